// CLI subcommands

pub mod check;
pub mod comprehensive;
pub mod concurrent;
pub mod interactive;
pub mod servers;
pub mod single;
