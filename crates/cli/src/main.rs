// Sheetload CLI
//
// Design Decision: Use clap derive for ergonomic argument parsing.
// Design Decision: Support text/json/yaml output formats for scripting.
// Design Decision: Logs go to stderr so json/yaml on stdout stays parseable.

mod client;
mod commands;
mod output;

use clap::{Parser, Subcommand};
use output::OutputFormat;
use sheetload_core::config::DEFAULT_SERVER;
use sheetload_core::LoadTestConfig;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "sheetload")]
#[command(about = "Sheetload - Load tester for the Excel data query endpoint")]
#[command(version)]
pub struct Cli {
    /// Server from the registry (see `sheetload servers`)
    #[arg(long, short, env = "SHEETLOAD_SERVER", default_value = DEFAULT_SERVER)]
    pub server: String,

    /// Base URL to target instead of a registry entry
    #[arg(long, env = "SHEETLOAD_BASE_URL")]
    pub base_url: Option<String>,

    /// Output format
    #[arg(long, short, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Seed for query generation, for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,

    /// Suppress per-request progress lines
    #[arg(long, short)]
    pub quiet: bool,

    /// Answer every request in memory instead of calling the server
    #[arg(long)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send one simple query and print the outcome
    Single,

    /// Run one concurrent batch
    Concurrent {
        /// Maximum requests in flight (default 10)
        concurrency: Option<usize>,

        /// Number of requests in the batch (default 100)
        total: Option<usize>,

        /// simple, complex, paginated (or pagination) or mixed (default)
        category: Option<String>,
    },

    /// Single request followed by simple, complex, paginated and mixed batches
    Comprehensive,

    /// Check /health and run a sample query (exit 1 on failure)
    Check {
        /// Server to check (defaults to --server)
        server: Option<String>,
    },

    /// List configured servers
    Servers,
}

fn init_tracing(quiet: bool) {
    let default_level = if quiet { "sheetload=warn" } else { "sheetload=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.quiet);

    let config = LoadTestConfig::from_env()?;
    let output_format = cli.output;

    let passed = match cli.command {
        Some(Commands::Servers) => {
            commands::servers::run(&config, output_format)?;
            true
        }
        Some(Commands::Check { server }) => {
            let name = server.unwrap_or(cli.server);
            commands::check::run(&config, &name, cli.base_url.as_deref(), output_format).await?
        }
        Some(Commands::Single) => {
            let mut client = load_client(config, &cli.server, cli.base_url, cli.seed, cli.dry_run)?;
            commands::single::run(&mut client, output_format).await?;
            true
        }
        Some(Commands::Concurrent {
            concurrency,
            total,
            category,
        }) => {
            let mut client = load_client(config, &cli.server, cli.base_url, cli.seed, cli.dry_run)?;
            commands::concurrent::run(
                &mut client,
                output_format,
                cli.quiet,
                concurrency,
                total,
                category.as_deref(),
            )
            .await?;
            true
        }
        Some(Commands::Comprehensive) => {
            let mut client = load_client(config, &cli.server, cli.base_url, cli.seed, cli.dry_run)?;
            commands::comprehensive::run(&mut client, output_format, cli.quiet).await?;
            true
        }
        None => {
            let mut client = load_client(config, &cli.server, cli.base_url, cli.seed, cli.dry_run)?;
            commands::interactive::run(&mut client, output_format, cli.quiet).await?
        }
    };

    Ok(exit_code(passed))
}

fn load_client(
    config: LoadTestConfig,
    server: &str,
    base_url: Option<String>,
    seed: Option<u64>,
    dry_run: bool,
) -> anyhow::Result<client::LoadClient> {
    let target = client::resolve_target(&config, server, base_url.as_deref())?;
    client::LoadClient::new(config, target, seed, dry_run)
}

fn exit_code(passed: bool) -> ExitCode {
    if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_concurrent_positional_arguments() {
        let cli = Cli::try_parse_from(["sheetload", "concurrent", "20", "200", "complex"]).unwrap();
        match cli.command {
            Some(Commands::Concurrent {
                concurrency,
                total,
                category,
            }) => {
                assert_eq!(concurrency, Some(20));
                assert_eq!(total, Some(200));
                assert_eq!(category.as_deref(), Some("complex"));
            }
            _ => panic!("expected concurrent command"),
        }
    }

    #[test]
    fn test_non_numeric_concurrency_is_rejected() {
        assert!(Cli::try_parse_from(["sheetload", "concurrent", "ten"]).is_err());
    }

    #[test]
    fn test_output_format_flag() {
        let cli = Cli::try_parse_from(["sheetload", "-o", "json", "servers"]).unwrap();
        assert_eq!(cli.output, OutputFormat::Json);
        assert!(Cli::try_parse_from(["sheetload", "-o", "xml", "servers"]).is_err());
    }

    #[test]
    fn test_base_url_reaches_check() {
        let cli = Cli::try_parse_from([
            "sheetload",
            "--base-url",
            "http://10.0.0.5:3000",
            "check",
        ])
        .unwrap();
        assert_eq!(cli.base_url.as_deref(), Some("http://10.0.0.5:3000"));
        assert!(matches!(cli.command, Some(Commands::Check { server: None })));
    }

    #[test]
    fn test_no_subcommand_means_interactive() {
        let cli = Cli::try_parse_from(["sheetload", "--seed", "7"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.seed, Some(7));
    }
}
