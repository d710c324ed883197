// Server registry listing

use crate::output::{print_table_header, print_table_row, OutputFormat};
use anyhow::Result;
use sheetload_core::LoadTestConfig;

pub fn run(config: &LoadTestConfig, output: OutputFormat) -> Result<()> {
    if !output.is_text() {
        return output.print_value(&config.servers);
    }

    if config.servers.is_empty() {
        println!("No servers configured");
        return Ok(());
    }

    print_table_header(&[("NAME", 12), ("BASE URL", 30), ("DESCRIPTION", 32)]);
    for server in config.servers.iter() {
        print_table_row(&[
            (&server.name, 12),
            (&server.base_url, 30),
            (&server.description, 32),
        ]);
    }

    Ok(())
}
