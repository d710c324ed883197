// Connection check command

use crate::client::resolve_target;
use crate::output::{print_banner, print_field, OutputFormat};
use anyhow::Result;
use sheetload_core::{
    check_connection, ConnectionReport, HealthCheck, LoadTestConfig, SampleQueryCheck,
};

/// Probe a server. `base_url` overrides the registry entry named `server`.
/// Returns whether the sample query passed.
pub async fn run(
    config: &LoadTestConfig,
    server: &str,
    base_url: Option<&str>,
    output: OutputFormat,
) -> Result<bool> {
    let entry = match resolve_target(config, server, base_url) {
        Ok(entry) => entry,
        Err(e) => {
            eprintln!("{}", e);
            return Ok(false);
        }
    };

    let report = check_connection(&entry, config).await?;

    if output.is_text() {
        print_report(&report, &config.auth.name);
    } else {
        output.print_value(&report)?;
    }

    Ok(report.is_success())
}

fn print_report(report: &ConnectionReport, auth_header: &str) {
    print_banner("Excel data service - connection check");
    print_field(
        "Server",
        &format!("{} ({})", report.server.name, report.server.description),
    );
    print_field("Base URL", &report.server.base_url);
    print_field("Auth header", auth_header);
    println!("{}", "-".repeat(60));

    match &report.health {
        HealthCheck::Healthy(info) => {
            println!("Health check passed");
            print_field("  Status", &info.status);
            print_field("  Database", &info.database);
            print_field("  Environment", &info.environment);
        }
        HealthCheck::UnexpectedStatus { status } => {
            println!("Health check returned status {}", status);
        }
        HealthCheck::InvalidBody { error } => {
            println!("Health check returned an unreadable body: {}", error);
        }
        HealthCheck::Unreachable { error } => {
            println!("Health check failed: {}", error);
        }
    }

    match &report.sample_query {
        SampleQueryCheck::Passed { rows, table_name } => {
            println!("Sample query passed");
            print_field("  Rows", &rows.to_string());
            print_field("  Table", table_name);
        }
        SampleQueryCheck::Failed { status, detail } => {
            println!("Sample query failed");
            if let Some(status) = status {
                print_field("  Status", &status.to_string());
            }
            print_field("  Detail", detail);
        }
        SampleQueryCheck::Skipped => {
            println!("Sample query skipped: health check failed");
        }
    }
}
