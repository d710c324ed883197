// Concurrent batch command

use crate::client::LoadClient;
use crate::output::{print_field, OutputFormat};
use anyhow::Result;
use sheetload_core::{
    AggregateStats, BatchReport, BatchSettings, NoopProgress, ProgressListener, QueryCategory,
    RequestOutcome,
};

/// Prints one line per completed request
pub struct ConsoleProgress;

impl ProgressListener for ConsoleProgress {
    fn on_outcome(&self, outcome: &RequestOutcome, stats: &AggregateStats, total: usize) {
        println!("{}", progress_line(outcome, stats, total));
    }
}

fn progress_line(outcome: &RequestOutcome, stats: &AggregateStats, total: usize) -> String {
    let done = stats.total_requests();
    let percent = if total == 0 {
        0.0
    } else {
        done as f64 / total as f64 * 100.0
    };
    format!(
        "Progress: {}/{} ({:.1}%) - {} - {:.3}s - rows: {} - success rate: {:.1}%",
        done,
        total,
        percent,
        if outcome.success { "ok" } else { "FAILED" },
        outcome.elapsed.as_secs_f64(),
        outcome.result_count,
        stats.success_rate(),
    )
}

pub async fn run(
    client: &mut LoadClient,
    output: OutputFormat,
    quiet: bool,
    concurrency: Option<usize>,
    total: Option<usize>,
    category: Option<&str>,
) -> Result<()> {
    let defaults = client.config().defaults.clone();
    let category = match category {
        Some(name) => name.parse::<QueryCategory>()?,
        None => defaults.category,
    };
    let settings = BatchSettings::new(
        concurrency.unwrap_or(defaults.concurrency),
        total.unwrap_or(defaults.total_requests),
        category,
    );

    let report = run_batch(client, settings, output, quiet).await?;
    print_report(&report, output)
}

/// Run one batch, streaming progress lines in text mode unless quiet
pub async fn run_batch(
    client: &mut LoadClient,
    settings: BatchSettings,
    output: OutputFormat,
    quiet: bool,
) -> Result<BatchReport> {
    if output.is_text() {
        println!("Starting concurrent load test");
        print_field("Endpoint", client.endpoint());
        print_field("Category", settings.category.as_str());
        print_field("Concurrency", &settings.concurrency.to_string());
        print_field("Requests", &settings.total_requests.to_string());
        println!("{}", "-".repeat(80));
    }

    if output.is_text() && !quiet {
        client.run_batch(settings, &ConsoleProgress).await
    } else {
        client.run_batch(settings, &NoopProgress).await
    }
}

pub fn print_report(report: &BatchReport, output: OutputFormat) -> Result<()> {
    if output.is_text() {
        println!();
        print!("{}", report);
        Ok(())
    } else {
        output.print_value(report)
    }
}
