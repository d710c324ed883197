// Comprehensive test: one single request, then a fixed series of batches

use crate::client::LoadClient;
use crate::commands::{concurrent, single};
use crate::output::{print_banner, print_table_header, print_table_row, OutputFormat};
use anyhow::Result;
use serde::Serialize;
use sheetload_core::{BatchReport, BatchSettings, QueryCategory, RequestOutcome};

/// Batches run after the single request, in order
pub const PLAN: [(usize, usize, QueryCategory); 4] = [
    (10, 100, QueryCategory::Simple),
    (20, 200, QueryCategory::Complex),
    (15, 150, QueryCategory::Paginated),
    (30, 300, QueryCategory::Mixed),
];

#[derive(Debug, Serialize)]
pub struct ComprehensiveReport {
    pub single: RequestOutcome,
    pub batches: Vec<BatchReport>,
}

pub async fn run(client: &mut LoadClient, output: OutputFormat, quiet: bool) -> Result<()> {
    if output.is_text() {
        print_banner("Excel data service - comprehensive load test");
        println!("1. Single request");
    }

    let single = client.single(QueryCategory::Simple).await;
    if output.is_text() {
        single::print_outcome(&single);
    }

    let mut batches = Vec::with_capacity(PLAN.len());
    for (step, &(concurrency, total, category)) in PLAN.iter().enumerate() {
        if output.is_text() {
            println!(
                "\n{}. {} queries ({} concurrent, {} requests)",
                step + 2,
                category,
                concurrency,
                total
            );
        }
        let settings = BatchSettings::new(concurrency, total, category);
        let report = concurrent::run_batch(client, settings, output, quiet).await?;
        if output.is_text() {
            concurrent::print_report(&report, output)?;
        }
        batches.push(report);
    }

    if !output.is_text() {
        return output.print_value(&ComprehensiveReport { single, batches });
    }

    println!("\nSummary");
    print_table_header(&[
        ("CATEGORY", 10),
        ("REQUESTS", 8),
        ("SUCCESS", 8),
        ("MEAN", 8),
        ("REQ/S", 8),
        ("TIER", 10),
    ]);
    for report in &batches {
        let success = format!("{:.1}%", report.success_rate);
        let mean = report
            .latency
            .as_ref()
            .map(|l| format!("{:.3}s", l.mean_secs))
            .unwrap_or_else(|| "-".to_string());
        let throughput = format!("{:.1}", report.throughput);
        let tier = report
            .tier
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string());
        print_table_row(&[
            (report.category.as_str(), 10),
            (&report.total_requests.to_string(), 8),
            (&success, 8),
            (&mean, 8),
            (&throughput, 8),
            (&tier, 10),
        ]);
    }
    println!("\nAll tests finished");

    Ok(())
}
