// Single request command

use crate::client::LoadClient;
use crate::output::{print_field, OutputFormat};
use anyhow::Result;
use sheetload_core::{QueryCategory, RequestOutcome};

pub async fn run(client: &mut LoadClient, output: OutputFormat) -> Result<()> {
    if output.is_text() {
        println!("Testing a single request");
        print_field("Endpoint", client.endpoint());
        print_field("Auth header", &client.config().auth.name);
        println!("{}", "-".repeat(60));
    }

    let outcome = client.single(QueryCategory::Simple).await;

    if output.is_text() {
        print_outcome(&outcome);
        Ok(())
    } else {
        output.print_value(&outcome)
    }
}

pub fn print_outcome(outcome: &RequestOutcome) {
    print_field("Result", if outcome.success { "success" } else { "failed" });
    print_field(
        "Response time",
        &format!("{:.3}s", outcome.elapsed.as_secs_f64()),
    );
    let status = outcome
        .status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "-".to_string());
    print_field("Status", &status);
    print_field("Rows", &outcome.result_count.to_string());
    print_field("Category", outcome.category.as_str());
    if let Some(error) = &outcome.error {
        print_field("Error", error);
    }
}
