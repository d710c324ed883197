// Interactive menu, used when no subcommand is given

use crate::client::LoadClient;
use crate::commands::{check, comprehensive, concurrent, single};
use crate::output::{print_banner, OutputFormat};
use anyhow::{bail, Context, Result};
use sheetload_core::{LoadTestConfig, QueryCategory};
use std::io::{self, BufRead, Write};

/// Show the menu, run the chosen action. Returns false when a check failed.
pub async fn run(client: &mut LoadClient, output: OutputFormat, quiet: bool) -> Result<bool> {
    let stdin = io::stdin();
    let mut input = stdin.lock();

    print_banner("Excel data service - query load tester");
    println!("Choose a test mode:");
    println!("1. Single request");
    println!("2. Concurrent load test");
    println!("3. Comprehensive load test");
    println!("4. Connection check");

    let choice = prompt(&mut input, "\nEnter choice (1-4): ")?;
    match choice.as_str() {
        "1" => single::run(client, output).await?,
        "2" => {
            let defaults = client.config().defaults.clone();
            let concurrency = prompt_number(
                &mut input,
                &format!("Concurrency (default {}): ", defaults.concurrency),
                defaults.concurrency,
            )?;
            let total = prompt_number(
                &mut input,
                &format!("Total requests (default {}): ", defaults.total_requests),
                defaults.total_requests,
            )?;
            let category = prompt(
                &mut input,
                &format!(
                    "Category (simple/complex/pagination/mixed, default {}): ",
                    defaults.category
                ),
            )?;
            let category = if category.is_empty() {
                defaults.category
            } else {
                category.parse::<QueryCategory>()?
            };
            concurrent::run(
                client,
                output,
                quiet,
                Some(concurrency),
                Some(total),
                Some(category.as_str()),
            )
            .await?
        }
        "3" => comprehensive::run(client, output, quiet).await?,
        "4" => {
            let config = client.config().clone();
            let server = choose_server(&mut input, &config)?;
            return check::run(&config, &server, None, output).await;
        }
        other => bail!("Invalid choice: {:?}", other),
    }

    Ok(true)
}

fn choose_server<R: BufRead>(input: &mut R, config: &LoadTestConfig) -> Result<String> {
    println!("Choose a server:");
    for (i, server) in config.servers.iter().enumerate() {
        println!(
            "{}. {} - {} ({})",
            i + 1,
            server.name,
            server.description,
            server.base_url
        );
    }
    let answer = prompt(input, &format!("\nEnter choice (1-{}): ", config.servers.len()))?;
    server_by_choice(config, &answer)
}

/// Accepts a 1-based menu number or a server name
fn server_by_choice(config: &LoadTestConfig, answer: &str) -> Result<String> {
    if let Ok(index) = answer.parse::<usize>() {
        return match config.servers.iter().nth(index.wrapping_sub(1)) {
            Some(server) => Ok(server.name.clone()),
            None => bail!("Invalid choice: {}", answer),
        };
    }
    Ok(config.servers.resolve(answer)?.name.clone())
}

fn prompt<R: BufRead>(input: &mut R, label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim().to_string())
}

fn prompt_number<R: BufRead>(input: &mut R, label: &str, default: usize) -> Result<usize> {
    let answer = prompt(input, label)?;
    if answer.is_empty() {
        return Ok(default);
    }
    answer
        .parse()
        .with_context(|| format!("Not a number: {}", answer))
}
