// Output formatting for CLI

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;

/// How command results are written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report
    Text,
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn print_value<T: Serialize>(&self, value: &T) -> Result<()> {
        match self {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(value)?);
            }
            OutputFormat::Yaml => {
                println!("{}", serde_yaml::to_string(value)?);
            }
            OutputFormat::Text => {
                // Text format is handled by each command
            }
        }
        Ok(())
    }

    pub fn is_text(&self) -> bool {
        matches!(self, OutputFormat::Text)
    }
}

/// Width of the label column in key-value output
const LABEL_WIDTH: usize = 14;

/// `Label:         value` line for text output
pub fn print_field(label: &str, value: &str) {
    println!("{}", field_line(label, value));
}

fn field_line(label: &str, value: &str) -> String {
    let label = format!("{}:", label);
    format!("{:<w$} {}", label, value, w = LABEL_WIDTH)
}

/// Title underlined with `=`
pub fn print_banner(title: &str) {
    println!("{}\n{}", title, "=".repeat(60));
}

/// Column titles, padded like the rows below them
pub fn print_table_header(columns: &[(&str, usize)]) {
    println!("{}", table_line(columns));
}

/// One table row; cells longer than their column are cut
pub fn print_table_row(cells: &[(&str, usize)]) {
    println!("{}", table_line(cells));
}

fn table_line(cells: &[(&str, usize)]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .map(|&(cell, width)| format!("{:<w$}", truncate(cell, width), w = width))
        .collect();
    padded.join("  ").trim_end().to_string()
}

/// Shorten to `width` characters, marking the cut with an ellipsis
fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let kept: String = value.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_names() {
        assert_eq!(OutputFormat::from_str("yaml", true).unwrap(), OutputFormat::Yaml);
        assert!(OutputFormat::from_str("xml", true).is_err());
        assert!(OutputFormat::Text.is_text());
        assert!(!OutputFormat::Json.is_text());
    }

    #[test]
    fn test_table_and_field_lines() {
        assert_eq!(
            table_line(&[("local", 8), ("http://localhost:3000", 10)]),
            "local     http://..."
        );
        assert_eq!(field_line("Rows", "10"), "Rows:          10");
    }

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate("local", 10), "local");
        assert_eq!(truncate("http://101.126.91.134:9000", 10), "http://...");
        assert_eq!(truncate("技术部技术部技术部", 5), "技术...");
    }
}
