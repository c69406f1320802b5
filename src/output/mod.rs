mod cli;
mod json;

pub use cli::{print_cli_table, render_table};
pub use json::{print_json, ScanReport};

use crate::aggregate::ThreatSignals;
use crate::model::{Query, ScanResult};
use crate::notify::render;
use anyhow::Result;

/// Output format for scan results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Per-module table with a summary
    Table,
    /// JSON document with query, result and signals
    Json,
    /// Plain-text alert report
    Text,
    /// HTML alert report
    Html,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "text" | "txt" => Ok(OutputFormat::Text),
            "html" => Ok(OutputFormat::Html),
            _ => Err(format!(
                "Unknown format: {}. Use 'table', 'json', 'text', or 'html'",
                s
            )),
        }
    }
}

pub fn print_result(
    query: &Query,
    result: &ScanResult,
    signals: &ThreatSignals,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Table => print_cli_table(result, signals),
        OutputFormat::Json => print_json(&ScanReport::new(query, result, *signals)),
        OutputFormat::Text | OutputFormat::Html => {
            println!("{}", format_result_to_string(query, result, signals, format)?);
            Ok(())
        }
    }
}

/// Format result to string for file output
pub fn format_result_to_string(
    query: &Query,
    result: &ScanResult,
    signals: &ThreatSignals,
    format: OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render(query, result, signals).text),
        OutputFormat::Html => Ok(render(query, result, signals).html),
        OutputFormat::Json | OutputFormat::Table => {
            // Table output goes to files as JSON
            Ok(serde_json::to_string_pretty(&ScanReport::new(
                query, result, *signals,
            ))?)
        }
    }
}
