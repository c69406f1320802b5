use crate::aggregate::ThreatSignals;
use crate::model::{Query, ScanResult};
use anyhow::Result;
use serde::Serialize;

/// JSON document emitted by `--format json`.
#[derive(Serialize)]
pub struct ScanReport<'a> {
    pub query: &'a Query,
    pub result: &'a ScanResult,
    pub signals: ThreatSignals,
}

impl<'a> ScanReport<'a> {
    pub fn new(query: &'a Query, result: &'a ScanResult, signals: ThreatSignals) -> Self {
        Self {
            query,
            result,
            signals,
        }
    }
}

pub fn print_json(report: &ScanReport<'_>) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    println!("{}", json);
    Ok(())
}
