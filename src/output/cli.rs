use crate::aggregate::ThreatSignals;
use crate::model::{ModuleStatus, PartialResult, ScanResult};
use anyhow::Result;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct ModuleRow {
    #[tabled(rename = "Module")]
    module: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Summary")]
    summary: String,
    #[tabled(rename = "Error")]
    error: String,
}

impl ModuleRow {
    fn from_result(result: &PartialResult) -> Self {
        let summary = match result.status {
            ModuleStatus::Completed => truncate(&result.findings.summary(), 50),
            _ => "-".to_string(),
        };
        Self {
            module: result.module.clone(),
            status: format_status(result.status),
            summary,
            error: result
                .error
                .as_deref()
                .map(|e| truncate(e, 60))
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

pub fn print_cli_table(result: &ScanResult, signals: &ThreatSignals) -> Result<()> {
    println!("{}", render_table(result, signals));
    Ok(())
}

pub fn render_table(result: &ScanResult, signals: &ThreatSignals) -> String {
    let mut out = String::new();

    out.push('\n');
    out.push_str(&format!(
        "Scan completed at: {}\n\n",
        result.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    if result.modules_run.is_empty() {
        out.push_str("No modules were run.\n");
    } else {
        let rows: Vec<ModuleRow> = result.results().map(ModuleRow::from_result).collect();
        out.push_str(&Table::new(rows).with(Style::rounded()).to_string());
        out.push('\n');
    }

    out.push('\n');
    out.push_str(&summary(result, signals));
    out
}

fn summary(result: &ScanResult, signals: &ThreatSignals) -> String {
    let failed = result.failed_modules().count();
    let skipped = result
        .results()
        .filter(|r| r.status == ModuleStatus::NotApplicable)
        .count();

    let mut lines = vec!["Summary:".to_string()];
    lines.push(format!(
        "  Modules: {} run, {} failed, {} not applicable",
        result.modules_run.len(),
        failed,
        skipped
    ));

    let mut positives = Vec::new();
    if signals.breach_detected {
        positives.push(format!("breach ({} breaches)", signals.breach_count));
    }
    if signals.malicious_detected {
        positives.push("malicious indicator".to_string());
    }
    if signals.ttps_identified > 0 {
        positives.push(format!("{} TTPs", signals.ttps_identified));
    }

    if positives.is_empty() {
        lines.push("  Threats: none detected".to_string());
    } else {
        lines.push(format!(
            "  Threats: {} ({})",
            signals.threat_count,
            positives.join(", ")
        ));
    }
    lines.join("\n")
}

fn format_status(status: ModuleStatus) -> String {
    match status {
        ModuleStatus::Completed => "\x1b[32mcompleted\x1b[0m".to_string(),
        ModuleStatus::Failed => "\x1b[31mfailed\x1b[0m".to_string(),
        ModuleStatus::NotApplicable => "n/a".to_string(),
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
