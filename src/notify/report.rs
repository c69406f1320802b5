//! Alert report rendering.
//!
//! Produces the subject, plain-text body and self-contained HTML body of
//! an alert from a scan and its [`ThreatSignals`].

use crate::aggregate::ThreatSignals;
use crate::model::{Query, ScanResult};
use serde::Serialize;

const RECOMMENDATIONS: [&str; 4] = [
    "Review full report in the OSINT Monitor dashboard",
    "Take appropriate action based on findings",
    "Update security policies if necessary",
    "Archive this alert for record-keeping",
];

const FOOTER: &str = concat!("OSINT Monitor v", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedReport {
    pub subject: String,
    pub text: String,
    pub html: String,
}

pub fn render(query: &Query, result: &ScanResult, signals: &ThreatSignals) -> RenderedReport {
    let target = query.raw_input();
    let subject = if signals.has_threats() {
        format!("OSINT Alert: Threats Detected for {}", target)
    } else {
        format!("OSINT Scan Report: {}", target)
    };

    RenderedReport {
        subject,
        text: render_text(target, result, signals),
        html: render_html(target, result, signals),
    }
}

fn modules_scanned(result: &ScanResult) -> String {
    if result.modules_run.is_empty() {
        "none".to_string()
    } else {
        result.modules_run.join(", ")
    }
}

/// `(module, error)` pairs for every failed module, in run order.
fn module_errors(result: &ScanResult) -> Vec<(&str, &str)> {
    result
        .failed_modules()
        .map(|r| (r.module.as_str(), r.error.as_deref().unwrap_or("unknown error")))
        .collect()
}

fn render_text(target: &str, result: &ScanResult, signals: &ThreatSignals) -> String {
    let mut text = String::new();

    text.push_str("OSINT MONITORING ALERT\n");
    text.push_str("========================\n\n");
    text.push_str(&format!("Search Target: {}\n", target));
    text.push_str(&format!("Modules Scanned: {}\n", modules_scanned(result)));
    text.push_str(&format!("Timestamp: {}\n\n", result.timestamp_string()));

    text.push_str("FINDINGS\n");
    text.push_str("--------\n");
    text.push_str(&format!("Threats Found: {}\n", signals.threat_count));

    if signals.breach_detected {
        text.push_str("\n✓ BREACH DETECTED\n");
        text.push_str(&format!("  Breaches: {}\n", signals.breach_count));
    }
    if signals.malicious_detected {
        text.push_str("\n✓ MALICIOUS URL/DOMAIN\n");
    }
    if signals.ttps_identified > 0 {
        text.push_str("\n✓ ATTACK PATTERNS IDENTIFIED\n");
        text.push_str(&format!("  TTPs: {}\n", signals.ttps_identified));
    }
    if !signals.has_threats() {
        text.push_str("\nNo immediate threats detected\n");
    }

    let errors = module_errors(result);
    if !errors.is_empty() {
        text.push_str("\nMODULE ERRORS\n");
        text.push_str("-------------\n");
        for (module, error) in errors {
            text.push_str(&format!("  {}: {}\n", module, error));
        }
    }

    text.push_str("\nRECOMMENDATIONS\n");
    text.push_str("---------------\n");
    for (i, line) in RECOMMENDATIONS.iter().enumerate() {
        text.push_str(&format!("{}. {}\n", i + 1, line));
    }

    text.push_str("\n---\n");
    text.push_str(FOOTER);
    text.push('\n');
    text
}

fn render_html(target: &str, result: &ScanResult, signals: &ThreatSignals) -> String {
    let (banner, banner_class) = if signals.has_threats() {
        ("THREAT ALERT", "alert")
    } else {
        ("SCAN REPORT", "clear")
    };

    let mut html = String::new();

    html.push_str(&format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>OSINT Report - {}</title>
    <style>
        body {{ font-family: Arial, sans-serif; background: #f5f5f5; }}
        .container {{ max-width: 600px; margin: 0 auto; background: white; padding: 20px; border-radius: 8px; }}
        .header {{ color: white; padding: 20px; border-radius: 4px; text-align: center; }}
        .header.alert {{ background: #d32f2f; }}
        .header.clear {{ background: #388e3c; }}
        .banner {{ font-size: 32px; font-weight: bold; }}
        .section {{ margin: 20px 0; padding: 15px; background: #f9f9f9; border-left: 4px solid #d32f2f; }}
        .section-title {{ font-size: 18px; font-weight: bold; color: #333; }}
        .details {{ font-size: 14px; line-height: 1.6; }}
        .details ul {{ list-style: none; padding: 0; }}
        .footer {{ margin-top: 20px; padding-top: 20px; border-top: 1px solid #ddd; text-align: center; color: #666; font-size: 12px; }}
    </style>
</head>
<body>
    <div class="container">
        <div class="header {}">
            <div class="banner">{}</div>
        </div>
        <div class="section">
            <div class="section-title">Search Target</div>
            <div class="details">{}</div>
        </div>
"#,
        html_escape(target),
        banner_class,
        banner,
        html_escape(target)
    ));

    // Findings
    let mut items = Vec::new();
    if signals.breach_detected {
        items.push(format!(
            "<li><strong>Breach Found:</strong> {} breaches</li>",
            signals.breach_count
        ));
    }
    if signals.malicious_detected {
        items.push("<li><strong>Malicious URL/Domain Detected</strong></li>".to_string());
    }
    if signals.ttps_identified > 0 {
        items.push(format!(
            "<li><strong>TTPs Identified:</strong> {} patterns</li>",
            signals.ttps_identified
        ));
    }
    if items.is_empty() {
        items.push("<li>No immediate threats detected</li>".to_string());
    }

    html.push_str(&format!(
        r#"        <div class="section">
            <div class="section-title">Findings Summary</div>
            <div class="details">
                <strong>Threats Found:</strong> {}
                <ul>
                    {}
                </ul>
            </div>
        </div>
        <div class="section">
            <div class="section-title">Modules Scanned</div>
            <div class="details">{}</div>
        </div>
"#,
        signals.threat_count,
        items.join("\n                    "),
        html_escape(&modules_scanned(result))
    ));

    let errors = module_errors(result);
    if !errors.is_empty() {
        html.push_str(
            r#"        <div class="section">
            <div class="section-title">Module Errors</div>
            <div class="details">
                <ul>
"#,
        );
        for (module, error) in errors {
            html.push_str(&format!(
                "                    <li><strong>{}:</strong> {}</li>\n",
                html_escape(module),
                html_escape(error)
            ));
        }
        html.push_str("                </ul>\n            </div>\n        </div>\n");
    }

    html.push_str(
        r#"        <div class="section">
            <div class="section-title">Recommendations</div>
            <div class="details">
                <ol>
"#,
    );
    for line in RECOMMENDATIONS {
        html.push_str(&format!("                    <li>{}</li>\n", line));
    }
    html.push_str("                </ol>\n            </div>\n        </div>\n");

    html.push_str(&format!(
        r#"        <div class="footer">
            <p>This is an automated alert from {}</p>
            <p>Timestamp: {}</p>
        </div>
    </div>
</body>
</html>
"#,
        FOOTER,
        result.timestamp_string()
    ));

    html
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
