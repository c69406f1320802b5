//! Threat signal aggregation.
//!
//! [`aggregate`] turns a [`ScanResult`] into [`ThreatSignals`]. Each evidence
//! category (breach, malicious indicator, TTPs) adds at most one to
//! `threat_count`, whatever the size of the underlying counter.

use crate::model::{Findings, ScanResult};
use serde::{Deserialize, Serialize};

/// Summary signals derived from a scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatSignals {
    pub breach_detected: bool,
    pub breach_count: usize,
    pub malicious_detected: bool,
    pub ttps_identified: usize,
    /// Number of positive categories, in `0..=3`.
    pub threat_count: usize,
}

impl ThreatSignals {
    pub fn has_threats(&self) -> bool {
        self.threat_count > 0
    }
}

/// Computes the threat signals of a scan.
///
/// Failed and not-applicable results are skipped, as are modules that were
/// not run.
pub fn aggregate(result: &ScanResult) -> ThreatSignals {
    let mut signals = ThreatSignals::default();

    for partial in result.per_module.values().filter(|r| r.is_usable()) {
        match &partial.findings {
            Findings::Breach(b) if b.credentials_found => {
                signals.breach_detected = true;
                signals.breach_count = signals.breach_count.max(b.breach_count);
            }
            Findings::Threat(t) if t.threat_found => {
                signals.malicious_detected = true;
            }
            Findings::Ttp(t) => {
                signals.ttps_identified += t.identified_ttps.len();
            }
            _ => {}
        }
    }

    signals.threat_count = [
        signals.breach_detected,
        signals.malicious_detected,
        signals.ttps_identified > 0,
    ]
    .into_iter()
    .filter(|positive| *positive)
    .count();

    signals
}
