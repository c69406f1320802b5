use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The kind of intelligence a module gathers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    Breach,
    Domain,
    Threat,
    DarkWeb,
    Leak,
    Ttp,
}

impl ModuleKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            ModuleKind::Breach => "Breach Databases",
            ModuleKind::Domain => "Domain & DNS",
            ModuleKind::Threat => "Threat Intelligence",
            ModuleKind::DarkWeb => "Dark Web Mentions",
            ModuleKind::Leak => "Leak Databases",
            ModuleKind::Ttp => "TTP Analysis",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BreachFindings {
    pub breaches: Vec<String>,
    pub credentials_found: bool,
    pub breach_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    pub record_type: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainFindings {
    pub domain: String,
    pub dns_records: Vec<DnsRecord>,
    pub whois: BTreeMap<String, String>,
    pub subdomains: Vec<String>,
    pub ssl_certs: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreatFindings {
    pub threat_found: bool,
    pub reputation_score: i64,
    /// Engines that flagged the target as malicious.
    pub detections: Vec<String>,
    pub last_analysis: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DarkWebFindings {
    pub mentions: Vec<String>,
    pub threat_level: String,
    pub sources_checked: Vec<String>,
}

impl Default for DarkWebFindings {
    fn default() -> Self {
        Self {
            mentions: Vec::new(),
            threat_level: "unknown".to_string(),
            sources_checked: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeakFindings {
    pub leaks_found: bool,
    pub leak_count: usize,
    pub leaked_data: Vec<String>,
}

/// A tactic/technique pair attributed to the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifiedTtp {
    pub tactic: String,
    pub technique: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtpFindings {
    pub identified_ttps: Vec<IdentifiedTtp>,
    pub threat_groups: Vec<String>,
    pub severity: String,
}

impl Default for TtpFindings {
    fn default() -> Self {
        Self {
            identified_ttps: Vec::new(),
            threat_groups: Vec::new(),
            severity: "unknown".to_string(),
        }
    }
}

/// Module-specific data carried by a [`PartialResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Findings {
    Breach(BreachFindings),
    Domain(DomainFindings),
    Threat(ThreatFindings),
    DarkWeb(DarkWebFindings),
    Leak(LeakFindings),
    Ttp(TtpFindings),
}

impl Findings {
    /// The documented defaults for a module kind: nothing found.
    pub fn empty(kind: ModuleKind) -> Self {
        match kind {
            ModuleKind::Breach => Findings::Breach(BreachFindings::default()),
            ModuleKind::Domain => Findings::Domain(DomainFindings::default()),
            ModuleKind::Threat => Findings::Threat(ThreatFindings::default()),
            ModuleKind::DarkWeb => Findings::DarkWeb(DarkWebFindings::default()),
            ModuleKind::Leak => Findings::Leak(LeakFindings::default()),
            ModuleKind::Ttp => Findings::Ttp(TtpFindings::default()),
        }
    }

    pub fn kind(&self) -> ModuleKind {
        match self {
            Findings::Breach(_) => ModuleKind::Breach,
            Findings::Domain(_) => ModuleKind::Domain,
            Findings::Threat(_) => ModuleKind::Threat,
            Findings::DarkWeb(_) => ModuleKind::DarkWeb,
            Findings::Leak(_) => ModuleKind::Leak,
            Findings::Ttp(_) => ModuleKind::Ttp,
        }
    }

    /// One-line human summary, used by the table output.
    pub fn summary(&self) -> String {
        match self {
            Findings::Breach(b) if b.credentials_found => {
                format!("{} breaches", b.breach_count)
            }
            Findings::Breach(_) => "no breaches".to_string(),
            Findings::Domain(d) => format!(
                "{} DNS records, {} subdomains",
                d.dns_records.len(),
                d.subdomains.len()
            ),
            Findings::Threat(t) if t.threat_found => {
                format!("malicious ({} detections)", t.detections.len())
            }
            Findings::Threat(t) => format!("clean (reputation {})", t.reputation_score),
            Findings::DarkWeb(d) => format!("{} mentions", d.mentions.len()),
            Findings::Leak(l) => format!("{} leaks", l.leak_count),
            Findings::Ttp(t) => format!("{} TTPs", t.identified_ttps.len()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
    Completed,
    NotApplicable,
    Failed,
}

impl ModuleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleStatus::Completed => "completed",
            ModuleStatus::NotApplicable => "not applicable",
            ModuleStatus::Failed => "failed",
        }
    }
}

/// One module's outcome for one query.
///
/// `error` is set if and only if `status` is [`ModuleStatus::Failed`]; the
/// constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialResult {
    pub module: String,
    pub status: ModuleStatus,
    pub findings: Findings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PartialResult {
    pub fn completed(module: impl Into<String>, findings: Findings) -> Self {
        Self {
            module: module.into(),
            status: ModuleStatus::Completed,
            findings,
            error: None,
        }
    }

    pub fn not_applicable(module: impl Into<String>, kind: ModuleKind) -> Self {
        Self {
            module: module.into(),
            status: ModuleStatus::NotApplicable,
            findings: Findings::empty(kind),
            error: None,
        }
    }

    pub fn failed(module: impl Into<String>, kind: ModuleKind, error: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            status: ModuleStatus::Failed,
            findings: Findings::empty(kind),
            error: Some(error.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == ModuleStatus::Failed
    }

    /// Whether this result can be counted as evidence.
    pub fn is_usable(&self) -> bool {
        self.status == ModuleStatus::Completed && self.error.is_none()
    }
}

/// The combined outcome of one scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Invoked module names, in request order.
    pub modules_run: Vec<String>,
    pub per_module: BTreeMap<String, PartialResult>,
    pub timestamp: DateTime<Utc>,
}

impl ScanResult {
    pub fn new(modules_run: Vec<String>, per_module: BTreeMap<String, PartialResult>) -> Self {
        Self {
            modules_run,
            per_module,
            timestamp: Utc::now(),
        }
    }

    /// Results in `modules_run` order.
    pub fn results(&self) -> impl Iterator<Item = &PartialResult> {
        self.modules_run
            .iter()
            .filter_map(|name| self.per_module.get(name))
    }

    pub fn failed_modules(&self) -> impl Iterator<Item = &PartialResult> {
        self.results().filter(|r| r.is_failed())
    }

    pub fn timestamp_string(&self) -> String {
        self.timestamp
            .to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_result_carries_defaults() {
        let result = PartialResult::failed("breach", ModuleKind::Breach, "connection refused");
        assert!(result.is_failed());
        assert!(!result.is_usable());
        assert_eq!(result.error.as_deref(), Some("connection refused"));
        match result.findings {
            Findings::Breach(b) => {
                assert!(!b.credentials_found);
                assert_eq!(b.breach_count, 0);
            }
            other => panic!("unexpected findings: {:?}", other),
        }
    }

    #[test]
    fn test_not_applicable_has_no_error() {
        let result = PartialResult::not_applicable("domain", ModuleKind::Domain);
        assert_eq!(result.status, ModuleStatus::NotApplicable);
        assert!(result.error.is_none());
        assert!(!result.is_usable());
    }

    #[test]
    fn test_empty_ttp_findings_severity_unknown() {
        match Findings::empty(ModuleKind::Ttp) {
            Findings::Ttp(t) => assert_eq!(t.severity, "unknown"),
            other => panic!("unexpected findings: {:?}", other),
        }
    }

    #[test]
    fn test_results_follow_modules_run_order() {
        let mut per_module = BTreeMap::new();
        per_module.insert(
            "threat".to_string(),
            PartialResult::completed("threat", Findings::empty(ModuleKind::Threat)),
        );
        per_module.insert(
            "breach".to_string(),
            PartialResult::failed("breach", ModuleKind::Breach, "timeout"),
        );
        let result = ScanResult::new(vec!["threat".to_string(), "breach".to_string()], per_module);

        let names: Vec<_> = result.results().map(|r| r.module.as_str()).collect();
        assert_eq!(names, vec!["threat", "breach"]);
        assert_eq!(result.failed_modules().count(), 1);
    }

    #[test]
    fn test_serialized_timestamp_is_iso8601() {
        let result = ScanResult::new(Vec::new(), BTreeMap::new());
        let json = serde_json::to_value(&result).unwrap();
        let ts = json["timestamp"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(ts).is_ok());
    }
}
