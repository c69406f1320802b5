use super::IntelModule;
use crate::error::ModuleError;
use crate::model::{Findings, ModuleKind, Query, QueryType, TtpFindings};
use async_trait::async_trait;

/// MITRE ATT&CK tactics and the techniques grouped under each.
static TACTICS: [(&str, &[&str]); 10] = [
    ("initial_access", &["Phishing", "Exploit", "Supply Chain"]),
    ("execution", &["Command Line", "Script", "PowerShell"]),
    ("persistence", &["Account Creation", "Registry", "Scheduled Task"]),
    ("privilege_escalation", &["UAC Bypass", "Token Impersonation"]),
    ("defense_evasion", &["Obfuscation", "Living off Land"]),
    ("discovery", &["System Information", "Network Service Scan"]),
    ("lateral_movement", &["Pass the Hash", "Exploitation"]),
    ("collection", &["Data Staging", "Archiving"]),
    ("exfiltration", &["Data Transfer", "C2 Channel"]),
    ("impact", &["Data Destruction", "Ransom"]),
];

/// Tactic, technique and procedure mapping.
///
/// Holds the tactic catalog but has no classifier: results always carry an
/// empty `identified_ttps` list and "unknown" severity.
pub struct TtpMapper;

impl TtpMapper {
    pub fn new() -> Self {
        Self
    }

    pub fn tactics(&self) -> impl Iterator<Item = (&'static str, &'static [&'static str])> {
        TACTICS.iter().copied()
    }

    /// The tactic a technique belongs to, matched case-insensitively.
    pub fn tactic_of(&self, technique: &str) -> Option<&'static str> {
        self.tactics()
            .find(|(_, techniques)| techniques.iter().any(|t| t.eq_ignore_ascii_case(technique)))
            .map(|(tactic, _)| tactic)
    }
}

impl Default for TtpMapper {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IntelModule for TtpMapper {
    fn name(&self) -> &'static str {
        "ttp_analysis"
    }

    fn kind(&self) -> ModuleKind {
        ModuleKind::Ttp
    }

    fn supported_types(&self) -> &[QueryType] {
        &QueryType::ALL
    }

    async fn lookup(&self, _query: &Query) -> Result<Findings, ModuleError> {
        Ok(Findings::Ttp(TtpFindings::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_covers_ten_tactics() {
        assert_eq!(TtpMapper::new().tactics().count(), 10);
    }

    #[test]
    fn test_tactic_of() {
        let mapper = TtpMapper::new();
        assert_eq!(mapper.tactic_of("phishing"), Some("initial_access"));
        assert_eq!(mapper.tactic_of("Pass the Hash"), Some("lateral_movement"));
        assert_eq!(mapper.tactic_of("Ransom"), Some("impact"));
        assert_eq!(mapper.tactic_of("Teleportation"), None);
    }

    #[tokio::test]
    async fn test_lookup_identifies_nothing() {
        let result = TtpMapper::new()
            .search(&Query::new("evil.example", QueryType::Domain))
            .await;
        match result.findings {
            Findings::Ttp(t) => {
                assert!(t.identified_ttps.is_empty());
                assert_eq!(t.severity, "unknown");
            }
            other => panic!("unexpected findings: {:?}", other),
        }
    }
}
