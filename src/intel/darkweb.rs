use super::IntelModule;
use crate::config::TorConfig;
use crate::error::ModuleError;
use crate::model::{DarkWebFindings, Findings, ModuleKind, Query, QueryType};
use async_trait::async_trait;
use tracing::debug;

/// Onion search engines a Tor-backed crawler would query.
const ONION_ENGINES: [&str; 1] = ["http://ahmia27vwqq2h3zb.onion/search/?q="];

/// Dark web mention search.
///
/// There is no crawler behind this module. It always returns an empty,
/// "unknown" result so scans that request it still complete.
pub struct DarkWebCrawler {
    tor: TorConfig,
}

impl DarkWebCrawler {
    pub fn new(tor: &TorConfig) -> Self {
        Self { tor: tor.clone() }
    }

    pub fn engines(&self) -> &[&'static str] {
        &ONION_ENGINES
    }
}

#[async_trait]
impl IntelModule for DarkWebCrawler {
    fn name(&self) -> &'static str {
        "darkweb"
    }

    fn kind(&self) -> ModuleKind {
        ModuleKind::DarkWeb
    }

    fn supported_types(&self) -> &[QueryType] {
        &QueryType::ALL
    }

    async fn lookup(&self, query: &Query) -> Result<Findings, ModuleError> {
        debug!(
            target_query = %query,
            tor_enabled = self.tor.enabled,
            proxy = %self.tor.proxy,
            engines = self.engines().len(),
            "dark web crawling unavailable, returning empty result"
        );
        Ok(Findings::DarkWeb(DarkWebFindings::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModuleStatus;

    #[tokio::test]
    async fn test_returns_neutral_result_for_every_type() {
        let module = DarkWebCrawler::new(&TorConfig::default());
        for query_type in QueryType::ALL {
            let result = module.search(&Query::new("target", query_type)).await;
            assert_eq!(result.status, ModuleStatus::Completed);
            match result.findings {
                Findings::DarkWeb(d) => {
                    assert!(d.mentions.is_empty());
                    assert_eq!(d.threat_level, "unknown");
                }
                other => panic!("unexpected findings: {:?}", other),
            }
        }
    }
}
