use super::IntelModule;
use crate::error::ModuleError;
use crate::model::{Findings, LeakFindings, ModuleKind, Query, QueryType};
use async_trait::async_trait;

/// Paste-site and leak database search.
///
/// A placeholder: no paste-site scraping source is configured, so every
/// lookup completes with zero leaks. It still runs for every query type,
/// so the module shows up in `modules_run` and in reports.
pub struct LeakDetector;

impl LeakDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LeakDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IntelModule for LeakDetector {
    fn name(&self) -> &'static str {
        "leak"
    }

    fn kind(&self) -> ModuleKind {
        ModuleKind::Leak
    }

    fn supported_types(&self) -> &[QueryType] {
        &QueryType::ALL
    }

    async fn lookup(&self, _query: &Query) -> Result<Findings, ModuleError> {
        Ok(Findings::Leak(LeakFindings::default()))
    }
}
