//! Intelligence modules.
//!
//! This module provides the [`IntelModule`] trait, the [`ModuleRegistry`]
//! that catalogs modules by name, and one implementation per source.
//!
//! # Available Modules
//!
//! | Name | Module | Query types |
//! |------|--------|-------------|
//! | `breach` | [`BreachFinder`] | email |
//! | `domain` | [`DomainIntel`] | domain, url |
//! | `threat` | [`ThreatIntel`] | url, domain, ip |
//! | `darkweb` | [`DarkWebCrawler`] | all |
//! | `leak` | [`LeakDetector`] | all |
//! | `ttp_analysis` | [`TtpMapper`] | all |
//!
//! # Example
//!
//! ```no_run
//! use osintwatch::intel::ModuleRegistry;
//! use osintwatch::model::Query;
//! use osintwatch::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let registry = ModuleRegistry::from_config(&Config::default())?;
//!     let query = Query::parse("user@example.com")?;
//!     for module in registry.iter() {
//!         let result = module.search(&query).await;
//!         println!("{}: {}", module.name(), result.status.as_str());
//!     }
//!     Ok(())
//! }
//! ```

mod breach;
mod darkweb;
mod domain;
mod leak;
mod threat;
mod ttp;

pub use breach::BreachFinder;
pub use darkweb::DarkWebCrawler;
pub use domain::DomainIntel;
pub use leak::LeakDetector;
pub use threat::ThreatIntel;
pub use ttp::TtpMapper;

use crate::config::Config;
use crate::error::ModuleError;
use crate::model::{Findings, ModuleKind, PartialResult, Query, QueryType};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("osintwatch/", env!("CARGO_PKG_VERSION"));

/// A single intelligence source.
///
/// Implementors provide [`lookup`](Self::lookup), which may fail. Callers use
/// [`search`](Self::search), which never does: failures and unsupported
/// query types are folded into the returned [`PartialResult`].
#[async_trait]
pub trait IntelModule: Send + Sync {
    /// Registry key, e.g. `"breach"`.
    fn name(&self) -> &'static str;

    fn kind(&self) -> ModuleKind;

    /// Query types this module can answer.
    fn supported_types(&self) -> &[QueryType];

    fn applies_to(&self, query_type: QueryType) -> bool {
        self.supported_types().contains(&query_type)
    }

    /// Queries the source.
    ///
    /// Only called for queries whose type is in
    /// [`supported_types`](Self::supported_types).
    ///
    /// # Errors
    ///
    /// Returns a [`ModuleError`] on transport failure, unexpected status,
    /// undecodable payload or missing credentials.
    async fn lookup(&self, query: &Query) -> Result<Findings, ModuleError>;

    async fn search(&self, query: &Query) -> PartialResult {
        if !self.applies_to(query.query_type()) {
            debug!(
                module = self.name(),
                query_type = %query.query_type(),
                "module does not apply to query type"
            );
            return PartialResult::not_applicable(self.name(), self.kind());
        }

        match self.lookup(query).await {
            Ok(findings) => {
                debug_assert_eq!(findings.kind(), self.kind());
                PartialResult::completed(self.name(), findings)
            }
            Err(e) => {
                warn!(module = self.name(), error = %e, "lookup failed");
                PartialResult::failed(self.name(), self.kind(), e.to_string())
            }
        }
    }
}

/// Name-keyed catalog of modules.
///
/// Built once, then shared read-only between scans (wrap it in an `Arc`).
/// Names are unique; registering a name twice replaces the earlier module.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: Vec<Arc<dyn IntelModule>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every built-in module, configured from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = http_client(config)?;

        Ok(Self::new()
            .with(BreachFinder::new(client.clone(), &config.api_keys.hibp))
            .with(DomainIntel::new(
                client.clone(),
                &config.api_keys.securitytrails,
            ))
            .with(ThreatIntel::new(client, &config.api_keys.virustotal))
            .with(DarkWebCrawler::new(&config.tor))
            .with(LeakDetector::new())
            .with(TtpMapper::new()))
    }

    pub fn with(mut self, module: impl IntelModule + 'static) -> Self {
        self.register(Arc::new(module));
        self
    }

    pub fn register(&mut self, module: Arc<dyn IntelModule>) {
        match self.modules.iter().position(|m| m.name() == module.name()) {
            Some(idx) => self.modules[idx] = module,
            None => self.modules.push(module),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn IntelModule>> {
        self.modules.iter().find(|m| m.name() == name).cloned()
    }

    /// Module names in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.modules.iter().map(|m| m.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn IntelModule>> {
        self.modules.iter()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

fn http_client(config: &Config) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(config.request_timeout())
        .build()
}

/// Joins path segments onto `base`, percent-encoding each one.
pub(crate) fn endpoint(base: &str, segments: &[&str]) -> Result<reqwest::Url, ModuleError> {
    let mut url =
        reqwest::Url::parse(base).map_err(|e| ModuleError::Endpoint(format!("{}: {}", base, e)))?;
    url.path_segments_mut()
        .map_err(|_| ModuleError::Endpoint(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

pub(crate) fn require_key(
    key: &Option<String>,
    source_name: &'static str,
) -> Result<String, ModuleError> {
    key.clone()
        .ok_or(ModuleError::MissingCredential(source_name))
}

pub(crate) fn non_empty(key: &str) -> Option<String> {
    let key = key.trim();
    (!key.is_empty()).then(|| key.to_string())
}
