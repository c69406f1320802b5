//! Scan orchestration.
//!
//! The [`Orchestrator`] runs a selection of registry modules against one
//! query and collects one [`PartialResult`] per module. A module that fails,
//! times out or panics only affects its own entry.

use crate::cache::ResultCache;
use crate::error::{ModuleError, ScanError};
use crate::intel::{IntelModule, ModuleRegistry};
use crate::model::{PartialResult, Query, ScanResult};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Concurrency and time limits for one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanLimits {
    /// Modules allowed to run at once. `1` runs them one after another.
    pub max_concurrency: usize,
    pub module_timeout: Duration,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            module_timeout: Duration::from_secs(10),
        }
    }
}

pub struct Orchestrator {
    registry: Arc<ModuleRegistry>,
    limits: ScanLimits,
    cache: Option<Arc<ResultCache>>,
}

impl Orchestrator {
    pub fn new(registry: Arc<ModuleRegistry>, limits: ScanLimits) -> Self {
        Self {
            registry,
            limits,
            cache: None,
        }
    }

    /// Reuses completed module results from `cache` and stores new ones.
    pub fn with_cache(mut self, cache: ResultCache) -> Self {
        self.cache = Some(Arc::new(cache));
        self
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn limits(&self) -> ScanLimits {
        self.limits
    }

    /// Runs the named modules against `query`.
    ///
    /// Names are resolved before anything runs. Duplicates are dropped and
    /// the first occurrence keeps its place in `modules_run`. A scan in which
    /// every module failed is still `Ok`.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::UnknownModule`] if a name is not registered.
    pub async fn run_scan<S: AsRef<str>>(
        &self,
        query: &Query,
        module_names: &[S],
    ) -> Result<ScanResult, ScanError> {
        let selected = self.resolve(module_names)?;

        info!(
            target_query = %query,
            query_type = %query.query_type(),
            modules = selected.len(),
            max_concurrency = self.limits.max_concurrency,
            "starting scan"
        );

        let semaphore = Arc::new(Semaphore::new(self.limits.max_concurrency.max(1)));
        let tasks: Vec<_> = selected
            .iter()
            .map(|module| {
                let module = Arc::clone(module);
                let query = query.clone();
                let semaphore = Arc::clone(&semaphore);
                let cache = self.cache.clone();
                let timeout = self.limits.module_timeout;

                tokio::spawn(async move {
                    // The semaphore is never closed
                    let _permit = semaphore.acquire_owned().await.ok();
                    invoke(module.as_ref(), &query, timeout, cache.as_deref()).await
                })
            })
            .collect();

        let joined = join_all(tasks).await;

        let mut modules_run = Vec::with_capacity(selected.len());
        let mut per_module = BTreeMap::new();
        for (module, outcome) in selected.iter().zip(joined) {
            let result = outcome.unwrap_or_else(|e| {
                warn!(module = module.name(), error = %e, "module task did not complete");
                PartialResult::failed(
                    module.name(),
                    module.kind(),
                    ModuleError::Aborted(e.to_string()).to_string(),
                )
            });
            modules_run.push(module.name().to_string());
            per_module.insert(module.name().to_string(), result);
        }

        let result = ScanResult::new(modules_run, per_module);
        info!(
            target_query = %query,
            modules = result.modules_run.len(),
            failed = result.failed_modules().count(),
            "scan complete"
        );
        Ok(result)
    }

    fn resolve<S: AsRef<str>>(
        &self,
        module_names: &[S],
    ) -> Result<Vec<Arc<dyn IntelModule>>, ScanError> {
        let mut selected: Vec<Arc<dyn IntelModule>> = Vec::with_capacity(module_names.len());

        for name in module_names {
            let name = name.as_ref().trim();
            if selected.iter().any(|m| m.name() == name) {
                continue;
            }
            let module = self
                .registry
                .get(name)
                .ok_or_else(|| ScanError::UnknownModule {
                    name: name.to_string(),
                    available: self
                        .registry
                        .names()
                        .into_iter()
                        .map(String::from)
                        .collect(),
                })?;
            selected.push(module);
        }

        Ok(selected)
    }
}

async fn invoke(
    module: &dyn IntelModule,
    query: &Query,
    timeout: Duration,
    cache: Option<&ResultCache>,
) -> PartialResult {
    if let Some(hit) = cache.and_then(|c| c.get(module.name(), query)) {
        debug!(module = module.name(), "using cached result");
        return hit;
    }

    let started = Instant::now();
    let result = match tokio::time::timeout(timeout, module.search(query)).await {
        Ok(result) => result,
        Err(_) => {
            warn!(module = module.name(), timeout_secs = timeout.as_secs_f32(), "module timed out");
            PartialResult::failed(
                module.name(),
                module.kind(),
                ModuleError::Timeout(timeout).to_string(),
            )
        }
    };

    debug!(
        module = module.name(),
        status = result.status.as_str(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "module finished"
    );

    if let Some(cache) = cache {
        if result.is_usable() {
            if let Err(e) = cache.put(query, &result) {
                debug!(module = module.name(), error = %e, "failed to cache result");
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::model::{BreachFindings, Findings, ModuleKind, ModuleStatus, QueryType};
    use crate::test_support::FakeModule;
    use std::sync::atomic::Ordering;

    fn breach_hit(count: usize) -> Findings {
        Findings::Breach(BreachFindings {
            breaches: vec!["Adobe".to_string(); count],
            credentials_found: true,
            breach_count: count,
        })
    }

    fn orchestrator(registry: ModuleRegistry) -> Orchestrator {
        Orchestrator::new(
            Arc::new(registry),
            ScanLimits {
                max_concurrency: 4,
                module_timeout: Duration::from_millis(200),
            },
        )
    }

    #[tokio::test]
    async fn test_unknown_module_aborts_before_running() {
        let breach = FakeModule::ok("breach", breach_hit(1));
        let calls = breach.counter();
        let orchestrator = orchestrator(ModuleRegistry::new().with(breach));

        let err = orchestrator
            .run_scan(
                &Query::new("user@example.com", QueryType::Email),
                &["breach", "nonexistent"],
            )
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ScanError::UnknownModule {
                name: "nonexistent".to_string(),
                available: vec!["breach".to_string()],
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let orchestrator = orchestrator(
            ModuleRegistry::new()
                .with(FakeModule::failing("threat", ModuleKind::Threat, 502))
                .with(FakeModule::ok("breach", breach_hit(3))),
        );

        let result = orchestrator
            .run_scan(
                &Query::new("user@example.com", QueryType::Email),
                &["threat", "breach"],
            )
            .await
            .unwrap();

        assert_eq!(result.modules_run, vec!["threat", "breach"]);
        assert_eq!(result.per_module["breach"].findings, breach_hit(3));
        assert_eq!(result.per_module["breach"].status, ModuleStatus::Completed);
        assert_eq!(
            result.per_module["threat"].error.as_deref(),
            Some("threat returned HTTP 502")
        );
    }

    #[tokio::test]
    async fn test_timeout_is_isolated() {
        let orchestrator = orchestrator(
            ModuleRegistry::new()
                .with(FakeModule::slow("darkweb", ModuleKind::DarkWeb, Duration::from_secs(30)))
                .with(FakeModule::ok("breach", breach_hit(2))),
        );

        let started = Instant::now();
        let result = orchestrator
            .run_scan(
                &Query::new("user@example.com", QueryType::Email),
                &["darkweb", "breach"],
            )
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(5));
        let darkweb = &result.per_module["darkweb"];
        assert!(darkweb.is_failed());
        assert_eq!(darkweb.error.as_deref(), Some("Lookup timed out after 0.2s"));
        assert!(result.per_module["breach"].is_usable());
    }

    #[tokio::test]
    async fn test_panic_is_isolated() {
        let orchestrator = orchestrator(
            ModuleRegistry::new()
                .with(FakeModule::panicking("leak", ModuleKind::Leak))
                .with(FakeModule::ok("breach", breach_hit(1))),
        );

        let result = orchestrator
            .run_scan(
                &Query::new("user@example.com", QueryType::Email),
                &["leak", "breach"],
            )
            .await
            .unwrap();

        let leak = &result.per_module["leak"];
        assert!(leak.is_failed());
        assert!(leak.error.as_deref().unwrap().starts_with("Module task aborted"));
        assert!(result.per_module["breach"].is_usable());
    }

    #[tokio::test]
    async fn test_all_modules_failing_is_a_valid_scan() {
        let orchestrator = orchestrator(
            ModuleRegistry::new()
                .with(FakeModule::slow("breach", ModuleKind::Breach, Duration::from_secs(30)))
                .with(FakeModule::slow("threat", ModuleKind::Threat, Duration::from_secs(30)))
                .with(FakeModule::slow("ttp_analysis", ModuleKind::Ttp, Duration::from_secs(30))),
        );

        let result = orchestrator
            .run_scan(
                &Query::new("evil.example", QueryType::Domain),
                &["breach", "threat", "ttp_analysis"],
            )
            .await
            .unwrap();

        assert_eq!(result.modules_run.len(), 3);
        assert_eq!(result.failed_modules().count(), 3);
        assert_eq!(aggregate(&result).threat_count, 0);
    }

    #[tokio::test]
    async fn test_subset_and_duplicates() {
        let orchestrator = orchestrator(
            ModuleRegistry::new()
                .with(FakeModule::ok("breach", breach_hit(1)))
                .with(FakeModule::ok("leak", Findings::empty(ModuleKind::Leak)))
                .with(FakeModule::ok("domain", Findings::empty(ModuleKind::Domain))),
        );

        let result = orchestrator
            .run_scan(
                &Query::new("user@example.com", QueryType::Email),
                &["leak", " breach", "leak"],
            )
            .await
            .unwrap();

        assert_eq!(result.modules_run, vec!["leak", "breach"]);
        assert!(!result.per_module.contains_key("domain"));
    }

    #[tokio::test]
    async fn test_not_applicable_module_is_still_run() {
        let orchestrator = orchestrator(
            ModuleRegistry::new()
                .with(
                    FakeModule::ok("breach", breach_hit(1)).supporting(&[QueryType::Email]),
                )
                .with(FakeModule::ok("domain", Findings::empty(ModuleKind::Domain))),
        );

        let result = orchestrator
            .run_scan(&Query::new("evil.example", QueryType::Domain), &["breach", "domain"])
            .await
            .unwrap();

        assert_eq!(result.modules_run, vec!["breach", "domain"]);
        assert_eq!(result.per_module["breach"].status, ModuleStatus::NotApplicable);
        assert!(result.per_module["breach"].error.is_none());
    }

    #[tokio::test]
    async fn test_sequential_limit_runs_everything() {
        let orchestrator = Orchestrator::new(
            Arc::new(
                ModuleRegistry::new()
                    .with(FakeModule::slow("leak", ModuleKind::Leak, Duration::from_millis(20)))
                    .with(FakeModule::slow("darkweb", ModuleKind::DarkWeb, Duration::from_millis(20))),
            ),
            ScanLimits {
                max_concurrency: 1,
                module_timeout: Duration::from_secs(2),
            },
        );

        let result = orchestrator
            .run_scan(&Query::new("x.example", QueryType::Domain), &["leak", "darkweb"])
            .await
            .unwrap();

        assert!(result.results().all(|r| r.is_usable()));
    }

    #[tokio::test]
    async fn test_empty_selection() {
        let orchestrator = orchestrator(ModuleRegistry::new());
        let result = orchestrator
            .run_scan::<&str>(&Query::new("x.example", QueryType::Domain), &[])
            .await
            .unwrap();
        assert!(result.modules_run.is_empty());
        assert!(result.per_module.is_empty());
    }

    #[tokio::test]
    async fn test_cache_skips_repeat_lookups() {
        let dir = tempfile::tempdir().unwrap();
        let breach = FakeModule::ok("breach", breach_hit(2));
        let calls = breach.counter();
        let failing = FakeModule::failing("threat", ModuleKind::Threat, 500);
        let failing_calls = failing.counter();

        let orchestrator = orchestrator(ModuleRegistry::new().with(breach).with(failing))
            .with_cache(ResultCache::in_dir(dir.path(), Duration::from_secs(3600)));
        let query = Query::new("user@example.com", QueryType::Email);

        let first = orchestrator.run_scan(&query, &["breach", "threat"]).await.unwrap();
        let second = orchestrator.run_scan(&query, &["breach", "threat"]).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(failing_calls.load(Ordering::SeqCst), 2);
        assert_eq!(first.per_module["breach"], second.per_module["breach"]);
    }
}
