//! File-based cache for module results.
//!
//! Completed [`PartialResult`]s are stored as JSON, one file per
//! `(module, query)` pair. Failed and not-applicable results are never
//! stored, so a source that was down is asked again on the next scan.
//!
//! # Cache Location
//!
//! - Linux: `~/.cache/osintwatch/`
//! - macOS: `~/Library/Caches/osintwatch/`
//! - Windows: `%LOCALAPPDATA%\osintwatch\`

use crate::model::{PartialResult, Query, QueryType};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Serialize, Deserialize)]
struct CacheEntry {
    stored_at: DateTime<Utc>,
    result: PartialResult,
}

pub struct ResultCache {
    dir: PathBuf,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(ttl_hours: u64) -> Self {
        Self::in_dir(&Self::default_dir(), Duration::from_secs(ttl_hours * 3600))
    }

    pub fn in_dir(dir: &Path, ttl: Duration) -> Self {
        Self {
            dir: dir.to_path_buf(),
            ttl,
        }
    }

    pub fn default_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("osintwatch")
    }

    /// `<module>__<type>__<target>.json`, with unsafe characters replaced.
    fn entry_path(&self, module: &str, query: &Query) -> PathBuf {
        let key = format!("{}__{}__{}", module, query.query_type(), cache_target(query));
        let safe_key: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", safe_key))
    }

    /// Returns a cached result that is younger than the TTL.
    ///
    /// Expired and unreadable entries are removed and count as a miss.
    pub fn get(&self, module: &str, query: &Query) -> Option<PartialResult> {
        let path = self.entry_path(module, query);
        let content = fs::read_to_string(&path).ok()?;

        let entry = match serde_json::from_str::<CacheEntry>(&content) {
            Ok(entry) => entry,
            Err(_) => {
                let _ = fs::remove_file(&path);
                return None;
            }
        };

        let age = Utc::now().signed_duration_since(entry.stored_at);
        let expired = age.to_std().map(|age| age > self.ttl).unwrap_or(false);
        if expired || entry.result.module != module {
            let _ = fs::remove_file(&path);
            return None;
        }

        Some(entry.result)
    }

    /// Stores a result. Anything but a completed result is ignored.
    pub fn put(&self, query: &Query, result: &PartialResult) -> Result<()> {
        if !result.is_usable() {
            return Ok(());
        }

        fs::create_dir_all(&self.dir)?;
        let entry = CacheEntry {
            stored_at: Utc::now(),
            result: result.clone(),
        };
        fs::write(
            self.entry_path(&result.module, query),
            serde_json::to_string(&entry)?,
        )?;
        Ok(())
    }

    /// Removes all cached entries.
    pub fn clear(&self) -> Result<()> {
        if self.dir.exists() {
            for entry in fs::read_dir(&self.dir)?.flatten() {
                let path = entry.path();
                if path.extension().map(|e| e == "json").unwrap_or(false) {
                    let _ = fs::remove_file(path);
                }
            }
        }
        Ok(())
    }
}

/// Case-folds the parts of a target that are case-insensitive.
///
/// URLs keep their path and query as given; only scheme and host fold.
fn cache_target(query: &Query) -> String {
    let raw = query.raw_input();
    match query.query_type() {
        QueryType::Url => reqwest::Url::parse(raw)
            .map(|url| url.to_string())
            .unwrap_or_else(|_| raw.to_string()),
        QueryType::Email | QueryType::Domain | QueryType::Ip => raw.to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BreachFindings, Findings, ModuleKind};

    fn completed() -> PartialResult {
        PartialResult::completed(
            "breach",
            Findings::Breach(BreachFindings {
                breaches: vec!["Adobe".to_string()],
                credentials_found: true,
                breach_count: 1,
            }),
        )
    }

    fn query() -> Query {
        Query::new("User@Example.com", QueryType::Email)
    }

    #[test]
    fn test_put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResultCache::in_dir(dir.path(), Duration::from_secs(60));

        cache.put(&query(), &completed()).unwrap();
        assert_eq!(cache.get("breach", &query()), Some(completed()));
        assert_eq!(cache.get("threat", &query()), None);
    }

    #[test]
    fn test_failed_results_not_stored() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResultCache::in_dir(dir.path(), Duration::from_secs(60));

        cache
            .put(&query(), &PartialResult::failed("breach", ModuleKind::Breach, "boom"))
            .unwrap();
        cache
            .put(&query(), &PartialResult::not_applicable("breach", ModuleKind::Breach))
            .unwrap();
        assert_eq!(cache.get("breach", &query()), None);
    }

    #[test]
    fn test_expired_entry_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResultCache::in_dir(dir.path(), Duration::from_secs(60));
        let path = cache.entry_path("breach", &query());

        let stale = CacheEntry {
            stored_at: Utc::now() - chrono::Duration::hours(2),
            result: completed(),
        };
        fs::write(&path, serde_json::to_string(&stale).unwrap()).unwrap();

        assert_eq!(cache.get("breach", &query()), None);
        assert!(!path.exists());
    }

    #[test]
    fn test_corrupt_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResultCache::in_dir(dir.path(), Duration::from_secs(60));
        let path = cache.entry_path("breach", &query());
        fs::write(&path, "{not json").unwrap();

        assert_eq!(cache.get("breach", &query()), None);
        assert!(!path.exists());
    }

    #[test]
    fn test_clear() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResultCache::in_dir(dir.path(), Duration::from_secs(60));
        cache.put(&query(), &completed()).unwrap();

        cache.clear().unwrap();
        assert_eq!(cache.get("breach", &query()), None);
    }

    #[test]
    fn test_entry_path_is_safe() {
        let cache = ResultCache::in_dir(Path::new("/tmp/x"), Duration::from_secs(1));
        let path = cache.entry_path("threat", &Query::new("http://a.example/../b?c=d", QueryType::Url));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(!name.contains('/'));
        assert!(name.starts_with("threat__url__http___a.example"));
    }

    #[test]
    fn test_url_path_case_is_kept() {
        let cache = ResultCache::in_dir(Path::new("/tmp/x"), Duration::from_secs(1));
        let upper = Query::new("https://Evil.Example/Login", QueryType::Url);
        let lower = Query::new("https://evil.example/login", QueryType::Url);
        let same_host = Query::new("https://EVIL.example/Login", QueryType::Url);

        assert_ne!(cache.entry_path("threat", &upper), cache.entry_path("threat", &lower));
        assert_eq!(cache.entry_path("threat", &upper), cache.entry_path("threat", &same_host));
    }

    #[test]
    fn test_email_and_domain_fold_case() {
        let cache = ResultCache::in_dir(Path::new("/tmp/x"), Duration::from_secs(1));
        assert_eq!(
            cache.entry_path("breach", &Query::new("User@Example.com", QueryType::Email)),
            cache.entry_path("breach", &Query::new("user@example.com", QueryType::Email))
        );
        assert_eq!(
            cache.entry_path("domain", &Query::new("Evil.Example", QueryType::Domain)),
            cache.entry_path("domain", &Query::new("evil.example", QueryType::Domain))
        );
    }
}
