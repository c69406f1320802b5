//! Error types for scans and intelligence lookups.
//!
//! - [`ScanError`] is returned to callers of the orchestrator and of
//!   [`Query::parse`](crate::model::Query::parse).
//! - [`ModuleError`] never leaves a module. The module turns it into a
//!   failed [`PartialResult`](crate::model::PartialResult).

use std::time::Duration;
use thiserror::Error;

/// Errors that abort a scan before any module runs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("Unknown module: {name}. Available modules: {}", available.join(", "))]
    UnknownModule {
        name: String,
        available: Vec<String>,
    },

    #[error("Cannot determine query type for '{0}'. Expected an email, domain, URL or IP address")]
    InvalidQuery(String),
}

/// Failure of a single intelligence source lookup.
#[derive(Error, Debug)]
pub enum ModuleError {
    #[error("Request to {source_name} failed: {source}")]
    Http {
        source_name: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{source_name} returned HTTP {status}")]
    Status {
        source_name: &'static str,
        status: u16,
    },

    #[error("Failed to decode {source_name} response: {message}")]
    Decode {
        source_name: &'static str,
        message: String,
    },

    #[error("No API key configured for {0}")]
    MissingCredential(&'static str),

    #[error("Invalid endpoint URL: {0}")]
    Endpoint(String),

    #[error("Lookup timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),

    #[error("Module task aborted: {0}")]
    Aborted(String),
}

impl ModuleError {
    pub(crate) fn http(source_name: &'static str, source: reqwest::Error) -> Self {
        if source.is_decode() {
            ModuleError::Decode {
                source_name,
                message: source.to_string(),
            }
        } else {
            ModuleError::Http {
                source_name,
                source,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_module_lists_available() {
        let err = ScanError::UnknownModule {
            name: "nonexistent".to_string(),
            available: vec!["breach".to_string(), "threat".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Unknown module: nonexistent. Available modules: breach, threat"
        );
    }

    #[test]
    fn test_timeout_message() {
        let err = ModuleError::Timeout(Duration::from_millis(1500));
        assert_eq!(err.to_string(), "Lookup timed out after 1.5s");
    }
}
