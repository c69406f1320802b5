pub mod aggregate;
pub mod cache;
pub mod config;
pub mod error;
pub mod intel;
pub mod logging;
pub mod model;
pub mod notify;
pub mod output;
pub mod scan;

#[cfg(test)]
mod test_support;

pub use aggregate::{aggregate, ThreatSignals};
pub use cache::ResultCache;
pub use config::Config;
pub use error::{ModuleError, ScanError};
pub use intel::{IntelModule, ModuleRegistry};
pub use model::{PartialResult, Query, QueryType, ScanResult};
pub use notify::{AlertState, Dispatcher, MailgunTransport};
pub use scan::{Orchestrator, ScanLimits};
