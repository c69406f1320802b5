//! Configuration file handling.
//!
//! The configuration is a TOML file. It holds the alert addresses, mail
//! transport settings, source credentials and scan limits.
//!
//! # Configuration Location
//!
//! - Linux: `~/.config/osintwatch/config.toml`
//! - macOS: `~/Library/Application Support/osintwatch/config.toml`
//! - Windows: `%APPDATA%\osintwatch\config.toml`
//!
//! # Example Configuration
//!
//! ```toml
//! notification_email = "alerts@example.org"
//! recipient_email = "soc@example.org"
//! mailgun_domain = "mg.example.org"
//! max_workers = 4
//! timeout_secs = 10
//! default_modules = ["breach", "domain", "threat"]
//!
//! [api_keys]
//! hibp = "..."
//! virustotal = "..."
//! ```
//!
//! Credentials may also come from `OSINT_*` environment variables; see
//! [`Config::apply_env`].

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::scan::ScanLimits;

/// Application configuration.
///
/// Built once at startup and handed to the registry, orchestrator and
/// dispatcher. Nothing in the scan pipeline reads the environment itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sender address used on alert emails.
    pub notification_email: String,

    /// Where alerts are delivered.
    pub recipient_email: String,

    pub mailgun_domain: String,
    pub mailgun_api_key: String,

    /// Mailgun API root. Use `https://api.eu.mailgun.net/v3` for EU domains.
    pub mailgun_api_base: String,

    pub api_keys: ApiKeys,

    pub tor: TorConfig,

    /// Maximum number of modules running at once.
    ///
    /// Default: 4
    pub max_workers: usize,

    /// Per-module time limit, in seconds. Also used as the HTTP request timeout.
    ///
    /// Default: 10
    pub timeout_secs: u64,

    /// Modules run when no `--modules` flag is given.
    pub default_modules: Vec<String>,

    /// How long module results are cached, in hours. Zero disables caching.
    pub cache_ttl_hours: u64,

    /// Default output format: "table", "json", "text" or "html".
    pub default_format: String,
}

/// Credentials for the intelligence sources. Empty means not configured.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeys {
    pub hibp: String,
    pub securitytrails: String,
    pub virustotal: String,
    pub shodan: String,
    pub abuseipdb: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TorConfig {
    pub enabled: bool,
    pub proxy: String,
}

impl Default for TorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            proxy: "socks5://127.0.0.1:9050".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            notification_email: "alerts@yourdomain.com".to_string(),
            recipient_email: "your-email@example.com".to_string(),
            mailgun_domain: String::new(),
            mailgun_api_key: String::new(),
            mailgun_api_base: "https://api.mailgun.net/v3".to_string(),
            api_keys: ApiKeys::default(),
            tor: TorConfig::default(),
            max_workers: 4,
            timeout_secs: 10,
            default_modules: ["breach", "domain", "threat", "darkweb", "leak", "ttp_analysis"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            cache_ttl_hours: 24,
            default_format: "table".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from the default config file.
    ///
    /// If the file doesn't exist, returns the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Saves the configuration to the default config file, creating the
    /// parent directory if needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("osintwatch")
            .join("config.toml")
    }

    pub fn generate_default_config() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }

    /// Overlays values from `OSINT_*` variables.
    ///
    /// `lookup` is usually `|k| std::env::var(k).ok()`. Empty values are
    /// ignored, as are numeric values that fail to parse.
    ///
    /// ```
    /// use osintwatch::Config;
    ///
    /// let mut config = Config::default();
    /// config.apply_env(|key| match key {
    ///     "OSINT_HIBP_API_KEY" => Some("secret".to_string()),
    ///     _ => None,
    /// });
    /// assert_eq!(config.api_keys.hibp, "secret");
    /// ```
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let strings: [(&str, &mut String); 10] = [
            ("OSINT_NOTIFICATION_EMAIL", &mut self.notification_email),
            ("OSINT_RECIPIENT_EMAIL", &mut self.recipient_email),
            ("OSINT_MAILGUN_DOMAIN", &mut self.mailgun_domain),
            ("OSINT_MAILGUN_API_KEY", &mut self.mailgun_api_key),
            ("OSINT_HIBP_API_KEY", &mut self.api_keys.hibp),
            ("OSINT_SECURITYTRAILS_API_KEY", &mut self.api_keys.securitytrails),
            ("OSINT_VIRUSTOTAL_API_KEY", &mut self.api_keys.virustotal),
            ("OSINT_SHODAN_API_KEY", &mut self.api_keys.shodan),
            ("OSINT_ABUSEIPDB_API_KEY", &mut self.api_keys.abuseipdb),
            ("OSINT_TOR_PROXY", &mut self.tor.proxy),
        ];
        for (key, slot) in strings {
            if let Some(value) = get(key) {
                *slot = value;
            }
        }

        if let Some(value) = get("OSINT_USE_TOR") {
            self.tor.enabled = value.eq_ignore_ascii_case("true") || value == "1";
        }
        if let Some(n) = get("OSINT_MAX_WORKERS").and_then(|v| v.parse().ok()) {
            self.max_workers = n;
        }
        if let Some(n) = get("OSINT_TIMEOUT").and_then(|v| v.parse().ok()) {
            self.timeout_secs = n;
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn limits(&self) -> ScanLimits {
        ScanLimits {
            max_concurrency: self.max_workers.max(1),
            module_timeout: self.request_timeout(),
        }
    }
}
