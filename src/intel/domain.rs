use super::{endpoint, non_empty, require_key, IntelModule};
use crate::error::ModuleError;
use crate::model::{DnsRecord, DomainFindings, Findings, ModuleKind, Query, QueryType};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

const SECURITYTRAILS_API: &str = "https://api.securitytrails.com/v1";
const SOURCE: &str = "SecurityTrails";

/// Keys SecurityTrails uses for the value of a DNS record, by record type.
const RECORD_VALUE_KEYS: [&str; 6] = ["ip", "ipv6", "hostname", "nameserver", "value", "email"];

/// Domain and DNS intelligence via SecurityTrails.
///
/// Reads `domain/{d}` for the current DNS records and
/// `domain/{d}/subdomains` for known subdomains. A 404 from either call
/// means SecurityTrails has no data, which is not a failure.
pub struct DomainIntel {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

#[derive(Deserialize)]
struct DomainResponse {
    #[serde(default)]
    current_dns: Value,
}

#[derive(Deserialize)]
struct SubdomainResponse {
    #[serde(default)]
    subdomains: Vec<String>,
}

impl DomainIntel {
    pub fn new(client: reqwest::Client, api_key: &str) -> Self {
        Self {
            client,
            api_key: non_empty(api_key),
            base_url: SECURITYTRAILS_API.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// GETs and decodes a JSON document. `None` on 404.
    async fn get_json<T: DeserializeOwned>(
        &self,
        api_key: &str,
        segments: &[&str],
    ) -> Result<Option<T>, ModuleError> {
        let url = endpoint(&self.base_url, segments)?;
        let response = self
            .client
            .get(url)
            .header("APIKEY", api_key)
            .send()
            .await
            .map_err(|e| ModuleError::http(SOURCE, e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json()
                .await
                .map(Some)
                .map_err(|e| ModuleError::http(SOURCE, e)),
            status => Err(ModuleError::Status {
                source_name: SOURCE,
                status: status.as_u16(),
            }),
        }
    }
}

/// Flattens SecurityTrails' `current_dns` object into records.
///
/// Record types come out sorted, and values keep the response's order.
fn parse_dns_records(current_dns: &Value) -> Vec<DnsRecord> {
    let Some(types) = current_dns.as_object() else {
        return Vec::new();
    };

    let mut sorted: Vec<_> = types.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    sorted
        .into_iter()
        .flat_map(|(record_type, entry)| {
            entry
                .get("values")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter_map(move |value| {
                    RECORD_VALUE_KEYS
                        .iter()
                        .find_map(|key| value.get(*key).and_then(Value::as_str))
                        .map(|v| DnsRecord {
                            record_type: record_type.to_uppercase(),
                            value: v.to_string(),
                        })
                })
        })
        .collect()
}

#[async_trait]
impl IntelModule for DomainIntel {
    fn name(&self) -> &'static str {
        "domain"
    }

    fn kind(&self) -> ModuleKind {
        ModuleKind::Domain
    }

    fn supported_types(&self) -> &[QueryType] {
        &[QueryType::Domain, QueryType::Url]
    }

    async fn lookup(&self, query: &Query) -> Result<Findings, ModuleError> {
        let api_key = require_key(&self.api_key, SOURCE)?;
        let domain = query
            .host()
            .ok_or_else(|| ModuleError::Endpoint(format!("no host in '{}'", query)))?;

        let details: Option<DomainResponse> =
            self.get_json(&api_key, &["domain", domain.as_str()]).await?;
        let Some(details) = details else {
            return Ok(Findings::Domain(DomainFindings {
                domain,
                ..DomainFindings::default()
            }));
        };

        let subdomains: Option<SubdomainResponse> = self
            .get_json(&api_key, &["domain", domain.as_str(), "subdomains"])
            .await?;

        Ok(Findings::Domain(DomainFindings {
            dns_records: parse_dns_records(&details.current_dns),
            subdomains: subdomains
                .map(|s| s.subdomains)
                .unwrap_or_default()
                .into_iter()
                .map(|s| format!("{}.{}", s, domain))
                .collect(),
            domain,
            ..DomainFindings::default()
        }))
    }
}
