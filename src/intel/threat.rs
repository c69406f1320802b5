use super::{endpoint, non_empty, require_key, IntelModule};
use crate::error::ModuleError;
use crate::model::{Findings, ModuleKind, Query, QueryType, ThreatFindings};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::IpAddr;

const VIRUSTOTAL_API: &str = "https://www.virustotal.com/api/v3";
const SOURCE: &str = "VirusTotal";

/// Malicious URL, domain and IP lookup via VirusTotal.
///
/// URL queries are checked by host, so a clean path on a malicious host is
/// still reported as malicious.
pub struct ThreatIntel {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

#[derive(Deserialize)]
struct VtResponse {
    data: VtObject,
}

#[derive(Deserialize)]
struct VtObject {
    #[serde(default)]
    attributes: VtAttributes,
}

#[derive(Deserialize, Default)]
struct VtAttributes {
    #[serde(default)]
    reputation: i64,
    #[serde(default)]
    last_analysis_date: Option<i64>,
    #[serde(default)]
    last_analysis_stats: VtStats,
    #[serde(default)]
    last_analysis_results: BTreeMap<String, VtEngineResult>,
}

#[derive(Deserialize, Default)]
struct VtStats {
    #[serde(default)]
    malicious: u32,
}

#[derive(Deserialize)]
struct VtEngineResult {
    #[serde(default)]
    category: String,
}

impl ThreatIntel {
    pub fn new(client: reqwest::Client, api_key: &str) -> Self {
        Self {
            client,
            api_key: non_empty(api_key),
            base_url: VIRUSTOTAL_API.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// The VirusTotal collection and object id for a query.
    fn object_path(query: &Query) -> Option<(&'static str, String)> {
        match query.query_type() {
            QueryType::Ip => Some(("ip_addresses", query.raw_input().to_string())),
            QueryType::Domain | QueryType::Url => {
                let host = query.host()?;
                let bare = host.trim_start_matches('[').trim_end_matches(']');
                if bare.parse::<IpAddr>().is_ok() {
                    Some(("ip_addresses", bare.to_string()))
                } else {
                    Some(("domains", host))
                }
            }
            QueryType::Email => None,
        }
    }
}

fn findings_from(attributes: VtAttributes) -> ThreatFindings {
    let detections = attributes
        .last_analysis_results
        .into_iter()
        .filter(|(_, result)| result.category == "malicious")
        .map(|(engine, _)| engine)
        .collect();

    ThreatFindings {
        threat_found: attributes.last_analysis_stats.malicious > 0,
        reputation_score: attributes.reputation,
        detections,
        last_analysis: attributes
            .last_analysis_date
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
    }
}

#[async_trait]
impl IntelModule for ThreatIntel {
    fn name(&self) -> &'static str {
        "threat"
    }

    fn kind(&self) -> ModuleKind {
        ModuleKind::Threat
    }

    fn supported_types(&self) -> &[QueryType] {
        &[QueryType::Url, QueryType::Domain, QueryType::Ip]
    }

    async fn lookup(&self, query: &Query) -> Result<Findings, ModuleError> {
        let api_key = require_key(&self.api_key, SOURCE)?;
        let (collection, id) = Self::object_path(query)
            .ok_or_else(|| ModuleError::Endpoint(format!("no lookup target in '{}'", query)))?;
        let url = endpoint(&self.base_url, &[collection, id.as_str()])?;

        let response = self
            .client
            .get(url)
            .header("x-apikey", api_key)
            .send()
            .await
            .map_err(|e| ModuleError::http(SOURCE, e))?;

        match response.status() {
            // Never seen by VirusTotal: nothing to report
            StatusCode::NOT_FOUND => Ok(Findings::Threat(ThreatFindings::default())),
            status if status.is_success() => {
                let body: VtResponse = response
                    .json()
                    .await
                    .map_err(|e| ModuleError::http(SOURCE, e))?;
                Ok(Findings::Threat(findings_from(body.data.attributes)))
            }
            status => Err(ModuleError::Status {
                source_name: SOURCE,
                status: status.as_u16(),
            }),
        }
    }
}
