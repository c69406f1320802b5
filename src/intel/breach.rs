use super::{endpoint, non_empty, require_key, IntelModule};
use crate::error::ModuleError;
use crate::model::{BreachFindings, Findings, ModuleKind, Query, QueryType};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

const HIBP_API: &str = "https://haveibeenpwned.com/api/v3";
const SOURCE: &str = "HaveIBeenPwned";

/// Breach database lookup via HaveIBeenPwned.
pub struct BreachFinder {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

#[derive(Deserialize)]
struct HibpBreach {
    #[serde(rename = "Name")]
    name: String,
}

impl BreachFinder {
    pub fn new(client: reqwest::Client, api_key: &str) -> Self {
        Self {
            client,
            api_key: non_empty(api_key),
            base_url: HIBP_API.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Builds findings from the breach names HIBP returned for an account.
fn findings_from(breaches: Vec<HibpBreach>) -> BreachFindings {
    let breaches: Vec<String> = breaches.into_iter().map(|b| b.name).collect();
    BreachFindings {
        credentials_found: !breaches.is_empty(),
        breach_count: breaches.len(),
        breaches,
    }
}

#[async_trait]
impl IntelModule for BreachFinder {
    fn name(&self) -> &'static str {
        "breach"
    }

    fn kind(&self) -> ModuleKind {
        ModuleKind::Breach
    }

    fn supported_types(&self) -> &[QueryType] {
        &[QueryType::Email]
    }

    async fn lookup(&self, query: &Query) -> Result<Findings, ModuleError> {
        let api_key = require_key(&self.api_key, SOURCE)?;
        let url = endpoint(&self.base_url, &["breachedaccount", query.raw_input()])?;

        let response = self
            .client
            .get(url)
            .query(&[("truncateResponse", "true")])
            .header("hibp-api-key", api_key)
            .send()
            .await
            .map_err(|e| ModuleError::http(SOURCE, e))?;

        match response.status() {
            // HIBP answers 404 for accounts with no breaches
            StatusCode::NOT_FOUND => Ok(Findings::Breach(BreachFindings::default())),
            status if status.is_success() => {
                let breaches: Vec<HibpBreach> = response
                    .json()
                    .await
                    .map_err(|e| ModuleError::http(SOURCE, e))?;
                Ok(Findings::Breach(findings_from(breaches)))
            }
            status => Err(ModuleError::Status {
                source_name: SOURCE,
                status: status.as_u16(),
            }),
        }
    }
}
