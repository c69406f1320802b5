use super::{Delivery, MailTransport, OutgoingMessage, TransportError};
use crate::config::Config;
use crate::intel::non_empty;
use async_trait::async_trait;
use serde::Deserialize;

/// Mailgun HTTP API transport.
pub struct MailgunTransport {
    client: reqwest::Client,
    api_base: String,
    domain: Option<String>,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct MailgunResponse {
    id: Option<String>,
}

impl MailgunTransport {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            api_base: config.mailgun_api_base.trim_end_matches('/').to_string(),
            domain: non_empty(&config.mailgun_domain),
            api_key: non_empty(&config.mailgun_api_key),
        }
    }

    /// Builds a transport with its own HTTP client.
    pub fn from_config(config: &Config) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self::new(client, config))
    }

    fn messages_url(&self) -> Result<String, TransportError> {
        let domain = self
            .domain
            .as_deref()
            .ok_or(TransportError::NotConfigured("mailgun_domain"))?;
        Ok(format!("{}/{}/messages", self.api_base, domain))
    }
}

#[async_trait]
impl MailTransport for MailgunTransport {
    fn name(&self) -> &'static str {
        "mailgun"
    }

    async fn send(&self, message: &OutgoingMessage) -> Result<Delivery, TransportError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(TransportError::NotConfigured("mailgun_api_key"))?;
        let url = self.messages_url()?;

        let form = [
            ("from", message.from.as_str()),
            ("to", message.to.as_str()),
            ("subject", message.subject.as_str()),
            ("text", message.text.as_str()),
            ("html", message.html.as_str()),
        ];

        let response = self
            .client
            .post(url)
            .basic_auth("api", Some(api_key))
            .form(&form)
            .send()
            .await
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;

        if status.is_success() {
            let message_id = serde_json::from_str::<MailgunResponse>(&body)
                .ok()
                .and_then(|r| r.id);
            Ok(Delivery::Accepted { message_id })
        } else {
            Ok(Delivery::Rejected {
                status: status.as_u16(),
                detail: body,
            })
        }
    }
}
