use crate::error::ScanError;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// The semantic type of a search target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Email,
    Domain,
    Url,
    Ip,
}

impl QueryType {
    pub const ALL: [QueryType; 4] = [
        QueryType::Email,
        QueryType::Domain,
        QueryType::Url,
        QueryType::Ip,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Email => "email",
            QueryType::Domain => "domain",
            QueryType::Url => "url",
            QueryType::Ip => "ip",
        }
    }
}

impl std::fmt::Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A search target. Its type is fixed when the query is built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Query {
    raw_input: String,
    query_type: QueryType,
}

impl Query {
    pub fn new(raw_input: impl Into<String>, query_type: QueryType) -> Self {
        Self {
            raw_input: raw_input.into(),
            query_type,
        }
    }

    /// Builds a query and infers its type from the input.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::InvalidQuery`] if the input is not an email,
    /// URL, IP address or domain name.
    pub fn parse(input: &str) -> Result<Self, ScanError> {
        let raw = input.trim();
        let query_type =
            infer_type(raw).ok_or_else(|| ScanError::InvalidQuery(raw.to_string()))?;
        Ok(Self::new(raw, query_type))
    }

    pub fn raw_input(&self) -> &str {
        &self.raw_input
    }

    pub fn query_type(&self) -> QueryType {
        self.query_type
    }

    /// The host name a domain-oriented source should look up.
    ///
    /// For URLs this is the host component, for domains the input itself.
    /// Email and IP queries have no host.
    pub fn host(&self) -> Option<String> {
        match self.query_type {
            QueryType::Domain => Some(self.raw_input.to_lowercase()),
            QueryType::Url => reqwest::Url::parse(&self.raw_input)
                .ok()?
                .host_str()
                .map(|h| h.to_lowercase()),
            QueryType::Email | QueryType::Ip => None,
        }
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw_input)
    }
}

fn infer_type(raw: &str) -> Option<QueryType> {
    if raw.is_empty() || raw.chars().any(char::is_whitespace) {
        return None;
    }

    let lower = raw.to_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        let url = reqwest::Url::parse(raw).ok()?;
        return url.host_str().map(|_| QueryType::Url);
    }

    if raw.parse::<IpAddr>().is_ok() {
        return Some(QueryType::Ip);
    }

    if let Some((local, domain)) = raw.split_once('@') {
        if !local.is_empty() && is_domain_name(domain) {
            return Some(QueryType::Email);
        }
        return None;
    }

    if is_domain_name(raw) {
        return Some(QueryType::Domain);
    }

    None
}

fn is_domain_name(s: &str) -> bool {
    if !s.contains('.') || s.starts_with('.') || s.ends_with('.') {
        return false;
    }
    s.split('.').all(|label| {
        !label.is_empty()
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}
