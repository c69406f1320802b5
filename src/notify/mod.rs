//! Alert decisions, rendering and delivery.
//!
//! A [`Dispatcher`] takes one scan through
//! `Idle -> Decided -> (Rendered -> Dispatched) | Suppressed`. It only talks
//! to the [`MailTransport`] when at least one threat category fired.

mod mailgun;
mod report;

pub use mailgun::MailgunTransport;
pub use report::{render, RenderedReport};

use crate::aggregate::{aggregate, ThreatSignals};
use crate::config::Config;
use crate::model::{Query, ScanResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// A message ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// What the transport said about a message it received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Accepted { message_id: Option<String> },
    Rejected { status: u16, detail: String },
}

/// The transport could not be reached at all.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Mail transport unreachable: {0}")]
    Unreachable(String),

    #[error("Mail transport not configured: missing {0}")]
    NotConfigured(&'static str),
}

/// Outbound notification sink.
#[async_trait]
pub trait MailTransport: Send + Sync {
    fn name(&self) -> &'static str;

    /// Hands one message to the provider. Not retried.
    async fn send(&self, message: &OutgoingMessage) -> Result<Delivery, TransportError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertDecision {
    pub should_notify: bool,
    pub recipient: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// The transport acknowledged the message.
    Sent,
    /// The transport answered but refused the message.
    Failed,
    /// The transport could not be reached.
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationOutcome {
    pub status: DeliveryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl NotificationOutcome {
    fn sent(message_id: Option<String>) -> Self {
        Self {
            status: DeliveryStatus::Sent,
            message_id,
            error_detail: None,
        }
    }

    fn failed(detail: String) -> Self {
        Self {
            status: DeliveryStatus::Failed,
            message_id: None,
            error_detail: Some(detail),
        }
    }

    fn error(detail: String) -> Self {
        Self {
            status: DeliveryStatus::Error,
            message_id: None,
            error_detail: Some(detail),
        }
    }
}

/// Steps of the per-scan alert lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertPhase {
    Idle,
    Decided,
    Rendered,
    Dispatched,
    Suppressed,
}

/// Where an alert ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum AlertState {
    /// No threats: nothing was rendered or sent.
    Suppressed,
    Dispatched(NotificationOutcome),
}

impl AlertState {
    pub fn phase(&self) -> AlertPhase {
        match self {
            AlertState::Suppressed => AlertPhase::Suppressed,
            AlertState::Dispatched(_) => AlertPhase::Dispatched,
        }
    }
}

pub struct Dispatcher {
    transport: Arc<dyn MailTransport>,
    sender: String,
    recipient: String,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn MailTransport>, config: &Config) -> Self {
        Self {
            transport,
            sender: config.notification_email.clone(),
            recipient: config.recipient_email.clone(),
        }
    }

    /// Notify iff at least one threat category is positive.
    pub fn decide(&self, signals: &ThreatSignals) -> AlertDecision {
        AlertDecision {
            should_notify: signals.threat_count > 0,
            recipient: self.recipient.clone(),
        }
    }

    pub fn render(
        &self,
        query: &Query,
        result: &ScanResult,
        signals: &ThreatSignals,
    ) -> RenderedReport {
        render(query, result, signals)
    }

    /// Sends a rendered report. One attempt, no retry.
    pub async fn dispatch(&self, report: &RenderedReport, recipient: &str) -> NotificationOutcome {
        let message = OutgoingMessage {
            from: format!("OSINT Monitor <{}>", self.sender),
            to: recipient.to_string(),
            subject: report.subject.clone(),
            text: report.text.clone(),
            html: report.html.clone(),
        };

        match self.transport.send(&message).await {
            Ok(Delivery::Accepted { message_id }) => {
                info!(
                    transport = self.transport.name(),
                    message_id = message_id.as_deref().unwrap_or("-"),
                    "alert sent"
                );
                NotificationOutcome::sent(message_id)
            }
            Ok(Delivery::Rejected { status, detail }) => {
                warn!(transport = self.transport.name(), status, detail = %detail, "alert rejected");
                NotificationOutcome::failed(detail)
            }
            Err(e) => {
                warn!(transport = self.transport.name(), error = %e, "alert transport error");
                NotificationOutcome::error(e.to_string())
            }
        }
    }

    /// Runs the full decide, render and dispatch sequence for one scan.
    pub async fn process(&self, query: &Query, result: &ScanResult) -> AlertState {
        let mut phase = AlertPhase::Idle;
        let signals = aggregate(result);
        let decision = self.decide(&signals);
        advance(&mut phase, AlertPhase::Decided);

        if !decision.should_notify {
            advance(&mut phase, AlertPhase::Suppressed);
            return AlertState::Suppressed;
        }

        let report = self.render(query, result, &signals);
        advance(&mut phase, AlertPhase::Rendered);

        let outcome = self.dispatch(&report, &decision.recipient).await;
        advance(&mut phase, AlertPhase::Dispatched);
        AlertState::Dispatched(outcome)
    }
}

fn advance(phase: &mut AlertPhase, next: AlertPhase) {
    let prev = *phase;
    debug!(from = ?prev, to = ?next, "alert phase");
    *phase = next;
}
