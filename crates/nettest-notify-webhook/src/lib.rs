// # Webhook Notifier
//
// This crate delivers watchdog notifications by POSTing a JSON document
// to an HTTP endpoint. Point it at a mail or SMS gateway (or a chat
// webhook relay) to reach the operator.
//
// ## Payload
//
// ```json
// {
//   "recipient": "oncall@example.com",
//   "subject": "nettest automated message",
//   "body": "nettest 2022-04-30 18:05\nConnection status to 10.0.0.1: New alert: timeout",
//   "sent_at": "2022-04-30T18:05:00Z"
// }
// ```
//
// Any 2xx status counts as delivered. Nothing is retried: a failed
// delivery is reported to the dispatcher, which logs it.

use chrono::{DateTime, Utc};
use nettest_core::CollaboratorRegistry;
use nettest_core::config::NotifierConfig;
use nettest_core::traits::{Notifier, NotifierFactory};
use nettest_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// JSON document posted for each notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookPayload {
    /// Operational destination
    pub recipient: String,
    /// Subject line
    pub subject: String,
    /// Message body
    pub body: String,
    /// When the notification was handed to the webhook
    pub sent_at: DateTime<Utc>,
}

/// Notifier posting JSON to a webhook
pub struct WebhookNotifier {
    /// Endpoint URL
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl WebhookNotifier {
    /// Create a new webhook notifier
    ///
    /// # Parameters
    ///
    /// - `url`: Endpoint receiving the JSON payload
    /// - `timeout`: Whole-request timeout
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// Returns the webhook URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        let payload = WebhookPayload {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            sent_at: Utc::now(),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::notify(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            return match status.as_u16() {
                401 | 403 => Err(Error::notify(format!(
                    "Webhook rejected credentials. Status: {}",
                    status
                ))),
                429 => Err(Error::notify(format!(
                    "Webhook rate limit exceeded. Status: {}",
                    status
                ))),
                _ => Err(Error::notify(format!(
                    "Webhook delivery failed: {} - {}",
                    status, error_text
                ))),
            };
        }

        tracing::debug!(url = %self.url, recipient = %recipient, "Webhook accepted notification");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "webhook"
    }
}

/// Factory for creating webhook notifiers
pub struct WebhookNotifierFactory;

impl NotifierFactory for WebhookNotifierFactory {
    fn create(&self, config: &NotifierConfig) -> Result<Box<dyn Notifier>> {
        match config {
            NotifierConfig::Webhook { url, timeout_secs } => {
                if url.is_empty() {
                    return Err(Error::config("Webhook URL cannot be empty"));
                }
                Ok(Box::new(WebhookNotifier::new(
                    url.clone(),
                    Duration::from_secs(*timeout_secs),
                )?))
            }
            _ => Err(Error::config("Invalid config for webhook notifier")),
        }
    }
}

/// Register the webhook notifier with a registry
pub fn register(registry: &CollaboratorRegistry) {
    registry.register_notifier("webhook", Box::new(WebhookNotifierFactory));
}
