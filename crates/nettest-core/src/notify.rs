//! Notification dispatch
//!
//! The [`Dispatcher`] turns a [`Message`] into subject and body text,
//! hands it to the configured `Notifier`, and reports what happened.
//! Delivery problems never propagate: they are logged and counted.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::fmt;
use tracing::{debug, error, info};

use crate::config::NotifierConfig;
use crate::model::Message;
use crate::traits::{Notifier, NotifierFactory};

/// Predicate deciding whether a message should be delivered
pub type MessageFilter = Box<dyn Fn(&Message) -> bool + Send + Sync>;

/// What happened to one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The notifier accepted the message
    Sent,
    /// The filter rejected the message
    Filtered,
    /// The notifier failed; the run continues
    Failed(String),
}

/// Formats messages and delivers them to the fixed recipient
pub struct Dispatcher {
    notifier: Box<dyn Notifier>,
    recipient: String,
    subject: String,
    filter: Option<MessageFilter>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("notifier", &self.notifier.name())
            .field("recipient", &self.recipient)
            .field("subject", &self.subject)
            .field("filtered", &self.filter.is_some())
            .finish()
    }
}

impl Dispatcher {
    /// Create a dispatcher
    pub fn new(
        notifier: Box<dyn Notifier>,
        recipient: impl Into<String>,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            notifier,
            recipient: recipient.into(),
            subject: subject.into(),
            filter: None,
        }
    }

    /// Only deliver messages accepted by `filter`
    pub fn with_filter(mut self, filter: impl Fn(&Message) -> bool + Send + Sync + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Deliver one message
    pub async fn dispatch(&self, message: &Message) -> DispatchOutcome {
        if let Some(filter) = &self.filter
            && !filter(message)
        {
            debug!(address = %message.address, kind = %message.kind, "Message filtered out");
            return DispatchOutcome::Filtered;
        }

        let body = format_body(message, Local::now());
        match self.notifier.send(&self.recipient, &self.subject, &body).await {
            Ok(()) => {
                info!(
                    address = %message.address,
                    kind = %message.kind,
                    notifier = self.notifier.name(),
                    "Notification sent"
                );
                DispatchOutcome::Sent
            }
            Err(e) => {
                error!(
                    address = %message.address,
                    notifier = self.notifier.name(),
                    "An error occurred while trying to send a message: {}",
                    e
                );
                DispatchOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Body text of a notification
pub fn format_body<Tz: chrono::TimeZone>(message: &Message, at: DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    format!(
        "nettest {}\nConnection status to {}: {}",
        at.format("%Y-%m-%d %H:%M"),
        message.address,
        message.text
    )
}

/// Notifier that only writes messages to the log
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl LogNotifier {
    /// Create a log notifier
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), crate::Error> {
        info!(recipient = %recipient, subject = %subject, "{}", body);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Factory for [`LogNotifier`]
pub struct LogNotifierFactory;

impl NotifierFactory for LogNotifierFactory {
    fn create(&self, config: &NotifierConfig) -> Result<Box<dyn Notifier>, crate::Error> {
        match config {
            NotifierConfig::Log => Ok(Box::new(LogNotifier::new())),
            _ => Err(crate::Error::config("Invalid config for log notifier")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MessageKind;
    use chrono::{TimeZone, Utc};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder {
        sent: Arc<Mutex<Vec<(String, String, String)>>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for Recorder {
        async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), crate::Error> {
            if self.fail {
                return Err(crate::Error::notify("smtp login refused"));
            }
            self.sent
                .lock()
                .unwrap()
                .push((recipient.into(), subject.into(), body.into()));
            Ok(())
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    fn message() -> Message {
        Message::new("192.168.1.20", MessageKind::NewAlert, "New alert: timeout")
    }

    #[test]
    fn test_body_format() {
        let at = Utc.with_ymd_and_hms(2022, 4, 30, 18, 5, 0).unwrap();
        assert_eq!(
            format_body(&message(), at),
            "nettest 2022-04-30 18:05\nConnection status to 192.168.1.20: New alert: timeout"
        );
    }

    #[tokio::test]
    async fn test_dispatch_sends_to_fixed_recipient() {
        let recorder = Recorder::default();
        let sent = Arc::clone(&recorder.sent);
        let dispatcher = Dispatcher::new(Box::new(recorder), "ops@example.com", "nettest");

        assert_eq!(dispatcher.dispatch(&message()).await, DispatchOutcome::Sent);

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "ops@example.com");
        assert_eq!(sent[0].1, "nettest");
        assert!(sent[0].2.ends_with("192.168.1.20: New alert: timeout"));
    }

    #[tokio::test]
    async fn test_dispatch_failure_is_reported_not_raised() {
        let recorder = Recorder {
            fail: true,
            ..Recorder::default()
        };
        let dispatcher = Dispatcher::new(Box::new(recorder), "ops@example.com", "nettest");

        match dispatcher.dispatch(&message()).await {
            DispatchOutcome::Failed(reason) => assert!(reason.contains("smtp login refused")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_filter_blocks_rejected_kinds() {
        let recorder = Recorder::default();
        let sent = Arc::clone(&recorder.sent);
        let dispatcher = Dispatcher::new(Box::new(recorder), "ops@example.com", "nettest")
            .with_filter(|m| m.kind != MessageKind::RepeatAlert);

        let repeat = Message::new("10.0.0.1", MessageKind::RepeatAlert, "Repeat alert: timeout");
        assert_eq!(dispatcher.dispatch(&repeat).await, DispatchOutcome::Filtered);
        assert_eq!(dispatcher.dispatch(&message()).await, DispatchOutcome::Sent);
        assert_eq!(sent.lock().unwrap().len(), 1);
    }
}
