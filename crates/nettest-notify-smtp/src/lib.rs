// # SMTP Email Notifier
//
// This crate delivers watchdog notifications as plain-text email through
// an SMTP relay.
//
// ## Security
//
// - `tls`: SMTPS, TLS from the first byte (port 465)
// - `start_tls`: STARTTLS upgrade (port 587)
// - `none`: unencrypted, for a relay on the local host or network
//
// A login is only sent when both username and password are configured.
//
// ## Delivery
//
// The SMTP client is blocking, so each message is sent on tokio's
// blocking pool. Nothing is retried: a failed delivery is reported to the
// dispatcher, which logs it.

use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message as Email, SmtpTransport, Transport};
use nettest_core::CollaboratorRegistry;
use nettest_core::config::{NotifierConfig, SmtpSecurity};
use nettest_core::traits::{Notifier, NotifierFactory};
use nettest_core::{Error, Result};
use std::time::Duration;

/// Notifier sending email through an SMTP relay
pub struct SmtpNotifier {
    /// Relay host, for logging
    relay: String,

    /// From address
    sender: Mailbox,

    /// Configured SMTP transport (connection pool)
    transport: SmtpTransport,
}

impl SmtpNotifier {
    /// Create a new SMTP notifier
    ///
    /// # Parameters
    ///
    /// - `relay`: Relay host name
    /// - `port`: Relay port
    /// - `security`: How the connection is secured
    /// - `credentials`: Optional login
    /// - `sender`: From address (e.g., "nettest <nettest@example.com>")
    /// - `timeout`: Timeout for each SMTP command
    pub fn new(
        relay: &str,
        port: u16,
        security: SmtpSecurity,
        credentials: Option<Credentials>,
        sender: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let sender: Mailbox = sender
            .parse()
            .map_err(|e| Error::config(format!("Invalid SMTP sender '{}': {}", sender, e)))?;

        let builder = match security {
            SmtpSecurity::Tls => SmtpTransport::relay(relay),
            SmtpSecurity::StartTls => SmtpTransport::starttls_relay(relay),
            SmtpSecurity::None => Ok(SmtpTransport::builder_dangerous(relay)),
        }
        .map_err(|e| Error::config(format!("Failed to set up SMTP relay {}: {}", relay, e)))?;

        let builder = builder.port(port).timeout(Some(timeout));
        let transport = match credentials {
            Some(credentials) => builder.credentials(credentials).build(),
            None => builder.build(),
        };

        Ok(Self {
            relay: relay.to_string(),
            sender,
            transport,
        })
    }

    /// Returns the relay host
    pub fn relay(&self) -> &str {
        &self.relay
    }

    fn compose(&self, recipient: &str, subject: &str, body: &str) -> Result<Email> {
        let to: Mailbox = recipient
            .parse()
            .map_err(|e| Error::notify(format!("Invalid recipient '{}': {}", recipient, e)))?;

        Email::builder()
            .from(self.sender.clone())
            .to(to)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| Error::notify(format!("Failed to build email: {}", e)))
    }
}

fn describe_failure(error: &lettre::transport::smtp::Error) -> String {
    if error.is_permanent() {
        format!("SMTP relay rejected the message: {}", error)
    } else if error.is_transient() {
        format!("SMTP relay deferred the message: {}", error)
    } else if error.is_timeout() {
        format!("SMTP relay timed out: {}", error)
    } else {
        format!("SMTP delivery failed: {}", error)
    }
}

#[async_trait::async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        let email = self.compose(recipient, subject, body)?;
        let transport = self.transport.clone();

        tokio::task::spawn_blocking(move || transport.send(&email))
            .await
            .map_err(|e| Error::notify(format!("SMTP delivery task failed: {}", e)))?
            .map_err(|e| Error::notify(describe_failure(&e)))?;

        tracing::debug!(relay = %self.relay, recipient = %recipient, "SMTP relay accepted notification");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}

/// Factory for creating SMTP notifiers
pub struct SmtpNotifierFactory;

impl NotifierFactory for SmtpNotifierFactory {
    fn create(&self, config: &NotifierConfig) -> Result<Box<dyn Notifier>> {
        match config {
            NotifierConfig::Smtp {
                relay,
                port,
                security,
                username,
                password,
                sender,
                timeout_secs,
            } => {
                let credentials = match (username, password) {
                    (Some(user), Some(pass)) => Some(Credentials::new(user.clone(), pass.clone())),
                    (None, None) => None,
                    _ => {
                        return Err(Error::config(
                            "SMTP username and password must be set together",
                        ));
                    }
                };
                Ok(Box::new(SmtpNotifier::new(
                    relay,
                    *port,
                    *security,
                    credentials,
                    sender,
                    Duration::from_secs(*timeout_secs),
                )?))
            }
            _ => Err(Error::config("Invalid config for SMTP notifier")),
        }
    }
}

/// Register the SMTP notifier with a registry
pub fn register(registry: &CollaboratorRegistry) {
    registry.register_notifier("smtp", Box::new(SmtpNotifierFactory));
}
