// # Notifier Trait
//
// Defines the interface for delivering a human-directed message.
//
// ## Implementations
//
// - SMTP email: `nettest-notify-smtp` crate
// - HTTP webhook (SMS gateways, chat hooks): `nettest-notify-webhook` crate
// - Log only: `LogNotifier`
//
// ## Usage
//
// ```rust,ignore
// use nettest_core::Notifier;
//
// #[tokio::main]
// async fn main() -> Result<(), Box<dyn std::error::Error>> {
//     let notifier = /* Notifier implementation */;
//
//     notifier
//         .send("ops@example.com", "nettest automated message", "Connection reestablished.")
//         .await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

/// Trait for notifier implementations
///
/// # Delivery Semantics
///
/// One call is one delivery attempt. Implementations must not retry or
/// queue: the `Dispatcher` logs a failed delivery and the run carries on.
/// The recipient is a fixed operational destination taken from
/// configuration, never derived from monitored data.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a message
    ///
    /// # Parameters
    ///
    /// - `recipient`: Destination (mailbox, phone gateway address, channel)
    /// - `subject`: Short subject line
    /// - `body`: Message body
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The message was accepted for delivery
    /// - `Err(Error)`: Delivery failed
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), crate::Error>;

    /// Name of the delivery channel (for logging)
    fn name(&self) -> &'static str;
}

/// Helper trait for constructing notifiers from configuration
pub trait NotifierFactory: Send + Sync {
    /// Create a Notifier instance from configuration
    fn create(
        &self,
        config: &crate::config::NotifierConfig,
    ) -> Result<Box<dyn Notifier>, crate::Error>;
}
