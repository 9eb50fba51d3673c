//! Error types for the nettest watchdog
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for nettest operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the nettest watchdog
#[derive(Error, Debug)]
pub enum Error {
    /// IP discovery errors (WAN address lookup)
    #[error("IP discovery error: {0}")]
    Discovery(String),

    /// Probe collaborator errors
    #[error("Probe error: {0}")]
    Probe(String),

    /// Notification delivery errors
    #[error("Notification error: {0}")]
    Notify(String),

    /// State store-related errors
    #[error("State store error: {0}")]
    StateStore(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client errors (discovery service, webhook)
    #[error("HTTP error: {0}")]
    Http(String),

    /// An address string that cannot be used
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

impl Error {
    /// Create an IP discovery error
    pub fn discovery(msg: impl Into<String>) -> Self {
        Self::Discovery(msg.into())
    }

    /// Create a probe error
    pub fn probe(msg: impl Into<String>) -> Self {
        Self::Probe(msg.into())
    }

    /// Create a notification error
    pub fn notify(msg: impl Into<String>) -> Self {
        Self::Notify(msg.into())
    }

    /// Create a state store error
    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an invalid address error
    pub fn invalid_address(msg: impl Into<String>) -> Self {
        Self::InvalidAddress(msg.into())
    }
}
