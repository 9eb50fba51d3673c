//! Configuration types for the nettest watchdog
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};

/// Main watchdog configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchdogConfig {
    /// File listing static addresses to monitor, one per line
    #[serde(default)]
    pub targets_path: Option<String>,

    /// Static addresses given directly (appended after file targets)
    #[serde(default)]
    pub targets: Vec<String>,

    /// WAN address discovery
    pub discovery: DiscoveryConfig,

    /// Reachability probing
    pub probe: ProbeConfig,

    /// Notification delivery
    pub notifier: NotifierConfig,

    /// Where the two durable records live
    pub store: StoreConfig,

    /// Alerting policy
    #[serde(default)]
    pub policy: PolicyConfig,
}

impl WatchdogConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            targets_path: None,
            targets: Vec::new(),
            discovery: DiscoveryConfig::default(),
            probe: ProbeConfig::default(),
            notifier: NotifierConfig::default(),
            store: StoreConfig::default(),
            policy: PolicyConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if let Some(path) = &self.targets_path
            && path.trim().is_empty()
        {
            return Err(crate::Error::config("Targets file path cannot be empty"));
        }

        if self.targets.iter().any(|t| t.trim().is_empty()) {
            return Err(crate::Error::config("Inline targets cannot be empty"));
        }

        self.discovery.validate()?;
        self.probe.validate()?;
        self.notifier.validate()?;
        self.store.validate()?;
        self.policy.validate()?;

        Ok(())
    }
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// WAN address discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiscoveryConfig {
    /// Plain-text "what is my IP" HTTP service
    Http {
        /// URL answering with the caller's address
        url: String,
        /// Request timeout in seconds
        #[serde(default = "default_http_timeout_secs")]
        timeout_secs: u64,
    },

    /// Always the same address
    Static {
        /// The WAN address to report
        address: String,
    },

    /// Custom discovery
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl DiscoveryConfig {
    /// Validate the discovery configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            DiscoveryConfig::Http { url, timeout_secs } => {
                if url.is_empty() {
                    return Err(crate::Error::config("HTTP discovery URL cannot be empty"));
                }
                if !url.starts_with("https://") && !url.starts_with("http://") {
                    return Err(crate::Error::config(format!(
                        "HTTP discovery URL must use HTTP or HTTPS scheme: {url}"
                    )));
                }
                if *timeout_secs == 0 {
                    return Err(crate::Error::config("HTTP discovery timeout must be > 0"));
                }
                Ok(())
            }
            DiscoveryConfig::Static { address } => {
                if address.trim().is_empty() {
                    return Err(crate::Error::config("Static discovery address cannot be empty"));
                }
                Ok(())
            }
            DiscoveryConfig::Custom { factory, .. } => validate_factory(factory, "discovery"),
        }
    }

    /// Get the discovery type name
    pub fn type_name(&self) -> &str {
        match self {
            DiscoveryConfig::Http { .. } => "http",
            DiscoveryConfig::Static { .. } => "static",
            DiscoveryConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        DiscoveryConfig::Http {
            url: "https://api.ipify.org".to_string(),
            timeout_secs: default_http_timeout_secs(),
        }
    }
}

/// Probe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProbeConfig {
    /// ICMP echo
    Icmp {
        /// How long to wait for each echo reply (milliseconds)
        #[serde(default = "default_probe_timeout_ms")]
        timeout_ms: u64,
        /// Echo requests sent before declaring the address unreachable
        #[serde(default = "default_probe_attempts")]
        attempts: u32,
    },

    /// Custom prober
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl ProbeConfig {
    /// Validate the probe configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProbeConfig::Icmp {
                timeout_ms,
                attempts,
            } => {
                if !(1..=60_000).contains(timeout_ms) {
                    return Err(crate::Error::config(format!(
                        "ICMP timeout must be between 1 and 60000 ms. Got: {timeout_ms}"
                    )));
                }
                if !(1..=10).contains(attempts) {
                    return Err(crate::Error::config(format!(
                        "ICMP attempts must be between 1 and 10. Got: {attempts}"
                    )));
                }
                Ok(())
            }
            ProbeConfig::Custom { factory, .. } => validate_factory(factory, "probe"),
        }
    }

    /// Get the prober type name
    pub fn type_name(&self) -> &str {
        match self {
            ProbeConfig::Icmp { .. } => "icmp",
            ProbeConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        ProbeConfig::Icmp {
            timeout_ms: default_probe_timeout_ms(),
            attempts: default_probe_attempts(),
        }
    }
}

/// Notifier configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotifierConfig {
    /// JSON POST to an HTTP endpoint
    Webhook {
        /// Endpoint URL
        url: String,
        /// Request timeout in seconds
        #[serde(default = "default_http_timeout_secs")]
        timeout_secs: u64,
    },

    /// Email through an SMTP relay
    Smtp {
        /// Relay host name
        relay: String,
        /// Relay port
        #[serde(default = "default_smtp_port")]
        port: u16,
        /// Transport security
        #[serde(default)]
        security: SmtpSecurity,
        /// Login name (sent together with `password`)
        #[serde(default)]
        username: Option<String>,
        /// Login password
        #[serde(default)]
        password: Option<String>,
        /// From address
        sender: String,
        /// Connection timeout in seconds
        #[serde(default = "default_http_timeout_secs")]
        timeout_secs: u64,
    },

    /// Write messages to the log only
    #[default]
    Log,

    /// Custom notifier
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl NotifierConfig {
    /// Validate the notifier configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            NotifierConfig::Webhook { url, timeout_secs } => {
                if url.is_empty() {
                    return Err(crate::Error::config("Webhook URL cannot be empty"));
                }
                if !url.starts_with("https://") && !url.starts_with("http://") {
                    return Err(crate::Error::config(format!(
                        "Webhook URL must use HTTP or HTTPS scheme: {url}"
                    )));
                }
                if *timeout_secs == 0 {
                    return Err(crate::Error::config("Webhook timeout must be > 0"));
                }
                Ok(())
            }
            NotifierConfig::Smtp {
                relay,
                port,
                username,
                password,
                sender,
                timeout_secs,
                ..
            } => {
                if relay.trim().is_empty() {
                    return Err(crate::Error::config("SMTP relay cannot be empty"));
                }
                if *port == 0 {
                    return Err(crate::Error::config("SMTP port must be > 0"));
                }
                if username.is_some() != password.is_some() {
                    return Err(crate::Error::config(
                        "SMTP username and password must be set together",
                    ));
                }
                if !sender.contains('@') {
                    return Err(crate::Error::config(format!(
                        "SMTP sender must be an email address: {sender}"
                    )));
                }
                if *timeout_secs == 0 {
                    return Err(crate::Error::config("SMTP timeout must be > 0"));
                }
                Ok(())
            }
            NotifierConfig::Log => Ok(()),
            NotifierConfig::Custom { factory, .. } => validate_factory(factory, "notifier"),
        }
    }

    /// Get the notifier type name
    pub fn type_name(&self) -> &str {
        match self {
            NotifierConfig::Webhook { .. } => "webhook",
            NotifierConfig::Smtp { .. } => "smtp",
            NotifierConfig::Log => "log",
            NotifierConfig::Custom { factory, .. } => factory,
        }
    }
}

/// How the SMTP connection is secured
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmtpSecurity {
    /// TLS from the first byte (SMTPS, usually port 465)
    #[default]
    Tls,
    /// Plain connection upgraded with STARTTLS (usually port 587)
    StartTls,
    /// No encryption; local relays only
    None,
}

/// Store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// JSON files on disk
    File {
        /// Path of the status snapshot
        status_path: String,
        /// Path of the dynamic address record
        address_path: String,
    },

    /// In-memory (not persistent)
    #[default]
    Memory,
}

impl StoreConfig {
    /// Validate the store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StoreConfig::File {
                status_path,
                address_path,
            } => {
                if status_path.is_empty() || address_path.is_empty() {
                    return Err(crate::Error::config("Store paths cannot be empty"));
                }
                if status_path == address_path {
                    return Err(crate::Error::config(
                        "Status and address records must use different files",
                    ));
                }
                Ok(())
            }
            StoreConfig::Memory => Ok(()),
        }
    }
}

/// Alerting policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Minimum time between notifications for one ongoing alert (seconds)
    #[serde(default = "default_repeat_wait_secs")]
    pub repeat_wait_secs: u64,

    /// Maximum age of a reusable dynamic address record (seconds)
    ///
    /// Slightly under a day, so a daily schedule does not push the
    /// re-discovery a little later every day.
    #[serde(default = "default_address_freshness_secs")]
    pub address_freshness_secs: u64,

    /// Addresses that are never probed and invalidate a cached record
    #[serde(default = "crate::model::default_blacklist")]
    pub blacklist: Vec<String>,

    /// Where notifications go
    #[serde(default)]
    pub recipient: String,

    /// Subject line of every notification
    #[serde(default = "default_subject")]
    pub subject: String,

    /// Whether the WAN address is probed (it is always resolved)
    #[serde(default = "default_true")]
    pub probe_wan: bool,

    /// Whether the gateway address is probed (it is always resolved)
    #[serde(default = "default_true")]
    pub probe_gateway: bool,

    /// Upper bound on probes in flight at once
    #[serde(default = "default_max_concurrent_probes")]
    pub max_concurrent_probes: usize,

    /// Capacity of the run event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl PolicyConfig {
    /// Validate the policy
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.address_freshness_secs == 0 {
            return Err(crate::Error::config("Address freshness window must be > 0"));
        }
        if self.max_concurrent_probes == 0 {
            return Err(crate::Error::config("max_concurrent_probes must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("event_channel_capacity must be > 0"));
        }
        if checked_duration(self.repeat_wait_secs).is_none()
            || checked_duration(self.address_freshness_secs).is_none()
        {
            return Err(crate::Error::config("Policy durations are out of range"));
        }
        Ok(())
    }

    /// Repeat wait as a duration
    pub fn repeat_wait(&self) -> chrono::Duration {
        checked_duration(self.repeat_wait_secs).unwrap_or(chrono::Duration::MAX)
    }

    /// Freshness window as a duration
    pub fn address_freshness(&self) -> chrono::Duration {
        checked_duration(self.address_freshness_secs).unwrap_or(chrono::Duration::MAX)
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            repeat_wait_secs: default_repeat_wait_secs(),
            address_freshness_secs: default_address_freshness_secs(),
            blacklist: crate::model::default_blacklist(),
            recipient: String::new(),
            subject: default_subject(),
            probe_wan: true,
            probe_gateway: true,
            max_concurrent_probes: default_max_concurrent_probes(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn checked_duration(secs: u64) -> Option<chrono::Duration> {
    i64::try_from(secs).ok().and_then(chrono::Duration::try_seconds)
}

fn validate_factory(factory: &str, kind: &str) -> Result<(), crate::Error> {
    if factory.is_empty() {
        return Err(crate::Error::config(format!(
            "Custom {kind} factory cannot be empty"
        )));
    }
    Ok(())
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_smtp_port() -> u16 {
    465
}

fn default_probe_timeout_ms() -> u64 {
    2000
}

fn default_probe_attempts() -> u32 {
    4
}

fn default_repeat_wait_secs() -> u64 {
    24 * 60 * 60
}

fn default_address_freshness_secs() -> u64 {
    23 * 60 * 60 + 58 * 60
}

fn default_subject() -> String {
    "nettest automated message".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_concurrent_probes() -> usize {
    8
}

fn default_event_channel_capacity() -> usize {
    256
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(WatchdogConfig::default().validate().is_ok());
    }

    #[test]
    fn test_policy_defaults() {
        let policy = PolicyConfig::default();
        assert_eq!(policy.repeat_wait(), chrono::Duration::hours(24));
        assert_eq!(policy.address_freshness(), chrono::Duration::minutes(23 * 60 + 58));
        assert_eq!(policy.blacklist, vec!["0.0.0.0", "0.0.0.1"]);
    }

    #[test]
    fn test_policy_deserializes_from_partial_json() {
        let policy: PolicyConfig =
            serde_json::from_str(r#"{ "repeat_wait_secs": 3600, "recipient": "ops@example.com" }"#)
                .unwrap();
        assert_eq!(policy.repeat_wait_secs, 3600);
        assert_eq!(policy.recipient, "ops@example.com");
        assert!(policy.probe_wan);
        assert_eq!(policy.max_concurrent_probes, 8);
    }

    #[test]
    fn test_tagged_enums_round_trip_type_names() {
        let config: WatchdogConfig = serde_json::from_str(
            r#"{
                "targets": ["192.168.1.1"],
                "discovery": { "type": "static", "address": "203.0.113.7" },
                "probe": { "type": "icmp" },
                "notifier": { "type": "webhook", "url": "https://hooks.example.com/x" },
                "store": { "type": "file", "status_path": "s.json", "address_path": "a.json" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.discovery.type_name(), "static");
        assert_eq!(config.probe.type_name(), "icmp");
        assert_eq!(config.notifier.type_name(), "webhook");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_configs_are_rejected() {
        let bad_probe = ProbeConfig::Icmp {
            timeout_ms: 0,
            attempts: 1,
        };
        assert!(bad_probe.validate().is_err());

        let bad_url = NotifierConfig::Webhook {
            url: "ftp://example.com".into(),
            timeout_secs: 5,
        };
        assert!(bad_url.validate().is_err());

        let half_login = NotifierConfig::Smtp {
            relay: "smtp.example.com".into(),
            port: 465,
            security: SmtpSecurity::Tls,
            username: Some("nettest".into()),
            password: None,
            sender: "nettest@example.com".into(),
            timeout_secs: 10,
        };
        assert!(half_login.validate().is_err());

        let same_file = StoreConfig::File {
            status_path: "state.json".into(),
            address_path: "state.json".into(),
        };
        assert!(same_file.validate().is_err());

        let policy = PolicyConfig {
            max_concurrent_probes: 0,
            ..PolicyConfig::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_smtp_notifier_defaults() {
        let notifier: NotifierConfig = serde_json::from_str(
            r#"{ "type": "smtp", "relay": "smtp.example.com", "sender": "nettest@example.com" }"#,
        )
        .unwrap();

        assert_eq!(notifier.type_name(), "smtp");
        match &notifier {
            NotifierConfig::Smtp {
                port,
                security,
                username,
                ..
            } => {
                assert_eq!(*port, 465);
                assert_eq!(*security, SmtpSecurity::Tls);
                assert!(username.is_none());
            }
            other => panic!("expected smtp notifier, got {other:?}"),
        }
        assert!(notifier.validate().is_ok());
    }
}
