// # nettest - Host-Connectivity Watchdog
//
// One invocation is one check. Schedule it (cron, systemd timer) at the
// interval you want; runs must not overlap.
//
// The binary is a thin integration layer:
// 1. Reading configuration from environment variables
// 2. Installing logging
// 3. Registering discovery, prober and notifier plugins
// 4. Running the watchdog once and mapping the outcome to an exit code
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Targets
// - `NETTEST_TARGETS_FILE`: File with one address per line (`#` comments),
//   default nettest.servers.txt when present
// - `NETTEST_TARGETS`: Comma-separated addresses, appended after the file's
//
// ### State
// - `NETTEST_STORE_TYPE`: Type of store (file, memory)
// - `NETTEST_STATUS_PATH`: Status snapshot file (default nettest.status.json)
// - `NETTEST_ADDRESS_PATH`: WAN address record file (default nettest.wanip.json)
//
// ### WAN Address Discovery
// - `NETTEST_DISCOVERY_TYPE`: Type of discovery (http, static)
// - `NETTEST_DISCOVERY_URL`: Plain-text "what is my IP" URL (for http)
// - `NETTEST_DISCOVERY_ADDRESS`: Fixed WAN address (for static)
//
// ### Probing
// - `NETTEST_PROBE_TIMEOUT_MS`: Wait per echo reply
// - `NETTEST_PROBE_ATTEMPTS`: Echo requests per address
// - `NETTEST_PROBE_WAN` / `NETTEST_PROBE_GATEWAY`: Probe the dynamic addresses
//
// ### Notification
// - `NETTEST_NOTIFIER_TYPE`: Type of notifier (smtp, webhook, log)
// - `NETTEST_NOTIFY_URL`: Endpoint (for webhook)
// - `NETTEST_SMTP_RELAY`: Relay host (for smtp)
// - `NETTEST_SMTP_PORT`: Relay port (default 465, 587 for starttls, 25 for none)
// - `NETTEST_SMTP_SECURITY`: tls, starttls, none (default tls)
// - `NETTEST_SMTP_USERNAME` / `NETTEST_SMTP_PASSWORD`: Relay login
// - `NETTEST_SMTP_SENDER`: From address (for smtp)
// - `NETTEST_RECIPIENT`: Operational destination
// - `NETTEST_SUBJECT`: Subject line
// - `NETTEST_TEST_NOTIFICATION`: Also send a test message
//
// ### Policy
// - `NETTEST_REPEAT_WAIT_SECS`: Minimum time between repeats of one alert
// - `NETTEST_ADDRESS_FRESHNESS_SECS`: Maximum age of the cached WAN address
// - `NETTEST_BLACKLIST`: Comma-separated addresses that are never probed
//
// ### Logging
// - `NETTEST_LOG_LEVEL`: trace, debug, info, warn, error
// - `NETTEST_LOG_FILE`: Append logs to this file instead of stderr
//
// ## Example
//
// ```bash
// export NETTEST_TARGETS_FILE=/etc/nettest/servers.txt
// export NETTEST_STATUS_PATH=/var/lib/nettest/status.json
// export NETTEST_ADDRESS_PATH=/var/lib/nettest/wanip.json
// export NETTEST_NOTIFIER_TYPE=smtp
// export NETTEST_SMTP_RELAY=smtp.example.com
// export NETTEST_SMTP_USERNAME=nettest@example.com
// export NETTEST_SMTP_PASSWORD=secret
// export NETTEST_SMTP_SENDER=nettest@example.com
// export NETTEST_RECIPIENT=oncall@example.com
//
// nettest
// ```

use anyhow::{Context, Result};
use nettest_core::model::{Message, MessageKind};
use nettest_core::{
    Collaborators, CollaboratorRegistry, DiscoveryConfig, NotifierConfig, PolicyConfig,
    ProbeConfig, SmtpSecurity, StoreConfig, Watchdog, WatchdogConfig, WatchdogEvent,
};
use std::env;
use std::fs::OpenOptions;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// - 0: Run completed
/// - 1: Configuration or startup error
/// - 2: Runtime error (the status snapshot could not be saved)
#[derive(Debug, Clone, Copy)]
enum NettestExitCode {
    /// Run completed (alerts may still have been raised)
    Completed = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error
    RuntimeError = 2,
}

impl From<NettestExitCode> for ExitCode {
    fn from(code: NettestExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Default status snapshot file
const DEFAULT_STATUS_PATH: &str = "nettest.status.json";

/// Default WAN address record file
const DEFAULT_ADDRESS_PATH: &str = "nettest.wanip.json";

/// Target list picked up from the working directory when none is configured
const DEFAULT_TARGETS_FILE: &str = "nettest.servers.txt";

/// Whole-request timeout for webhook delivery (seconds)
const WEBHOOK_TIMEOUT_SECS: u64 = 30;

/// Per-command timeout for SMTP delivery (seconds)
const SMTP_TIMEOUT_SECS: u64 = 30;

/// Application configuration
#[derive(Debug)]
struct Config {
    targets_file: Option<String>,
    targets: Vec<String>,
    store_type: String,
    status_path: String,
    address_path: String,
    discovery_type: String,
    discovery_url: Option<String>,
    discovery_address: Option<String>,
    probe_timeout_ms: Option<u64>,
    probe_attempts: Option<u32>,
    probe_wan: bool,
    probe_gateway: bool,
    notifier_type: String,
    notify_url: Option<String>,
    smtp_relay: Option<String>,
    smtp_port: Option<u16>,
    smtp_security: String,
    smtp_username: Option<String>,
    smtp_password: Option<String>,
    smtp_sender: Option<String>,
    recipient: String,
    subject: Option<String>,
    repeat_wait_secs: Option<u64>,
    address_freshness_secs: Option<u64>,
    blacklist: Option<Vec<String>>,
    test_notification: bool,
    log_level: String,
    log_file: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            targets_file: var("NETTEST_TARGETS_FILE").or_else(|| {
                std::path::Path::new(DEFAULT_TARGETS_FILE)
                    .is_file()
                    .then(|| DEFAULT_TARGETS_FILE.to_string())
            }),
            targets: var("NETTEST_TARGETS").map(|v| split_list(&v)).unwrap_or_default(),
            store_type: var("NETTEST_STORE_TYPE").unwrap_or_else(|| "file".to_string()),
            status_path: var("NETTEST_STATUS_PATH")
                .unwrap_or_else(|| DEFAULT_STATUS_PATH.to_string()),
            address_path: var("NETTEST_ADDRESS_PATH")
                .unwrap_or_else(|| DEFAULT_ADDRESS_PATH.to_string()),
            discovery_type: var("NETTEST_DISCOVERY_TYPE").unwrap_or_else(|| "http".to_string()),
            discovery_url: var("NETTEST_DISCOVERY_URL"),
            discovery_address: var("NETTEST_DISCOVERY_ADDRESS"),
            probe_timeout_ms: parse_var(&var, "NETTEST_PROBE_TIMEOUT_MS")?,
            probe_attempts: parse_var(&var, "NETTEST_PROBE_ATTEMPTS")?,
            probe_wan: parse_flag(&var, "NETTEST_PROBE_WAN")?.unwrap_or(true),
            probe_gateway: parse_flag(&var, "NETTEST_PROBE_GATEWAY")?.unwrap_or(true),
            notifier_type: var("NETTEST_NOTIFIER_TYPE").unwrap_or_else(|| "log".to_string()),
            notify_url: var("NETTEST_NOTIFY_URL"),
            smtp_relay: var("NETTEST_SMTP_RELAY"),
            smtp_port: parse_var(&var, "NETTEST_SMTP_PORT")?,
            smtp_security: var("NETTEST_SMTP_SECURITY").unwrap_or_else(|| "tls".to_string()),
            smtp_username: var("NETTEST_SMTP_USERNAME"),
            smtp_password: var("NETTEST_SMTP_PASSWORD"),
            smtp_sender: var("NETTEST_SMTP_SENDER"),
            recipient: var("NETTEST_RECIPIENT").unwrap_or_default(),
            subject: var("NETTEST_SUBJECT"),
            repeat_wait_secs: parse_var(&var, "NETTEST_REPEAT_WAIT_SECS")?,
            address_freshness_secs: parse_var(&var, "NETTEST_ADDRESS_FRESHNESS_SECS")?,
            blacklist: var("NETTEST_BLACKLIST").map(|v| split_list(&v)),
            test_notification: parse_flag(&var, "NETTEST_TEST_NOTIFICATION")?.unwrap_or(false),
            log_level: var("NETTEST_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_file: var("NETTEST_LOG_FILE"),
        })
    }

    /// Validate the parts of the configuration the core does not know about
    fn validate(&self) -> Result<()> {
        // Validate store type
        match self.store_type.as_str() {
            "file" | "memory" => {}
            _ => anyhow::bail!(
                "NETTEST_STORE_TYPE '{}' is not supported. \
                Supported types: file, memory",
                self.store_type
            ),
        }

        // Validate discovery type
        match self.discovery_type.as_str() {
            "http" | "static" => {}
            _ => anyhow::bail!(
                "NETTEST_DISCOVERY_TYPE '{}' is not supported. \
                Supported types: http, static",
                self.discovery_type
            ),
        }

        if self.discovery_type == "static" && self.discovery_address.is_none() {
            anyhow::bail!(
                "NETTEST_DISCOVERY_ADDRESS is required when NETTEST_DISCOVERY_TYPE=static"
            );
        }

        // Validate notifier type
        match self.notifier_type.as_str() {
            "smtp" | "webhook" | "log" => {}
            _ => anyhow::bail!(
                "NETTEST_NOTIFIER_TYPE '{}' is not supported. \
                Supported types: smtp, webhook, log",
                self.notifier_type
            ),
        }

        if self.notifier_type == "webhook" && self.notify_url.is_none() {
            anyhow::bail!("NETTEST_NOTIFY_URL is required when NETTEST_NOTIFIER_TYPE=webhook");
        }

        if self.notifier_type == "smtp" {
            parse_security(&self.smtp_security)?;
            if self.smtp_relay.is_none() {
                anyhow::bail!("NETTEST_SMTP_RELAY is required when NETTEST_NOTIFIER_TYPE=smtp");
            }
            if self.smtp_sender.is_none() {
                anyhow::bail!("NETTEST_SMTP_SENDER is required when NETTEST_NOTIFIER_TYPE=smtp");
            }
        }

        if self.notifier_type != "log" && self.recipient.is_empty() {
            anyhow::bail!(
                "NETTEST_RECIPIENT is required when NETTEST_NOTIFIER_TYPE={}. \
                Set it via: export NETTEST_RECIPIENT=oncall@example.com",
                self.notifier_type
            );
        }

        if self.targets_file.is_none()
            && self.targets.is_empty()
            && !self.probe_wan
            && !self.probe_gateway
        {
            anyhow::bail!(
                "Nothing to monitor: set NETTEST_TARGETS_FILE or NETTEST_TARGETS, \
                or enable NETTEST_PROBE_WAN / NETTEST_PROBE_GATEWAY"
            );
        }

        // Validate state paths for file store
        if self.store_type == "file" {
            for (name, path) in [
                ("NETTEST_STATUS_PATH", &self.status_path),
                ("NETTEST_ADDRESS_PATH", &self.address_path),
            ] {
                if let Some(parent) = std::path::Path::new(path).parent()
                    && !parent.as_os_str().is_empty()
                    && !parent.exists()
                {
                    anyhow::bail!(
                        "{} parent directory does not exist: {}. \
                        Create it first: mkdir -p {}",
                        name,
                        parent.display(),
                        parent.display()
                    );
                }
            }
        }

        parse_level(&self.log_level)?;

        self.watchdog_config().validate()?;
        Ok(())
    }

    /// Translate into the core configuration
    fn watchdog_config(&self) -> WatchdogConfig {
        let defaults = WatchdogConfig::new();

        let discovery = match self.discovery_type.as_str() {
            "static" => DiscoveryConfig::Static {
                address: self.discovery_address.clone().unwrap_or_default(),
            },
            _ => match (&defaults.discovery, &self.discovery_url) {
                (DiscoveryConfig::Http { timeout_secs, .. }, Some(url)) => DiscoveryConfig::Http {
                    url: url.clone(),
                    timeout_secs: *timeout_secs,
                },
                (default, _) => default.clone(),
            },
        };

        let probe = match defaults.probe {
            ProbeConfig::Icmp {
                timeout_ms,
                attempts,
            } => ProbeConfig::Icmp {
                timeout_ms: self.probe_timeout_ms.unwrap_or(timeout_ms),
                attempts: self.probe_attempts.unwrap_or(attempts),
            },
            other => other,
        };

        let notifier = match self.notifier_type.as_str() {
            "webhook" => NotifierConfig::Webhook {
                url: self.notify_url.clone().unwrap_or_default(),
                timeout_secs: WEBHOOK_TIMEOUT_SECS,
            },
            "smtp" => {
                let security = parse_security(&self.smtp_security).unwrap_or_default();
                NotifierConfig::Smtp {
                    relay: self.smtp_relay.clone().unwrap_or_default(),
                    port: self.smtp_port.unwrap_or(match security {
                        SmtpSecurity::Tls => 465,
                        SmtpSecurity::StartTls => 587,
                        SmtpSecurity::None => 25,
                    }),
                    security,
                    username: self.smtp_username.clone(),
                    password: self.smtp_password.clone(),
                    sender: self.smtp_sender.clone().unwrap_or_default(),
                    timeout_secs: SMTP_TIMEOUT_SECS,
                }
            }
            _ => NotifierConfig::Log,
        };

        let store = match self.store_type.as_str() {
            "memory" => StoreConfig::Memory,
            _ => StoreConfig::File {
                status_path: self.status_path.clone(),
                address_path: self.address_path.clone(),
            },
        };

        let base = PolicyConfig::default();
        let policy = PolicyConfig {
            repeat_wait_secs: self.repeat_wait_secs.unwrap_or(base.repeat_wait_secs),
            address_freshness_secs: self
                .address_freshness_secs
                .unwrap_or(base.address_freshness_secs),
            blacklist: self.blacklist.clone().unwrap_or_else(|| base.blacklist.clone()),
            recipient: self.recipient.clone(),
            subject: self.subject.clone().unwrap_or_else(|| base.subject.clone()),
            probe_wan: self.probe_wan,
            probe_gateway: self.probe_gateway,
            ..base
        };

        WatchdogConfig {
            targets_path: self.targets_file.clone(),
            targets: self.targets.clone(),
            discovery,
            probe,
            notifier,
            store,
            policy,
        }
    }
}

/// Split a comma-separated list, dropping empty items
fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse an optional numeric variable, rejecting malformed values
fn parse_var<T>(var: impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    var(key)
        .map(|v| {
            v.trim()
                .parse::<T>()
                .with_context(|| format!("{} is not a valid number: '{}'", key, v))
        })
        .transpose()
}

/// Parse an optional boolean variable
fn parse_flag(var: impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<bool>> {
    var(key)
        .map(|v| match v.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(anyhow::anyhow!(
                "{} must be true or false. Got: '{}'",
                key,
                v
            )),
        })
        .transpose()
}

/// Parse an SMTP security mode
fn parse_security(value: &str) -> Result<SmtpSecurity> {
    match value.to_lowercase().as_str() {
        "tls" | "ssl" => Ok(SmtpSecurity::Tls),
        "starttls" | "start_tls" => Ok(SmtpSecurity::StartTls),
        "none" | "plain" => Ok(SmtpSecurity::None),
        _ => anyhow::bail!(
            "NETTEST_SMTP_SECURITY '{}' is not valid. \
            Valid modes: tls, starttls, none",
            value
        ),
    }
}

/// Parse a log level name
fn parse_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "NETTEST_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            level
        ),
    }
}

/// Install the global tracing subscriber
fn init_logging(config: &Config) -> Result<()> {
    let level = parse_level(&config.log_level)?;

    match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path))?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        None => {
            let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return NettestExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return NettestExitCode::ConfigError.into();
    }

    if let Err(e) = init_logging(&config) {
        eprintln!("Failed to set up logging: {:#}", e);
        return NettestExitCode::ConfigError.into();
    }

    info!("Starting nettest");

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return NettestExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        let (watchdog, mut events) = match build_watchdog(&config).await {
            Ok(built) => built,
            Err(e) => {
                error!("Startup error: {:#}", e);
                return NettestExitCode::ConfigError;
            }
        };

        // Surface run events at debug level
        let monitor = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                debug!(?event, "Watchdog event");
            }
        });

        let code = match watchdog.run_once().await {
            Ok(summary) => {
                info!(
                    addresses = summary.states.len(),
                    in_alert = summary.in_alert(),
                    "nettest run finished"
                );
                NettestExitCode::Completed
            }
            Err(e) => {
                error!("Run error: {}", e);
                NettestExitCode::RuntimeError
            }
        };

        if config.test_notification {
            info!("A test notification is being sent.");
            let message = Message::new("test", MessageKind::Test, "testing notification only");
            watchdog.dispatcher().dispatch(&message).await;
        }

        // Closing the channel ends the monitor once queued events are logged
        drop(watchdog);
        let _ = monitor.await;

        code
    });

    result.into()
}

/// Register plugins, build collaborators and assemble the watchdog
async fn build_watchdog(config: &Config) -> Result<(Watchdog, mpsc::Receiver<WatchdogEvent>)> {
    let watchdog_config = config.watchdog_config();

    // Create collaborator registry
    let registry = CollaboratorRegistry::with_builtins();

    // Register plugin collaborators
    #[cfg(feature = "http")]
    {
        info!("Registering HTTP discovery");
        nettest_ip_http::register(&registry);
    }

    #[cfg(feature = "icmp")]
    {
        info!("Registering ICMP prober");
        nettest_probe_icmp::register(&registry);
    }

    #[cfg(feature = "smtp")]
    {
        info!("Registering SMTP notifier");
        nettest_notify_smtp::register(&registry);
    }

    #[cfg(feature = "webhook")]
    {
        info!("Registering webhook notifier");
        nettest_notify_webhook::register(&registry);
    }

    let discovery = registry.create_discovery(&watchdog_config.discovery)?;
    let prober = registry.create_prober(&watchdog_config.probe)?;
    let notifier = registry.create_notifier(&watchdog_config.notifier)?;
    let (status_store, address_cache) =
        nettest_core::state::open_stores(&watchdog_config.store).await?;

    let mut targets = match &watchdog_config.targets_path {
        Some(path) => nettest_core::targets::load_targets(path).await?,
        None => Vec::new(),
    };
    targets.extend(watchdog_config.targets.iter().cloned());

    if targets.is_empty() {
        warn!("No static targets configured; only dynamic addresses are checked");
    }
    info!("Monitoring {} static target(s)", targets.len());

    let collaborators = Collaborators {
        discovery,
        prober,
        notifier,
        status_store,
        address_cache,
    };
    let built = Watchdog::new(collaborators, targets, watchdog_config.policy)?;

    Ok(built)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert!(config.validate().is_ok());

        let core = config.watchdog_config();
        assert!(matches!(core.notifier, NotifierConfig::Log));
        assert!(matches!(core.discovery, DiscoveryConfig::Http { .. }));
        assert_eq!(core.policy.repeat_wait_secs, 86_400);
        assert_eq!(core.policy.address_freshness_secs, 86_280);
        assert_eq!(core.policy.blacklist, vec!["0.0.0.0", "0.0.0.1"]);
        match core.store {
            StoreConfig::File {
                status_path,
                address_path,
            } => {
                assert_eq!(status_path, DEFAULT_STATUS_PATH);
                assert_eq!(address_path, DEFAULT_ADDRESS_PATH);
            }
            other => panic!("expected file store, got {other:?}"),
        }
    }

    #[test]
    fn test_lists_and_flags() {
        let config = config_from(&[
            ("NETTEST_TARGETS", " 192.168.1.1, ,nas.local "),
            ("NETTEST_BLACKLIST", "0.0.0.0,10.0.0.66"),
            ("NETTEST_PROBE_GATEWAY", "no"),
            ("NETTEST_TEST_NOTIFICATION", "TRUE"),
        ])
        .unwrap();

        assert_eq!(config.targets, vec!["192.168.1.1", "nas.local"]);
        assert!(config.probe_wan);
        assert!(!config.probe_gateway);
        assert!(config.test_notification);
        assert_eq!(
            config.watchdog_config().policy.blacklist,
            vec!["0.0.0.0", "10.0.0.66"]
        );
    }

    #[test]
    fn test_malformed_number_is_rejected() {
        let err = config_from(&[("NETTEST_PROBE_ATTEMPTS", "four")]).unwrap_err();
        assert!(err.to_string().contains("NETTEST_PROBE_ATTEMPTS"));

        assert!(config_from(&[("NETTEST_PROBE_WAN", "maybe")]).is_err());
    }

    #[test]
    fn test_out_of_range_probe_settings_fail_validation() {
        let config = config_from(&[("NETTEST_PROBE_ATTEMPTS", "50")]).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_webhook_requires_url_and_recipient() {
        let config = config_from(&[("NETTEST_NOTIFIER_TYPE", "webhook")]).unwrap();
        assert!(config.validate().is_err());

        let config = config_from(&[
            ("NETTEST_NOTIFIER_TYPE", "webhook"),
            ("NETTEST_NOTIFY_URL", "https://relay.example.com/mail"),
            ("NETTEST_RECIPIENT", "oncall@example.com"),
        ])
        .unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_smtp_settings() {
        let config = config_from(&[
            ("NETTEST_NOTIFIER_TYPE", "smtp"),
            ("NETTEST_SMTP_RELAY", "smtp.example.com"),
            ("NETTEST_SMTP_SECURITY", "starttls"),
            ("NETTEST_SMTP_USERNAME", "nettest@example.com"),
            ("NETTEST_SMTP_PASSWORD", "secret"),
            ("NETTEST_SMTP_SENDER", "nettest@example.com"),
            ("NETTEST_RECIPIENT", "oncall@example.com"),
        ])
        .unwrap();
        assert!(config.validate().is_ok());

        match config.watchdog_config().notifier {
            NotifierConfig::Smtp {
                relay,
                port,
                security,
                username,
                ..
            } => {
                assert_eq!(relay, "smtp.example.com");
                assert_eq!(port, 587);
                assert_eq!(security, SmtpSecurity::StartTls);
                assert_eq!(username.as_deref(), Some("nettest@example.com"));
            }
            other => panic!("expected smtp notifier, got {other:?}"),
        }
    }

    #[test]
    fn test_smtp_requires_relay_sender_and_recipient() {
        let base = [
            ("NETTEST_NOTIFIER_TYPE", "smtp"),
            ("NETTEST_SMTP_RELAY", "smtp.example.com"),
            ("NETTEST_SMTP_SENDER", "nettest@example.com"),
            ("NETTEST_RECIPIENT", "oncall@example.com"),
        ];
        assert!(config_from(&base).unwrap().validate().is_ok());

        for skipped in 1..base.len() {
            let partial: Vec<_> = base
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != skipped)
                .map(|(_, kv)| *kv)
                .collect();
            let config = config_from(&partial).unwrap();
            assert!(config.validate().is_err(), "{} missing", base[skipped].0);
        }

        let mut bad_security = base.to_vec();
        bad_security.push(("NETTEST_SMTP_SECURITY", "ssl3"));
        assert!(config_from(&bad_security).unwrap().validate().is_err());

        let mut password_only = base.to_vec();
        password_only.push(("NETTEST_SMTP_PASSWORD", "secret"));
        assert!(config_from(&password_only).unwrap().validate().is_err());
    }

    #[test]
    fn test_nothing_to_monitor_is_rejected() {
        let config = config_from(&[
            ("NETTEST_PROBE_WAN", "false"),
            ("NETTEST_PROBE_GATEWAY", "false"),
        ])
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_types_are_rejected() {
        for (key, value) in [
            ("NETTEST_STORE_TYPE", "redis"),
            ("NETTEST_DISCOVERY_TYPE", "upnp"),
            ("NETTEST_NOTIFIER_TYPE", "pager"),
            ("NETTEST_LOG_LEVEL", "loud"),
        ] {
            let config = config_from(&[(key, value)]).unwrap();
            assert!(config.validate().is_err(), "{key}={value} should be rejected");
        }
    }

    #[tokio::test]
    async fn test_missing_targets_file_fails_startup() {
        let dir = std::env::temp_dir().join("nettest-absent-dir-for-test");
        let path = dir.join("servers.txt");
        let config = config_from(&[
            ("NETTEST_TARGETS_FILE", path.to_str().unwrap()),
            ("NETTEST_STORE_TYPE", "memory"),
            ("NETTEST_DISCOVERY_TYPE", "static"),
            ("NETTEST_DISCOVERY_ADDRESS", "203.0.113.7"),
        ])
        .unwrap();

        assert!(build_watchdog(&config).await.is_err());
    }
}
