//! Data model shared by every watchdog component
//!
//! - [`AddressStatus`] / [`StatusSnapshot`]: per-address alert history
//! - [`DynamicAddressRecord`]: the cached WAN/gateway pair
//! - [`Blacklist`]: addresses that are never worth probing
//! - [`ProbeOutcome`] / [`Message`]: values flowing between components

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::net::Ipv4Addr;

/// Address returned by discovery when the real WAN address is unknown
pub const SENTINEL_ADDRESS: Ipv4Addr = Ipv4Addr::UNSPECIFIED;

/// Alert state of one monitored address after an evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressStatus {
    /// Whether the address is currently considered unreachable
    pub in_alert: bool,
    /// When the ongoing alert began
    pub alert_start: Option<DateTime<Utc>>,
    /// Failure detail from the most recent probe
    pub alert_description: Option<String>,
    /// When the operator was last told about the ongoing alert
    pub last_notified: Option<DateTime<Utc>>,
    /// When this evaluation happened
    pub last_checked: DateTime<Utc>,
}

impl AddressStatus {
    /// Check the alert-field invariant.
    ///
    /// `alert_start` and `last_notified` are set exactly when `in_alert`
    /// is true, and a notification never predates the alert it is about.
    pub fn is_consistent(&self) -> bool {
        match (self.in_alert, self.alert_start, self.last_notified) {
            (true, Some(start), Some(notified)) => notified >= start,
            (false, None, None) => true,
            _ => false,
        }
    }
}

/// Every address status produced by one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// When the snapshot was produced
    pub updated_at: DateTime<Utc>,
    /// Status per address string
    pub statuses: BTreeMap<String, AddressStatus>,
}

impl StatusSnapshot {
    /// Create an empty snapshot stamped with `updated_at`
    pub fn new(updated_at: DateTime<Utc>) -> Self {
        Self {
            updated_at,
            statuses: BTreeMap::new(),
        }
    }

    /// Previous status of an address, if it was evaluated last run
    pub fn get(&self, address: &str) -> Option<&AddressStatus> {
        self.statuses.get(address)
    }

    /// Number of addresses in the snapshot
    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    /// Whether the snapshot holds no statuses
    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    /// Drop entries that break the [`AddressStatus`] invariant.
    ///
    /// A dropped entry behaves exactly like an address never seen before.
    pub fn validated(mut self) -> Self {
        self.statuses.retain(|address, status| {
            let keep = status.is_consistent();
            if !keep {
                tracing::warn!(
                    address = %address,
                    "Discarding inconsistent stored status; treating address as new"
                );
            }
            keep
        });
        self
    }
}

/// Cached result of WAN address discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicAddressRecord {
    /// When discovery produced this record
    pub obtained_at: DateTime<Utc>,
    /// The network's externally visible address
    pub wan: Ipv4Addr,
    /// The assumed router address, derived from `wan`
    pub gateway: Ipv4Addr,
}

impl DynamicAddressRecord {
    /// Create a record for a freshly discovered WAN address
    pub fn new(wan: Ipv4Addr, obtained_at: DateTime<Utc>) -> Self {
        Self {
            obtained_at,
            wan,
            gateway: derive_gateway(wan),
        }
    }

    /// Time elapsed since the record was obtained
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now.signed_duration_since(self.obtained_at)
    }

    /// Whether the record can be reused without asking discovery again.
    ///
    /// Requires an age strictly below `window`, neither address
    /// blacklisted, and a gateway that still matches its WAN address.
    pub fn is_fresh(
        &self,
        now: DateTime<Utc>,
        window: chrono::Duration,
        blacklist: &Blacklist,
    ) -> bool {
        self.age(now) < window
            && !blacklist.contains_ip(self.wan)
            && !blacklist.contains_ip(self.gateway)
            && self.gateway == derive_gateway(self.wan)
    }
}

/// Derive the gateway from a WAN address: first three octets, then `.1`
pub fn derive_gateway(wan: Ipv4Addr) -> Ipv4Addr {
    let [a, b, c, _] = wan.octets();
    Ipv4Addr::new(a, b, c, 1)
}

/// Fixed set of addresses that are always treated as unreachable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blacklist {
    addresses: HashSet<String>,
}

impl Blacklist {
    /// Create a blacklist from address strings
    pub fn new<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            addresses: addresses
                .into_iter()
                .map(|a| a.into().trim().to_string())
                .filter(|a| !a.is_empty())
                .collect(),
        }
    }

    /// Whether an address string is blacklisted
    pub fn contains(&self, address: &str) -> bool {
        self.addresses.contains(address.trim())
    }

    /// Whether an IPv4 address is blacklisted
    pub fn contains_ip(&self, address: Ipv4Addr) -> bool {
        self.contains(&address.to_string())
    }

    /// Number of blacklisted addresses
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// Whether the blacklist is empty
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

impl Default for Blacklist {
    fn default() -> Self {
        Self::new(default_blacklist())
    }
}

/// Placeholders produced by failed discovery and by deriving a gateway from them
pub fn default_blacklist() -> Vec<String> {
    vec!["0.0.0.0".to_string(), "0.0.0.1".to_string()]
}

/// Uniform result of probing one address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    /// Whether the address answered
    pub reachable: bool,
    /// Failure detail; `None` exactly when reachable
    pub detail: Option<String>,
}

impl ProbeOutcome {
    /// The address answered
    pub fn reachable() -> Self {
        Self {
            reachable: true,
            detail: None,
        }
    }

    /// The address did not answer; an empty detail is replaced by a generic one
    pub fn unreachable(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        let detail = if detail.trim().is_empty() {
            "unreachable host".to_string()
        } else {
            detail
        };
        Self {
            reachable: false,
            detail: Some(detail),
        }
    }
}

/// Why a message is being sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// An address just became unreachable
    NewAlert,
    /// An address is still unreachable and the repeat wait elapsed
    RepeatAlert,
    /// A previously unreachable address answered again
    Recovered,
    /// The WAN or gateway address differs from the cached one
    AddressChanged,
    /// No cached WAN address existed to compare against
    AddressUnknown,
    /// Operator-requested test message
    Test,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NewAlert => "new_alert",
            Self::RepeatAlert => "repeat_alert",
            Self::Recovered => "recovered",
            Self::AddressChanged => "address_changed",
            Self::AddressUnknown => "address_unknown",
            Self::Test => "test",
        };
        f.write_str(name)
    }
}

/// A human-directed notification about one address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The address the message is about
    pub address: String,
    /// Category, usable for filtering before dispatch
    pub kind: MessageKind,
    /// Human-readable text
    pub text: String,
}

impl Message {
    /// Create a message
    pub fn new(address: impl Into<String>, kind: MessageKind, text: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            kind,
            text: text.into(),
        }
    }
}
