//! Dynamic address resolution
//!
//! Produces the host's WAN address and the gateway derived from it,
//! asking the discovery service only when the cached record is stale or
//! invalid. Discovery services throttle frequent callers, so a cached
//! record younger than the freshness window is reused as is.
//!
//! ## Flow
//!
//! 1. Load the cached record (missing or corrupt counts as absent)
//! 2. Fresh and not blacklisted → return it unchanged
//! 3. Otherwise discover, derive the gateway, persist a new record
//! 4. Compare with the old record and produce change notices

use chrono::{DateTime, Utc};
use std::net::Ipv4Addr;
use tracing::{debug, error, info, warn};

use crate::model::{Blacklist, DynamicAddressRecord, Message, MessageKind, SENTINEL_ADDRESS};
use crate::traits::{AddressCache, IpDiscovery};

/// Addresses produced by one resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAddresses {
    /// The WAN address (the sentinel if discovery failed)
    pub wan: Ipv4Addr,
    /// The gateway derived from `wan`
    pub gateway: Ipv4Addr,
    /// Whether discovery was queried this time
    pub refreshed: bool,
    /// Address change notices; these are never rate limited
    pub notices: Vec<Message>,
}

/// Cached WAN/gateway resolver
pub struct AddressResolver {
    discovery: Box<dyn IpDiscovery>,
    cache: Box<dyn AddressCache>,
    freshness: chrono::Duration,
    blacklist: Blacklist,
}

impl AddressResolver {
    /// Create a resolver
    ///
    /// # Parameters
    ///
    /// - `discovery`: Where to learn the WAN address
    /// - `cache`: Where the last discovered record is kept
    /// - `freshness`: Maximum age of a reusable record
    /// - `blacklist`: Addresses that invalidate a cached record
    pub fn new(
        discovery: Box<dyn IpDiscovery>,
        cache: Box<dyn AddressCache>,
        freshness: chrono::Duration,
        blacklist: Blacklist,
    ) -> Self {
        Self {
            discovery,
            cache,
            freshness,
            blacklist,
        }
    }

    /// Resolve the WAN and gateway addresses now
    pub async fn resolve(&self) -> ResolvedAddresses {
        self.resolve_at(Utc::now()).await
    }

    /// Resolve the WAN and gateway addresses as of `now`
    pub async fn resolve_at(&self, now: DateTime<Utc>) -> ResolvedAddresses {
        let cached = self.cache.load().await;

        if let Some(record) = &cached {
            if record.is_fresh(now, self.freshness, &self.blacklist) {
                debug!(
                    wan = %record.wan,
                    gateway = %record.gateway,
                    age_secs = record.age(now).num_seconds(),
                    "Reusing cached WAN address"
                );
                return ResolvedAddresses {
                    wan: record.wan,
                    gateway: record.gateway,
                    refreshed: false,
                    notices: Vec::new(),
                };
            }
            info!("The WAN address data is stale or invalid and will be refreshed.");
        }

        let wan = self.discover().await;
        let record = DynamicAddressRecord::new(wan, now);

        if let Err(e) = self.cache.save(&record).await {
            error!("Failed to persist WAN address record: {}", e);
        }

        let notices = change_notices(cached.as_ref(), &record);
        ResolvedAddresses {
            wan: record.wan,
            gateway: record.gateway,
            refreshed: true,
            notices,
        }
    }

    /// Ask discovery for the WAN address, falling back to the sentinel
    async fn discover(&self) -> Ipv4Addr {
        match self.discovery.current_wan_address().await {
            Ok(wan) => {
                info!(wan = %wan, source = self.discovery.name(), "Discovered WAN address");
                wan
            }
            Err(e) => {
                warn!(
                    source = self.discovery.name(),
                    "WAN address discovery failed, using {}: {}",
                    SENTINEL_ADDRESS,
                    e
                );
                SENTINEL_ADDRESS
            }
        }
    }
}

/// Notices describing how `new` differs from `old`
///
/// With no previous record there is nothing to compare against, so a
/// single notice reports the newly discovered WAN address instead.
pub fn change_notices(old: Option<&DynamicAddressRecord>, new: &DynamicAddressRecord) -> Vec<Message> {
    let Some(old) = old else {
        return vec![Message::new(
            new.wan.to_string(),
            MessageKind::AddressUnknown,
            format!(
                "The last known WAN address cannot be determined. The current WAN address is {}.",
                new.wan
            ),
        )];
    };

    let mut notices = Vec::new();
    if old.wan != new.wan {
        notices.push(Message::new(
            new.wan.to_string(),
            MessageKind::AddressChanged,
            format!(
                "The WAN address has changed since the last check (was {}).",
                old.wan
            ),
        ));
    }
    if old.gateway != new.gateway {
        notices.push(Message::new(
            new.gateway.to_string(),
            MessageKind::AddressChanged,
            format!(
                "The gateway address has changed since the last check (was {}).",
                old.gateway
            ),
        ));
    }
    notices
}
