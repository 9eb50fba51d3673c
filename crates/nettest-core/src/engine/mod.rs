//! Watchdog orchestrator
//!
//! The Watchdog performs one complete connectivity check per invocation:
//! - Loading the previous StatusSnapshot
//! - Resolving the WAN/gateway addresses via AddressResolver
//! - Probing every address via ProbeRunner
//! - Deciding alerts via the pure alert state machine
//! - Persisting the new snapshot, then dispatching notifications
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────────┐   ┌─────────────┐
//! │ StatusStore │   │ AddressResolver │   │ ProbeRunner │
//! │ (load/save) │   │ (wan, gateway)  │   │ (outcomes)  │
//! └─────────────┘   └─────────────────┘   └─────────────┘
//!        │                   │                   │
//!        └───────────────────┼───────────────────┘
//!                            ▼
//!                     ┌────────────┐
//!                     │  Watchdog  │── transition() per address
//!                     └────────────┘
//!                            │
//!              ┌─────────────┴─────────────┐
//!              ▼                           ▼
//!       ┌────────────┐              ┌────────────┐
//!       │ Dispatcher │              │   Events   │
//!       │ (notify)   │              │ (monitor)  │
//!       └────────────┘              └────────────┘
//! ```
//!
//! ## Run Flow
//!
//! 1. Load the previous snapshot (missing or corrupt means empty)
//! 2. Resolve WAN and gateway; collect change notices
//! 3. Assemble static targets + WAN + gateway
//! 4. Probe all addresses, transition each against its previous status
//! 5. Save the new snapshot (replacing, not merging, the old one)
//! 6. Dispatch change notices and alert messages

use chrono::{DateTime, Utc};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::alert::{AlertState, transition};
use crate::config::PolicyConfig;
use crate::error::{Error, Result};
use crate::model::{Blacklist, Message, StatusSnapshot};
use crate::notify::{DispatchOutcome, Dispatcher};
use crate::probe::ProbeRunner;
use crate::resolver::{AddressResolver, ResolvedAddresses};
use crate::targets::merge_targets;
use crate::traits::{AddressCache, IpDiscovery, Notifier, Prober, StatusStore};

/// Events emitted by the Watchdog during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchdogEvent {
    /// Run started
    RunStarted {
        static_targets: usize,
    },

    /// WAN and gateway addresses are known for this run
    AddressesResolved {
        wan: Ipv4Addr,
        gateway: Ipv4Addr,
        refreshed: bool,
    },

    /// A WAN or gateway change notice was produced
    AddressChanged {
        address: String,
        text: String,
    },

    /// One address was probed
    ProbeCompleted {
        address: String,
        reachable: bool,
        detail: Option<String>,
    },

    /// One address was classified
    Transition {
        address: String,
        state: AlertState,
    },

    /// A notification was delivered
    NotificationSent {
        address: String,
    },

    /// A notification could not be delivered
    NotificationFailed {
        address: String,
        error: String,
    },

    /// The new snapshot was persisted
    SnapshotSaved {
        entries: usize,
    },

    /// Run finished
    RunCompleted {
        addresses: usize,
        in_alert: usize,
    },
}

/// What one run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Evaluation time stamped into every status
    pub checked_at: DateTime<Utc>,
    /// WAN address used this run
    pub wan: Ipv4Addr,
    /// Gateway address used this run
    pub gateway: Ipv4Addr,
    /// Classification per probed address, in probe order
    pub states: Vec<(String, AlertState)>,
    /// Notifications the notifier accepted
    pub sent: usize,
    /// Notifications the notifier rejected
    pub failed: usize,
    /// Notifications held back by the dispatcher filter
    pub filtered: usize,
    /// Continuing alerts still inside the repeat wait
    pub suppressed: usize,
}

impl RunSummary {
    /// Classification of one address
    pub fn state_of(&self, address: &str) -> Option<AlertState> {
        self.states
            .iter()
            .find(|(a, _)| a == address)
            .map(|(_, state)| *state)
    }

    /// Number of addresses in alert after this run
    pub fn in_alert(&self) -> usize {
        self.states.iter().filter(|(_, s)| s.is_alert()).count()
    }
}

/// The collaborators a Watchdog is assembled from
pub struct Collaborators {
    /// Where the WAN address is learned
    pub discovery: Box<dyn IpDiscovery>,
    /// How reachability is tested
    pub prober: Box<dyn Prober>,
    /// How the operator is told
    pub notifier: Box<dyn Notifier>,
    /// Where alert history lives
    pub status_store: Box<dyn StatusStore>,
    /// Where the dynamic address record lives
    pub address_cache: Box<dyn AddressCache>,
}

/// Connectivity watchdog
///
/// One call to [`Watchdog::run_once()`] is one complete check. Runs must
/// not overlap: the two persisted records assume a single writer.
pub struct Watchdog {
    /// Static addresses, in configured order
    targets: Vec<String>,

    /// Alert history
    status_store: Box<dyn StatusStore>,

    /// WAN/gateway resolution
    resolver: AddressResolver,

    /// Blacklist-aware prober
    probes: ProbeRunner,

    /// Message delivery
    dispatcher: Dispatcher,

    /// Minimum time between notifications for one ongoing alert
    repeat_wait: chrono::Duration,

    /// Whether the WAN address is probed
    probe_wan: bool,

    /// Whether the gateway address is probed
    probe_gateway: bool,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<WatchdogEvent>,
}

impl Watchdog {
    /// Create a new watchdog
    ///
    /// # Parameters
    ///
    /// - `collaborators`: Discovery, prober, notifier and the two stores
    /// - `targets`: Static addresses to monitor
    /// - `policy`: Alerting policy
    ///
    /// # Returns
    ///
    /// A tuple of (watchdog, event_receiver) where event_receiver yields run events
    pub fn new(
        collaborators: Collaborators,
        targets: Vec<String>,
        policy: PolicyConfig,
    ) -> Result<(Self, mpsc::Receiver<WatchdogEvent>)> {
        policy.validate()?;

        let (tx, rx) = mpsc::channel(policy.event_channel_capacity);
        let blacklist = Blacklist::new(policy.blacklist.iter().cloned());

        let resolver = AddressResolver::new(
            collaborators.discovery,
            collaborators.address_cache,
            policy.address_freshness(),
            blacklist.clone(),
        );
        let probes = ProbeRunner::new(
            Arc::from(collaborators.prober),
            blacklist,
            policy.max_concurrent_probes,
        );
        let dispatcher = Dispatcher::new(
            collaborators.notifier,
            policy.recipient.clone(),
            policy.subject.clone(),
        );

        let watchdog = Self {
            targets: merge_targets(&targets),
            status_store: collaborators.status_store,
            resolver,
            probes,
            dispatcher,
            repeat_wait: policy.repeat_wait(),
            probe_wan: policy.probe_wan,
            probe_gateway: policy.probe_gateway,
            event_tx: tx,
        };

        Ok((watchdog, rx))
    }

    /// Only dispatch messages accepted by `filter`
    pub fn with_filter(
        mut self,
        filter: impl Fn(&Message) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.dispatcher = self.dispatcher.with_filter(filter);
        self
    }

    /// The dispatcher used for every notification
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Run one check now
    pub async fn run_once(&self) -> Result<RunSummary> {
        self.run_once_at(Utc::now()).await
    }

    /// Run one check as of `now`
    ///
    /// # Returns
    ///
    /// - `Ok(summary)`: The snapshot was saved
    /// - `Err(Error)`: The snapshot could not be saved; notifications
    ///   were still dispatched
    pub async fn run_once_at(&self, now: DateTime<Utc>) -> Result<RunSummary> {
        self.emit_event(WatchdogEvent::RunStarted {
            static_targets: self.targets.len(),
        });

        let previous = self.status_store.load().await;
        debug!(entries = previous.len(), "Loaded previous status snapshot");

        let resolved = self.resolver.resolve_at(now).await;
        self.emit_event(WatchdogEvent::AddressesResolved {
            wan: resolved.wan,
            gateway: resolved.gateway,
            refreshed: resolved.refreshed,
        });
        for notice in &resolved.notices {
            self.emit_event(WatchdogEvent::AddressChanged {
                address: notice.address.clone(),
                text: notice.text.clone(),
            });
        }

        let addresses = self.assemble_addresses(&resolved);
        let outcomes = self.probes.probe_all(&addresses).await;

        let mut summary = RunSummary {
            checked_at: now,
            wan: resolved.wan,
            gateway: resolved.gateway,
            states: Vec::with_capacity(addresses.len()),
            sent: 0,
            failed: 0,
            filtered: 0,
            suppressed: 0,
        };
        let mut snapshot = StatusSnapshot::new(now);
        let mut pending = resolved.notices;

        for (address, outcome) in addresses.iter().zip(outcomes) {
            self.emit_event(WatchdogEvent::ProbeCompleted {
                address: address.clone(),
                reachable: outcome.reachable,
                detail: outcome.detail.clone(),
            });

            let result = transition(
                address,
                previous.get(address),
                &outcome,
                now,
                self.repeat_wait,
            );
            info!(address = %address, state = %result.state, "Address evaluated");
            self.emit_event(WatchdogEvent::Transition {
                address: address.clone(),
                state: result.state,
            });

            if result.state == (AlertState::ContinuingAlert { notified: false }) {
                summary.suppressed += 1;
            }
            if let Some(message) = result.message {
                pending.push(message);
            }
            summary.states.push((address.clone(), result.state));
            snapshot.statuses.insert(address.clone(), result.status);
        }

        let saved = self.status_store.save(&snapshot).await;
        match &saved {
            Ok(()) => {
                debug!(entries = snapshot.len(), "Status snapshot saved");
                self.emit_event(WatchdogEvent::SnapshotSaved {
                    entries: snapshot.len(),
                });
            }
            Err(e) => error!("Failed to save status snapshot: {}", e),
        }

        for message in &pending {
            match self.dispatcher.dispatch(message).await {
                DispatchOutcome::Sent => {
                    summary.sent += 1;
                    self.emit_event(WatchdogEvent::NotificationSent {
                        address: message.address.clone(),
                    });
                }
                DispatchOutcome::Failed(reason) => {
                    summary.failed += 1;
                    self.emit_event(WatchdogEvent::NotificationFailed {
                        address: message.address.clone(),
                        error: reason,
                    });
                }
                DispatchOutcome::Filtered => summary.filtered += 1,
            }
        }

        info!(
            addresses = summary.states.len(),
            in_alert = summary.in_alert(),
            sent = summary.sent,
            failed = summary.failed,
            suppressed = summary.suppressed,
            "Run completed"
        );
        self.emit_event(WatchdogEvent::RunCompleted {
            addresses: summary.states.len(),
            in_alert: summary.in_alert(),
        });

        saved.map_err(|e| Error::state_store(format!("Status snapshot not saved: {e}")))?;
        Ok(summary)
    }

    /// Static targets, then the dynamic addresses that are probed
    fn assemble_addresses(&self, resolved: &ResolvedAddresses) -> Vec<String> {
        let mut dynamic = Vec::with_capacity(2);
        if self.probe_wan {
            dynamic.push(resolved.wan.to_string());
        }
        if self.probe_gateway {
            dynamic.push(resolved.gateway.to_string());
        }
        merge_targets(self.targets.iter().chain(dynamic.iter()))
    }

    /// Emit a watchdog event
    ///
    /// # Parameters
    ///
    /// - `event`: The event to emit
    fn emit_event(&self, event: WatchdogEvent) {
        // A run never waits on its observers
        match self.event_tx.try_send(event) {
            Ok(()) | Err(mpsc::error::TrySendError::Closed(_)) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AddressStatus;
    use crate::notify::LogNotifier;
    use crate::state::{MemoryAddressCache, MemoryStatusStore};
    use crate::traits::EchoReply;
    use crate::traits::ip_discovery::StaticDiscovery;
    use chrono::TimeZone;

    struct DownProber;

    #[async_trait::async_trait]
    impl Prober for DownProber {
        async fn echo(&self, _address: &str) -> std::result::Result<EchoReply, Error> {
            Ok(EchoReply::Failed {
                detail: "timeout".into(),
            })
        }

        fn name(&self) -> &'static str {
            "down"
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 8, 1, 7, 0, 0).unwrap()
    }

    fn watchdog(
        store: MemoryStatusStore,
        policy: PolicyConfig,
    ) -> (Watchdog, mpsc::Receiver<WatchdogEvent>) {
        let collaborators = Collaborators {
            discovery: Box::new(StaticDiscovery::new(Ipv4Addr::new(52, 144, 115, 26))),
            prober: Box::new(DownProber),
            notifier: Box::new(LogNotifier::new()),
            status_store: Box::new(store),
            address_cache: Box::new(MemoryAddressCache::new()),
        };
        Watchdog::new(
            collaborators,
            vec!["192.168.1.20".into(), "192.168.1.20".into()],
            policy,
        )
        .unwrap()
    }

    #[test]
    fn test_invalid_policy_is_rejected() {
        let policy = PolicyConfig {
            max_concurrent_probes: 0,
            ..PolicyConfig::default()
        };
        let collaborators = Collaborators {
            discovery: Box::new(StaticDiscovery::new(Ipv4Addr::new(1, 2, 3, 4))),
            prober: Box::new(DownProber),
            notifier: Box::new(LogNotifier::new()),
            status_store: Box::new(MemoryStatusStore::new()),
            address_cache: Box::new(MemoryAddressCache::new()),
        };
        assert!(Watchdog::new(collaborators, Vec::new(), policy).is_err());
    }

    #[tokio::test]
    async fn test_address_list_includes_dynamic_addresses_once() {
        let store = MemoryStatusStore::new();
        let (watchdog, _rx) = watchdog(store.clone(), PolicyConfig::default());

        let summary = watchdog.run_once_at(t0()).await.unwrap();

        let addresses: Vec<&str> = summary.states.iter().map(|(a, _)| a.as_str()).collect();
        assert_eq!(addresses, vec!["192.168.1.20", "52.144.115.26", "52.144.115.1"]);
        assert_eq!(summary.in_alert(), 3);
        // Unknown previous WAN notice plus three new alerts
        assert_eq!(summary.sent, 4);
        assert_eq!(store.snapshot().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_disabled_dynamic_probes_are_resolved_but_not_probed() {
        let policy = PolicyConfig {
            probe_wan: false,
            probe_gateway: false,
            ..PolicyConfig::default()
        };
        let (watchdog, _rx) = watchdog(MemoryStatusStore::new(), policy);

        let summary = watchdog.run_once_at(t0()).await.unwrap();

        assert_eq!(summary.wan, Ipv4Addr::new(52, 144, 115, 26));
        assert_eq!(summary.states.len(), 1);
        assert_eq!(summary.sent, 2, "address notice still fires");
    }

    #[tokio::test]
    async fn test_snapshot_replaces_previous_entries() {
        let mut old = StatusSnapshot::new(t0());
        old.statuses.insert(
            "10.9.9.9".into(),
            AddressStatus {
                in_alert: false,
                alert_start: None,
                alert_description: None,
                last_notified: None,
                last_checked: t0(),
            },
        );
        let store = MemoryStatusStore::with_snapshot(old);
        let (watchdog, _rx) = watchdog(store.clone(), PolicyConfig::default());

        watchdog.run_once_at(t0()).await.unwrap();

        let saved = store.snapshot().await.unwrap();
        assert!(saved.get("10.9.9.9").is_none());
        assert_eq!(saved.updated_at, t0());
    }

    #[tokio::test]
    async fn test_events_describe_the_run() {
        let (watchdog, mut rx) = watchdog(MemoryStatusStore::new(), PolicyConfig::default());

        watchdog.run_once_at(t0()).await.unwrap();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(
            events.first(),
            Some(&WatchdogEvent::RunStarted { static_targets: 1 })
        );
        assert!(events.contains(&WatchdogEvent::SnapshotSaved { entries: 3 }));
        assert_eq!(
            events.last(),
            Some(&WatchdogEvent::RunCompleted {
                addresses: 3,
                in_alert: 3
            })
        );
    }

    #[tokio::test]
    async fn test_full_event_channel_does_not_block_run() {
        let policy = PolicyConfig {
            event_channel_capacity: 1,
            ..PolicyConfig::default()
        };
        let (watchdog, _rx) = watchdog(MemoryStatusStore::new(), policy);

        let summary = watchdog.run_once_at(t0()).await.unwrap();
        assert_eq!(summary.states.len(), 3);
    }
}
