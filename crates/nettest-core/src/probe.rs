//! Probe runner
//!
//! Wraps the `Prober` collaborator so that every address yields a uniform
//! [`ProbeOutcome`]:
//! - Blacklisted addresses are not-reachable without being probed
//! - Prober errors and panics become not-reachable with a description
//! - Distinct addresses are probed concurrently, bounded by a semaphore

use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::model::{Blacklist, ProbeOutcome};
use crate::traits::{EchoReply, Prober};

/// Detail reported for blacklisted addresses
pub const INVALID_ADDRESS_DETAIL: &str = "invalid address";

/// Blacklist-aware, fault-isolating probe wrapper
#[derive(Clone)]
pub struct ProbeRunner {
    prober: Arc<dyn Prober>,
    blacklist: Arc<Blacklist>,
    limiter: Arc<Semaphore>,
}

impl ProbeRunner {
    /// Create a runner
    ///
    /// # Parameters
    ///
    /// - `prober`: The underlying probe collaborator
    /// - `blacklist`: Addresses that are never probed
    /// - `max_concurrent`: Upper bound on probes in flight
    pub fn new(prober: Arc<dyn Prober>, blacklist: Blacklist, max_concurrent: usize) -> Self {
        Self {
            prober,
            blacklist: Arc::new(blacklist),
            limiter: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Probe one address
    pub async fn probe(&self, address: &str) -> ProbeOutcome {
        probe_one(self.prober.as_ref(), &self.blacklist, address).await
    }

    /// Probe every address, returning outcomes in the same order
    ///
    /// Each address runs in its own task, so a prober that panics only
    /// affects the address it was probing.
    pub async fn probe_all(&self, addresses: &[String]) -> Vec<ProbeOutcome> {
        let handles: Vec<_> = addresses
            .iter()
            .map(|address| {
                let prober = Arc::clone(&self.prober);
                let blacklist = Arc::clone(&self.blacklist);
                let limiter = Arc::clone(&self.limiter);
                let address = address.clone();
                tokio::spawn(async move {
                    let _permit = limiter.acquire_owned().await;
                    probe_one(prober.as_ref(), &blacklist, &address).await
                })
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (address, handle) in addresses.iter().zip(handles) {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(address = %address, "Probe task failed: {}", e);
                    let reason = if e.is_panic() { "panicked" } else { "was cancelled" };
                    ProbeOutcome::unreachable(format!("Exception: probe {reason}"))
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }
}

async fn probe_one(prober: &dyn Prober, blacklist: &Blacklist, address: &str) -> ProbeOutcome {
    if blacklist.contains(address) {
        debug!(address = %address, "Address is blacklisted, not probing");
        return ProbeOutcome::unreachable(INVALID_ADDRESS_DETAIL);
    }

    match prober.echo(address).await {
        Ok(EchoReply::Answered { rtt }) => {
            debug!(address = %address, rtt = ?rtt, "Echo answered");
            ProbeOutcome::reachable()
        }
        Ok(EchoReply::Failed { detail }) => {
            debug!(address = %address, detail = %detail, "Echo failed");
            ProbeOutcome::unreachable(detail)
        }
        Err(e) => {
            warn!(address = %address, prober = prober.name(), "Probe error: {}", e);
            ProbeOutcome::unreachable(format!("Exception: {e}"))
        }
    }
}
