// # Prober Trait
//
// Defines the interface for a single reachability check of one address.
//
// ## Implementations
//
// - ICMP echo: `nettest-probe-icmp` crate

use async_trait::async_trait;
use std::time::Duration;

/// What the remote end did in response to one echo
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EchoReply {
    /// The address answered
    Answered {
        /// Round-trip time, if the mechanism measures one
        rtt: Option<Duration>,
    },
    /// The address did not answer; `detail` describes how it failed
    Failed {
        /// Human-readable failure description
        detail: String,
    },
}

/// Trait for prober implementations
///
/// `Err` is reserved for faults of the probing machinery itself (no raw
/// socket permission, unresolvable host name, ...). A host that simply
/// does not answer is `Ok(EchoReply::Failed { .. })`. `ProbeRunner`
/// turns both into a not-reachable outcome, so neither aborts a run.
///
/// Implementations check once and return; they do not decide whether an
/// address should be probed at all (blacklisting is owned by `ProbeRunner`).
#[async_trait]
pub trait Prober: Send + Sync {
    /// Send one echo to `address` and report the reply
    async fn echo(&self, address: &str) -> Result<EchoReply, crate::Error>;

    /// Name of the probing mechanism (for logging)
    fn name(&self) -> &'static str;
}

/// Helper trait for constructing probers from configuration
pub trait ProberFactory: Send + Sync {
    /// Create a Prober instance from configuration
    fn create(&self, config: &crate::config::ProbeConfig)
    -> Result<Box<dyn Prober>, crate::Error>;
}
