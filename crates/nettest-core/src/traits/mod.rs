//! Collaborator traits for the nettest watchdog
//!
//! This module defines the abstract interfaces the core depends on.
//!
//! - [`IpDiscovery`]: Learn the host's current WAN address
//! - [`Prober`]: Perform one reachability check
//! - [`Notifier`]: Deliver a message to the operator
//! - [`StatusStore`] / [`AddressCache`]: Persist the two durable records

pub mod ip_discovery;
pub mod notifier;
pub mod prober;
pub mod state_store;

pub use ip_discovery::{IpDiscovery, IpDiscoveryFactory};
pub use notifier::{Notifier, NotifierFactory};
pub use prober::{EchoReply, Prober, ProberFactory};
pub use state_store::{AddressCache, StatusStore};
