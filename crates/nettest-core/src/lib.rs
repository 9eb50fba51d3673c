// # nettest-core
//
// Core library for the nettest host-connectivity watchdog.
//
// ## Architecture Overview
//
// One invocation probes every monitored address once and decides, per
// address, whether a human must be told about it:
// - **IpDiscovery**: Trait for learning the host's current WAN address
// - **Prober**: Trait for a single ICMP-style reachability check
// - **Notifier**: Trait for delivering a message to the operator
// - **StatusStore / AddressCache**: Traits for the two persisted records
// - **AddressResolver**: Cached WAN/gateway lookup with a freshness window
// - **ProbeRunner**: Blacklist-aware, fault-isolating probe wrapper
// - **alert::transition**: Pure per-address alert state machine
// - **Watchdog**: Orchestrates one run end to end
// - **CollaboratorRegistry**: Plugin-based factories for the collaborators
//
// ## Design Principles
//
// 1. **Pure policy**: All alert decisions live in `alert`, free of I/O
// 2. **Fail soft**: Transient faults become domain outcomes, never aborted runs
// 3. **Plugin-Based**: Collaborators are registered, no hard-coded if-else
// 4. **Library-First**: The whole run can be embedded in a longer-lived service

pub mod alert;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod notify;
pub mod probe;
pub mod registry;
pub mod resolver;
pub mod state;
pub mod targets;
pub mod traits;

// Re-export core types for convenience
pub use alert::{AlertState, Transition, transition};
pub use config::{
    DiscoveryConfig, NotifierConfig, PolicyConfig, ProbeConfig, SmtpSecurity, StoreConfig,
    WatchdogConfig,
};
pub use engine::{Collaborators, RunSummary, Watchdog, WatchdogEvent};
pub use error::{Error, Result};
pub use model::{AddressStatus, Blacklist, DynamicAddressRecord, Message, ProbeOutcome, StatusSnapshot};
pub use notify::{DispatchOutcome, Dispatcher, LogNotifier};
pub use probe::ProbeRunner;
pub use registry::CollaboratorRegistry;
pub use resolver::{AddressResolver, ResolvedAddresses};
pub use state::{FileAddressCache, FileStatusStore, MemoryAddressCache, MemoryStatusStore};
pub use traits::{AddressCache, IpDiscovery, Notifier, Prober, StatusStore};
