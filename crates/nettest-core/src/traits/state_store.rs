// # State Store Traits
//
// Defines the interfaces for the two durable records of the watchdog.
//
// ## Purpose
//
// - `StatusStore` keeps the per-address alert history between runs. It is
//   the only memory of when an alert started and when the operator was
//   last told, so the repeat-wait policy depends on it.
// - `AddressCache` keeps the last discovered WAN/gateway pair, so the
//   discovery service is asked at most about once a day.
//
// ## Implementations
//
// - File-based: JSON documents with write-then-rename
// - In-memory: tests and embedded use

use async_trait::async_trait;

use crate::model::{DynamicAddressRecord, StatusSnapshot};

/// Persistence for the per-address status snapshot
///
/// # Missing or Corrupt State
///
/// `load()` never fails because of what is (or is not) on disk: a
/// missing or unparseable record yields an empty snapshot and an
/// informational log line. The snapshot is validated on load, so callers
/// only ever see statuses that satisfy the alert-field invariant.
///
/// # Single Writer
///
/// Stores assume exclusive access for the duration of a run; concurrent
/// invocations must be serialized by whoever schedules them.
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Load the snapshot written by the previous run
    async fn load(&self) -> StatusSnapshot;

    /// Replace the stored snapshot
    ///
    /// A crash during `save` must leave the previous snapshot recoverable.
    async fn save(&self, snapshot: &StatusSnapshot) -> Result<(), crate::Error>;
}

/// Persistence for the cached dynamic address record
#[async_trait]
pub trait AddressCache: Send + Sync {
    /// Load the cached record; `None` if missing or unparseable
    async fn load(&self) -> Option<DynamicAddressRecord>;

    /// Replace the cached record
    async fn save(&self, record: &DynamicAddressRecord) -> Result<(), crate::Error>;
}
