// # State Store Implementations
//
// This module provides implementations of the StatusStore and AddressCache
// traits for different persistence strategies.

pub mod file;
pub mod memory;

pub use file::{FileAddressCache, FileStatusStore};
pub use memory::{MemoryAddressCache, MemoryStatusStore};

use crate::config::StoreConfig;
use crate::traits::{AddressCache, StatusStore};

/// Open both durable records described by `config`
pub async fn open_stores(
    config: &StoreConfig,
) -> crate::Result<(Box<dyn StatusStore>, Box<dyn AddressCache>)> {
    match config {
        StoreConfig::File {
            status_path,
            address_path,
        } => Ok((
            Box::new(FileStatusStore::new(status_path).await?),
            Box::new(FileAddressCache::new(address_path).await?),
        )),
        StoreConfig::Memory => Ok((
            Box::new(MemoryStatusStore::new()),
            Box::new(MemoryAddressCache::new()),
        )),
    }
}
