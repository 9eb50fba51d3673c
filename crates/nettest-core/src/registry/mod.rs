//! Plugin-based collaborator registry
//!
//! The registry allows IP discovery mechanisms, probers and notifiers to be
//! registered dynamically at runtime, avoiding hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use nettest_core::registry::CollaboratorRegistry;
//! use nettest_core::config::NotifierConfig;
//!
//! // Create a registry with the built-in collaborators
//! let registry = CollaboratorRegistry::with_builtins();
//!
//! // Register plugins
//! nettest_notify_webhook::register(&registry);
//!
//! // Create a notifier from config
//! let notifier = registry.create_notifier(&NotifierConfig::Log)?;
//! ```
//!
//! ## Registration
//!
//! Plugin crates expose a `register` function:
//!
//! ```rust,ignore
//! // In the nettest-probe-icmp crate
//! pub fn register(registry: &CollaboratorRegistry) {
//!     registry.register_prober("icmp", Box::new(IcmpProberFactory));
//! }
//! ```

use crate::config::{DiscoveryConfig, NotifierConfig, ProbeConfig};
use crate::error::{Error, Result};
use crate::notify::LogNotifierFactory;
use crate::traits::ip_discovery::StaticDiscoveryFactory;
use crate::traits::{IpDiscovery, Notifier, Prober};
use crate::traits::{IpDiscoveryFactory, NotifierFactory, ProberFactory};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Collaborator registry for plugin-based construction
///
/// Maps type names (the `type_name()` of each config enum) to factories.
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes. A poisoned lock still yields its map: a
/// factory insert cannot leave it half-written.
#[derive(Default)]
pub struct CollaboratorRegistry {
    /// Registered IP discovery factories
    discoveries: RwLock<HashMap<String, Box<dyn IpDiscoveryFactory>>>,

    /// Registered prober factories
    probers: RwLock<HashMap<String, Box<dyn ProberFactory>>>,

    /// Registered notifier factories
    notifiers: RwLock<HashMap<String, Box<dyn NotifierFactory>>>,
}

impl CollaboratorRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the collaborators built into this crate
    ///
    /// - `static` discovery
    /// - `log` notifier
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register_discovery("static", Box::new(StaticDiscoveryFactory));
        registry.register_notifier("log", Box::new(LogNotifierFactory));
        registry
    }

    /// Register an IP discovery factory
    ///
    /// # Parameters
    ///
    /// - `name`: Discovery type name (e.g., "http", "static")
    /// - `factory`: Factory object for creating discovery instances
    pub fn register_discovery(&self, name: impl Into<String>, factory: Box<dyn IpDiscoveryFactory>) {
        let mut discoveries = self.discoveries.write().unwrap_or_else(PoisonError::into_inner);
        discoveries.insert(name.into(), factory);
    }

    /// Register a prober factory
    ///
    /// # Parameters
    ///
    /// - `name`: Prober type name (e.g., "icmp")
    /// - `factory`: Factory object for creating prober instances
    pub fn register_prober(&self, name: impl Into<String>, factory: Box<dyn ProberFactory>) {
        let mut probers = self.probers.write().unwrap_or_else(PoisonError::into_inner);
        probers.insert(name.into(), factory);
    }

    /// Register a notifier factory
    ///
    /// # Parameters
    ///
    /// - `name`: Notifier type name (e.g., "webhook", "log")
    /// - `factory`: Factory object for creating notifier instances
    pub fn register_notifier(&self, name: impl Into<String>, factory: Box<dyn NotifierFactory>) {
        let mut notifiers = self.notifiers.write().unwrap_or_else(PoisonError::into_inner);
        notifiers.insert(name.into(), factory);
    }

    /// Create IP discovery from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn IpDiscovery>)`: Created discovery instance
    /// - `Err(Error)`: If the type is not registered or creation fails
    pub fn create_discovery(&self, config: &DiscoveryConfig) -> Result<Box<dyn IpDiscovery>> {
        let discovery_type = config.type_name();
        let discoveries = self.discoveries.read().unwrap_or_else(PoisonError::into_inner);

        let factory = discoveries.get(discovery_type).ok_or_else(|| {
            Error::config(format!("Unknown discovery type: {}", discovery_type))
        })?;

        factory.create(config)
    }

    /// Create a prober from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn Prober>)`: Created prober instance
    /// - `Err(Error)`: If the type is not registered or creation fails
    pub fn create_prober(&self, config: &ProbeConfig) -> Result<Box<dyn Prober>> {
        let prober_type = config.type_name();
        let probers = self.probers.read().unwrap_or_else(PoisonError::into_inner);

        let factory = probers
            .get(prober_type)
            .ok_or_else(|| Error::config(format!("Unknown prober type: {}", prober_type)))?;

        factory.create(config)
    }

    /// Create a notifier from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn Notifier>)`: Created notifier instance
    /// - `Err(Error)`: If the type is not registered or creation fails
    pub fn create_notifier(&self, config: &NotifierConfig) -> Result<Box<dyn Notifier>> {
        let notifier_type = config.type_name();
        let notifiers = self.notifiers.read().unwrap_or_else(PoisonError::into_inner);

        let factory = notifiers
            .get(notifier_type)
            .ok_or_else(|| Error::config(format!("Unknown notifier type: {}", notifier_type)))?;

        factory.create(config)
    }

    /// List all registered discovery types
    pub fn list_discoveries(&self) -> Vec<String> {
        let discoveries = self.discoveries.read().unwrap_or_else(PoisonError::into_inner);
        discoveries.keys().cloned().collect()
    }

    /// List all registered prober types
    pub fn list_probers(&self) -> Vec<String> {
        let probers = self.probers.read().unwrap_or_else(PoisonError::into_inner);
        probers.keys().cloned().collect()
    }

    /// List all registered notifier types
    pub fn list_notifiers(&self) -> Vec<String> {
        let notifiers = self.notifiers.read().unwrap_or_else(PoisonError::into_inner);
        notifiers.keys().cloned().collect()
    }

    /// Check if a discovery type is registered
    pub fn has_discovery(&self, name: &str) -> bool {
        let discoveries = self.discoveries.read().unwrap_or_else(PoisonError::into_inner);
        discoveries.contains_key(name)
    }

    /// Check if a prober type is registered
    pub fn has_prober(&self, name: &str) -> bool {
        let probers = self.probers.read().unwrap_or_else(PoisonError::into_inner);
        probers.contains_key(name)
    }

    /// Check if a notifier type is registered
    pub fn has_notifier(&self, name: &str) -> bool {
        let notifiers = self.notifiers.read().unwrap_or_else(PoisonError::into_inner);
        notifiers.contains_key(name)
    }
}
