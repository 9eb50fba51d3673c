// # IP Discovery Trait
//
// Defines the interface for learning the host network's WAN address.
//
// ## Implementations
//
// - HTTP "what is my IP" services: `nettest-ip-http` crate
// - Fixed address (testing, hosts with a known uplink): `StaticDiscovery`
//
// ## Usage
//
// ```rust,ignore
// use nettest_core::IpDiscovery;
//
// #[tokio::main]
// async fn main() -> Result<(), Box<dyn std::error::Error>> {
//     let discovery = /* IpDiscovery implementation */;
//
//     let wan = discovery.current_wan_address().await?;
//     println!("WAN address: {wan}");
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::Ipv4Addr;

/// Trait for WAN address discovery
///
/// # Failure Semantics
///
/// Implementations report failures as `Err`. They must not retry or fall
/// back to a placeholder themselves: the `AddressResolver` maps any error
/// to the sentinel address, which the blacklist then forces to be
/// re-discovered on the next run.
///
/// # Rate Limits
///
/// Public discovery services throttle aggressive callers. Implementations
/// perform exactly one request per call; how often calls happen is owned by
/// the resolver's freshness window.
#[async_trait]
pub trait IpDiscovery: Send + Sync {
    /// Query the current WAN address
    ///
    /// # Returns
    ///
    /// - `Ok(Ipv4Addr)`: The externally visible address
    /// - `Err(Error)`: If the service could not be reached or answered garbage
    async fn current_wan_address(&self) -> Result<Ipv4Addr, crate::Error>;

    /// Name of the discovery mechanism (for logging)
    fn name(&self) -> &'static str;
}

/// Helper trait for constructing IP discovery from configuration
pub trait IpDiscoveryFactory: Send + Sync {
    /// Create an IpDiscovery instance from configuration
    fn create(
        &self,
        config: &crate::config::DiscoveryConfig,
    ) -> Result<Box<dyn IpDiscovery>, crate::Error>;
}

/// Discovery that always reports the same address
#[derive(Debug, Clone)]
pub struct StaticDiscovery {
    address: Ipv4Addr,
}

impl StaticDiscovery {
    /// Create a discovery that always answers `address`
    pub fn new(address: Ipv4Addr) -> Self {
        Self { address }
    }
}

#[async_trait]
impl IpDiscovery for StaticDiscovery {
    async fn current_wan_address(&self) -> Result<Ipv4Addr, crate::Error> {
        Ok(self.address)
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Factory for [`StaticDiscovery`]
pub struct StaticDiscoveryFactory;

impl IpDiscoveryFactory for StaticDiscoveryFactory {
    fn create(
        &self,
        config: &crate::config::DiscoveryConfig,
    ) -> Result<Box<dyn IpDiscovery>, crate::Error> {
        match config {
            crate::config::DiscoveryConfig::Static { address } => {
                let address: Ipv4Addr = address.trim().parse().map_err(|_| {
                    crate::Error::config(format!("Static discovery address is not IPv4: {address}"))
                })?;
                Ok(Box::new(StaticDiscovery::new(address)))
            }
            _ => Err(crate::Error::config("Invalid config for static discovery")),
        }
    }
}
