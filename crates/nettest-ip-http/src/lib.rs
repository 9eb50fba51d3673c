// # HTTP WAN Address Discovery
//
// This crate provides WAN address discovery over HTTP for the nettest
// watchdog.
//
// ## Purpose
//
// A host behind NAT cannot see its externally visible address locally.
// Plain-text "what is my IP" services (api.ipify.org, ifconfig.me/ip,
// icanhazip.com) answer with it in the response body.
//
// ## Rate Limits
//
// These services throttle frequent callers. One call here is exactly one
// request; the resolver's freshness window keeps calls to about one a day.

use nettest_core::CollaboratorRegistry;
use nettest_core::config::DiscoveryConfig;
use nettest_core::traits::{IpDiscovery, IpDiscoveryFactory};
use nettest_core::{Error, Result};

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// HTTP "what is my IP" discovery
pub struct HttpIpDiscovery {
    /// URL answering with the caller's address as plain text
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpDiscovery {
    /// Create a new HTTP discovery
    ///
    /// # Parameters
    ///
    /// - `url`: URL to fetch the address from (e.g., "https://api.ipify.org")
    /// - `timeout`: Whole-request timeout
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// The URL queried
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Parse a discovery response body into an IPv4 address
///
/// An IPv6 answer is rejected: the gateway is derived from IPv4 octets.
pub fn parse_wan_address(body: &str) -> Result<Ipv4Addr> {
    let text = body.trim();
    match text.parse::<IpAddr>() {
        Ok(IpAddr::V4(address)) => Ok(address),
        Ok(IpAddr::V6(address)) => Err(Error::invalid_address(format!(
            "Expected IPv4, got: {}",
            address
        ))),
        Err(_) => Err(Error::invalid_address(format!(
            "Invalid IP address: {}",
            text
        ))),
    }
}

#[async_trait::async_trait]
impl IpDiscovery for HttpIpDiscovery {
    async fn current_wan_address(&self) -> Result<Ipv4Addr> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::discovery(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::discovery(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::discovery(format!("Failed to read response: {}", e)))?;

        let address = parse_wan_address(&body)?;
        tracing::debug!(url = %self.url, address = %address, "Discovery service answered");
        Ok(address)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Factory for creating HTTP discovery
pub struct HttpDiscoveryFactory;

impl IpDiscoveryFactory for HttpDiscoveryFactory {
    fn create(&self, config: &DiscoveryConfig) -> Result<Box<dyn IpDiscovery>> {
        match config {
            DiscoveryConfig::Http { url, timeout_secs } => Ok(Box::new(HttpIpDiscovery::new(
                url.clone(),
                Duration::from_secs(*timeout_secs),
            )?)),
            _ => Err(Error::config("Invalid config for HTTP discovery")),
        }
    }
}

/// Register the HTTP discovery with a registry
pub fn register(registry: &CollaboratorRegistry) {
    registry.register_discovery("http", Box::new(HttpDiscoveryFactory));
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one HTTP response on a local port, returning its URL
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });

        format!("http://{}", addr)
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!(
            parse_wan_address(" 52.144.115.26\n").unwrap(),
            Ipv4Addr::new(52, 144, 115, 26)
        );
    }

    #[test]
    fn test_parse_rejects_ipv6_and_garbage() {
        assert!(parse_wan_address("2001:db8::1").is_err());
        assert!(parse_wan_address("<html>rate limited</html>").is_err());
        assert!(parse_wan_address("").is_err());
    }

    #[test]
    fn test_factory_creation() {
        let config = DiscoveryConfig::Http {
            url: "https://api.ipify.org".to_string(),
            timeout_secs: 10,
        };
        assert!(HttpDiscoveryFactory.create(&config).is_ok());

        let wrong = DiscoveryConfig::Static {
            address: "1.2.3.4".to_string(),
        };
        assert!(HttpDiscoveryFactory.create(&wrong).is_err());
    }

    #[test]
    fn test_register() {
        let registry = CollaboratorRegistry::new();
        register(&registry);
        assert!(registry.has_discovery("http"));
    }

    #[tokio::test]
    async fn test_discovers_address_from_body() {
        let url = serve_once("200 OK", "198.51.100.23\n").await;
        let discovery = HttpIpDiscovery::new(url, Duration::from_secs(5)).unwrap();

        assert_eq!(
            discovery.current_wan_address().await.unwrap(),
            Ipv4Addr::new(198, 51, 100, 23)
        );
    }

    #[tokio::test]
    async fn test_error_status_is_discovery_error() {
        let url = serve_once("429 Too Many Requests", "slow down").await;
        let discovery = HttpIpDiscovery::new(url, Duration::from_secs(5)).unwrap();

        let err = discovery.current_wan_address().await.unwrap_err();
        assert!(matches!(err, Error::Discovery(_)));
        assert!(err.to_string().contains("429"));
    }
}
