// # ICMP Echo Prober
//
// This crate provides the ICMP echo prober for the nettest watchdog.
//
// ## Permissions
//
// Sockets are opened as unprivileged ICMP datagram sockets. On Linux this
// requires the process group to be inside `net.ipv4.ping_group_range`;
// otherwise run with CAP_NET_RAW. Sockets are opened on first use, so a
// missing permission surfaces as a per-address probe error rather than
// a startup failure.

use nettest_core::CollaboratorRegistry;
use nettest_core::config::ProbeConfig;
use nettest_core::traits::{EchoReply, Prober, ProberFactory};
use nettest_core::{Error, Result};

use std::net::IpAddr;
use std::time::Duration;

use surge_ping::{Client, Config, ICMP, PingIdentifier, PingSequence, SurgeError};
use tokio::sync::OnceCell;

/// Size of the echo payload (bytes)
const PAYLOAD_SIZE: usize = 56;

/// Pause between attempts to one address
const RETRY_PAUSE: Duration = Duration::from_millis(50);

/// ICMP echo prober
pub struct IcmpProber {
    /// How long to wait for each reply
    timeout: Duration,

    /// Echo requests per probe
    attempts: u32,

    /// IPv4 socket, opened on first use
    v4: OnceCell<Client>,

    /// IPv6 socket, opened on first use
    v6: OnceCell<Client>,
}

impl IcmpProber {
    /// Create a new ICMP prober
    ///
    /// # Parameters
    ///
    /// - `timeout`: How long to wait for each echo reply
    /// - `attempts`: Echo requests sent before giving up (at least one)
    pub fn new(timeout: Duration, attempts: u32) -> Self {
        Self {
            timeout,
            attempts: attempts.max(1),
            v4: OnceCell::new(),
            v6: OnceCell::new(),
        }
    }

    async fn client(&self, ip: IpAddr) -> Result<&Client> {
        let (cell, kind) = match ip {
            IpAddr::V4(_) => (&self.v4, ICMP::V4),
            IpAddr::V6(_) => (&self.v6, ICMP::V6),
        };
        cell.get_or_try_init(|| async move {
            let config = Config::builder().kind(kind).build();
            Client::new(&config)
                .map_err(|e| Error::probe(format!("Failed to open ICMP socket: {}", e)))
        })
        .await
    }
}

/// Resolve a target to an IP address, preferring IPv4
pub async fn resolve_target(address: &str) -> Result<IpAddr> {
    let address = address.trim();
    if let Ok(ip) = address.parse::<IpAddr>() {
        return Ok(ip);
    }

    let candidates: Vec<IpAddr> = tokio::net::lookup_host((address, 0))
        .await
        .map_err(|e| Error::invalid_address(format!("Cannot resolve {}: {}", address, e)))?
        .map(|socket| socket.ip())
        .collect();

    candidates
        .iter()
        .find(|ip| ip.is_ipv4())
        .or_else(|| candidates.first())
        .copied()
        .ok_or_else(|| Error::invalid_address(format!("No addresses found for {}", address)))
}

fn describe_failure(error: &SurgeError) -> String {
    match error {
        SurgeError::Timeout { .. } => "Request timed out".to_string(),
        other => other.to_string(),
    }
}

#[async_trait::async_trait]
impl Prober for IcmpProber {
    async fn echo(&self, address: &str) -> Result<EchoReply> {
        let ip = resolve_target(address).await?;
        let client = self.client(ip).await?;

        let payload = [0u8; PAYLOAD_SIZE];
        let mut pinger = client.pinger(ip, PingIdentifier(rand::random())).await;
        pinger.timeout(self.timeout);

        let mut last_failure = String::new();
        for attempt in 0..self.attempts {
            match pinger.ping(PingSequence(attempt as u16), &payload).await {
                Ok((_, rtt)) => {
                    tracing::debug!(address = %address, ip = %ip, rtt = ?rtt, "Echo reply");
                    return Ok(EchoReply::Answered { rtt: Some(rtt) });
                }
                Err(e) => {
                    tracing::debug!(address = %address, attempt, "Echo failed: {}", e);
                    last_failure = describe_failure(&e);
                    if attempt + 1 < self.attempts {
                        tokio::time::sleep(RETRY_PAUSE).await;
                    }
                }
            }
        }

        Ok(EchoReply::Failed {
            detail: format!("{} ({} echo requests lost)", last_failure, self.attempts),
        })
    }

    fn name(&self) -> &'static str {
        "icmp"
    }
}

/// Factory for creating ICMP probers
pub struct IcmpProberFactory;

impl ProberFactory for IcmpProberFactory {
    fn create(&self, config: &ProbeConfig) -> Result<Box<dyn Prober>> {
        match config {
            ProbeConfig::Icmp {
                timeout_ms,
                attempts,
            } => Ok(Box::new(IcmpProber::new(
                Duration::from_millis(*timeout_ms),
                *attempts,
            ))),
            _ => Err(Error::config("Invalid config for ICMP prober")),
        }
    }
}

/// Register the ICMP prober with a registry
pub fn register(registry: &CollaboratorRegistry) {
    registry.register_prober("icmp", Box::new(IcmpProberFactory));
}
