//! Test doubles and common utilities for watchdog contract tests
//!
//! Every double keeps its state behind an `Arc`, so a test can hand a
//! clone to the watchdog and keep another clone to script and inspect it.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use nettest_core::error::Result;
use nettest_core::model::StatusSnapshot;
use nettest_core::traits::{EchoReply, IpDiscovery, Notifier, Prober, StatusStore};
use nettest_core::{Collaborators, MemoryAddressCache, MemoryStatusStore, PolicyConfig};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A prober answering from a script; unscripted addresses answer
#[derive(Clone, Default)]
pub struct ScriptedProber {
    replies: Arc<Mutex<HashMap<String, EchoReply>>>,
    asked: Arc<Mutex<Vec<String>>>,
}

impl ScriptedProber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `address` stop answering with `detail`
    pub fn fail(&self, address: &str, detail: &str) {
        self.replies.lock().unwrap().insert(
            address.to_string(),
            EchoReply::Failed {
                detail: detail.to_string(),
            },
        );
    }

    /// Make `address` answer again
    pub fn answer(&self, address: &str) {
        self.replies.lock().unwrap().remove(address);
    }

    /// Every address echo() was called with, in call order
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Prober for ScriptedProber {
    async fn echo(&self, address: &str) -> Result<EchoReply> {
        self.asked.lock().unwrap().push(address.to_string());
        let reply = self.replies.lock().unwrap().get(address).cloned();
        Ok(reply.unwrap_or(EchoReply::Answered { rtt: None }))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// A discovery whose answer can change between runs; `None` fails
#[derive(Clone)]
pub struct ScriptedDiscovery {
    answer: Arc<Mutex<Option<Ipv4Addr>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedDiscovery {
    pub fn new(answer: Option<Ipv4Addr>) -> Self {
        Self {
            answer: Arc::new(Mutex::new(answer)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set(&self, answer: Option<Ipv4Addr>) {
        *self.answer.lock().unwrap() = answer;
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IpDiscovery for ScriptedDiscovery {
    async fn current_wan_address(&self) -> Result<Ipv4Addr> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let answer = *self.answer.lock().unwrap();
        answer.ok_or_else(|| nettest_core::Error::discovery("service unavailable"))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// One delivered notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// A notifier that records deliveries and can be told to fail
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    delivered: Arc<Mutex<Vec<Delivered>>>,
    attempts: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn delivered(&self) -> Vec<Delivered> {
        self.delivered.lock().unwrap().clone()
    }

    /// Bodies delivered so far, emptying the record
    pub fn take_bodies(&self) -> Vec<String> {
        self.delivered
            .lock()
            .unwrap()
            .drain(..)
            .map(|d| d.body)
            .collect()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(nettest_core::Error::notify("mail server unreachable"));
        }
        self.delivered.lock().unwrap().push(Delivered {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// A status store whose saves always fail
#[derive(Clone, Default)]
pub struct BrokenStatusStore {
    save_attempts: Arc<AtomicUsize>,
}

impl BrokenStatusStore {
    pub fn save_attempts(&self) -> usize {
        self.save_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl StatusStore for BrokenStatusStore {
    async fn load(&self) -> StatusSnapshot {
        StatusSnapshot::default()
    }

    async fn save(&self, _snapshot: &StatusSnapshot) -> Result<()> {
        self.save_attempts.fetch_add(1, Ordering::SeqCst);
        Err(nettest_core::Error::state_store("disk full"))
    }
}

/// The doubles behind one watchdog, kept for scripting and inspection
#[derive(Clone)]
pub struct Harness {
    pub prober: ScriptedProber,
    pub discovery: ScriptedDiscovery,
    pub notifier: RecordingNotifier,
    pub statuses: MemoryStatusStore,
    pub addresses: MemoryAddressCache,
}

impl Harness {
    pub fn new(wan: Option<Ipv4Addr>) -> Self {
        Self {
            prober: ScriptedProber::new(),
            discovery: ScriptedDiscovery::new(wan),
            notifier: RecordingNotifier::new(),
            statuses: MemoryStatusStore::new(),
            addresses: MemoryAddressCache::new(),
        }
    }

    /// Collaborators sharing state with this harness
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            discovery: Box::new(self.discovery.clone()),
            prober: Box::new(self.prober.clone()),
            notifier: Box::new(self.notifier.clone()),
            status_store: Box::new(self.statuses.clone()),
            address_cache: Box::new(self.addresses.clone()),
        }
    }
}

/// Policy with a recipient and the default waits
pub fn policy() -> PolicyConfig {
    PolicyConfig {
        recipient: "oncall@example.com".to_string(),
        ..PolicyConfig::default()
    }
}

/// The WAN address most tests run behind
pub fn wan() -> Ipv4Addr {
    Ipv4Addr::new(52, 144, 115, 26)
}

/// A fixed starting instant
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2022, 6, 6, 9, 0, 0).unwrap()
}

pub fn targets(addresses: &[&str]) -> Vec<String> {
    addresses.iter().map(|a| a.to_string()).collect()
}
