// mDNS device discovery
//
// Browses a DNS-SD service type and collects instances whose names start
// with a known device prefix. mDNS answers trickle in, so the scan runs a
// bounded number of short cycles instead of one long blocking wait. The
// browse session is released when the session value is dropped, which
// covers normal return, errors, and a cancelled scan future alike.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use serde::Serialize;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::Error;

pub const DEFAULT_SERVICE_TYPE: &str = "_http._tcp.local.";
pub const DEFAULT_CYCLES: u32 = 10;
pub const DEFAULT_WAIT: Duration = Duration::from_millis(500);
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Instance-name prefixes advertised by supported devices.
pub const DEFAULT_PREFIXES: [&str; 2] = ["shellyrgbw2-", "shelly1-"];

// ── Configuration ────────────────────────────────────────────────────

/// Tuning for one discovery scan. Total wall-clock time is roughly
/// `cycles * (resolve_timeout + wait)` in the worst case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    pub service_type: String,
    pub name_prefixes: Vec<String>,
    pub cycles: u32,
    pub wait: Duration,
    pub resolve_timeout: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            service_type: DEFAULT_SERVICE_TYPE.into(),
            name_prefixes: DEFAULT_PREFIXES.iter().map(|p| (*p).to_owned()).collect(),
            cycles: DEFAULT_CYCLES,
            wait: DEFAULT_WAIT,
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
        }
    }
}

impl DiscoveryConfig {
    /// Whether an advertised full name belongs to this scan.
    pub fn matches(&self, name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        lower.ends_with(&self.service_type.to_ascii_lowercase())
            && self
                .name_prefixes
                .iter()
                .any(|prefix| lower.starts_with(&prefix.to_ascii_lowercase()))
    }
}

/// A device found during one scan. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredDevice {
    /// Full advertised service name, e.g. `shelly1-A4CF12._http._tcp.local.`
    pub name: String,
    pub address: SocketAddr,
    pub discovered_at: DateTime<Utc>,
}

// ── Session abstraction ──────────────────────────────────────────────

/// An open browse session for one service type.
pub trait BrowseSession {
    /// Every instance name the session currently knows about.
    fn cached_names(&self) -> Vec<String>;

    /// Wait up to `timeout` for `name` to resolve to an address.
    fn resolve(
        &self,
        name: &str,
        timeout: Duration,
    ) -> impl Future<Output = Option<SocketAddr>> + Send;
}

/// Run `config.cycles` scan cycles over an already-open session.
///
/// Each cycle lists matching names, resolves the new ones concurrently, and
/// then sleeps `config.wait` unless it was the last cycle. Names that only
/// appear after the final cycle are not part of the result.
pub async fn scan<S>(session: &S, config: &DiscoveryConfig) -> HashMap<String, DiscoveredDevice>
where
    S: BrowseSession + Sync,
{
    let mut devices: HashMap<String, DiscoveredDevice> = HashMap::new();

    for cycle in 0..config.cycles {
        let candidates: Vec<String> = session
            .cached_names()
            .into_iter()
            .filter(|name| config.matches(name) && !devices.contains_key(name))
            .collect();

        let lookups = candidates.iter().map(|name| async move {
            (name, session.resolve(name, config.resolve_timeout).await)
        });

        for (name, address) in join_all(lookups).await {
            match address {
                Some(address) => {
                    debug!(name, %address, cycle, "resolved device");
                    devices.insert(
                        name.clone(),
                        DiscoveredDevice {
                            name: name.clone(),
                            address,
                            discovered_at: Utc::now(),
                        },
                    );
                }
                None => debug!(name, cycle, "no address within resolve timeout"),
            }
        }

        let last = cycle + 1 == config.cycles;
        if !last && !config.wait.is_zero() {
            tokio::time::sleep(config.wait).await;
        }
    }

    devices
}

/// Open an mDNS session, scan, and close it again.
///
/// Only a failure to open the session is an error; finding nothing is a
/// valid, empty result. Must be called from within a tokio runtime.
pub async fn discover(config: &DiscoveryConfig) -> Result<HashMap<String, DiscoveredDevice>, Error> {
    info!(
        service_type = %config.service_type,
        cycles = config.cycles,
        "starting mDNS discovery"
    );

    let session = MdnsSession::open(&config.service_type)?;
    let devices = scan(&session, config).await;
    session.close();

    info!(found = devices.len(), "mDNS discovery finished");
    Ok(devices)
}

// ── mdns-sd backed session ───────────────────────────────────────────

#[derive(Default)]
struct MdnsCache {
    names: BTreeSet<String>,
    addresses: HashMap<String, SocketAddr>,
}

/// Browse session backed by an `mdns_sd::ServiceDaemon`.
///
/// A background task drains browse events into a local cache. Dropping the
/// session stops the browse, shuts the daemon down, and aborts the task.
pub struct MdnsSession {
    daemon: ServiceDaemon,
    service_type: String,
    cache: Arc<Mutex<MdnsCache>>,
    resolved: Arc<Notify>,
    pump: JoinHandle<()>,
}

impl MdnsSession {
    pub fn open(service_type: &str) -> Result<Self, Error> {
        let daemon = ServiceDaemon::new()?;
        let receiver = match daemon.browse(service_type) {
            Ok(receiver) => receiver,
            Err(e) => {
                shutdown_daemon(&daemon);
                return Err(e.into());
            }
        };

        let cache = Arc::new(Mutex::new(MdnsCache::default()));
        let resolved = Arc::new(Notify::new());

        let pump = {
            let cache = Arc::clone(&cache);
            let resolved = Arc::clone(&resolved);
            tokio::spawn(async move {
                while let Ok(event) = receiver.recv_async().await {
                    match event {
                        ServiceEvent::ServiceFound(_, fullname) => {
                            lock(&cache).names.insert(fullname);
                        }
                        ServiceEvent::ServiceResolved(info) => {
                            if let Some(address) = pick_address(&info) {
                                let mut guard = lock(&cache);
                                let name = info.get_fullname().to_owned();
                                guard.names.insert(name.clone());
                                guard.addresses.insert(name, address);
                                drop(guard);
                                resolved.notify_waiters();
                            }
                        }
                        ServiceEvent::ServiceRemoved(_, fullname) => {
                            let mut guard = lock(&cache);
                            guard.names.remove(&fullname);
                            guard.addresses.remove(&fullname);
                        }
                        ServiceEvent::SearchStopped(_) => break,
                        _ => {}
                    }
                }
            })
        };

        Ok(Self {
            daemon,
            service_type: service_type.to_owned(),
            cache,
            resolved,
            pump,
        })
    }

    /// Release the session. Equivalent to dropping it.
    pub fn close(self) {
        drop(self);
    }

    fn lookup(&self, name: &str) -> Option<SocketAddr> {
        lock(&self.cache).addresses.get(name).copied()
    }
}

impl BrowseSession for MdnsSession {
    fn cached_names(&self) -> Vec<String> {
        lock(&self.cache).names.iter().cloned().collect()
    }

    async fn resolve(&self, name: &str, timeout: Duration) -> Option<SocketAddr> {
        let wait = async {
            loop {
                let notified = self.resolved.notified();
                if let Some(address) = self.lookup(name) {
                    return address;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, wait).await.ok()
    }
}

impl Drop for MdnsSession {
    fn drop(&mut self) {
        if let Err(e) = self.daemon.stop_browse(&self.service_type) {
            debug!(error = %e, "stop_browse failed");
        }
        shutdown_daemon(&self.daemon);
        self.pump.abort();
    }
}

fn shutdown_daemon(daemon: &ServiceDaemon) {
    if let Err(e) = daemon.shutdown() {
        warn!(error = %e, "mDNS daemon shutdown failed");
    }
}

fn lock(cache: &Mutex<MdnsCache>) -> std::sync::MutexGuard<'_, MdnsCache> {
    cache.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Prefer IPv4; fall back to the lowest IPv6 address.
fn pick_address(info: &ServiceInfo) -> Option<SocketAddr> {
    let mut addresses: Vec<IpAddr> = info.get_addresses().iter().copied().collect();
    addresses.sort_by_key(|ip| (ip.is_ipv6(), *ip));
    addresses
        .first()
        .map(|ip| SocketAddr::new(*ip, info.get_port()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_prefix_and_service_type() {
        let config = DiscoveryConfig::default();
        assert!(config.matches("shellyrgbw2-A1B2C3._http._tcp.local."));
        assert!(config.matches("ShellY1-A1B2C3._http._tcp.local."));
        assert!(!config.matches("printer-1._http._tcp.local."));
        assert!(!config.matches("shelly1-A1B2C3._ipp._tcp.local."));
    }
}
