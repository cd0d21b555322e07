// ── Bridge façade ──
//
// Owns the device registry, the report snapshot, and the background poll
// and discovery tasks. Polls fan out across devices concurrently; within a
// device, `DeviceHandle` serializes. A failing device only ever produces
// its own offline/degraded report.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use futures_util::future::join_all;
use shelly_api::{DiscoveredDevice, DiscoveryConfig, TransportConfig};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::{CommandParams, NodeCommand};
use crate::config::{BridgeConfig, DeviceConfig};
use crate::device::DeviceHandle;
use crate::error::CoreError;
use crate::naming;
use crate::report::{DeviceReport, Reporter};

/// Shortest wait between discovery scans, for retries and for the
/// regular interval alike.
const DISCOVERY_MIN_INTERVAL: Duration = Duration::from_secs(5);

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<BridgeInner>`. Does nothing in the
/// background until [`start()`](Self::start) is called.
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

struct BridgeInner {
    config: BridgeConfig,
    transport: TransportConfig,
    devices: DashMap<String, Arc<DeviceHandle>>,
    reports: DashMap<String, DeviceReport>,
    reporter: Arc<dyn Reporter>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
    started: AtomicBool,
}

impl Bridge {
    /// Build a bridge and register every configured device.
    pub fn new(config: BridgeConfig, reporter: Arc<dyn Reporter>) -> Result<Self, CoreError> {
        let transport = TransportConfig::default().with_timeout(config.request_timeout);
        let devices = config.devices.clone();

        let bridge = Self {
            inner: Arc::new(BridgeInner {
                config,
                transport,
                devices: DashMap::new(),
                reports: DashMap::new(),
                reporter,
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
                started: AtomicBool::new(false),
            }),
        };

        for device in devices {
            bridge.add_device(device)?;
        }
        Ok(bridge)
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    // ── Registry ─────────────────────────────────────────────────

    /// Register a device. Returns `false` when a device with the same id
    /// and host is already present; a changed host replaces the entry.
    pub fn add_device(&self, config: DeviceConfig) -> Result<bool, CoreError> {
        if let Some(existing) = self.inner.devices.get(&config.id) {
            if existing.host() == config.host && existing.kind() == config.kind {
                return Ok(false);
            }
            info!(device = %config.id, old = existing.host(), new = %config.host, "device address changed");
        }

        let handle = DeviceHandle::new(config, &self.inner.transport)?;
        debug!(device = handle.id(), host = handle.host(), kind = %handle.kind(), "registered device");
        self.inner
            .devices
            .insert(handle.id().to_owned(), Arc::new(handle));
        Ok(true)
    }

    pub fn remove_device(&self, id: &str) -> bool {
        self.inner.reports.remove(id);
        self.inner.devices.remove(id).is_some()
    }

    pub fn device(&self, id: &str) -> Option<Arc<DeviceHandle>> {
        self.inner.devices.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Look a device up by id, or by name ignoring case.
    pub fn find(&self, key: &str) -> Option<Arc<DeviceHandle>> {
        self.device(key).or_else(|| {
            self.inner
                .devices
                .iter()
                .find(|entry| entry.value().name().eq_ignore_ascii_case(key))
                .map(|entry| Arc::clone(entry.value()))
        })
    }

    pub fn device_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.devices.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn device_count(&self) -> usize {
        self.inner.devices.len()
    }

    fn require(&self, id: &str) -> Result<Arc<DeviceHandle>, CoreError> {
        self.find(id).ok_or_else(|| CoreError::DeviceNotFound {
            identifier: id.to_owned(),
        })
    }

    // ── Polling ──────────────────────────────────────────────────

    pub async fn poll_device(&self, id: &str) -> Result<DeviceReport, CoreError> {
        let handle = self.require(id)?;
        let report = handle.poll().await;
        self.publish(&handle, &report);
        Ok(report)
    }

    /// Poll every registered device concurrently. A round takes about as
    /// long as its slowest device.
    pub async fn poll_all(&self) -> Vec<DeviceReport> {
        let handles: Vec<Arc<DeviceHandle>> = self
            .inner
            .devices
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let polls = handles.iter().map(|handle| async move {
            let report = handle.poll().await;
            self.publish(handle, &report);
            report
        });
        let mut reports = join_all(polls).await;
        reports.sort_by(|a, b| a.device_id.cmp(&b.device_id));

        debug!(
            devices = reports.len(),
            online = reports.iter().filter(|r| r.is_online()).count(),
            "poll round complete"
        );
        reports
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Run a parsed command, then re-poll and publish the fresh report.
    pub async fn execute(&self, id: &str, command: &NodeCommand) -> Result<DeviceReport, CoreError> {
        let handle = self.require(id)?;
        let report = handle.execute(command).await?;
        self.publish(&handle, &report);
        Ok(report)
    }

    /// Entry point for host commands: name plus raw query map.
    pub async fn handle_host_command(
        &self,
        id: &str,
        name: &str,
        query: &HashMap<String, String>,
    ) -> Result<DeviceReport, CoreError> {
        let command = NodeCommand::parse(
            name,
            &CommandParams::from_query(query.iter().map(|(k, v)| (k, v.clone()))),
        )?;
        self.execute(id, &command).await
    }

    // ── Snapshot ─────────────────────────────────────────────────

    pub fn report(&self, id: &str) -> Option<DeviceReport> {
        self.inner.reports.get(id).map(|entry| entry.value().clone())
    }

    /// Latest report per device, sorted by id.
    pub fn snapshot(&self) -> Vec<DeviceReport> {
        let mut reports: Vec<DeviceReport> = self
            .inner
            .reports
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        reports.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        reports
    }

    /// Record and forward a report, unless `handle` has since been removed
    /// or replaced by a re-addressed registration.
    fn publish(&self, handle: &Arc<DeviceHandle>, report: &DeviceReport) {
        let current = self
            .inner
            .devices
            .get(&report.device_id)
            .is_some_and(|entry| Arc::ptr_eq(entry.value(), handle));
        if !current {
            debug!(device = %report.device_id, host = handle.host(), "dropping report from stale handle");
            return;
        }
        self.inner
            .reports
            .insert(report.device_id.clone(), report.clone());
        self.inner.reporter.report(report);
    }

    // ── Discovery ────────────────────────────────────────────────

    /// Run one mDNS scan and register every recognized device.
    /// Returns how many devices were added or re-addressed.
    pub async fn discover_once(&self, config: &DiscoveryConfig) -> Result<usize, CoreError> {
        let found = shelly_api::discover(config).await?;
        self.register_discovered(found.values(), &config.service_type)
    }

    /// Normalize discovered names and register the recognized ones.
    pub fn register_discovered<'a>(
        &self,
        found: impl IntoIterator<Item = &'a DiscoveredDevice>,
        service_type: &str,
    ) -> Result<usize, CoreError> {
        let mut added = 0;
        for device in found {
            let Some(identity) = naming::normalize(&device.name, service_type) else {
                continue;
            };
            let config = DeviceConfig::new(
                identity.id.clone(),
                identity.id,
                device.address.to_string(),
                identity.kind,
            );
            if self.add_device(config)? {
                added += 1;
            }
        }
        Ok(added)
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Poll once, then spawn the background poll loop and, if configured,
    /// the discovery loop. Later calls, and calls after shutdown, do nothing.
    pub async fn start(&self) {
        let mut handles = self.inner.task_handles.lock().await;
        if self.is_shut_down() {
            warn!("bridge already shut down, not starting");
            return;
        }
        if self.inner.started.swap(true, Ordering::SeqCst) {
            debug!("bridge already started");
            return;
        }

        self.poll_all().await;

        let interval = self.inner.config.poll_interval;
        if !interval.is_zero() {
            let bridge = self.clone();
            let cancel = self.inner.cancel.clone();
            handles.push(tokio::spawn(poll_task(bridge, interval, cancel)));
        }

        if let Some(discovery) = self.inner.config.discovery.clone() {
            let bridge = self.clone();
            let cancel = self.inner.cancel.clone();
            let every = self.inner.config.discovery_interval;
            handles.push(tokio::spawn(discovery_task(bridge, discovery, every, cancel)));
        }

        info!(devices = self.device_count(), "bridge started");
    }

    /// Cancel background tasks and wait for them to finish.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "background task ended abnormally");
            }
        }
        debug!("bridge stopped");
    }

    pub fn is_running(&self) -> bool {
        self.inner.started.load(Ordering::SeqCst) && !self.is_shut_down()
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }
}

// ── Background tasks ─────────────────────────────────────────────

async fn poll_task(bridge: Bridge, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await; // start() already polled once

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                bridge.poll_all().await;
            }
        }
    }
}

/// Delay between discovery scans. Failed scans back off exponentially,
/// capped at the regular interval. Neither delay drops below
/// `DISCOVERY_MIN_INTERVAL`, so a zero interval cannot spin.
#[derive(Debug)]
struct DiscoverySchedule {
    every: Duration,
    backoff: Duration,
}

impl DiscoverySchedule {
    fn new(every: Duration) -> Self {
        Self {
            every: every.max(DISCOVERY_MIN_INTERVAL),
            backoff: DISCOVERY_MIN_INTERVAL,
        }
    }

    fn after_success(&mut self) -> Duration {
        self.backoff = DISCOVERY_MIN_INTERVAL;
        self.every
    }

    fn after_failure(&mut self) -> Duration {
        let delay = self.backoff;
        self.backoff = (self.backoff * 2).min(self.every);
        delay
    }
}

/// Re-scan periodically until cancelled.
async fn discovery_task(
    bridge: Bridge,
    config: DiscoveryConfig,
    every: Duration,
    cancel: CancellationToken,
) {
    let mut schedule = DiscoverySchedule::new(every);
    let mut delay = Duration::ZERO;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }

        let scan = bridge.discover_once(&config);
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            outcome = scan => outcome,
        };

        match outcome {
            Ok(added) => {
                if added > 0 {
                    info!(added, "discovery registered devices");
                }
                delay = schedule.after_success();
            }
            Err(e) => {
                delay = schedule.after_failure();
                warn!(error = %e, retry_in = ?delay, "discovery scan failed");
            }
        }
    }
}
