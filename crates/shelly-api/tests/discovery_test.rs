#![allow(clippy::unwrap_used)]
// Scan-cycle tests for discovery against a scripted browse session.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use shelly_api::{BrowseSession, DiscoveryConfig, scan};

// ── Helpers ─────────────────────────────────────────────────────────

/// Each record becomes visible at a given scan index.
struct ScriptedSession {
    scans: AtomicU32,
    records: Vec<(u32, String, Option<SocketAddr>)>,
}

impl ScriptedSession {
    fn new(records: &[(u32, &str, Option<&str>)]) -> Self {
        Self {
            scans: AtomicU32::new(0),
            records: records
                .iter()
                .map(|(at, name, addr)| (*at, (*name).to_string(), addr.map(|a| a.parse().unwrap())))
                .collect(),
        }
    }

    fn scans(&self) -> u32 {
        self.scans.load(Ordering::SeqCst)
    }
}

impl BrowseSession for ScriptedSession {
    fn cached_names(&self) -> Vec<String> {
        let scan = self.scans.fetch_add(1, Ordering::SeqCst);
        self.records
            .iter()
            .filter(|(at, _, _)| *at <= scan)
            .map(|(_, name, _)| name.clone())
            .collect()
    }

    async fn resolve(&self, name: &str, _timeout: Duration) -> Option<SocketAddr> {
        self.records
            .iter()
            .find(|(_, n, _)| n == name)
            .and_then(|(_, _, addr)| *addr)
    }
}

fn quick(cycles: u32) -> DiscoveryConfig {
    DiscoveryConfig {
        cycles,
        wait: Duration::ZERO,
        ..DiscoveryConfig::default()
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_three_cycles_scan_exactly_three_times() {
    let session = ScriptedSession::new(&[
        (0, "shelly1-AAAAAA._http._tcp.local.", Some("192.168.3.10:80")),
        (2, "shellyrgbw2-BBBBBB._http._tcp.local.", Some("192.168.3.11:80")),
        (3, "shelly1-CCCCCC._http._tcp.local.", Some("192.168.3.12:80")),
    ]);

    let found = scan(&session, &quick(3)).await;

    assert_eq!(session.scans(), 3);
    let mut names: Vec<&String> = found.keys().collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "shelly1-AAAAAA._http._tcp.local.",
            "shellyrgbw2-BBBBBB._http._tcp.local."
        ]
    );
    assert_eq!(
        found["shellyrgbw2-BBBBBB._http._tcp.local."].address,
        "192.168.3.11:80".parse::<SocketAddr>().unwrap()
    );
}

#[tokio::test]
async fn test_foreign_and_unresolved_names_are_skipped() {
    let session = ScriptedSession::new(&[
        (0, "printer-1._http._tcp.local.", Some("192.168.3.50:80")),
        (0, "shelly1-DDDDDD._http._tcp.local.", None),
        (0, "shelly1-EEEEEE._http._tcp.local.", Some("192.168.3.13:80")),
    ]);

    let found: HashMap<_, _> = scan(&session, &quick(2)).await;

    assert_eq!(found.len(), 1);
    assert!(found.contains_key("shelly1-EEEEEE._http._tcp.local."));
}

#[tokio::test]
async fn test_zero_cycles_find_nothing() {
    let session = ScriptedSession::new(&[(0, "shelly1-AAAAAA._http._tcp.local.", Some("10.0.0.2:80"))]);

    let found = scan(&session, &quick(0)).await;

    assert!(found.is_empty());
    assert_eq!(session.scans(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_wait_between_cycles_not_after_last() {
    let session = ScriptedSession::new(&[]);
    let config = DiscoveryConfig {
        cycles: 3,
        wait: Duration::from_millis(500),
        ..DiscoveryConfig::default()
    };

    let started = tokio::time::Instant::now();
    scan(&session, &config).await;

    assert_eq!(started.elapsed(), Duration::from_millis(1000));
}
