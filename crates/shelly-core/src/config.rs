// ── Runtime bridge configuration ──
//
// Describes which devices to drive and how often. Carries credentials but
// never touches disk: the config crate or the CLI builds a `BridgeConfig`
// and hands it in.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use shelly_api::{Credentials, DiscoveryConfig};
use strum::{Display, EnumString, IntoStaticStr};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_DISCOVERY_INTERVAL: Duration = Duration::from_secs(300);

/// Which device profile drives a device.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// Shelly1 single relay.
    Relay,
    /// Shelly RGBW2 in color mode.
    Color,
}

impl DeviceKind {
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// One device the bridge drives.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Stable identity used as the registry key, e.g. `RGBW2_A1B2C3`.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    pub host: String,
    pub kind: DeviceKind,
    pub credentials: Option<Credentials>,
}

impl DeviceConfig {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        host: impl Into<String>,
        kind: DeviceKind,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            host: host.into(),
            kind,
            credentials: None,
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }
}

/// Configuration for one bridge instance.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub devices: Vec<DeviceConfig>,
    /// Interval between poll rounds. Zero disables the poll loop.
    pub poll_interval: Duration,
    /// Per-request bound for device calls.
    pub request_timeout: Duration,
    /// Periodic re-discovery; `None` disables it.
    pub discovery: Option<DiscoveryConfig>,
    pub discovery_interval: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            devices: Vec::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: shelly_api::DEFAULT_TIMEOUT,
            discovery: None,
            discovery_interval: DEFAULT_DISCOVERY_INTERVAL,
        }
    }
}
