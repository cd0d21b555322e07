// ── Device reports ──
//
// The host-facing result of one poll. A report keeps reachability apart
// from device state: an offline device carries no current state at all,
// only the last confirmed one under `last_known`, which is never turned
// into attributes.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use shelly_api::LightSettings;
use strum::Display;
use tracing::{debug, warn};

use crate::config::DeviceKind;
use crate::error::CoreError;

// ── Availability ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    /// Reachable, state confirmed by this poll.
    Online,
    /// Unreachable or timed out.
    Offline,
    /// Reachable, but the answer was unusable (bad JSON, auth, HTTP error).
    Degraded,
}

// ── State ────────────────────────────────────────────────────────────

/// Confirmed state of an RGBW2 color channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColorSnapshot {
    pub on: bool,
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub white: u8,
    /// 0-100
    pub brightness: u8,
    pub transition_ms: u16,
    pub effect: u8,
}

impl From<&LightSettings> for ColorSnapshot {
    fn from(light: &LightSettings) -> Self {
        Self {
            on: light.ison,
            red: light.red,
            green: light.green,
            blue: light.blue,
            white: light.white,
            brightness: light.gain,
            transition_ms: light.transition,
            effect: light.effect,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DeviceState {
    Relay { on: bool },
    Color(ColorSnapshot),
}

impl DeviceState {
    pub fn is_on(&self) -> bool {
        match self {
            Self::Relay { on } => *on,
            Self::Color(color) => color.on,
        }
    }
}

// ── Attributes ───────────────────────────────────────────────────────

/// One value on the host-facing attribute surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "attribute", content = "value", rename_all = "snake_case")]
pub enum Attribute {
    Online(bool),
    On(bool),
    Red(u8),
    Green(u8),
    Blue(u8),
    White(u8),
    Brightness(u8),
    TransitionMs(u16),
    Effect(u8),
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Online(v) => write!(f, "online={v}"),
            Self::On(v) => write!(f, "on={v}"),
            Self::Red(v) => write!(f, "red={v}"),
            Self::Green(v) => write!(f, "green={v}"),
            Self::Blue(v) => write!(f, "blue={v}"),
            Self::White(v) => write!(f, "white={v}"),
            Self::Brightness(v) => write!(f, "brightness={v}"),
            Self::TransitionMs(v) => write!(f, "transition_ms={v}"),
            Self::Effect(v) => write!(f, "effect={v}"),
        }
    }
}

// ── DeviceReport ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceReport {
    pub device_id: String,
    pub kind: DeviceKind,
    pub availability: Availability,
    /// Present only when `availability` is `Online`.
    pub state: Option<DeviceState>,
    /// Last state confirmed by an earlier poll. Informational only.
    pub last_known: Option<DeviceState>,
    pub error: Option<String>,
    pub polled_at: DateTime<Utc>,
}

impl DeviceReport {
    pub fn online(device_id: impl Into<String>, kind: DeviceKind, state: DeviceState) -> Self {
        Self {
            device_id: device_id.into(),
            kind,
            availability: Availability::Online,
            state: Some(state),
            last_known: Some(state),
            error: None,
            polled_at: Utc::now(),
        }
    }

    /// Build a report for a failed poll. Reachability failures are
    /// `Offline`; everything else is `Degraded`.
    pub fn failed(
        device_id: impl Into<String>,
        kind: DeviceKind,
        error: &CoreError,
        last_known: Option<DeviceState>,
    ) -> Self {
        let availability = if error.is_offline() {
            Availability::Offline
        } else {
            Availability::Degraded
        };
        Self {
            device_id: device_id.into(),
            kind,
            availability,
            state: None,
            last_known,
            error: Some(error.to_string()),
            polled_at: Utc::now(),
        }
    }

    pub fn is_online(&self) -> bool {
        self.availability == Availability::Online
    }

    /// Current on/off, or `None` when this poll did not confirm it.
    pub fn is_on(&self) -> Option<bool> {
        self.state.as_ref().map(DeviceState::is_on)
    }

    /// Attributes to publish to the host.
    ///
    /// Offline: `Online(false)` only. Degraded: `Online(true)` only.
    /// Online: the online flag followed by every state attribute.
    pub fn attributes(&self) -> Vec<Attribute> {
        let mut attrs = vec![Attribute::Online(
            self.availability != Availability::Offline,
        )];
        match self.state {
            Some(DeviceState::Relay { on }) => attrs.push(Attribute::On(on)),
            Some(DeviceState::Color(c)) => attrs.extend([
                Attribute::On(c.on),
                Attribute::Red(c.red),
                Attribute::Green(c.green),
                Attribute::Blue(c.blue),
                Attribute::White(c.white),
                Attribute::Brightness(c.brightness),
                Attribute::TransitionMs(c.transition_ms),
                Attribute::Effect(c.effect),
            ]),
            None => {}
        }
        attrs
    }
}

// ── Reporter ─────────────────────────────────────────────────────────

/// Sink for device reports. Called once per poll result, from whichever
/// task produced it.
pub trait Reporter: Send + Sync {
    fn report(&self, report: &DeviceReport);
}

/// Logs every report through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, report: &DeviceReport) {
        let attributes = report
            .attributes()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");

        match report.availability {
            Availability::Online => {
                debug!(device = %report.device_id, %attributes, "device state");
            }
            Availability::Offline | Availability::Degraded => {
                warn!(
                    device = %report.device_id,
                    availability = %report.availability,
                    error = report.error.as_deref().unwrap_or_default(),
                    "device not reporting state"
                );
            }
        }
    }
}
