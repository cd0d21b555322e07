// ── Device registry entries ──
//
// `DeviceProfile` gives relay and color devices one set of operations.
// `DeviceHandle` owns a profile plus the per-device gate: every poll and
// command against one device runs under its async mutex, so calls to a
// single device never overlap while different devices proceed in parallel.

use shelly_api::{
    ColorDevice, DeviceConnector, DeviceEndpoint, LedColor, RelayDevice, TransportConfig,
};
use tokio::sync::Mutex;
use tracing::debug;

use crate::command::NodeCommand;
use crate::config::{DeviceConfig, DeviceKind};
use crate::error::CoreError;
use crate::report::{ColorSnapshot, DeviceReport, DeviceState};

// ── DeviceProfile ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum DeviceProfile {
    Relay(RelayDevice),
    Color(ColorDevice),
}

impl DeviceProfile {
    pub fn from_config(config: &DeviceConfig, transport: &TransportConfig) -> Result<Self, CoreError> {
        let endpoint = DeviceEndpoint::new(config.host.clone(), config.credentials.clone())?;
        let profile = match config.kind {
            DeviceKind::Relay => Self::Relay(RelayDevice::new(endpoint, transport)?),
            DeviceKind::Color => Self::Color(ColorDevice::new(endpoint, transport)?),
        };
        Ok(profile)
    }

    pub fn kind(&self) -> DeviceKind {
        match self {
            Self::Relay(_) => DeviceKind::Relay,
            Self::Color(_) => DeviceKind::Color,
        }
    }

    pub fn connector(&self) -> &DeviceConnector {
        match self {
            Self::Relay(relay) => relay.connector(),
            Self::Color(color) => color.connector(),
        }
    }

    pub fn as_color(&self, operation: &'static str) -> Result<&ColorDevice, CoreError> {
        match self {
            Self::Color(color) => Ok(color),
            Self::Relay(_) => Err(CoreError::Unsupported {
                operation,
                kind: DeviceKind::Relay.as_str(),
            }),
        }
    }

    // ── Uniform operations ───────────────────────────────────────────

    pub async fn turn_on(&self, timer: Option<u32>) -> Result<(), CoreError> {
        Ok(self.connector().turn_on(timer).await?)
    }

    pub async fn turn_off(&self) -> Result<(), CoreError> {
        Ok(self.connector().turn_off().await?)
    }

    pub async fn toggle(&self) -> Result<(), CoreError> {
        match self {
            Self::Relay(relay) => relay.toggle().await?,
            Self::Color(color) => color.toggle().await?,
        }
        Ok(())
    }

    pub async fn is_on(&self) -> Result<bool, CoreError> {
        Ok(self.connector().get_is_on().await?)
    }

    /// Relays report `Unsupported` without touching the network.
    pub async fn set_color(&self, color: &LedColor) -> Result<(), CoreError> {
        Ok(self.as_color("set_color")?.set_color(color).await?)
    }

    /// Read the state a poll reports.
    ///
    /// Color devices read `settings.lights[0]`, which carries transition
    /// and effect alongside the color; relays read `relays[0].ison`.
    pub async fn read_state(&self) -> Result<DeviceState, CoreError> {
        match self {
            Self::Relay(relay) => Ok(DeviceState::Relay {
                on: relay.is_on().await?,
            }),
            Self::Color(color) => {
                let light = color.get_light_settings().await?;
                Ok(DeviceState::Color(ColorSnapshot::from(&light)))
            }
        }
    }

    /// Run one host command. Unsupported commands fail before any I/O.
    pub async fn apply(&self, command: &NodeCommand) -> Result<(), CoreError> {
        match command {
            NodeCommand::TurnOn => self.turn_on(None).await,
            NodeCommand::TurnOff => self.turn_off().await,
            NodeCommand::Query => Ok(()),
            NodeCommand::SetAllColor(color) => {
                let device = self.as_color(command.kind().name())?;
                Ok(device.set_color(color).await?)
            }
            NodeCommand::SetColorRgbw(color) => {
                let device = self.as_color(command.kind().name())?;
                let channels = LedColor {
                    red: color.red,
                    green: color.green,
                    blue: color.blue,
                    white: color.white,
                    ..LedColor::default()
                };
                Ok(device.set_color(&channels).await?)
            }
            NodeCommand::SetBrightness(brightness) => {
                let device = self.as_color(command.kind().name())?;
                let color = LedColor::default().with_brightness(*brightness);
                Ok(device.set_color(&color).await?)
            }
            NodeCommand::SetTransition(delay_ms) => {
                let device = self.as_color(command.kind().name())?;
                Ok(device.set_transition(*delay_ms).await?)
            }
            NodeCommand::SetEffect(effect) => {
                let device = self.as_color(command.kind().name())?;
                Ok(device.set_color_effect(*effect).await?)
            }
        }
    }
}

// ── DeviceHandle ─────────────────────────────────────────────────────

/// One registered device: identity, profile, and its single-flight gate.
#[derive(Debug)]
pub struct DeviceHandle {
    config: DeviceConfig,
    profile: DeviceProfile,
    /// Held for the duration of every device call. Guards the last
    /// confirmed state.
    gate: Mutex<Option<DeviceState>>,
}

impl DeviceHandle {
    pub fn new(config: DeviceConfig, transport: &TransportConfig) -> Result<Self, CoreError> {
        let profile = DeviceProfile::from_config(&config, transport)?;
        Ok(Self::with_profile(config, profile))
    }

    pub fn with_profile(config: DeviceConfig, profile: DeviceProfile) -> Self {
        Self {
            config,
            profile,
            gate: Mutex::new(None),
        }
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn host(&self) -> &str {
        &self.config.host
    }

    pub fn kind(&self) -> DeviceKind {
        self.profile.kind()
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Direct access to the profile, bypassing the gate. For one-shot
    /// callers that do not share the device with a running bridge.
    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// Poll the device. Never fails: errors become an offline or
    /// degraded report.
    pub async fn poll(&self) -> DeviceReport {
        let mut last_known = self.gate.lock().await;
        self.poll_locked(&mut last_known).await
    }

    /// Apply a command, then re-poll, all under one hold of the gate.
    pub async fn execute(&self, command: &NodeCommand) -> Result<DeviceReport, CoreError> {
        let mut last_known = self.gate.lock().await;
        debug!(device = self.id(), command = %command.kind(), "executing command");
        self.profile.apply(command).await?;
        Ok(self.poll_locked(&mut last_known).await)
    }

    async fn poll_locked(&self, last_known: &mut Option<DeviceState>) -> DeviceReport {
        match self.profile.read_state().await {
            Ok(state) => {
                *last_known = Some(state);
                DeviceReport::online(self.id(), self.kind(), state)
            }
            Err(e) => DeviceReport::failed(self.id(), self.kind(), &e, *last_known),
        }
    }
}
