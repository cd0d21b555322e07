// Color profile (RGBW2 in color mode)
//
// Status under `lights[0]`, control under `color/0`. One-shot commands go to
// `color/0` and are lost on reboot; persistent settings go to
// `settings/color/0`. Range checks run before any request is built, so a
// rejected argument never reaches the device.

use serde_json::Value;
use tracing::debug;

use crate::connector::{Channels, DeviceConnector, decode, first_channel};
use crate::error::Error;
use crate::models::{
    ButtonType, ColorEffect, ColorState, LedColor, LightSettings, PowerOnState, PowerState,
};
use crate::transport::{DeviceEndpoint, TransportConfig};

const COLOR_CONTROL: &str = "color/0";
const COLOR_SETTINGS: &str = "settings/color/0";

/// Longest transition the firmware accepts, in milliseconds.
pub const MAX_TRANSITION_MS: u32 = 5000;

/// An RGBW2 LED controller in color mode.
#[derive(Debug, Clone)]
pub struct ColorDevice {
    connector: DeviceConnector,
}

impl ColorDevice {
    pub fn new(endpoint: DeviceEndpoint, transport: &TransportConfig) -> Result<Self, Error> {
        let connector = DeviceConnector::new(endpoint, Channels::COLOR, transport)?;
        Ok(Self { connector })
    }

    pub fn from_client(
        http: reqwest::Client,
        endpoint: DeviceEndpoint,
        transport: &TransportConfig,
    ) -> Self {
        Self {
            connector: DeviceConnector::with_client(
                http,
                endpoint,
                Channels::COLOR,
                transport.timeout,
            ),
        }
    }

    pub fn connector(&self) -> &DeviceConnector {
        &self.connector
    }

    // ── Power ────────────────────────────────────────────────────────

    pub async fn turn_on(&self, timer: Option<u32>) -> Result<(), Error> {
        self.connector.turn_on(timer).await
    }

    pub async fn turn_off(&self) -> Result<(), Error> {
        self.connector.turn_off().await
    }

    pub async fn toggle(&self) -> Result<(), Error> {
        self.connector.set_power_state(PowerState::Toggle, None).await
    }

    pub async fn is_on(&self) -> Result<bool, Error> {
        self.connector.get_is_on().await
    }

    // ── State reads ──────────────────────────────────────────────────

    /// Raw `GET /color/0` document.
    pub async fn get_color_state(&self) -> Result<ColorState, Error> {
        let doc = self.connector.get_json(COLOR_CONTROL, &[]).await?;
        decode(COLOR_CONTROL, COLOR_CONTROL, doc)
    }

    /// Current color, brightness (`gain`), and power of the channel.
    pub async fn get_color(&self) -> Result<LedColor, Error> {
        let state = self.get_color_state().await?;
        Ok(LedColor::from(&state))
    }

    /// Raw `GET /settings/color/0` document.
    pub async fn get_color_settings(&self) -> Result<Value, Error> {
        self.connector.get_json(COLOR_SETTINGS, &[]).await
    }

    /// `settings.lights[0]`, including transition and effect.
    pub async fn get_light_settings(&self) -> Result<LightSettings, Error> {
        let settings = self.connector.get_settings().await?;
        let light = first_channel(&settings, "lights", "settings")?.clone();
        decode("settings", "lights[0]", light)
    }

    // ── One-shot commands ────────────────────────────────────────────

    /// Apply a full or partial color. Only the set fields are sent.
    pub async fn set_color(&self, color: &LedColor) -> Result<(), Error> {
        if let Some(brightness) = color.brightness {
            if brightness > LedColor::MAX_BRIGHTNESS {
                return Err(Error::invalid(
                    "brightness",
                    format!("{brightness} is outside 0..={}", LedColor::MAX_BRIGHTNESS),
                ));
            }
        }
        debug!(host = self.connector.host(), %color, "setting color");
        self.connector
            .send(COLOR_CONTROL, &color.query_pairs())
            .await
            .map(drop)
    }

    /// Build a color from individual parts and apply it.
    #[allow(clippy::too_many_arguments)]
    pub async fn on_with_color(
        &self,
        red: Option<u8>,
        green: Option<u8>,
        blue: Option<u8>,
        white: Option<u8>,
        brightness: Option<u8>,
        on: Option<bool>,
        timer: Option<u32>,
    ) -> Result<(), Error> {
        let color = LedColor {
            red,
            green,
            blue,
            white,
            brightness,
            on,
            timer,
        };
        self.set_color(&color).await
    }

    /// Transition for the next change only (`color/0?transition=`).
    pub async fn set_one_shot_transition(&self, delay_ms: i64) -> Result<(), Error> {
        let delay = check_transition(delay_ms)?;
        self.connector
            .send(COLOR_CONTROL, &[("transition", delay.to_string())])
            .await
            .map(drop)
    }

    // ── Persistent settings ──────────────────────────────────────────

    /// Select one of the built-in effects, 0 (off) through 3.
    pub async fn set_color_effect(&self, effect: i64) -> Result<(), Error> {
        let effect = ColorEffect::try_from(effect)?;
        self.set_setting("effect", effect.index().to_string()).await
    }

    /// Default transition between on/off and color changes.
    pub async fn set_transition(&self, delay_ms: i64) -> Result<(), Error> {
        let delay = check_transition(delay_ms)?;
        self.set_setting("transition", delay.to_string()).await
    }

    pub async fn set_default_power_on_state(&self, state: PowerOnState) -> Result<(), Error> {
        self.set_setting("default_state", state.to_string()).await
    }

    /// Turn back on this many seconds after every off command.
    pub async fn set_auto_on_time(&self, seconds: u32) -> Result<(), Error> {
        self.set_setting("auto_on", seconds.to_string()).await
    }

    /// Turn back off this many seconds after every on command.
    pub async fn set_auto_off_time(&self, seconds: u32) -> Result<(), Error> {
        self.set_setting("auto_off", seconds.to_string()).await
    }

    pub async fn set_button_type(&self, button: ButtonType) -> Result<(), Error> {
        self.set_setting("btn_type", button.to_string()).await
    }

    /// Invert the external switch input.
    pub async fn set_button_invert(&self, invert: bool) -> Result<(), Error> {
        self.set_setting("btn_reverse", u8::from(invert).to_string())
            .await
    }

    pub async fn set_schedule_enabled(&self, enabled: bool) -> Result<(), Error> {
        self.set_setting("schedule", u8::from(enabled).to_string())
            .await
    }

    async fn set_setting(&self, key: &'static str, value: String) -> Result<(), Error> {
        debug!(host = self.connector.host(), key, %value, "updating color settings");
        self.connector
            .send(COLOR_SETTINGS, &[(key, value)])
            .await
            .map(drop)
    }
}

fn check_transition(delay_ms: i64) -> Result<u32, Error> {
    u32::try_from(delay_ms)
        .ok()
        .filter(|d| *d <= MAX_TRANSITION_MS)
        .ok_or_else(|| {
            Error::invalid(
                "transition",
                format!("{delay_ms}ms is outside 0..={MAX_TRANSITION_MS}"),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_bounds() {
        assert!(check_transition(0).is_ok());
        assert!(check_transition(5000).is_ok());
        assert!(check_transition(5001).is_err());
        assert!(check_transition(-1).is_err());
    }
}
