// Device API value types
//
// Wire enums, the partial LED color command, and typed decodes of the
// JSON documents the firmware returns. Decodes keep required fields
// required: a missing `ison` is a protocol violation, not a `false`.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

// ── Wire enums ───────────────────────────────────────────────────────

/// Target of a `turn=` parameter on an output channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum PowerState {
    On,
    Off,
    Toggle,
}

/// State a color channel assumes after power loss (`default_state=`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PowerOnState {
    On,
    Off,
    Last,
}

/// How the external switch input is interpreted (`btn_type=`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ButtonType {
    Momentary,
    Toggle,
    Edge,
    Detached,
    Action,
}

/// Built-in light effects on an RGBW2 in color mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorEffect {
    Off = 0,
    MeteorShower = 1,
    GradualChange = 2,
    Flash = 3,
}

impl ColorEffect {
    pub const MAX_INDEX: i64 = 3;

    pub fn index(self) -> u8 {
        self as u8
    }
}

impl TryFrom<i64> for ColorEffect {
    type Error = crate::Error;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Off),
            1 => Ok(Self::MeteorShower),
            2 => Ok(Self::GradualChange),
            3 => Ok(Self::Flash),
            other => Err(crate::Error::invalid(
                "effect",
                format!("{other} is outside 0..={}", Self::MAX_INDEX),
            )),
        }
    }
}

// ── LED color ────────────────────────────────────────────────────────

/// A full or partial color command.
///
/// Every field is optional. Unset fields are left untouched on the device:
/// they never appear in the outgoing query string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedColor {
    pub red: Option<u8>,
    pub green: Option<u8>,
    pub blue: Option<u8>,
    pub white: Option<u8>,
    /// 0-100, sent as `gain`.
    pub brightness: Option<u8>,
    pub on: Option<bool>,
    /// Flip-back timer in seconds.
    pub timer: Option<u32>,
}

impl LedColor {
    pub const MAX_BRIGHTNESS: u8 = 100;

    pub fn rgbw(red: u8, green: u8, blue: u8, white: u8) -> Self {
        Self {
            red: Some(red),
            green: Some(green),
            blue: Some(blue),
            white: Some(white),
            ..Self::default()
        }
    }

    pub fn with_brightness(mut self, brightness: u8) -> Self {
        self.brightness = Some(brightness);
        self
    }

    pub fn with_on(mut self, on: bool) -> Self {
        self.on = Some(on);
        self
    }

    pub fn with_timer(mut self, seconds: u32) -> Self {
        self.timer = Some(seconds);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Query parameters for the set fields only, in wire order.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(7);
        let channels = [
            ("red", self.red),
            ("green", self.green),
            ("blue", self.blue),
            ("white", self.white),
            ("gain", self.brightness),
        ];
        for (key, value) in channels {
            if let Some(v) = value {
                pairs.push((key, v.to_string()));
            }
        }
        if let Some(on) = self.on {
            let turn = if on { PowerState::On } else { PowerState::Off };
            pairs.push(("turn", turn.to_string()));
        }
        if let Some(timer) = self.timer {
            pairs.push(("timer", timer.to_string()));
        }
        pairs
    }
}

impl fmt::Display for LedColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn opt<T: fmt::Display>(v: Option<T>) -> String {
            v.map_or_else(|| "-".into(), |v| v.to_string())
        }
        write!(
            f,
            "rgbw=({}, {}, {}, {}) brightness={} on={} timer={}",
            opt(self.red),
            opt(self.green),
            opt(self.blue),
            opt(self.white),
            opt(self.brightness),
            opt(self.on),
            opt(self.timer),
        )
    }
}

// ── Response documents ───────────────────────────────────────────────

/// `GET /color/0`: the live state of the color channel.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColorState {
    pub ison: bool,
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub white: u8,
    pub gain: u8,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub has_timer: Option<bool>,
    #[serde(default)]
    pub timer_remaining: Option<u32>,
    #[serde(default)]
    pub effect: Option<u8>,
    #[serde(default)]
    pub transition: Option<u16>,
}

impl From<&ColorState> for LedColor {
    fn from(state: &ColorState) -> Self {
        Self {
            red: Some(state.red),
            green: Some(state.green),
            blue: Some(state.blue),
            white: Some(state.white),
            brightness: Some(state.gain),
            on: Some(state.ison),
            timer: state.timer_remaining.filter(|_| state.has_timer.unwrap_or(false)),
        }
    }
}

/// One entry of `settings.lights[]` on an RGBW2 in color mode.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LightSettings {
    pub ison: bool,
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub white: u8,
    pub gain: u8,
    pub transition: u16,
    pub effect: u8,
    #[serde(default)]
    pub default_state: Option<PowerOnState>,
    #[serde(default)]
    pub auto_on: Option<f64>,
    #[serde(default)]
    pub auto_off: Option<f64>,
    #[serde(default)]
    pub btn_type: Option<ButtonType>,
    #[serde(default)]
    pub btn_reverse: Option<u8>,
    #[serde(default)]
    pub schedule: Option<bool>,
}

/// `GET /shelly`: identification, served without authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(rename = "type", default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub auth: Option<bool>,
    #[serde(default)]
    pub fw: Option<String>,
    #[serde(default)]
    pub num_outputs: Option<u32>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_color_emits_no_parameters() {
        assert!(LedColor::default().query_pairs().is_empty());
        assert!(LedColor::default().is_empty());
    }

    #[test]
    fn zero_is_sent_when_set() {
        let color = LedColor {
            red: Some(0),
            brightness: Some(0),
            on: Some(false),
            ..LedColor::default()
        };
        assert_eq!(
            color.query_pairs(),
            vec![
                ("red", "0".to_string()),
                ("gain", "0".to_string()),
                ("turn", "off".to_string()),
            ]
        );
    }

    #[test]
    fn wire_enums_render_lowercase() {
        assert_eq!(PowerState::Toggle.to_string(), "toggle");
        assert_eq!(PowerOnState::Last.to_string(), "last");
        assert_eq!(ButtonType::Detached.to_string(), "detached");
        assert_eq!("edge".parse::<ButtonType>().unwrap(), ButtonType::Edge);
    }

    #[test]
    fn effect_index_bounds() {
        assert_eq!(ColorEffect::try_from(3).unwrap(), ColorEffect::Flash);
        assert!(ColorEffect::try_from(4).is_err());
        assert!(ColorEffect::try_from(-1).is_err());
    }

    #[test]
    fn color_state_to_led_color_maps_gain() {
        let state: ColorState = serde_json::from_value(serde_json::json!({
            "ison": true, "red": 1, "green": 2, "blue": 3, "white": 4, "gain": 55
        }))
        .unwrap();
        let color = LedColor::from(&state);
        assert_eq!(color.brightness, Some(55));
        assert_eq!(color.on, Some(true));
        assert_eq!(color.timer, None);
    }
}
