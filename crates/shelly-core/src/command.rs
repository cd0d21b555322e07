// ── Host command table ──
//
// Host commands arrive as a name plus a flat query map whose keys carry a
// unit suffix (`R.uom100`, `BR.uom78`). Names map onto an explicit enum;
// anything not in the table is rejected before a device is touched.

use std::collections::HashMap;
use std::str::FromStr;

use shelly_api::LedColor;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::config::DeviceKind;
use crate::error::CoreError;

// ── CommandKind ──────────────────────────────────────────────────────

/// Every command name the bridge accepts from the host.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr,
)]
pub enum CommandKind {
    #[strum(serialize = "DON")]
    TurnOn,
    #[strum(serialize = "DOF")]
    TurnOff,
    #[strum(serialize = "QUERY")]
    Query,
    #[strum(serialize = "SET_ALL_COLOR")]
    SetAllColor,
    #[strum(serialize = "SET_COLOR_RGBW")]
    SetColorRgbw,
    #[strum(serialize = "SET_BRIGHTNESS")]
    SetBrightness,
    #[strum(serialize = "SET_TRANSITION")]
    SetTransition,
    #[strum(serialize = "SET_EFFECT")]
    SetEffect,
}

const RELAY_COMMANDS: &[CommandKind] =
    &[CommandKind::TurnOn, CommandKind::TurnOff, CommandKind::Query];

impl CommandKind {
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Look up a host command name.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        Self::from_str(name).map_err(|_| CoreError::UnknownCommand {
            name: name.to_owned(),
        })
    }

    /// Commands a device kind accepts.
    pub fn table(kind: DeviceKind) -> Vec<CommandKind> {
        match kind {
            DeviceKind::Relay => RELAY_COMMANDS.to_vec(),
            DeviceKind::Color => Self::iter().collect(),
        }
    }

    pub fn is_supported_by(self, kind: DeviceKind) -> bool {
        match kind {
            DeviceKind::Relay => RELAY_COMMANDS.contains(&self),
            DeviceKind::Color => true,
        }
    }
}

/// Check a host-side command list against what a device kind supports.
///
/// Run at startup so a host profile that advertises a command the bridge
/// cannot serve fails immediately rather than on first use.
pub fn validate_command_table(kind: DeviceKind, names: &[&str]) -> Result<(), CoreError> {
    for name in names {
        let command = CommandKind::from_name(name)?;
        if !command.is_supported_by(kind) {
            return Err(CoreError::Unsupported {
                operation: command.name(),
                kind: kind.as_str(),
            });
        }
    }
    Ok(())
}

// ── Parameters ───────────────────────────────────────────────────────

/// Command parameters keyed by their bare name (`R`, `BR`, `TRN`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandParams {
    values: HashMap<String, String>,
}

impl CommandParams {
    /// Build from a host query map, dropping `.uomNN` suffixes.
    pub fn from_query<I, K, V>(query: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let values = query
            .into_iter()
            .map(|(key, value)| {
                let key = key.as_ref();
                let bare = key.split_once('.').map_or(key, |(bare, _)| bare);
                (bare.to_ascii_uppercase(), value.into())
            })
            .collect();
        Self { values }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn optional<T: FromStr>(&self, key: &'static str) -> Result<Option<T>, CoreError> {
        let Some(raw) = self.values.get(key) else {
            return Ok(None);
        };
        raw.trim()
            .parse()
            .map(Some)
            .map_err(|_| CoreError::InvalidArgument {
                field: key.to_owned(),
                reason: format!("{raw:?} is not a valid value"),
            })
    }

    fn required<T: FromStr>(
        &self,
        command: CommandKind,
        key: &'static str,
    ) -> Result<T, CoreError> {
        self.optional(key)?.ok_or(CoreError::MissingParameter {
            command: command.name(),
            parameter: key,
        })
    }
}

// ── NodeCommand ──────────────────────────────────────────────────────

/// A fully parsed host command, ready to run against a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeCommand {
    TurnOn,
    TurnOff,
    Query,
    /// Any mix of color, brightness, power and timer in one request.
    /// Unset fields stay as they are.
    SetAllColor(LedColor),
    /// Channels only; brightness and power untouched.
    SetColorRgbw(LedColor),
    SetBrightness(u8),
    /// Persistent default transition, in ms.
    SetTransition(i64),
    /// Effect index.
    SetEffect(i64),
}

impl NodeCommand {
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::TurnOn => CommandKind::TurnOn,
            Self::TurnOff => CommandKind::TurnOff,
            Self::Query => CommandKind::Query,
            Self::SetAllColor(_) => CommandKind::SetAllColor,
            Self::SetColorRgbw(_) => CommandKind::SetColorRgbw,
            Self::SetBrightness(_) => CommandKind::SetBrightness,
            Self::SetTransition(_) => CommandKind::SetTransition,
            Self::SetEffect(_) => CommandKind::SetEffect,
        }
    }

    /// Parse a host command. Unknown names fail with `UnknownCommand`;
    /// absent required parameters with `MissingParameter`.
    pub fn parse(name: &str, params: &CommandParams) -> Result<Self, CoreError> {
        let kind = CommandKind::from_name(name)?;
        let command = match kind {
            CommandKind::TurnOn => Self::TurnOn,
            CommandKind::TurnOff => Self::TurnOff,
            CommandKind::Query => Self::Query,
            CommandKind::SetAllColor => {
                let on: Option<u8> = params.optional("ON")?;
                let timer: Option<u32> = params.optional("TM")?;
                Self::SetAllColor(LedColor {
                    red: Some(params.required(kind, "R")?),
                    green: Some(params.required(kind, "G")?),
                    blue: Some(params.required(kind, "B")?),
                    white: Some(params.required(kind, "W")?),
                    brightness: Some(params.required(kind, "BR")?),
                    on: on.map(|v| v != 0),
                    timer: timer.filter(|t| *t > 0),
                })
            }
            CommandKind::SetColorRgbw => Self::SetColorRgbw(LedColor::rgbw(
                params.required(kind, "RSC")?,
                params.required(kind, "GSC")?,
                params.required(kind, "BSC")?,
                params.required(kind, "WSC")?,
            )),
            CommandKind::SetBrightness => Self::SetBrightness(params.required(kind, "BRSB")?),
            CommandKind::SetTransition => Self::SetTransition(params.required(kind, "TRN")?),
            CommandKind::SetEffect => Self::SetEffect(params.required(kind, "EFF")?),
        };
        Ok(command)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn params(pairs: &[(&str, &str)]) -> CommandParams {
        CommandParams::from_query(pairs.iter().map(|(k, v)| (*k, (*v).to_string())))
    }

    #[test]
    fn names_round_trip_through_table() {
        for kind in CommandKind::iter() {
            assert_eq!(CommandKind::from_name(kind.name()).unwrap(), kind);
        }
        assert_eq!(CommandKind::SetColorRgbw.to_string(), "SET_COLOR_RGBW");
    }

    #[test]
    fn unknown_name_fails_fast() {
        let err = NodeCommand::parse("SET_DANCE_MODE", &CommandParams::default()).unwrap_err();
        assert!(matches!(err, CoreError::UnknownCommand { ref name } if name == "SET_DANCE_MODE"));
    }

    #[test]
    fn set_all_color_strips_unit_suffixes() {
        let p = params(&[
            ("R.uom100", "255"),
            ("G.uom100", "128"),
            ("B.uom100", "0"),
            ("W.uom100", "10"),
            ("BR.uom78", "80"),
            ("ON.uom2", "1"),
            ("TM.uom42", "0"),
        ]);
        let cmd = NodeCommand::parse("SET_ALL_COLOR", &p).unwrap();
        assert_eq!(
            cmd,
            NodeCommand::SetAllColor(LedColor::rgbw(255, 128, 0, 10).with_brightness(80).with_on(true))
        );
    }

    #[test]
    fn missing_parameter_is_named() {
        let p = params(&[("RSC.uom100", "1"), ("GSC.uom100", "2"), ("BSC.uom100", "3")]);
        let err = NodeCommand::parse("SET_COLOR_RGBW", &p).unwrap_err();
        assert!(matches!(
            err,
            CoreError::MissingParameter { parameter: "WSC", .. }
        ));
    }

    #[test]
    fn out_of_range_channel_is_invalid_argument() {
        let p = params(&[("BRSB.uom78", "300")]);
        let err = NodeCommand::parse("SET_BRIGHTNESS", &p).unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument { ref field, .. } if field == "BRSB"));
    }

    #[test]
    fn effect_value_is_passed_through_for_device_check() {
        let p = params(&[("EFF.uom25", "7")]);
        assert_eq!(
            NodeCommand::parse("SET_EFFECT", &p).unwrap(),
            NodeCommand::SetEffect(7)
        );
    }

    #[test]
    fn relay_table_rejects_color_commands() {
        assert!(validate_command_table(DeviceKind::Relay, &["DON", "DOF", "QUERY"]).is_ok());
        let err = validate_command_table(DeviceKind::Relay, &["DON", "SET_EFFECT"]).unwrap_err();
        assert!(matches!(err, CoreError::Unsupported { operation: "SET_EFFECT", .. }));
        assert!(validate_command_table(DeviceKind::Color, &["SET_ALL_COLOR", "SET_EFFECT"]).is_ok());
        assert_eq!(CommandKind::table(DeviceKind::Color).len(), 8);
    }
}
