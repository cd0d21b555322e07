// ── Discovered-name normalization ──
//
// Turns an advertised mDNS instance name into a bridge identity and a
// device kind: `shellyrgbw2-A1B2C3._http._tcp.local.` becomes
// `RGBW2_A1B2C3` (color), `shelly1-A1B2C3...` becomes `SHELLY1_A1B2C3`
// (relay). Names without a known prefix are not ours.

use tracing::warn;

use crate::config::DeviceKind;

/// Advertised prefix, identity prefix, and profile for each supported model.
const KNOWN_MODELS: &[(&str, &str, DeviceKind)] = &[
    ("shellyrgbw2-", "RGBW2_", DeviceKind::Color),
    ("shelly1-", "SHELLY1_", DeviceKind::Relay),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub id: String,
    pub kind: DeviceKind,
}

/// Normalize an advertised name. Returns `None` (and logs a warning) for
/// names that match no known model.
pub fn normalize(advertised: &str, service_type: &str) -> Option<DeviceIdentity> {
    let instance = strip_service_type(advertised, service_type);

    let lower = instance.to_ascii_lowercase();
    let matched = KNOWN_MODELS
        .iter()
        .find(|(prefix, _, _)| lower.starts_with(prefix));

    let Some((prefix, id_prefix, kind)) = matched else {
        warn!(name = advertised, "ignoring device with unrecognized name");
        return None;
    };

    let suffix = instance.get(prefix.len()..).unwrap_or_default();
    if suffix.is_empty() {
        warn!(name = advertised, "ignoring device name without a serial");
        return None;
    }

    Some(DeviceIdentity {
        id: format!("{id_prefix}{}", suffix.to_ascii_uppercase()),
        kind: *kind,
    })
}

fn strip_service_type<'a>(name: &'a str, service_type: &str) -> &'a str {
    let trimmed = name.trim_end_matches('.');
    let service = format!(".{}", service_type.trim_end_matches('.'));
    if trimmed
        .to_ascii_lowercase()
        .ends_with(&service.to_ascii_lowercase())
    {
        trimmed
            .get(..trimmed.len() - service.len())
            .unwrap_or(trimmed)
    } else {
        trimmed
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const HTTP: &str = "_http._tcp.local.";

    #[test]
    fn rgbw2_name_becomes_color_identity() {
        let id = normalize("shellyrgbw2-A4CF12F3A1B2._http._tcp.local.", HTTP).unwrap();
        assert_eq!(id.id, "RGBW2_A4CF12F3A1B2");
        assert_eq!(id.kind, DeviceKind::Color);
    }

    #[test]
    fn shelly1_name_becomes_relay_identity() {
        let id = normalize("shelly1-98cdac1f03aa._http._tcp.local.", HTTP).unwrap();
        assert_eq!(id.id, "SHELLY1_98CDAC1F03AA");
        assert_eq!(id.kind, DeviceKind::Relay);
    }

    #[test]
    fn unknown_and_empty_names_are_dropped() {
        assert_eq!(normalize("printer-1._http._tcp.local.", HTTP), None);
        assert_eq!(normalize("shelly1-._http._tcp.local.", HTTP), None);
        assert_eq!(normalize("shellyplug-s-ABC._http._tcp.local.", HTTP), None);
    }

    #[test]
    fn bare_instance_name_is_accepted() {
        let id = normalize("shelly1-abc", HTTP).unwrap();
        assert_eq!(id.id, "SHELLY1_ABC");
    }
}
