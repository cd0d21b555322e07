//! Shared command helpers: config loading and device resolution.

use std::path::PathBuf;
use std::time::Duration;

use shelly_api::TransportConfig;
use shelly_config::Config;
use shelly_core::{DeviceConfig, DeviceHandle};

use crate::cli::{DeviceArgs, GlobalOpts};
use crate::error::CliError;

/// `--config`, or the platform default.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(shelly_config::config_path)
}

pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(shelly_config::load_config_from(&config_file(global))?)
}

/// Apply global flag overrides on top of the loaded file.
pub fn apply_overrides(config: &mut Config, global: &GlobalOpts) -> Result<(), CliError> {
    if let Some(timeout) = global.timeout {
        if timeout == 0 {
            return Err(CliError::Validation {
                field: "--timeout".into(),
                reason: "must be greater than zero".into(),
            });
        }
        config.timeout_ms = timeout;
    }
    Ok(())
}

/// Resolve `<device>` to a ready handle.
///
/// Configured devices match by id, then by name ignoring case. Anything
/// else is treated as a raw host and needs `--kind`.
pub fn resolve_device(args: &DeviceArgs, global: &GlobalOpts) -> Result<DeviceHandle, CliError> {
    let mut config = load(global)?;
    apply_overrides(&mut config, global)?;

    let entry = config
        .devices
        .iter()
        .find(|e| e.id() == args.device)
        .or_else(|| {
            config
                .devices
                .iter()
                .find(|e| e.name.eq_ignore_ascii_case(&args.device))
        });

    let mut device = match (entry, args.kind) {
        (Some(entry), _) => shelly_config::entry_to_device_config(entry)?,
        (None, Some(kind)) => DeviceConfig::new(
            args.device.clone(),
            args.device.clone(),
            args.device.clone(),
            kind.into(),
        ),
        (None, None) => {
            return Err(CliError::NotFound {
                identifier: args.device.clone(),
            });
        }
    };
    if let Some(kind) = args.kind {
        device.kind = kind.into();
    }

    tracing::debug!(device = %device.id, host = %device.host, kind = %device.kind, "resolved device");
    let transport =
        TransportConfig::default().with_timeout(Duration::from_millis(config.timeout_ms));
    Ok(DeviceHandle::new(device, &transport)?)
}
