//! Configuration for the Shelly bridge.
//!
//! TOML file + `SHELLY_` environment overrides, host-supplied custom
//! parameters, device password resolution (env var or plaintext), and
//! translation to `shelly_core::BridgeConfig`. The CLI layers its own
//! flag overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shelly_api::{Credentials, DiscoveryConfig, discovery};
use shelly_core::{BridgeConfig, DeviceConfig, DeviceKind};

const CONFIG_FILE_NAME: &str = "shelly-bridge.toml";
const ENV_PREFIX: &str = "SHELLY_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("custom parameter {key}: {reason}")]
    CustomParam { key: String, reason: String },

    #[error("device '{device}' reads its password from ${variable}, which is not set")]
    MissingPassword { device: String, variable: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Per-request bound for device calls.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub discovery: DiscoverySection,

    #[serde(default)]
    pub devices: Vec<DeviceEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            timeout_ms: default_timeout_ms(),
            discovery: DiscoverySection::default(),
            devices: Vec::new(),
        }
    }
}

fn default_poll_interval() -> u64 {
    10
}
fn default_timeout_ms() -> u64 {
    3000
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoverySection {
    /// Run periodic mDNS discovery inside `run`.
    pub enabled: bool,
    pub service_type: String,
    pub prefixes: Vec<String>,
    pub cycles: u32,
    pub wait_ms: u64,
    pub resolve_timeout_ms: u64,
    /// Interval between background scans.
    pub interval_secs: u64,
}

impl Default for DiscoverySection {
    fn default() -> Self {
        Self {
            enabled: false,
            service_type: discovery::DEFAULT_SERVICE_TYPE.into(),
            prefixes: discovery::DEFAULT_PREFIXES
                .iter()
                .map(|p| (*p).to_owned())
                .collect(),
            cycles: discovery::DEFAULT_CYCLES,
            wait_ms: 500,
            resolve_timeout_ms: 1000,
            interval_secs: 300,
        }
    }
}

impl DiscoverySection {
    pub fn to_discovery_config(&self) -> DiscoveryConfig {
        DiscoveryConfig {
            service_type: self.service_type.clone(),
            name_prefixes: self.prefixes.clone(),
            cycles: self.cycles,
            wait: Duration::from_millis(self.wait_ms),
            resolve_timeout: Duration::from_millis(self.resolve_timeout_ms),
        }
    }
}

/// A statically configured device.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DeviceEntry {
    pub name: String,

    /// IP address or `ip:port`.
    pub host: String,

    pub kind: DeviceKind,

    /// Registry key. Defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Password (plaintext, prefer `password_env`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Environment variable holding the password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,
}

impl DeviceEntry {
    pub fn new(name: impl Into<String>, host: impl Into<String>, kind: DeviceKind) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            kind,
            id: None,
            username: None,
            password: None,
            password_env: None,
        }
    }

    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.name)
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "shelly-bridge", "shelly-bridge").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push(CONFIG_FILE_NAME);
            p
        },
        |dirs| dirs.config_dir().join(CONFIG_FILE_NAME),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("shelly-bridge");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load from the canonical path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file yields the defaults
/// (still subject to env overrides).
///
/// Environment keys use `__` for nesting: `SHELLY_POLL_INTERVAL_SECS=30`,
/// `SHELLY_DISCOVERY__ENABLED=true`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    validate(&config)?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.timeout_ms == 0 {
        return Err(ConfigError::Validation {
            field: "timeout_ms".into(),
            reason: "must be greater than zero".into(),
        });
    }

    if config.discovery.enabled && config.discovery.interval_secs == 0 {
        return Err(ConfigError::Validation {
            field: "discovery.interval_secs".into(),
            reason: "must be greater than zero when discovery is enabled".into(),
        });
    }

    let mut seen = HashMap::new();
    for device in &config.devices {
        if device.host.trim().is_empty() {
            return Err(ConfigError::Validation {
                field: format!("devices.{}.host", device.name),
                reason: "must not be empty".into(),
            });
        }
        if let Some(previous) = seen.insert(device.id().to_owned(), device.host.as_str()) {
            return Err(ConfigError::Validation {
                field: "devices".into(),
                reason: format!(
                    "duplicate device id '{}' ({previous} and {})",
                    device.id(),
                    device.host
                ),
            });
        }
    }
    Ok(())
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Host custom parameters ─────────────────────────────────────────

/// Device families configurable through custom parameters: count key,
/// per-device key prefix, and profile.
const CUSTOM_PARAM_FAMILIES: &[(&str, &str, DeviceKind)] = &[
    ("Num_RGBW2", "RGBW2_", DeviceKind::Color),
    ("Num_SHELLY1", "SHELLY1_", DeviceKind::Relay),
];

/// Parse host-supplied custom parameters.
///
/// `Num_RGBW2 = "2"` with `RGBW2_1 = "Porch, 192.168.3.64"` and
/// `RGBW2_2 = ...` yields two color devices with ids `RGBW2_1` and
/// `RGBW2_2`; `Num_SHELLY1` / `SHELLY1_{i}` likewise for relays. An
/// absent count means no devices of that family.
pub fn from_custom_params(params: &HashMap<String, String>) -> Result<Vec<DeviceEntry>, ConfigError> {
    let mut devices = Vec::new();

    for (count_key, prefix, kind) in CUSTOM_PARAM_FAMILIES {
        let Some(raw_count) = params.get(*count_key) else {
            continue;
        };
        let count: usize = raw_count.trim().parse().map_err(|_| ConfigError::CustomParam {
            key: (*count_key).to_owned(),
            reason: format!("expected a device count, got {raw_count:?}"),
        })?;

        for index in 1..=count {
            let key = format!("{prefix}{index}");
            let value = params.get(&key).ok_or_else(|| ConfigError::CustomParam {
                key: key.clone(),
                reason: "missing".into(),
            })?;
            let (name, host) = parse_device_param(&key, value)?;

            let mut entry = DeviceEntry::new(name, host, *kind);
            entry.id = Some(key);
            devices.push(entry);
        }
    }

    Ok(devices)
}

/// `"<name>, <ip>"`
fn parse_device_param(key: &str, value: &str) -> Result<(String, String), ConfigError> {
    let malformed = |reason: &str| ConfigError::CustomParam {
        key: key.to_owned(),
        reason: format!("{reason} (expected \"<name>, <ip>\", got {value:?})"),
    };

    let (name, host) = value
        .split_once(',')
        .ok_or_else(|| malformed("missing comma"))?;
    let (name, host) = (name.trim(), host.trim());
    if name.is_empty() {
        return Err(malformed("empty name"));
    }
    if host.is_empty() || host.contains(char::is_whitespace) {
        return Err(malformed("invalid address"));
    }
    Ok((name.to_owned(), host.to_owned()))
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve a device's password: `password_env` first, then plaintext.
pub fn resolve_password(entry: &DeviceEntry) -> Result<Option<SecretString>, ConfigError> {
    if let Some(ref variable) = entry.password_env {
        return std::env::var(variable)
            .map(|pw| Some(SecretString::from(pw)))
            .map_err(|_| ConfigError::MissingPassword {
                device: entry.name.clone(),
                variable: variable.clone(),
            });
    }
    Ok(entry.password.clone().map(SecretString::from))
}

/// Credentials for a device, or `None` when it has no username.
pub fn resolve_credentials(entry: &DeviceEntry) -> Result<Option<Credentials>, ConfigError> {
    let Some(ref username) = entry.username else {
        return Ok(None);
    };
    let password = resolve_password(entry)?.unwrap_or_else(|| SecretString::from(String::new()));
    Ok(Some(Credentials::new(username.clone(), password)))
}

// ── Translation to core types ───────────────────────────────────────

pub fn entry_to_device_config(entry: &DeviceEntry) -> Result<DeviceConfig, ConfigError> {
    let mut device = DeviceConfig::new(entry.id(), entry.name.clone(), entry.host.clone(), entry.kind);
    if let Some(credentials) = resolve_credentials(entry)? {
        device = device.with_credentials(credentials);
    }
    Ok(device)
}

/// Build a `BridgeConfig` from a loaded config.
pub fn to_bridge_config(config: &Config) -> Result<BridgeConfig, ConfigError> {
    let devices = config
        .devices
        .iter()
        .map(entry_to_device_config)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(BridgeConfig {
        devices,
        poll_interval: Duration::from_secs(config.poll_interval_secs),
        request_timeout: Duration::from_millis(config.timeout_ms),
        discovery: config
            .discovery
            .enabled
            .then(|| config.discovery.to_discovery_config()),
        discovery_interval: Duration::from_secs(config.discovery.interval_secs),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn custom_params_produce_both_families() {
        let p = params(&[
            ("Num_RGBW2", "2"),
            ("RGBW2_1", "Porch, 192.168.3.64"),
            ("RGBW2_2", " Deck ,192.168.3.65 "),
            ("Num_SHELLY1", "1"),
            ("SHELLY1_1", "Garage, 192.168.3.70:8080"),
        ]);

        let devices = from_custom_params(&p).unwrap();

        assert_eq!(devices.len(), 3);
        assert_eq!(devices[1].name, "Deck");
        assert_eq!(devices[1].host, "192.168.3.65");
        assert_eq!(devices[1].id(), "RGBW2_2");
        assert_eq!(devices[2].kind, DeviceKind::Relay);
        assert_eq!(devices[2].host, "192.168.3.70:8080");
    }

    #[test]
    fn missing_device_param_names_the_key() {
        let p = params(&[("Num_RGBW2", "2"), ("RGBW2_1", "Porch, 192.168.3.64")]);
        let err = from_custom_params(&p).unwrap_err();
        assert!(matches!(err, ConfigError::CustomParam { ref key, .. } if key == "RGBW2_2"));
    }

    #[test]
    fn malformed_device_param_is_rejected() {
        let p = params(&[("Num_SHELLY1", "1"), ("SHELLY1_1", "Garage 192.168.3.70")]);
        assert!(from_custom_params(&p).is_err());

        let p = params(&[("Num_SHELLY1", "one")]);
        let err = from_custom_params(&p).unwrap_err();
        assert!(matches!(err, ConfigError::CustomParam { ref key, .. } if key == "Num_SHELLY1"));
    }

    #[test]
    fn absent_counts_mean_no_devices() {
        assert!(from_custom_params(&HashMap::new()).unwrap().is_empty());
    }

    #[test]
    fn plaintext_password_is_used_without_env() {
        let mut entry = DeviceEntry::new("Porch", "192.168.3.64", DeviceKind::Color);
        entry.username = Some("admin".into());
        entry.password = Some("hunter2".into());

        let creds = resolve_credentials(&entry).unwrap().unwrap();
        assert_eq!(creds.username, "admin");
        assert_eq!(creds.password.expose_secret(), "hunter2");
    }

    #[test]
    fn unset_password_env_is_an_error() {
        let mut entry = DeviceEntry::new("Porch", "192.168.3.64", DeviceKind::Color);
        entry.username = Some("admin".into());
        entry.password_env = Some("SHELLY_TEST_PASSWORD_THAT_IS_NEVER_SET".into());

        let err = resolve_credentials(&entry).unwrap_err();
        assert!(matches!(err, ConfigError::MissingPassword { .. }));
    }

    #[test]
    fn discovery_is_only_configured_when_enabled() {
        let mut config = Config::default();
        assert!(to_bridge_config(&config).unwrap().discovery.is_none());

        config.discovery.enabled = true;
        config.discovery.cycles = 3;
        let bridge = to_bridge_config(&config).unwrap();
        assert_eq!(bridge.discovery.unwrap().cycles, 3);
        assert_eq!(bridge.request_timeout, Duration::from_millis(3000));
    }
}
