#![allow(clippy::unwrap_used)]
// Loading tests: TOML files, env overrides, and translation to BridgeConfig.
//
// Every test that loads runs inside a figment `Jail`, which serializes
// access to the process environment.

use std::path::Path;
use std::time::Duration;

use figment::Jail;
use pretty_assertions::assert_eq;

use shelly_config::{
    Config, ConfigError, DeviceEntry, load_config_from, save_config, to_bridge_config,
};
use shelly_core::DeviceKind;

const SAMPLE: &str = r#"
poll_interval_secs = 15
timeout_ms = 2500

[discovery]
enabled = true
cycles = 4
wait_ms = 250

[[devices]]
name = "Porch"
host = "192.168.3.64"
kind = "color"

[[devices]]
name = "Garage"
id = "SHELLY1_GARAGE"
host = "192.168.3.70"
kind = "relay"
username = "admin"
password = "hunter2"
"#;

#[test]
fn test_load_from_toml_file() {
    Jail::expect_with(|jail| {
        jail.create_file("shelly-bridge.toml", SAMPLE)?;
        let config = load_config_from(Path::new("shelly-bridge.toml")).unwrap();
        check_sample(&config);
        Ok(())
    });
}

fn check_sample(config: &Config) {
    assert_eq!(config.poll_interval_secs, 15);
    assert_eq!(config.devices.len(), 2);
    assert_eq!(config.devices[0].kind, DeviceKind::Color);
    assert_eq!(config.devices[1].id(), "SHELLY1_GARAGE");
    assert_eq!(config.discovery.cycles, 4);
    assert_eq!(config.discovery.resolve_timeout_ms, 1000);

    let bridge = to_bridge_config(config).unwrap();
    assert_eq!(bridge.request_timeout, Duration::from_millis(2500));
    assert_eq!(bridge.poll_interval, Duration::from_secs(15));
    assert!(bridge.devices[1].credentials.is_some());
    let discovery = bridge.discovery.unwrap();
    assert_eq!(discovery.wait, Duration::from_millis(250));
}

#[test]
fn test_missing_file_yields_defaults() {
    Jail::expect_with(|_jail| {
        let config = load_config_from(Path::new("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
        Ok(())
    });
}

#[test]
fn test_duplicate_ids_are_rejected() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "dup.toml",
            r#"
[[devices]]
name = "Porch"
host = "192.168.3.64"
kind = "color"

[[devices]]
name = "Porch"
host = "192.168.3.65"
kind = "relay"
"#,
        )?;

        let err = load_config_from(Path::new("dup.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }), "got {err:?}");
        Ok(())
    });
}

#[test]
fn test_zero_discovery_interval_is_rejected() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "scan.toml",
            "[discovery]\nenabled = true\ninterval_secs = 0\n",
        )?;

        let err = load_config_from(Path::new("scan.toml")).unwrap_err();
        match err {
            ConfigError::Validation { field, .. } => {
                assert_eq!(field, "discovery.interval_secs");
            }
            other => panic!("expected validation error, got {other:?}"),
        }

        // Via env, too.
        jail.create_file("scan.toml", "[discovery]\nenabled = true\n")?;
        jail.set_env("SHELLY_DISCOVERY__INTERVAL_SECS", "0");
        assert!(matches!(
            load_config_from(Path::new("scan.toml")),
            Err(ConfigError::Validation { .. })
        ));
        Ok(())
    });
}

#[test]
fn test_zero_discovery_interval_is_fine_when_disabled() {
    Jail::expect_with(|jail| {
        jail.create_file("scan.toml", "[discovery]\ninterval_secs = 0\n")?;

        let config = load_config_from(Path::new("scan.toml")).unwrap();
        assert!(!config.discovery.enabled);
        Ok(())
    });
}

#[test]
fn test_unknown_kind_is_a_load_error() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "bad.toml",
            "[[devices]]\nname = \"Lamp\"\nhost = \"10.0.0.9\"\nkind = \"dimmer\"\n",
        )?;

        assert!(matches!(
            load_config_from(Path::new("bad.toml")),
            Err(ConfigError::Figment(_))
        ));
        Ok(())
    });
}

#[test]
fn test_save_then_load_preserves_devices() {
    Jail::expect_with(|_jail| {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("shelly-bridge.toml");

        let mut config = Config::default();
        config
            .devices
            .push(DeviceEntry::new("Deck", "192.168.3.80", DeviceKind::Relay));
        save_config(&config, &path).unwrap();

        assert_eq!(load_config_from(&path).unwrap(), config);
        Ok(())
    });
}

#[test]
fn test_env_overrides_file() {
    Jail::expect_with(|jail| {
        jail.create_file("shelly-bridge.toml", SAMPLE)?;
        jail.set_env("SHELLY_POLL_INTERVAL_SECS", "42");
        jail.set_env("SHELLY_DISCOVERY__ENABLED", "false");

        let config = load_config_from(Path::new("shelly-bridge.toml")).unwrap();
        assert_eq!(config.poll_interval_secs, 42);
        assert!(!config.discovery.enabled);
        assert_eq!(config.timeout_ms, 2500);
        Ok(())
    });
}

#[test]
fn test_password_env_is_resolved() {
    Jail::expect_with(|jail| {
        jail.set_env("PORCH_PW", "s3cret");

        let mut entry = DeviceEntry::new("Porch", "192.168.3.64", DeviceKind::Color);
        entry.username = Some("admin".into());
        entry.password_env = Some("PORCH_PW".into());

        let device = shelly_config::entry_to_device_config(&entry).unwrap();
        assert!(device.credentials.is_some());
        Ok(())
    });
}
