//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with help
//! text and process exit codes.

use miette::Diagnostic;
use thiserror::Error;

use shelly_config::ConfigError;
use shelly_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const UNSUPPORTED: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Reachability ─────────────────────────────────────────────────
    #[error("Could not reach device at {host}")]
    #[diagnostic(
        code(shelly::offline),
        help(
            "Check that the device is powered and on this network.\n\
             Reason: {reason}"
        )
    )]
    Offline { host: String, reason: String },

    #[error("Device at {host} did not answer within {timeout_ms}ms")]
    #[diagnostic(
        code(shelly::timeout),
        help("Increase the limit with --timeout or check the device's Wi-Fi signal.")
    )]
    Timeout { host: String, timeout_ms: u64 },

    #[error("Authentication failed for {host}")]
    #[diagnostic(
        code(shelly::auth_failed),
        help(
            "Set username and password (or password_env) for this device\n\
             in the config file. Run: shelly-bridge config path"
        )
    )]
    AuthFailed { host: String },

    #[error("Unexpected response: {message}")]
    #[diagnostic(
        code(shelly::invalid_response),
        help("The device firmware may not match the selected profile (--kind).")
    )]
    InvalidResponse { message: String },

    // ── Lookup ───────────────────────────────────────────────────────
    #[error("Device '{identifier}' not found")]
    #[diagnostic(
        code(shelly::not_found),
        help(
            "Use a name from the config file, or pass a raw host with\n\
             --kind relay|color. Run: shelly-bridge discover"
        )
    )]
    NotFound { identifier: String },

    // ── Arguments ────────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(shelly::validation))]
    Validation { field: String, reason: String },

    #[error("{operation} is not supported by {kind} devices")]
    #[diagnostic(
        code(shelly::unsupported),
        help("Color, effect, and transition commands need an RGBW2 (--kind color).")
    )]
    Unsupported { operation: String, kind: String },

    // ── Discovery / configuration ────────────────────────────────────
    #[error("mDNS discovery failed: {message}")]
    #[diagnostic(
        code(shelly::discovery),
        help("Multicast may be blocked on this interface or by a firewall.")
    )]
    Discovery { message: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(shelly::config),
        help("Expected at: {path}")
    )]
    Config { message: String, path: String },

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not render output: {0}")]
    #[diagnostic(code(shelly::render))]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Offline { .. } | Self::Discovery { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } => exit_code::USAGE,
            Self::Unsupported { .. } => exit_code::UNSUPPORTED,
            Self::InvalidResponse { .. } | Self::Config { .. } | Self::Io(_) | Self::Render(_) => {
                exit_code::GENERAL
            }
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::DeviceOffline { host, reason } => Self::Offline { host, reason },
            CoreError::Timeout { host, timeout_ms } => Self::Timeout { host, timeout_ms },
            CoreError::AuthenticationFailed { host } => Self::AuthFailed { host },
            CoreError::InvalidResponse { message } => Self::InvalidResponse { message },
            CoreError::DeviceNotFound { identifier } => Self::NotFound { identifier },
            CoreError::InvalidArgument { field, reason } => Self::Validation { field, reason },
            CoreError::UnknownCommand { name } => Self::Validation {
                field: "command".into(),
                reason: format!("unknown command {name}"),
            },
            CoreError::MissingParameter { command, parameter } => Self::Validation {
                field: parameter.into(),
                reason: format!("required by {command}"),
            },
            CoreError::Unsupported { operation, kind } => Self::Unsupported {
                operation: operation.into(),
                kind: kind.into(),
            },
            CoreError::Discovery { message } => Self::Discovery { message },
            CoreError::Config { message } => Self::Config {
                message,
                path: shelly_config::config_path().display().to_string(),
            },
        }
    }
}

impl From<shelly_api::Error> for CliError {
    fn from(err: shelly_api::Error) -> Self {
        CoreError::from(err).into()
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::Io(e) => Self::Io(e),
            other => Self::Config {
                message: other.to_string(),
                path: shelly_config::config_path().display().to_string(),
            },
        }
    }
}
