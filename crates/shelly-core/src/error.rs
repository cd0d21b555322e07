// ── Core error types ──
//
// Bridge-level errors. Consumers see reachability, authentication, and
// command problems in device terms, never raw HTTP statuses or JSON
// decode failures. `From<shelly_api::Error>` does the translation.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Device errors ────────────────────────────────────────────────
    #[error("Device {host} is offline: {reason}")]
    DeviceOffline { host: String, reason: String },

    #[error("Device {host} timed out after {timeout_ms}ms")]
    Timeout { host: String, timeout_ms: u64 },

    #[error("Authentication failed for {host}")]
    AuthenticationFailed { host: String },

    #[error("Invalid response from device: {message}")]
    InvalidResponse { message: String },

    #[error("Device not found: {identifier}")]
    DeviceNotFound { identifier: String },

    // ── Command errors ───────────────────────────────────────────────
    #[error("Invalid {field}: {reason}")]
    InvalidArgument { field: String, reason: String },

    #[error("Unknown command: {name}")]
    UnknownCommand { name: String },

    #[error("Command {command} is missing parameter {parameter}")]
    MissingParameter {
        command: &'static str,
        parameter: &'static str,
    },

    #[error("Operation not supported: {operation} on a {kind} device")]
    Unsupported {
        operation: &'static str,
        kind: &'static str,
    },

    // ── Discovery / configuration ────────────────────────────────────
    #[error("Discovery failed: {message}")]
    Discovery { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// `true` when the device could not be reached at all.
    pub fn is_offline(&self) -> bool {
        matches!(self, Self::DeviceOffline { .. } | Self::Timeout { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<shelly_api::Error> for CoreError {
    fn from(err: shelly_api::Error) -> Self {
        use shelly_api::Error as Api;

        match err {
            Api::Unreachable { host, reason } => CoreError::DeviceOffline { host, reason },
            Api::Timeout { host, timeout_ms } => CoreError::Timeout { host, timeout_ms },
            Api::AuthFailed { host } => CoreError::AuthenticationFailed { host },
            Api::MalformedResponse {
                endpoint, message, ..
            } => CoreError::InvalidResponse {
                message: format!("{endpoint}: {message}"),
            },
            Api::ProtocolViolation {
                endpoint,
                field,
                message,
            } => CoreError::InvalidResponse {
                message: format!("{endpoint}: {field} {message}"),
            },
            Api::HttpStatus { endpoint, status } => CoreError::InvalidResponse {
                message: format!("{endpoint}: HTTP {status}"),
            },
            Api::InvalidArgument { field, reason } => CoreError::InvalidArgument {
                field: field.to_owned(),
                reason,
            },
            Api::Transport(e) => CoreError::DeviceOffline {
                host: e
                    .url()
                    .and_then(|u| u.host_str().map(str::to_owned))
                    .unwrap_or_else(|| "<unknown>".into()),
                reason: e.to_string(),
            },
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid device address: {e}"),
            },
            Api::Discovery(message) => CoreError::Discovery { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reachability_errors_map_to_offline() {
        let err: CoreError = shelly_api::Error::Unreachable {
            host: "10.0.0.5".into(),
            reason: "connection refused".into(),
        }
        .into();
        assert!(err.is_offline());

        let err: CoreError = shelly_api::Error::Timeout {
            host: "10.0.0.5".into(),
            timeout_ms: 3000,
        }
        .into();
        assert!(err.is_offline());
    }

    #[test]
    fn protocol_violation_is_invalid_response() {
        let err: CoreError = shelly_api::Error::ProtocolViolation {
            endpoint: "status".into(),
            field: "relays[0].ison".into(),
            message: "is missing".into(),
        }
        .into();
        assert!(matches!(err, CoreError::InvalidResponse { .. }));
        assert!(!err.is_offline());
    }
}
