use thiserror::Error;

/// Top-level error type for the `shelly-api` crate.
///
/// Every connector, profile, and discovery call reports failures through
/// this enum. The variants keep "could not reach the device" apart from
/// "reached it but the answer made no sense", so callers can mark a device
/// offline without ever mistaking a failed read for an "off" reading.
/// `shelly-core` maps these into bridge-level diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Reachability ────────────────────────────────────────────────
    /// Connection refused, host down, or no route to the device.
    #[error("Device at {host} is unreachable: {reason}")]
    Unreachable { host: String, reason: String },

    /// No response within the per-request bound.
    #[error("Request to {host} timed out after {timeout_ms}ms")]
    Timeout { host: String, timeout_ms: u64 },

    // ── Authentication ──────────────────────────────────────────────
    /// HTTP 401 on the original request and on its single retry.
    #[error("Authentication rejected by {host}")]
    AuthFailed { host: String },

    // ── Responses ───────────────────────────────────────────────────
    /// 2xx response whose body is not the expected JSON.
    #[error("Malformed response from {endpoint}: {message}")]
    MalformedResponse {
        endpoint: String,
        message: String,
        body: String,
    },

    /// Well-formed JSON that lacks a field the protocol requires.
    #[error("Protocol violation at {endpoint}: {field} {message}")]
    ProtocolViolation {
        endpoint: String,
        field: String,
        message: String,
    },

    /// Non-2xx status other than 401.
    #[error("Device returned HTTP {status} for {endpoint}")]
    HttpStatus { endpoint: String, status: u16 },

    // ── Local validation ────────────────────────────────────────────
    /// Parameter rejected before any request was sent.
    #[error("Invalid {field}: {reason}")]
    InvalidArgument { field: &'static str, reason: String },

    // ── Transport ───────────────────────────────────────────────────
    /// Any other HTTP transport failure.
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Device host could not be turned into a base URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Discovery ───────────────────────────────────────────────────
    /// The mDNS browse session could not be opened.
    #[error("mDNS discovery failed: {0}")]
    Discovery(String),
}

impl Error {
    /// Returns `true` if the device could not be reached at all.
    pub fn is_offline(&self) -> bool {
        matches!(self, Self::Unreachable { .. } | Self::Timeout { .. })
    }

    /// Returns `true` if the device answered but the answer was unusable.
    pub fn is_bad_response(&self) -> bool {
        matches!(
            self,
            Self::MalformedResponse { .. } | Self::ProtocolViolation { .. }
        )
    }

    /// Returns `true` if the request never left the process.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. } | Self::InvalidUrl(_))
    }

    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field,
            reason: reason.into(),
        }
    }
}

impl From<mdns_sd::Error> for Error {
    fn from(err: mdns_sd::Error) -> Self {
        Self::Discovery(err.to_string())
    }
}
