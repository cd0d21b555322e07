// Shared transport configuration for device HTTP clients.
//
// Every connector owns one pooled `reqwest::Client` built from this config.
// Devices live on the LAN, so the default timeout is short: a stalled device
// must not hold up a poll round.

use std::fmt;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::error::Error;

/// Default per-request bound for device calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// HTTP Basic credentials for a device with restricted login enabled.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }

    pub(crate) fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.basic_auth(&self.username, Some(self.password.expose_secret()))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Identifies one physical device: host (IP or `ip:port`), optional
/// credentials, and the derived base URL. Immutable after construction.
#[derive(Debug, Clone)]
pub struct DeviceEndpoint {
    host: String,
    credentials: Option<Credentials>,
    base_url: Url,
}

impl DeviceEndpoint {
    /// Build an endpoint for `host`. Accepts `192.168.1.20`,
    /// `192.168.1.20:8080`, or a full `http://` URL.
    pub fn new(host: impl Into<String>, credentials: Option<Credentials>) -> Result<Self, Error> {
        let host = host.into();
        let trimmed = host.trim().trim_end_matches('/');
        let base = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            format!("{trimmed}/")
        } else {
            format!("http://{trimmed}/")
        };
        let base_url = Url::parse(&base)?;
        Ok(Self {
            host: trimmed.to_owned(),
            credentials,
            base_url,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Join a REST sub-resource (`relay/0`, `settings/color/0`) onto the base URL.
    pub(crate) fn url(&self, endpoint: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(endpoint.trim_start_matches('/'))?)
    }
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: concat!("shelly-bridge/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}

impl TransportConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.timeout)
            .user_agent(self.user_agent.as_str())
            .build()
            .map_err(Error::Transport)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_derives_base_url_from_bare_ip() {
        let ep = DeviceEndpoint::new("192.168.3.64", None).unwrap();
        assert_eq!(ep.base_url().as_str(), "http://192.168.3.64/");
        assert_eq!(ep.host(), "192.168.3.64");
    }

    #[test]
    fn endpoint_keeps_port_and_scheme() {
        let ep = DeviceEndpoint::new("http://127.0.0.1:8080/", None).unwrap();
        assert_eq!(ep.base_url().as_str(), "http://127.0.0.1:8080/");
        assert_eq!(
            ep.url("settings/color/0").unwrap().as_str(),
            "http://127.0.0.1:8080/settings/color/0"
        );
    }

    #[test]
    fn credentials_debug_is_redacted() {
        let creds = Credentials::new("admin", SecretString::from("hunter2".to_string()));
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("hunter2"));
    }
}
