// Device connector
//
// Wraps one pooled `reqwest::Client` bound to a single device. Handles URL
// construction, Basic auth, the single 401 retry, and classification of
// failures into the crate's error taxonomy. The relay and color profiles
// are built on top of this type in their own modules.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Error;
use crate::models::{DeviceInfo, PowerState};
use crate::transport::{DeviceEndpoint, TransportConfig};

/// How many times a request answered with HTTP 401 is re-sent.
const AUTH_RETRIES: u32 = 1;

/// The JSON key and REST path that carry a device variant's canonical state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channels {
    /// Array key in `/status` whose first entry holds `ison`.
    pub status: &'static str,
    /// Sub-resource that accepts `turn=` commands.
    pub output: &'static str,
}

impl Channels {
    pub const RELAY: Self = Self {
        status: "relays",
        output: "relay/0",
    };

    pub const COLOR: Self = Self {
        status: "lights",
        output: "color/0",
    };
}

/// HTTP client for one device.
///
/// Every public method performs one logical round trip (two requests at
/// most, when the first is rejected with 401). Methods take `&self`; callers
/// that need per-device ordering serialize access themselves.
#[derive(Debug, Clone)]
pub struct DeviceConnector {
    http: reqwest::Client,
    endpoint: DeviceEndpoint,
    channels: Channels,
    timeout: Duration,
    in_flight: Arc<AtomicUsize>,
}

impl DeviceConnector {
    /// Create a connector with its own client built from `transport`.
    pub fn new(
        endpoint: DeviceEndpoint,
        channels: Channels,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, endpoint, channels, transport.timeout))
    }

    /// Create a connector around a pre-built `reqwest::Client`.
    ///
    /// `timeout` is only used for error reporting; the bound itself is
    /// whatever the client was built with.
    pub fn with_client(
        http: reqwest::Client,
        endpoint: DeviceEndpoint,
        channels: Channels,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            endpoint,
            channels,
            timeout,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn host(&self) -> &str {
        self.endpoint.host()
    }

    pub fn endpoint(&self) -> &DeviceEndpoint {
        &self.endpoint
    }

    pub fn channels(&self) -> Channels {
        self.channels
    }

    /// Requests currently awaiting a response.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    // ── Device information ───────────────────────────────────────────

    /// `GET /settings`
    pub async fn get_settings(&self) -> Result<Value, Error> {
        self.get_json("settings", &[]).await
    }

    /// `GET /status`
    pub async fn get_status(&self) -> Result<Value, Error> {
        self.get_json("status", &[]).await
    }

    /// `GET /shelly`: identification, no authentication required.
    pub async fn get_device_info(&self) -> Result<DeviceInfo, Error> {
        let doc = self.get_json("shelly", &[]).await?;
        decode("shelly", "shelly", doc)
    }

    /// Read `status[<status channel>][0].ison`.
    pub async fn get_is_on(&self) -> Result<bool, Error> {
        let status = self.get_status().await?;
        channel_is_on(&status, self.channels.status, "status")
    }

    // ── Power ────────────────────────────────────────────────────────

    /// Turn the output on, optionally flipping back after `timer` seconds.
    pub async fn turn_on(&self, timer: Option<u32>) -> Result<(), Error> {
        self.set_power_state(PowerState::On, timer).await
    }

    pub async fn turn_off(&self) -> Result<(), Error> {
        self.set_power_state(PowerState::Off, None).await
    }

    /// `GET /<output channel>?turn=<state>[&timer=N]`
    pub async fn set_power_state(&self, state: PowerState, timer: Option<u32>) -> Result<(), Error> {
        let mut query = vec![("turn", state.to_string())];
        if let Some(timer) = timer {
            query.push(("timer", timer.to_string()));
        }
        debug!(host = self.host(), %state, ?timer, "setting power state");
        self.send(self.channels.output, &query).await.map(drop)
    }

    /// `GET /reboot`. The body is ignored.
    pub async fn reboot(&self) -> Result<(), Error> {
        debug!(host = self.host(), "rebooting device");
        self.send("reboot", &[]).await.map(drop)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET and parse the body as a JSON object.
    pub(crate) async fn get_json(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<Value, Error> {
        let body = self.send(endpoint, query).await?;
        parse_object(endpoint, &body)
    }

    /// Send a GET and return the raw body of a 2xx response.
    ///
    /// HTTP 401 is retried exactly once. The in-flight counter covers the
    /// whole call and is released on every exit path, including when the
    /// caller drops the future.
    pub(crate) async fn send(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<String, Error> {
        let url = self.endpoint.url(endpoint)?;
        let _guard = InFlight::enter(&self.in_flight);
        let mut retries_left = AUTH_RETRIES;

        loop {
            debug!(host = self.host(), %url, ?query, "GET");

            let mut request = self.http.get(url.clone());
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(credentials) = self.endpoint.credentials() {
                request = credentials.apply(request);
            }

            let response = request.send().await.map_err(|e| self.classify(e))?;
            let status = response.status();

            if status == StatusCode::UNAUTHORIZED {
                if retries_left > 0 {
                    retries_left -= 1;
                    debug!(host = self.host(), endpoint, "401 from device, retrying");
                    continue;
                }
                warn!(host = self.host(), endpoint, "authentication rejected after retry");
                return Err(Error::AuthFailed {
                    host: self.host().to_owned(),
                });
            }

            if !status.is_success() {
                return Err(Error::HttpStatus {
                    endpoint: endpoint.to_owned(),
                    status: status.as_u16(),
                });
            }

            return response.text().await.map_err(|e| self.classify(e));
        }
    }

    /// Map a transport failure onto the reachability taxonomy.
    fn classify(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                host: self.host().to_owned(),
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }
        } else if err.is_connect() {
            Error::Unreachable {
                host: self.host().to_owned(),
                reason: root_cause(&err),
            }
        } else {
            Error::Transport(err)
        }
    }
}

// ── In-flight accounting ─────────────────────────────────────────────

struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

// ── Decoding ─────────────────────────────────────────────────────────

fn root_cause(err: &(dyn std::error::Error + 'static)) -> String {
    let mut current = err;
    while let Some(source) = current.source() {
        current = source;
    }
    current.to_string()
}

/// Parse a body that must be a JSON object.
pub(crate) fn parse_object(endpoint: &str, body: &str) -> Result<Value, Error> {
    let value: Value = serde_json::from_str(body).map_err(|e| Error::MalformedResponse {
        endpoint: endpoint.to_owned(),
        message: e.to_string(),
        body: body.to_owned(),
    })?;

    if value.is_object() {
        Ok(value)
    } else {
        Err(Error::MalformedResponse {
            endpoint: endpoint.to_owned(),
            message: "expected a JSON object".into(),
            body: body.to_owned(),
        })
    }
}

/// Decode a parsed document into a typed schema.
///
/// Structural mismatches (missing or mistyped fields) are protocol
/// violations: the device answered with JSON, just not the JSON we need.
pub(crate) fn decode<T: DeserializeOwned>(
    endpoint: &str,
    field: &str,
    value: Value,
) -> Result<T, Error> {
    serde_json::from_value(value).map_err(|e| Error::ProtocolViolation {
        endpoint: endpoint.to_owned(),
        field: field.to_owned(),
        message: e.to_string(),
    })
}

/// First entry of the array stored under `channel`.
pub(crate) fn first_channel<'a>(
    doc: &'a Value,
    channel: &str,
    endpoint: &str,
) -> Result<&'a Value, Error> {
    doc.get(channel)
        .and_then(Value::as_array)
        .and_then(|entries| entries.first())
        .ok_or_else(|| Error::ProtocolViolation {
            endpoint: endpoint.to_owned(),
            field: format!("{channel}[0]"),
            message: "is missing".into(),
        })
}

/// `doc[channel][0].ison`, with absence reported rather than defaulted.
pub(crate) fn channel_is_on(doc: &Value, channel: &str, endpoint: &str) -> Result<bool, Error> {
    first_channel(doc, channel, endpoint)?
        .get("ison")
        .and_then(Value::as_bool)
        .ok_or_else(|| Error::ProtocolViolation {
            endpoint: endpoint.to_owned(),
            field: format!("{channel}[0].ison"),
            message: "is missing or not a boolean".into(),
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn ison_is_read_from_first_channel() {
        let doc = json!({ "relays": [{ "ison": true }, { "ison": false }] });
        assert!(channel_is_on(&doc, "relays", "status").unwrap());
    }

    #[test]
    fn missing_channel_is_protocol_violation() {
        let doc = json!({ "lights": [] });
        let err = channel_is_on(&doc, "lights", "status").unwrap_err();
        assert!(
            matches!(err, Error::ProtocolViolation { ref field, .. } if field == "lights[0]"),
            "got {err:?}"
        );
    }

    #[test]
    fn non_boolean_ison_is_protocol_violation() {
        let doc = json!({ "relays": [{ "ison": "yes" }] });
        let err = channel_is_on(&doc, "relays", "status").unwrap_err();
        assert!(matches!(err, Error::ProtocolViolation { .. }));
    }

    #[test]
    fn non_json_body_is_malformed() {
        let err = parse_object("status", "<html>oops</html>").unwrap_err();
        assert!(matches!(err, Error::MalformedResponse { .. }));
    }

    #[test]
    fn json_array_body_is_malformed() {
        let err = parse_object("status", "[1, 2]").unwrap_err();
        assert!(matches!(err, Error::MalformedResponse { .. }));
    }

    #[test]
    fn in_flight_guard_releases_on_drop() {
        let counter = AtomicUsize::new(0);
        {
            let _a = InFlight::enter(&counter);
            let _b = InFlight::enter(&counter);
            assert_eq!(counter.load(Ordering::SeqCst), 2);
        }
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
