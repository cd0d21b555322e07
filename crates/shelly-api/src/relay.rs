// Relay profile (Shelly1)
//
// Single on/off output: status lives under `relays[0]`, control under
// `relay/0`. No color state.

use crate::connector::{Channels, DeviceConnector};
use crate::error::Error;
use crate::models::PowerState;
use crate::transport::{DeviceEndpoint, TransportConfig};

/// A single-relay switch.
#[derive(Debug, Clone)]
pub struct RelayDevice {
    connector: DeviceConnector,
}

impl RelayDevice {
    pub fn new(endpoint: DeviceEndpoint, transport: &TransportConfig) -> Result<Self, Error> {
        let connector = DeviceConnector::new(endpoint, Channels::RELAY, transport)?;
        Ok(Self { connector })
    }

    /// Wrap an existing connector, forcing the relay channels onto it.
    pub fn from_client(
        http: reqwest::Client,
        endpoint: DeviceEndpoint,
        transport: &TransportConfig,
    ) -> Self {
        Self {
            connector: DeviceConnector::with_client(
                http,
                endpoint,
                Channels::RELAY,
                transport.timeout,
            ),
        }
    }

    pub fn connector(&self) -> &DeviceConnector {
        &self.connector
    }

    pub async fn turn_on(&self, timer: Option<u32>) -> Result<(), Error> {
        self.connector.turn_on(timer).await
    }

    pub async fn turn_off(&self) -> Result<(), Error> {
        self.connector.turn_off().await
    }

    pub async fn toggle(&self) -> Result<(), Error> {
        self.connector.set_power_state(PowerState::Toggle, None).await
    }

    pub async fn is_on(&self) -> Result<bool, Error> {
        self.connector.get_is_on().await
    }
}
