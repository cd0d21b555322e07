// shelly-api: Async Rust client for Shelly relay and RGBW2 devices (HTTP + mDNS)

pub mod color;
pub mod connector;
pub mod discovery;
pub mod error;
pub mod models;
pub mod relay;
pub mod transport;

pub use color::{ColorDevice, MAX_TRANSITION_MS};
pub use connector::{Channels, DeviceConnector};
pub use discovery::{BrowseSession, DiscoveredDevice, DiscoveryConfig, MdnsSession, discover, scan};
pub use error::Error;
pub use models::{
    ButtonType, ColorEffect, ColorState, DeviceInfo, LedColor, LightSettings, PowerOnState,
    PowerState,
};
pub use relay::RelayDevice;
pub use transport::{Credentials, DEFAULT_TIMEOUT, DeviceEndpoint, TransportConfig};
