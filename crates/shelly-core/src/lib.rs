// shelly-core: Status/command façade between Shelly devices and a host (polling, commands, discovery).

pub mod bridge;
pub mod command;
pub mod config;
pub mod device;
pub mod error;
pub mod naming;
pub mod report;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bridge::Bridge;
pub use command::{CommandKind, CommandParams, NodeCommand, validate_command_table};
pub use config::{BridgeConfig, DeviceConfig, DeviceKind};
pub use device::{DeviceHandle, DeviceProfile};
pub use error::CoreError;
pub use naming::{DeviceIdentity, normalize};
pub use report::{
    Attribute, Availability, ColorSnapshot, DeviceReport, DeviceState, Reporter, TracingReporter,
};
