//! Foreground bridge: poll every configured device until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use shelly_core::{Bridge, TracingReporter};

use crate::cli::{GlobalOpts, RunArgs};
use crate::error::CliError;
use crate::output;

use super::{device, util};

pub async fn handle(args: &RunArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut config = util::load(global)?;
    util::apply_overrides(&mut config, global)?;
    if args.discover {
        config.discovery.enabled = true;
    }

    let mut bridge_config = shelly_config::to_bridge_config(&config)?;
    if let Some(secs) = args.poll_interval {
        bridge_config.poll_interval = Duration::from_secs(secs);
    }
    if bridge_config.devices.is_empty() && bridge_config.discovery.is_none() {
        return Err(CliError::Validation {
            field: "devices".into(),
            reason: "no devices configured and discovery is disabled (try --discover)".into(),
        });
    }

    let bridge = Bridge::new(bridge_config, Arc::new(TracingReporter))?;
    bridge.start().await;
    output::print_output(&device::render_reports(&bridge.snapshot(), global.output)?);

    tokio::signal::ctrl_c().await?;
    tracing::info!("interrupt received, stopping");
    bridge.shutdown().await;

    output::print_output(&device::render_reports(&bridge.snapshot(), global.output)?);
    Ok(())
}
