//! mDNS scan command.

use chrono::{DateTime, Utc};
use serde::Serialize;
use shelly_core::DeviceKind;
use tabled::Tabled;

use crate::cli::{DiscoverArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Debug, Serialize)]
struct Found {
    id: Option<String>,
    kind: Option<DeviceKind>,
    name: String,
    address: String,
    discovered_at: DateTime<Utc>,
}

#[derive(Tabled)]
struct FoundRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Advertised Name")]
    name: String,
}

impl From<&Found> for FoundRow {
    fn from(f: &Found) -> Self {
        Self {
            id: f.id.clone().unwrap_or_else(|| "-".into()),
            kind: f.kind.map_or_else(|| "-".into(), |k| k.to_string()),
            address: f.address.clone(),
            name: f.name.clone(),
        }
    }
}

pub async fn handle(args: &DiscoverArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let config = util::load(global)?;
    let mut discovery = config.discovery.to_discovery_config();
    if let Some(cycles) = args.cycles {
        discovery.cycles = cycles;
    }
    if let Some(wait_ms) = args.wait_ms {
        discovery.wait = std::time::Duration::from_millis(wait_ms);
    }
    if let Some(ref service_type) = args.service_type {
        discovery.service_type.clone_from(service_type);
    }

    tracing::info!(
        service = %discovery.service_type,
        cycles = discovery.cycles,
        "browsing for devices"
    );
    let found = shelly_api::discover(&discovery).await?;

    let mut devices: Vec<Found> = found
        .into_values()
        .map(|d| {
            let identity = shelly_core::normalize(&d.name, &discovery.service_type);
            Found {
                id: identity.as_ref().map(|i| i.id.clone()),
                kind: identity.map(|i| i.kind),
                name: d.name,
                address: d.address.to_string(),
                discovered_at: d.discovered_at,
            }
        })
        .collect();
    devices.sort_by(|a, b| a.name.cmp(&b.name));

    let out = output::render_list(
        global.output,
        &devices,
        |f| FoundRow::from(f),
        |f| f.id.clone().unwrap_or_else(|| f.name.clone()),
    )?;
    output::print_output(&out);
    Ok(())
}
