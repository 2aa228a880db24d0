//! Devices command handler.

use tabled::Tabled;

use fleetlink_config::Config;
use fleetlink_core::{AddressRecord, DeviceRecord, Origin};

use crate::cli::{DevicesArgs, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output::{self, Tone};

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "Type")]
    dtype: String,
    #[tabled(rename = "Provider ID")]
    provider_id: String,
    #[tabled(rename = "Addresses")]
    addresses: String,
}

fn address_line(a: &AddressRecord, color: bool) -> String {
    let origin = match a.origin {
        Origin::Provider => output::paint("provider", Tone::Good, color),
        Origin::Machine => output::paint("machine", Tone::Muted, color),
    };
    match &a.provider_id {
        Some(pid) => format!("{} [{origin}] {pid}", a.value),
        None => format!("{} [{origin}]", a.value),
    }
}

fn row(d: &DeviceRecord, color: bool) -> DeviceRow {
    DeviceRow {
        name: d.name.clone(),
        mac: d.mac_address.to_string(),
        dtype: d.device_type.to_string(),
        provider_id: d
            .provider_id
            .as_ref()
            .map_or_else(|| "-".into(), ToString::to_string),
        addresses: d
            .addresses
            .iter()
            .map(|a| address_line(a, color))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: &DevicesArgs, global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    let format = config::output_format(global, cfg)?;
    let color = output::should_color(config::color_mode(global, cfg)?);

    let machine_id = util::machine_id(&args.machine)?;
    let snapshot = util::load_store(&args.state)?.machine(&machine_id)?;

    let out = output::render_list(format, snapshot.devices(), |d| row(d, color))?;
    output::print_output(&out, global.quiet);
    Ok(())
}
