//! Machines command handler.

use serde::Serialize;
use tabled::Tabled;

use fleetlink_config::Config;
use fleetlink_core::{Life, MachineRecord};

use crate::cli::{GlobalOpts, MachinesArgs};
use crate::config;
use crate::error::CliError;
use crate::output::{self, Tone};

use super::util;

#[derive(Debug, Serialize)]
struct MachineSummary {
    id: String,
    life: Life,
    devices: usize,
    addresses: usize,
    /// Devices currently linked to a provider interface.
    provider_linked: usize,
}

impl From<&MachineRecord> for MachineSummary {
    fn from(m: &MachineRecord) -> Self {
        Self {
            id: m.id.to_string(),
            life: m.life,
            devices: m.devices.len(),
            addresses: m.devices.iter().map(|d| d.addresses.len()).sum(),
            provider_linked: m
                .devices
                .iter()
                .filter(|d| d.provider_id.is_some())
                .count(),
        }
    }
}

#[derive(Tabled)]
struct MachineRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Life")]
    life: String,
    #[tabled(rename = "Devices")]
    devices: usize,
    #[tabled(rename = "Addresses")]
    addresses: usize,
    #[tabled(rename = "Provider-linked")]
    provider_linked: usize,
}

fn row(m: &MachineSummary, color: bool) -> MachineRow {
    let tone = if m.life == Life::Alive {
        Tone::Good
    } else {
        Tone::Warn
    };
    MachineRow {
        id: m.id.clone(),
        life: output::paint(&m.life.to_string(), tone, color),
        devices: m.devices,
        addresses: m.addresses,
        provider_linked: m.provider_linked,
    }
}

pub fn handle(args: &MachinesArgs, global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    let format = config::output_format(global, cfg)?;
    let color = output::should_color(config::color_mode(global, cfg)?);

    let state = util::load_store(&args.state)?.to_state();
    let summaries: Vec<MachineSummary> = state.machines.iter().map(MachineSummary::from).collect();

    let out = output::render_list(format, &summaries, |m| row(m, color))?;
    output::print_output(&out, global.quiet);
    Ok(())
}
