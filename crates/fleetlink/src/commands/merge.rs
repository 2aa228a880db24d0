//! Merge command handler.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tabled::Tabled;
use tracing::{debug, info};

use fleetlink_config::Config;
use fleetlink_core::{IncomingSnapshot, MergeOutcome, Operation, reconcile_machine};

use crate::cli::{GlobalOpts, MergeArgs};
use crate::config;
use crate::error::CliError;
use crate::output::{self, Tone};

use super::util;

// ── Report ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct MergeReport<'a> {
    machine: &'a str,
    attempts: u32,
    revision: u64,
    /// Whether the reconciled model was written back to the state file.
    written: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    outcome: &'a MergeOutcome,
}

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct OperationRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Operation")]
    kind: &'static str,
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn cleared(color: bool) -> String {
    output::paint("(clear)", Tone::Warn, color)
}

fn operation_row(index: usize, op: &Operation, color: bool) -> OperationRow {
    let (device, address, value) = match op {
        Operation::AssertAlive { machine } => (
            String::new(),
            String::new(),
            output::paint(&format!("machine {machine} alive"), Tone::Muted, color),
        ),
        Operation::SetDeviceProviderId {
            device,
            provider_id,
            ..
        } => (
            device.clone(),
            String::new(),
            provider_id
                .as_ref()
                .map_or_else(|| cleared(color), |p| output::paint(p.as_str(), Tone::Good, color)),
        ),
        Operation::SetAddressProviderId {
            device,
            address,
            provider_id,
            ..
        } => (
            device.clone(),
            address.clone(),
            provider_id
                .as_ref()
                .map_or_else(|| cleared(color), |p| output::paint(p.as_str(), Tone::Good, color)),
        ),
        Operation::SetAddressProviderNetIds {
            device,
            address,
            network_id,
            subnet_id,
            ..
        } => (
            device.clone(),
            address.clone(),
            format!(
                "network={} subnet={}",
                network_id.as_deref().unwrap_or("-"),
                subnet_id.as_deref().unwrap_or("-")
            ),
        ),
        Operation::SetAddressOrigin {
            device,
            address,
            origin,
            ..
        } => (
            device.clone(),
            address.clone(),
            output::paint(&origin.to_string(), Tone::Warn, color),
        ),
    };
    OperationRow {
        index,
        kind: op.kind(),
        device,
        address,
        value,
    }
}

fn detail(report: &MergeReport<'_>, color: bool) -> String {
    let ops = match report.outcome {
        MergeOutcome::NoOperations => {
            return format!(
                "no operations: machine {} has no link-layer devices yet",
                report.machine
            );
        }
        MergeOutcome::Batch(ops) if ops.is_empty() => {
            return format!("machine {} is already in sync", report.machine);
        }
        MergeOutcome::Batch(ops) => ops,
    };

    let rows: Vec<OperationRow> = ops
        .iter()
        .enumerate()
        .map(|(i, op)| operation_row(i + 1, op, color))
        .collect();
    let status = if report.written {
        output::paint("written", Tone::Good, color)
    } else {
        output::paint("dry run, pass --apply to write", Tone::Muted, color)
    };
    format!(
        "{}\n{} operations, attempt {}, revision {} ({status})",
        output::render_table(&rows),
        ops.len(),
        report.attempts,
        report.revision,
    )
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: &MergeArgs, global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    let format = config::output_format(global, cfg)?;
    let color = output::should_color(config::color_mode(global, cfg)?);
    let (merge, txn) = config::merge_options(args, cfg);

    let machine_id = util::machine_id(&args.machine)?;
    let store = util::load_store(&args.state)?;
    let incoming: IncomingSnapshot = util::read_document(&args.incoming)?;
    if incoming.is_empty() {
        debug!(machine = %machine_id, "provider reported no interfaces");
    }

    let report = reconcile_machine(&store, &machine_id, &incoming, &merge, &txn)?;

    let written = args.apply && report.applied();
    if written {
        util::write_document(&args.state, &store.to_state())?;
        info!(
            machine = %machine_id,
            path = %args.state.display(),
            operations = report.outcome.operations().len(),
            "wrote reconciled model"
        );
    }

    let summary = MergeReport {
        machine: machine_id.as_str(),
        attempts: report.attempts,
        revision: report.revision,
        written,
        updated_at: store.last_updated(&machine_id),
        outcome: &report.outcome,
    };
    let out = output::render_single(format, &summary, |r| detail(r, color))?;
    output::print_output(&out, global.quiet);
    Ok(())
}
