// ── Link-layer reconciliation ──
//
// Merges a provider-sourced snapshot of one machine's interfaces into the
// machine's persisted link-layer model and produces the operations needed to
// bring the two into agreement:
//
//   1. nameless incoming devices get names from persisted devices
//      (`normalize`),
//   2. each persisted device adopts the provider's identity or relinquishes
//      provider authority (`device`),
//   3. each address on an adopted device is linked to the provider's address
//      or handed back to the machine agent (`address`).
//
// A pass is a pure function of the machine model and the snapshot. All
// bookkeeping lives in a `PassState` that is dropped when `build` returns.

mod address;
mod device;
mod normalize;
mod pass;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::debug;

use crate::error::CoreError;
use crate::link_layer::{LinkLayerAddress, LinkLayerMachine};
use crate::model::{IncomingAddress, IncomingDevice, IncomingSnapshot, MacAddress};
use crate::operation::MergeOutcome;

pub use normalize::{NamingMode, naming_mode};

use self::normalize::normalize_incoming;
use self::pass::PassState;

// ── Options ─────────────────────────────────────────────────────────

/// What to do with a snapshot where some interfaces are named and some are not.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum MixedNamingPolicy {
    /// The first interface decides: if it is nameless, every nameless
    /// interface is name-repaired.
    #[default]
    FirstDevice,
    /// Never name-repair a mixed snapshot.
    Skip,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOptions {
    pub mixed_naming: MixedNamingPolicy,
}

// ── Orchestrator ────────────────────────────────────────────────────

/// One reconciliation pass for one machine.
///
/// Owns its copy of the incoming devices because name normalization
/// rewrites them. Build a new value for every attempt.
pub struct LinkLayerMerge<'m, M: LinkLayerMachine> {
    machine: &'m M,
    incoming: Vec<IncomingDevice>,
    options: MergeOptions,
}

impl<'m, M: LinkLayerMachine> LinkLayerMerge<'m, M> {
    pub fn new(machine: &'m M, incoming: Vec<IncomingDevice>, options: MergeOptions) -> Self {
        Self {
            machine,
            incoming,
            options,
        }
    }

    /// Compute the operations merging the incoming snapshot into the
    /// machine's link-layer model.
    ///
    /// Returns [`MergeOutcome::NoOperations`] when the machine agent has not
    /// reported any devices yet. A non-empty batch always starts with the
    /// machine's assert-alive precondition; an empty batch is returned as-is.
    pub fn build(mut self) -> Result<MergeOutcome, CoreError> {
        let machine_id = self.machine.machine_id();
        let devices = self.machine.all_link_layer_devices()?;

        // Until the machine agent has reported its devices there is nothing
        // to merge into.
        if devices.is_empty() {
            debug!(machine = %machine_id, "no link-layer devices on machine, skipping merge");
            return Ok(MergeOutcome::NoOperations);
        }

        let synthesized =
            normalize_incoming(&mut self.incoming, &devices, self.options.mixed_naming);

        let addresses = group_by_device(self.machine.all_device_addresses()?);

        let mut pass = Pass {
            incoming: &self.incoming,
            addresses: &addresses,
            state: PassState::new(synthesized),
        };

        let mut ops = Vec::new();
        for dev in &devices {
            ops.extend(pass.process_existing_device(dev)?);
        }

        pass.log_unrecognised_devices();

        if ops.is_empty() {
            return Ok(MergeOutcome::Batch(ops));
        }

        let mut batch = Vec::with_capacity(ops.len() + 1);
        batch.push(self.machine.assert_alive_op());
        batch.extend(ops);
        debug!(machine = %machine_id, operations = batch.len(), "link-layer merge built");
        Ok(MergeOutcome::Batch(batch))
    }
}

/// Run a single pass over a fresh copy of `snapshot`.
pub fn merge_link_layer<M: LinkLayerMachine>(
    machine: &M,
    snapshot: &IncomingSnapshot,
    options: &MergeOptions,
) -> Result<MergeOutcome, CoreError> {
    LinkLayerMerge::new(machine, snapshot.devices.clone(), options.clone()).build()
}

fn group_by_device<A: LinkLayerAddress>(addresses: Vec<A>) -> HashMap<String, Vec<A>> {
    let mut by_device: HashMap<String, Vec<A>> = HashMap::new();
    for addr in addresses {
        by_device
            .entry(addr.device_name().to_owned())
            .or_default()
            .push(addr);
    }
    by_device
}

// ── Pass ────────────────────────────────────────────────────────────

/// Inputs and bookkeeping for a single pass. The device and address
/// reconcilers are implemented on this type in their own modules.
struct Pass<'a, A> {
    incoming: &'a [IncomingDevice],
    addresses: &'a HashMap<String, Vec<A>>,
    state: PassState,
}

impl<'a, A: LinkLayerAddress> Pass<'a, A> {
    fn addresses_of(&self, device: &str) -> &'a [A] {
        let addresses: &'a HashMap<String, Vec<A>> = self.addresses;
        addresses.get(device).map(Vec::as_slice).unwrap_or_default()
    }

    /// The first incoming device identified by both name and hardware address.
    fn matching_incoming(&self, name: &str, mac: &MacAddress) -> Option<&'a IncomingDevice> {
        let incoming: &'a [IncomingDevice] = self.incoming;
        incoming.iter().find(|d| d.is_identified_by(name, mac))
    }

    /// Addresses of every incoming device identified by name and hardware address.
    fn matching_incoming_addrs(&self, name: &str, mac: &MacAddress) -> Vec<&'a IncomingAddress> {
        let incoming: &'a [IncomingDevice] = self.incoming;
        incoming
            .iter()
            .filter(|d| d.is_identified_by(name, mac))
            .flat_map(|d| d.addresses.iter())
            .collect()
    }

    /// Incoming devices that matched nothing are logged, never created.
    fn log_unrecognised_devices(&self) {
        for dev in self.incoming {
            if self.state.is_incoming_processed(dev) {
                continue;
            }
            let addresses: Vec<&str> = dev
                .addresses
                .iter()
                .map(|a| a.cidr_address.as_str())
                .collect();
            debug!(
                name = %dev.interface_name,
                mac = %dev.mac_address,
                ?addresses,
                "ignoring unrecognised device"
            );
        }
    }
}
