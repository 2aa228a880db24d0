// ── Mutation descriptors ──
//
// The engine never mutates the model directly. It emits `Operation` values
// that an external transactional store applies as one atomic batch.

use serde::{Deserialize, Serialize};

use crate::model::{MachineId, Origin, ProviderId};

/// A single model mutation, or a precondition the batch depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum Operation {
    /// Precondition: the machine has not been destroyed concurrently.
    AssertAlive { machine: MachineId },

    /// Set or clear (`None`) a device's provider ID.
    SetDeviceProviderId {
        machine: MachineId,
        device: String,
        provider_id: Option<ProviderId>,
    },

    /// Set or clear an address's provider ID. Setting a value also hands
    /// origin of the address to the provider.
    SetAddressProviderId {
        machine: MachineId,
        device: String,
        address: String,
        provider_id: Option<ProviderId>,
    },

    SetAddressProviderNetIds {
        machine: MachineId,
        device: String,
        address: String,
        network_id: Option<String>,
        subnet_id: Option<String>,
    },

    SetAddressOrigin {
        machine: MachineId,
        device: String,
        address: String,
        origin: Origin,
    },
}

impl Operation {
    pub fn machine(&self) -> &MachineId {
        match self {
            Self::AssertAlive { machine }
            | Self::SetDeviceProviderId { machine, .. }
            | Self::SetAddressProviderId { machine, .. }
            | Self::SetAddressProviderNetIds { machine, .. }
            | Self::SetAddressOrigin { machine, .. } => machine,
        }
    }

    /// Short kebab-case name, matching the serialized `op` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AssertAlive { .. } => "assert-alive",
            Self::SetDeviceProviderId { .. } => "set-device-provider-id",
            Self::SetAddressProviderId { .. } => "set-address-provider-id",
            Self::SetAddressProviderNetIds { .. } => "set-address-provider-net-ids",
            Self::SetAddressOrigin { .. } => "set-address-origin",
        }
    }
}

/// Result of one reconciliation pass.
///
/// `NoOperations` is an intentional skip: the caller must not apply
/// anything. `Batch` may be empty, meaning the model is already in sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "operations", rename_all = "kebab-case")]
pub enum MergeOutcome {
    NoOperations,
    Batch(Vec<Operation>),
}

impl MergeOutcome {
    pub fn operations(&self) -> &[Operation] {
        match self {
            Self::NoOperations => &[],
            Self::Batch(ops) => ops,
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Self::NoOperations)
    }
}
