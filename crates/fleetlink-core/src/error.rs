// ── Core error types ──
//
// Errors raised while reading the machine model, constructing mutation
// operations, or applying a batch. Reconciliation wraps lower-level failures
// in `Device` / `Address` context so a failed pass can be diagnosed without
// re-running it.

use thiserror::Error;

use crate::model::{MacAddress, MachineId, ProviderId};

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Data errors ──────────────────────────────────────────────────
    #[error("Machine not found: {machine_id}")]
    MachineNotFound { machine_id: MachineId },

    #[error("Machine {machine_id} is not alive")]
    MachineNotAlive { machine_id: MachineId },

    #[error("Device {name:?} not found on machine {machine_id}")]
    DeviceNotFound { machine_id: MachineId, name: String },

    #[error("Address {value:?} not found on device {device:?} of machine {machine_id}")]
    AddressNotFound {
        machine_id: MachineId,
        device: String,
        value: String,
    },

    #[error("Invalid machine model: {reason}")]
    InvalidModel { reason: String },

    // ── Identifier errors ────────────────────────────────────────────
    #[error("Invalid provider ID {value:?}: {reason}")]
    InvalidProviderId { value: String, reason: String },

    #[error("Provider ID {provider_id:?} is already assigned to {holder}")]
    DuplicateProviderId {
        provider_id: ProviderId,
        holder: String,
    },

    // ── Transaction errors ───────────────────────────────────────────
    #[error("Machine {machine_id} changed while the transaction was being built")]
    TxnConflict { machine_id: MachineId },

    #[error("Operation rejected: {reason}")]
    OperationRejected { reason: String },

    #[error("Transaction still conflicting after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    // ── Reconciliation context ───────────────────────────────────────
    #[error("Device {name:?} ({mac}): cannot {operation}")]
    Device {
        name: String,
        mac: MacAddress,
        operation: &'static str,
        #[source]
        source: Box<CoreError>,
    },

    #[error("Address {value:?} on device {device:?}: cannot {operation}")]
    Address {
        device: String,
        value: String,
        operation: &'static str,
        #[source]
        source: Box<CoreError>,
    },

    // ── Serialization ────────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CoreError {
    /// Whether the error signals an optimistic-concurrency conflict that a
    /// fresh attempt may resolve.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::TxnConflict { .. })
    }

    /// The innermost error, skipping reconciliation context wrappers.
    pub fn root_cause(&self) -> &CoreError {
        match self {
            Self::Device { source, .. } | Self::Address { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
