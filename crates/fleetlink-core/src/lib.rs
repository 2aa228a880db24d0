//! Link-layer reconciliation between a machine's persisted network model and
//! what its infrastructure provider reports.
//!
//! The crate is split the same way the data flows:
//!
//! - **Domain model** ([`model`]): Persisted [`MachineRecord`]s with their
//!   [`DeviceRecord`]s and [`AddressRecord`]s, and the ephemeral
//!   [`IncomingSnapshot`] a provider returns for one machine.
//!
//! - **Capability traits** ([`link_layer`]): What the engine needs from any
//!   persistence layer, which enumerates devices and addresses and builds (never
//!   applies) [`Operation`]s.
//!
//! - **Engine** ([`merge`]): [`LinkLayerMerge`] names nameless incoming
//!   devices, adopts or relinquishes provider identity per device, and links
//!   addresses. One pass yields a [`MergeOutcome`].
//!
//! - **[`ModelStore`]**: `DashMap`-backed reference store with per-machine
//!   revisions. Batches are applied atomically via
//!   [`apply()`](ModelStore::apply).
//!
//! - **[`TxnRunner`]**: Optimistic retry loop that rebuilds from a fresh snapshot
//!   whenever the machine changed under the batch.
//!   [`reconcile_machine()`] wires the engine into it.

pub mod error;
pub mod link_layer;
pub mod merge;
pub mod model;
pub mod operation;
pub mod store;
pub mod txn;

// ── Primary re-exports ──────────────────────────────────────────────
pub use error::CoreError;
pub use link_layer::{LinkLayerAddress, LinkLayerDevice, LinkLayerMachine};
pub use merge::{LinkLayerMerge, MergeOptions, MixedNamingPolicy, merge_link_layer};
pub use operation::{MergeOutcome, Operation};
pub use store::{MachineSnapshot, ModelStore};
pub use txn::{TxnOptions, TxnReport, TxnRunner, reconcile_machine};

pub use model::{
    AddressRecord, DeviceRecord, DeviceType, IncomingAddress, IncomingDevice, IncomingSnapshot,
    Life, MacAddress, MachineId, MachineRecord, ModelState, Origin, ProviderId,
};
