// ── In-memory model store ──
//
// A reference implementation of the persisted machine model: concurrent
// per-machine records with optimistic revision checks, read through
// immutable `MachineSnapshot`s and written only by applying whole batches.

mod apply;
mod model_store;
mod snapshot;

pub use model_store::{DeviceRef, ModelStore};
pub use snapshot::{MachineSnapshot, SnapshotAddress, SnapshotDevice};
