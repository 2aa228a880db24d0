// ── Machine network model ──
//
// Persisted records (devices and their addresses, owned by a machine) and
// the ephemeral provider-sourced snapshot that gets merged into them.

pub mod address;
pub mod device;
pub mod entity_id;
pub mod incoming;
pub mod machine;

// ── Re-exports ──────────────────────────────────────────────────────

pub use address::{AddressRecord, Origin};
pub use device::{DeviceRecord, DeviceType};
pub use entity_id::{MacAddress, MachineId, ProviderId};
pub use incoming::{IncomingAddress, IncomingDevice, IncomingSnapshot};
pub use machine::{Life, MachineRecord, ModelState};
