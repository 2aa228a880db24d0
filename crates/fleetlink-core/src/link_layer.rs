// ── Machine capability traits ──
//
// What the reconciliation engine needs from a persisted machine model:
// enumerate devices and addresses, and build (never apply) mutation
// operations. Any persistence technology can implement these.
//
// Operation constructors return an empty vector when the requested value is
// already in place, which is what makes repeated passes converge.

use crate::error::CoreError;
use crate::model::{DeviceType, MacAddress, MachineId, Origin, ProviderId};
use crate::operation::Operation;

/// A persisted link-layer device.
pub trait LinkLayerDevice {
    fn name(&self) -> &str;

    fn mac_address(&self) -> &MacAddress;

    fn device_type(&self) -> DeviceType;

    fn provider_id(&self) -> Option<&ProviderId>;

    /// Operations setting the device's provider ID; an empty `provider_id`
    /// clears it.
    fn set_provider_id_ops(&self, provider_id: &str) -> Result<Vec<Operation>, CoreError>;
}

/// A persisted address, owned by the device named by [`device_name`](Self::device_name).
pub trait LinkLayerAddress {
    fn device_name(&self) -> &str;

    /// Bare address value, without prefix length.
    fn value(&self) -> &str;

    fn origin(&self) -> Origin;

    fn set_origin_ops(&self, origin: Origin) -> Vec<Operation>;

    fn set_provider_id_ops(&self, provider_id: &str) -> Result<Vec<Operation>, CoreError>;

    fn set_provider_net_ids_ops(&self, network_id: &str, subnet_id: &str) -> Vec<Operation>;
}

/// Read access to one machine's persisted network model.
pub trait LinkLayerMachine {
    type Device: LinkLayerDevice;
    type Address: LinkLayerAddress;

    fn machine_id(&self) -> &MachineId;

    fn all_link_layer_devices(&self) -> Result<Vec<Self::Device>, CoreError>;

    fn all_device_addresses(&self) -> Result<Vec<Self::Address>, CoreError>;

    /// Precondition asserting the machine is still alive when the batch is applied.
    fn assert_alive_op(&self) -> Operation;
}
