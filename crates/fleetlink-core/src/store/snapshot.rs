// ── Read-only machine views ──
//
// A `MachineSnapshot` is an owned copy of one machine at a revision. It is
// what the reconciliation engine reads, and its device/address handles build
// the operations, eliding any that would not change the stored value.

use std::collections::HashMap;
use std::sync::Arc;

use super::model_store::DeviceRef;
use crate::error::CoreError;
use crate::link_layer::{LinkLayerAddress, LinkLayerDevice, LinkLayerMachine};
use crate::model::{
    AddressRecord, DeviceRecord, DeviceType, Life, MacAddress, MachineId, MachineRecord, Origin,
    ProviderId,
};
use crate::operation::Operation;

type ProviderIndex = Arc<HashMap<ProviderId, DeviceRef>>;

fn non_empty(raw: &str) -> Option<String> {
    (!raw.is_empty()).then(|| raw.to_owned())
}

// ── MachineSnapshot ─────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct MachineSnapshot {
    record: MachineRecord,
    revision: u64,
    provider_ids: ProviderIndex,
}

impl MachineSnapshot {
    pub(super) fn new(record: MachineRecord, revision: u64, provider_ids: ProviderIndex) -> Self {
        Self {
            record,
            revision,
            provider_ids,
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn life(&self) -> Life {
        self.record.life
    }

    pub fn record(&self) -> &MachineRecord {
        &self.record
    }

    pub fn devices(&self) -> &[DeviceRecord] {
        &self.record.devices
    }

    /// Addresses of the named device, empty if there is no such device.
    pub fn addresses_of(&self, device: &str) -> &[AddressRecord] {
        self.record
            .device(device)
            .map(|d| d.addresses.as_slice())
            .unwrap_or_default()
    }
}

impl LinkLayerMachine for MachineSnapshot {
    type Device = SnapshotDevice;
    type Address = SnapshotAddress;

    fn machine_id(&self) -> &MachineId {
        &self.record.id
    }

    fn all_link_layer_devices(&self) -> Result<Vec<SnapshotDevice>, CoreError> {
        Ok(self
            .record
            .devices
            .iter()
            .map(|d| SnapshotDevice {
                machine: self.record.id.clone(),
                name: d.name.clone(),
                mac_address: d.mac_address.clone(),
                device_type: d.device_type,
                provider_id: d.provider_id.clone(),
                provider_ids: Arc::clone(&self.provider_ids),
            })
            .collect())
    }

    fn all_device_addresses(&self) -> Result<Vec<SnapshotAddress>, CoreError> {
        Ok(self
            .record
            .devices
            .iter()
            .flat_map(|d| {
                d.addresses.iter().map(|a| SnapshotAddress {
                    machine: self.record.id.clone(),
                    device: d.name.clone(),
                    record: a.clone(),
                })
            })
            .collect())
    }

    fn assert_alive_op(&self) -> Operation {
        Operation::AssertAlive {
            machine: self.record.id.clone(),
        }
    }
}

// ── SnapshotDevice ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SnapshotDevice {
    machine: MachineId,
    name: String,
    mac_address: MacAddress,
    device_type: DeviceType,
    provider_id: Option<ProviderId>,
    provider_ids: ProviderIndex,
}

impl LinkLayerDevice for SnapshotDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn mac_address(&self) -> &MacAddress {
        &self.mac_address
    }

    fn device_type(&self) -> DeviceType {
        self.device_type
    }

    fn provider_id(&self) -> Option<&ProviderId> {
        self.provider_id.as_ref()
    }

    /// Provider IDs are unique across the whole model. Only holders on other
    /// machines are rejected here: a device on this machine may give the ID
    /// up in the same batch, and `ModelStore::apply` checks the result.
    fn set_provider_id_ops(&self, provider_id: &str) -> Result<Vec<Operation>, CoreError> {
        let provider_id = ProviderId::parse(provider_id)?;
        if provider_id == self.provider_id {
            return Ok(Vec::new());
        }

        if let Some(pid) = &provider_id {
            if let Some(holder) = self.provider_ids.get(pid) {
                if holder.machine != self.machine {
                    return Err(CoreError::DuplicateProviderId {
                        provider_id: pid.clone(),
                        holder: holder.to_string(),
                    });
                }
            }
        }

        Ok(vec![Operation::SetDeviceProviderId {
            machine: self.machine.clone(),
            device: self.name.clone(),
            provider_id,
        }])
    }
}

// ── SnapshotAddress ─────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SnapshotAddress {
    machine: MachineId,
    device: String,
    record: AddressRecord,
}

impl LinkLayerAddress for SnapshotAddress {
    fn device_name(&self) -> &str {
        &self.device
    }

    fn value(&self) -> &str {
        &self.record.value
    }

    fn origin(&self) -> Origin {
        self.record.origin
    }

    fn set_origin_ops(&self, origin: Origin) -> Vec<Operation> {
        if self.record.origin == origin {
            return Vec::new();
        }
        vec![Operation::SetAddressOrigin {
            machine: self.machine.clone(),
            device: self.device.clone(),
            address: self.record.value.clone(),
            origin,
        }]
    }

    fn set_provider_id_ops(&self, provider_id: &str) -> Result<Vec<Operation>, CoreError> {
        let provider_id = ProviderId::parse(provider_id)?;
        // Setting an ID also claims the address for the provider, so an
        // unchanged ID still needs an operation if origin is not yet provider.
        let in_place = provider_id == self.record.provider_id
            && (provider_id.is_none() || self.record.origin == Origin::Provider);
        if in_place {
            return Ok(Vec::new());
        }
        Ok(vec![Operation::SetAddressProviderId {
            machine: self.machine.clone(),
            device: self.device.clone(),
            address: self.record.value.clone(),
            provider_id,
        }])
    }

    fn set_provider_net_ids_ops(&self, network_id: &str, subnet_id: &str) -> Vec<Operation> {
        let network_id = non_empty(network_id);
        let subnet_id = non_empty(subnet_id);
        if network_id == self.record.provider_network_id
            && subnet_id == self.record.provider_subnet_id
        {
            return Vec::new();
        }
        vec![Operation::SetAddressProviderNetIds {
            machine: self.machine.clone(),
            device: self.device.clone(),
            address: self.record.value.clone(),
            network_id,
            subnet_id,
        }]
    }
}
