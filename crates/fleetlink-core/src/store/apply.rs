// ── Atomic batch application ──
//
// A batch is applied to a copy of the machine record and swapped in only if
// every operation succeeds, the revision is the one the batch was built
// against, and device provider IDs stay unique across the model. The
// uniqueness check and the commit run under the store's write lock, so two
// machines cannot claim the same provider ID concurrently.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, info};

use super::model_store::{DeviceRef, ModelStore};
use crate::error::CoreError;
use crate::model::{
    AddressRecord, DeviceRecord, Life, MachineId, MachineRecord, Origin, ProviderId,
};
use crate::operation::Operation;

impl ModelStore {
    /// Apply `ops` to one machine as a single atomic write.
    ///
    /// Fails with [`CoreError::TxnConflict`] if the machine changed since
    /// `expected_revision`; nothing is written on any failure. Returns the
    /// machine's new revision.
    pub fn apply(
        &self,
        machine_id: &MachineId,
        expected_revision: u64,
        ops: &[Operation],
    ) -> Result<u64, CoreError> {
        let _guard = self.lock_writes();
        // Collected before taking the entry's shard lock: iterating the map
        // while holding it would deadlock.
        let elsewhere = self.provider_index(Some(machine_id));

        let mut entry = self
            .machines
            .get_mut(machine_id)
            .ok_or_else(|| CoreError::MachineNotFound {
                machine_id: machine_id.clone(),
            })?;

        if entry.revision != expected_revision {
            debug!(
                machine = %machine_id,
                expected = expected_revision,
                actual = entry.revision,
                "revision mismatch, rejecting batch"
            );
            return Err(CoreError::TxnConflict {
                machine_id: machine_id.clone(),
            });
        }

        let mut record = entry.record.clone();
        for op in ops {
            apply_op(&mut record, op)?;
        }
        check_provider_ids(&record, &elsewhere)?;

        entry.record = record;
        entry.revision += 1;
        entry.updated_at = Some(Utc::now());
        info!(
            machine = %machine_id,
            operations = ops.len(),
            revision = entry.revision,
            "applied link-layer batch"
        );
        Ok(entry.revision)
    }
}

fn apply_op(record: &mut MachineRecord, op: &Operation) -> Result<(), CoreError> {
    if op.machine() != &record.id {
        return Err(CoreError::OperationRejected {
            reason: format!(
                "{} targets machine {}, batch is for machine {}",
                op.kind(),
                op.machine(),
                record.id
            ),
        });
    }

    match op {
        Operation::AssertAlive { .. } => {
            if record.life != Life::Alive {
                return Err(CoreError::MachineNotAlive {
                    machine_id: record.id.clone(),
                });
            }
        }
        Operation::SetDeviceProviderId {
            device,
            provider_id,
            ..
        } => {
            device_mut(record, device)?.provider_id.clone_from(provider_id);
        }
        Operation::SetAddressProviderId {
            device,
            address,
            provider_id,
            ..
        } => {
            let addr = address_mut(record, device, address)?;
            addr.provider_id.clone_from(provider_id);
            if provider_id.is_some() {
                addr.origin = Origin::Provider;
            }
        }
        Operation::SetAddressProviderNetIds {
            device,
            address,
            network_id,
            subnet_id,
            ..
        } => {
            let addr = address_mut(record, device, address)?;
            addr.provider_network_id.clone_from(network_id);
            addr.provider_subnet_id.clone_from(subnet_id);
        }
        Operation::SetAddressOrigin {
            device,
            address,
            origin,
            ..
        } => {
            address_mut(record, device, address)?.origin = *origin;
        }
    }
    Ok(())
}

fn device_mut<'r>(
    record: &'r mut MachineRecord,
    name: &str,
) -> Result<&'r mut DeviceRecord, CoreError> {
    let machine_id = record.id.clone();
    record
        .device_mut(name)
        .ok_or_else(|| CoreError::DeviceNotFound {
            machine_id,
            name: name.to_owned(),
        })
}

fn address_mut<'r>(
    record: &'r mut MachineRecord,
    device: &str,
    value: &str,
) -> Result<&'r mut AddressRecord, CoreError> {
    let machine_id = record.id.clone();
    device_mut(record, device)?
        .addresses
        .iter_mut()
        .find(|a| a.value == value)
        .ok_or_else(|| CoreError::AddressNotFound {
            machine_id,
            device: device.to_owned(),
            value: value.to_owned(),
        })
}

pub(super) fn check_provider_ids(
    record: &MachineRecord,
    elsewhere: &HashMap<ProviderId, DeviceRef>,
) -> Result<(), CoreError> {
    let mut here: HashMap<&ProviderId, &str> = HashMap::new();
    for dev in &record.devices {
        let Some(pid) = &dev.provider_id else {
            continue;
        };
        let holder = elsewhere.get(pid).map(ToString::to_string).or_else(|| {
            here.insert(pid, &dev.name).map(|other| {
                DeviceRef {
                    machine: record.id.clone(),
                    device: other.to_owned(),
                }
                .to_string()
            })
        });
        if let Some(holder) = holder {
            return Err(CoreError::DuplicateProviderId {
                provider_id: pid.clone(),
                holder,
            });
        }
    }
    Ok(())
}
