// ── Concurrent machine storage ──

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use super::apply::check_provider_ids;
use super::snapshot::MachineSnapshot;
use crate::error::CoreError;
use crate::model::{MachineId, MachineRecord, ModelState, ProviderId};

/// Where a provider ID is currently held.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRef {
    pub machine: MachineId,
    pub device: String,
}

impl fmt::Display for DeviceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "device {:?} on machine {}", self.device, self.machine)
    }
}

pub(super) struct StoredMachine {
    pub(super) record: MachineRecord,
    /// Bumped on every successful write; batches built against an older
    /// revision are rejected.
    pub(super) revision: u64,
    pub(super) updated_at: Option<DateTime<Utc>>,
    /// Insertion order, so exports keep the order machines were loaded in.
    seq: u64,
}

/// Thread-safe store of machine link-layer models.
///
/// Machines live in a `DashMap`, so reads never block each other. Writes
/// take `write_lock` because provider-ID uniqueness spans every machine.
pub struct ModelStore {
    pub(super) machines: DashMap<MachineId, StoredMachine>,
    write_lock: Mutex<()>,
    next_seq: AtomicU64,
}

impl Default for ModelStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelStore {
    pub fn new() -> Self {
        Self {
            machines: DashMap::new(),
            write_lock: Mutex::new(()),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Load a whole serialized model, validating every machine and the
    /// model-wide uniqueness of device provider IDs.
    pub fn from_state(state: ModelState) -> Result<Self, CoreError> {
        let store = Self::new();
        let mut seen: HashMap<ProviderId, DeviceRef> = HashMap::new();
        for machine in state.machines {
            for dev in &machine.devices {
                let Some(pid) = &dev.provider_id else {
                    continue;
                };
                let here = DeviceRef {
                    machine: machine.id.clone(),
                    device: dev.name.clone(),
                };
                if let Some(holder) = seen.insert(pid.clone(), here) {
                    return Err(CoreError::InvalidModel {
                        reason: format!("provider ID {pid:?} is held by more than one device ({holder})"),
                    });
                }
            }
            store.insert_machine(machine)?;
        }
        Ok(store)
    }

    /// Export every machine, in the order they were inserted.
    pub fn to_state(&self) -> ModelState {
        let mut machines: Vec<(u64, MachineRecord)> = self
            .machines
            .iter()
            .map(|entry| (entry.seq, entry.record.clone()))
            .collect();
        machines.sort_by_key(|(seq, _)| *seq);
        ModelState {
            machines: machines.into_iter().map(|(_, m)| m).collect(),
        }
    }

    pub fn insert_machine(&self, record: MachineRecord) -> Result<(), CoreError> {
        record.validate()?;
        let _guard = self.lock_writes();
        if self.machines.contains_key(&record.id) {
            return Err(CoreError::InvalidModel {
                reason: format!("machine {} already exists", record.id),
            });
        }
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.machines.insert(
            record.id.clone(),
            StoredMachine {
                record,
                revision: 0,
                updated_at: None,
                seq,
            },
        );
        Ok(())
    }

    /// Change a machine outside of reconciliation (the machine agent
    /// reporting devices, the machine being destroyed, ...).
    ///
    /// Bumps the revision, so any batch built before the change conflicts.
    pub fn update_machine(
        &self,
        machine_id: &MachineId,
        update: impl FnOnce(&mut MachineRecord),
    ) -> Result<u64, CoreError> {
        let _guard = self.lock_writes();
        let elsewhere = self.provider_index(Some(machine_id));

        let mut entry = self
            .machines
            .get_mut(machine_id)
            .ok_or_else(|| CoreError::MachineNotFound {
                machine_id: machine_id.clone(),
            })?;

        let mut record = entry.record.clone();
        update(&mut record);
        record.validate()?;
        check_provider_ids(&record, &elsewhere)?;

        entry.record = record;
        entry.revision += 1;
        entry.updated_at = Some(Utc::now());
        debug!(machine = %machine_id, revision = entry.revision, "machine updated");
        Ok(entry.revision)
    }

    /// Take an immutable snapshot of one machine at its current revision.
    pub fn machine(&self, machine_id: &MachineId) -> Result<MachineSnapshot, CoreError> {
        let (record, revision) = {
            let entry = self
                .machines
                .get(machine_id)
                .ok_or_else(|| CoreError::MachineNotFound {
                    machine_id: machine_id.clone(),
                })?;
            (entry.record.clone(), entry.revision)
        };
        Ok(MachineSnapshot::new(
            record,
            revision,
            Arc::new(self.provider_index(None)),
        ))
    }

    pub fn revision(&self, machine_id: &MachineId) -> Option<u64> {
        self.machines.get(machine_id).map(|e| e.revision)
    }

    pub fn last_updated(&self, machine_id: &MachineId) -> Option<DateTime<Utc>> {
        self.machines.get(machine_id).and_then(|e| e.updated_at)
    }

    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    /// Serializes writers. The guarded value is `()`, so a poisoned lock
    /// carries no broken state and is recovered.
    pub(super) fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Every device provider ID in the model, optionally leaving out one machine.
    pub(super) fn provider_index(
        &self,
        excluding: Option<&MachineId>,
    ) -> HashMap<ProviderId, DeviceRef> {
        let mut index = HashMap::new();
        for entry in &self.machines {
            if excluding.is_some_and(|id| id == entry.key()) {
                continue;
            }
            for dev in &entry.record.devices {
                if let Some(pid) = &dev.provider_id {
                    index.insert(
                        pid.clone(),
                        DeviceRef {
                            machine: entry.record.id.clone(),
                            device: dev.name.clone(),
                        },
                    );
                }
            }
        }
        index
    }
}
