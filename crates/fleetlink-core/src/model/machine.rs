// ── Machines and the serialized model ──

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::device::DeviceRecord;
use super::entity_id::MachineId;
use crate::error::CoreError;

/// Machine lifecycle. Only `Alive` machines accept reconciliation batches.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Life {
    #[default]
    Alive,
    Dying,
    Dead,
}

/// A machine and the link-layer devices its agent has reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineRecord {
    pub id: MachineId,
    #[serde(default)]
    pub life: Life,
    #[serde(default)]
    pub devices: Vec<DeviceRecord>,
}

impl MachineRecord {
    pub fn new(id: impl Into<MachineId>) -> Self {
        Self {
            id: id.into(),
            life: Life::Alive,
            devices: Vec::new(),
        }
    }

    pub fn with_device(mut self, device: DeviceRecord) -> Self {
        self.devices.push(device);
        self
    }

    pub fn device(&self, name: &str) -> Option<&DeviceRecord> {
        self.devices.iter().find(|d| d.name == name)
    }

    pub(crate) fn device_mut(&mut self, name: &str) -> Option<&mut DeviceRecord> {
        self.devices.iter_mut().find(|d| d.name == name)
    }

    /// Check the per-machine uniqueness rules: device names, and address
    /// values within a device.
    pub fn validate(&self) -> Result<(), CoreError> {
        let mut names = HashSet::new();
        for dev in &self.devices {
            if dev.name.is_empty() {
                return Err(CoreError::InvalidModel {
                    reason: format!("machine {} has a device without a name", self.id),
                });
            }
            if !names.insert(dev.name.as_str()) {
                return Err(CoreError::InvalidModel {
                    reason: format!("machine {} has duplicate device {:?}", self.id, dev.name),
                });
            }
            let mut values = HashSet::new();
            for addr in &dev.addresses {
                if !values.insert(addr.value.as_str()) {
                    return Err(CoreError::InvalidModel {
                        reason: format!(
                            "device {:?} on machine {} has duplicate address {:?}",
                            dev.name, self.id, addr.value
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Serialized form of a whole model store (JSON or YAML).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelState {
    #[serde(default)]
    pub machines: Vec<MachineRecord>,
}

impl ModelState {
    pub fn from_json(raw: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, CoreError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_yaml(&self) -> Result<String, CoreError> {
        Ok(serde_yaml::to_string(self)?)
    }
}
