// ── Link-layer device records ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::address::AddressRecord;
use super::entity_id::{MacAddress, ProviderId};

/// Kind of link-layer device, as reported by the machine agent.
///
/// Only consulted when several devices share a hardware address and a
/// nameless incoming device has to be attributed to one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
#[non_exhaustive]
pub enum DeviceType {
    Ethernet,
    Bridge,
    Bond,
    Vlan,
    Loopback,
    #[serde(other)]
    Other,
}

impl DeviceType {
    pub fn is_ethernet(self) -> bool {
        matches!(self, Self::Ethernet)
    }
}

/// A persisted network device on a machine, together with its addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Unique within the owning machine.
    pub name: String,
    pub mac_address: MacAddress,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<ProviderId>,
    #[serde(default)]
    pub addresses: Vec<AddressRecord>,
}

impl DeviceRecord {
    pub fn new(name: impl Into<String>, mac: impl Into<MacAddress>, device_type: DeviceType) -> Self {
        Self {
            name: name.into(),
            mac_address: mac.into(),
            device_type,
            provider_id: None,
            addresses: Vec::new(),
        }
    }

    pub fn with_provider_id(mut self, provider_id: ProviderId) -> Self {
        self.provider_id = Some(provider_id);
        self
    }

    pub fn with_address(mut self, address: AddressRecord) -> Self {
        self.addresses.push(address);
        self
    }

    pub fn address(&self, value: &str) -> Option<&AddressRecord> {
        self.addresses.iter().find(|a| a.value == value)
    }
}
