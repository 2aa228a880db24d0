// ── Provider-sourced network configuration ──
//
// One snapshot per machine per poll. These values are built fresh for every
// reconciliation attempt and never persisted.

use serde::{Deserialize, Serialize};

use super::entity_id::MacAddress;

/// An address reported by the provider for one interface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingAddress {
    /// Address with prefix length, e.g. `10.0.0.5/24`.
    pub cidr_address: String,
    #[serde(default)]
    pub provider_id: String,
    #[serde(default)]
    pub provider_network_id: String,
    #[serde(default)]
    pub provider_subnet_id: String,
}

impl IncomingAddress {
    pub fn new(cidr_address: impl Into<String>) -> Self {
        Self {
            cidr_address: cidr_address.into(),
            ..Self::default()
        }
    }

    pub fn with_provider_ids(
        mut self,
        provider_id: impl Into<String>,
        network_id: impl Into<String>,
        subnet_id: impl Into<String>,
    ) -> Self {
        self.provider_id = provider_id.into();
        self.provider_network_id = network_id.into();
        self.provider_subnet_id = subnet_id.into();
        self
    }
}

/// An interface as the provider sees it. The name may be empty for
/// providers that only know hardware addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingDevice {
    #[serde(default)]
    pub interface_name: String,
    pub mac_address: MacAddress,
    #[serde(default)]
    pub provider_id: String,
    #[serde(default)]
    pub addresses: Vec<IncomingAddress>,
}

impl IncomingDevice {
    pub fn new(
        interface_name: impl Into<String>,
        mac: impl Into<MacAddress>,
        provider_id: impl Into<String>,
    ) -> Self {
        Self {
            interface_name: interface_name.into(),
            mac_address: mac.into(),
            provider_id: provider_id.into(),
            addresses: Vec::new(),
        }
    }

    pub fn with_address(mut self, address: IncomingAddress) -> Self {
        self.addresses.push(address);
        self
    }

    /// Whether this interface is identified by the given name and hardware address.
    pub fn is_identified_by(&self, name: &str, mac: &MacAddress) -> bool {
        self.interface_name == name && &self.mac_address == mac
    }
}

/// The provider's full view of one machine's interfaces, in reported order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingSnapshot {
    #[serde(default)]
    pub devices: Vec<IncomingDevice>,
}

impl IncomingSnapshot {
    pub fn new(devices: Vec<IncomingDevice>) -> Self {
        Self { devices }
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn from_json(raw: &str) -> Result<Self, crate::CoreError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, crate::CoreError> {
        Ok(serde_yaml::from_str(raw)?)
    }
}
