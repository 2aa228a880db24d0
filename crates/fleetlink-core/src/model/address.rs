// ── Link-layer address records ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::entity_id::ProviderId;

/// Which side currently has write authority over an address's
/// provider-linked fields.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Origin {
    Provider,
    #[default]
    Machine,
}

/// A persisted IP address owned by a single device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    /// Bare address, without prefix length.
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<ProviderId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_network_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_subnet_id: Option<String>,
    #[serde(default)]
    pub origin: Origin,
}

impl AddressRecord {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            provider_id: None,
            provider_network_id: None,
            provider_subnet_id: None,
            origin: Origin::Machine,
        }
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_provider_id(mut self, provider_id: ProviderId) -> Self {
        self.provider_id = Some(provider_id);
        self
    }
}
