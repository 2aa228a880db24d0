// ── Core identity types ──
//
// MachineId, MacAddress and ProviderId identify everything the engine
// compares. Hardware addresses are normalized on the way in so that the
// machine agent's view and the provider's view compare equal.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

// ── MachineId ───────────────────────────────────────────────────────

/// Identifier of a machine in the model (e.g. `"0"`, `"3/lxd/1"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MachineId(String);

impl MachineId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for MachineId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MachineId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ── MacAddress ──────────────────────────────────────────────────────

/// Hardware address, normalized to lowercase colon-separated format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct MacAddress(String);

impl MacAddress {
    /// Create a normalized hardware address from any common format.
    /// Accepts colon-separated, dash-separated, or bare hex.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let normalized = raw.as_ref().trim().to_lowercase().replace('-', ":");
        if normalized.len() == 12 && normalized.chars().all(|c| c.is_ascii_hexdigit()) {
            let pairs: Vec<&str> = (0..12)
                .step_by(2)
                .filter_map(|i| normalized.get(i..i + 2))
                .collect();
            return Self(pairs.join(":"));
        }
        Self(normalized)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for MacAddress {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for MacAddress {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl FromStr for MacAddress {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

// ── ProviderId ──────────────────────────────────────────────────────

/// Opaque identifier assigned by the cloud provider.
///
/// Never empty: an empty provider-reported value means "no identifier"
/// and is represented as `None` wherever a `ProviderId` is optional.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct ProviderId(String);

impl ProviderId {
    /// Parse a provider-reported identifier.
    ///
    /// Returns `Ok(None)` for the empty string. Identifiers containing
    /// whitespace or control characters are rejected.
    pub fn parse(raw: &str) -> Result<Option<Self>, CoreError> {
        if raw.is_empty() {
            return Ok(None);
        }
        if let Some(bad) = raw.chars().find(|c| c.is_whitespace() || c.is_control()) {
            return Err(CoreError::InvalidProviderId {
                value: raw.to_owned(),
                reason: format!("contains forbidden character {bad:?}"),
            });
        }
        Ok(Some(Self(raw.to_owned())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ProviderId {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)?.ok_or_else(|| CoreError::InvalidProviderId {
            value: s,
            reason: "empty".into(),
        })
    }
}
