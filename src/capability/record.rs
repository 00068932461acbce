//! Capability records, raw and normalized.
//!
//! The two mobile BLE stacks report characteristic properties differently:
//!
//! ```text
//! Android: "properties": { "Read": "Read", "Notify": "Notify" }
//! iOS:     "properties": [ "Read", "Notify" ]
//! ```
//!
//! [`RawProperties`] accepts either shape and [`RawProperties::capabilities`]
//! turns both into the same [`Capabilities`] set, so nothing past this
//! module branches on the platform.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::identifier::normalize_uuid;
use crate::address::Advertisement;
use crate::error::Result;

/// What a characteristic supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Readable.
    Read,
    /// Writable with an ATT acknowledgement (`Write`).
    WriteWithResponse,
    /// Writable without acknowledgement.
    WriteWithoutResponse,
    /// Emits notifications.
    Notify,
}

impl Capability {
    /// Every capability, in the order the index lists them.
    pub const ALL: [Capability; 4] = [
        Capability::Read,
        Capability::WriteWithResponse,
        Capability::WriteWithoutResponse,
        Capability::Notify,
    ];

    /// Map a platform property name to a capability.
    ///
    /// Names the index does not track (`Indicate`, `Broadcast`, ...) map to
    /// `None`.
    pub fn from_flag_name(name: &str) -> Option<Self> {
        match name {
            "Read" => Some(Capability::Read),
            "Write" => Some(Capability::WriteWithResponse),
            "WriteWithoutResponse" => Some(Capability::WriteWithoutResponse),
            "Notify" => Some(Capability::Notify),
            _ => None,
        }
    }

    #[inline]
    fn bit(self) -> u8 {
        match self {
            Capability::Read => 0b0001,
            Capability::WriteWithResponse => 0b0010,
            Capability::WriteWithoutResponse => 0b0100,
            Capability::Notify => 0b1000,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Read => "read",
            Capability::WriteWithResponse => "write-with-response",
            Capability::WriteWithoutResponse => "write-without-response",
            Capability::Notify => "notify",
        };
        f.write_str(name)
    }
}

/// Set of capabilities of one characteristic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Capabilities(u8);

impl Capabilities {
    /// Empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Add a capability.
    #[inline]
    pub fn insert(&mut self, capability: Capability) {
        self.0 |= capability.bit();
    }

    /// Check if a capability is present.
    #[inline]
    pub fn contains(&self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    /// Check if no capability is present.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Present capabilities, in [`Capability::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL.into_iter().filter(|c| self.contains(*c))
    }
}

impl FromIterator<Capability> for Capabilities {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        let mut set = Capabilities::empty();
        for capability in iter {
            set.insert(capability);
        }
        set
    }
}

/// Platform whose BLE stack produced a raw record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Properties arrive as a name-to-name map.
    Android,
    /// Properties arrive as a list of names.
    Ios,
}

/// Characteristic properties as the platform reported them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawProperties {
    /// `{ "Read": "Read", ... }`
    Keyed(BTreeMap<String, String>),
    /// `[ "Read", ... ]`
    Listed(Vec<String>),
}

impl RawProperties {
    /// Platform that reports properties in this shape.
    pub fn native_platform(&self) -> Platform {
        match self {
            RawProperties::Keyed(_) => Platform::Android,
            RawProperties::Listed(_) => Platform::Ios,
        }
    }

    /// Normalize to a capability set.
    ///
    /// A keyed entry only counts when its value repeats its key. A shape
    /// that does not match `platform` is still normalized, with a warning.
    pub fn capabilities(&self, platform: Platform) -> Capabilities {
        if self.native_platform() != platform {
            tracing::warn!(
                ?platform,
                reported = ?self.native_platform(),
                "Characteristic properties in unexpected shape"
            );
        }

        match self {
            RawProperties::Keyed(map) => map
                .iter()
                .filter(|(key, value)| key == value)
                .filter_map(|(key, _)| Capability::from_flag_name(key))
                .collect(),
            RawProperties::Listed(names) => names
                .iter()
                .filter_map(|name| Capability::from_flag_name(name))
                .collect(),
        }
    }
}

/// One discovered characteristic as the transport reported it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCapabilityRecord {
    /// Service identifier, any length form.
    pub service: String,
    /// Characteristic identifier, any length form.
    pub characteristic: String,
    /// Platform-specific property flags.
    pub properties: RawProperties,
}

impl RawCapabilityRecord {
    /// Normalize identifiers and properties.
    pub fn normalize(&self, platform: Platform) -> Result<CapabilityRecord> {
        Ok(CapabilityRecord {
            service_id: normalize_uuid(&self.service)?,
            characteristic_id: normalize_uuid(&self.characteristic)?,
            capabilities: self.properties.capabilities(platform),
        })
    }
}

/// A characteristic with canonical identifiers and a unified capability set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityRecord {
    /// Canonical service identifier.
    pub service_id: Uuid,
    /// Canonical characteristic identifier.
    pub characteristic_id: Uuid,
    /// What the characteristic supports.
    pub capabilities: Capabilities,
}

/// Service discovery result for a connected peripheral.
///
/// Matches the JSON shape of react-native-ble-manager's
/// `retrieveServices`; unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PeripheralInfo {
    /// Transport identifier of the peripheral.
    pub id: String,
    /// Advertised local name.
    #[serde(default)]
    pub name: Option<String>,
    /// Signal strength at discovery.
    #[serde(default)]
    pub rssi: Option<i16>,
    /// Advertising payload.
    #[serde(default)]
    pub advertising: Option<Advertisement>,
    /// Discovered characteristics, in discovery order.
    #[serde(default)]
    pub characteristics: Vec<RawCapabilityRecord>,
}

impl PeripheralInfo {
    /// Parse a discovery result from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
