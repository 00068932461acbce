//! Capability index - characteristics grouped by what they support.

use std::fmt;

use uuid::Uuid;

use super::identifier::canonical_string;
use super::record::{Capability, CapabilityRecord, Platform, RawCapabilityRecord};
use crate::error::{BleLinkError, Result};

/// A (service, characteristic) pair to address a GATT operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CharacteristicRef {
    /// Canonical service identifier.
    pub service: Uuid,
    /// Canonical characteristic identifier.
    pub characteristic: Uuid,
}

impl CharacteristicRef {
    /// Create a new reference.
    pub fn new(service: Uuid, characteristic: Uuid) -> Self {
        Self {
            service,
            characteristic,
        }
    }
}

impl fmt::Display for CharacteristicRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            canonical_string(&self.service),
            canonical_string(&self.characteristic)
        )
    }
}

/// Characteristics of one connected peripheral, bucketed by capability.
///
/// Each list keeps discovery order and is never sorted or deduplicated:
/// callers pick a characteristic by its position, so positions must stay
/// stable for the lifetime of the connection. A characteristic with several
/// capabilities appears in several lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilityIndex {
    read: Vec<CharacteristicRef>,
    write_with_response: Vec<CharacteristicRef>,
    write_without_response: Vec<CharacteristicRef>,
    notify: Vec<CharacteristicRef>,
}

impl CapabilityIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a normalized record to every list it qualifies for.
    pub fn insert(&mut self, record: &CapabilityRecord) {
        let target = CharacteristicRef::new(record.service_id, record.characteristic_id);
        for capability in record.capabilities.iter() {
            self.list_mut(capability).push(target);
        }
    }

    /// Characteristics supporting `capability`, in discovery order.
    pub fn list(&self, capability: Capability) -> &[CharacteristicRef] {
        match capability {
            Capability::Read => &self.read,
            Capability::WriteWithResponse => &self.write_with_response,
            Capability::WriteWithoutResponse => &self.write_without_response,
            Capability::Notify => &self.notify,
        }
    }

    /// Select the `index`-th characteristic supporting `capability`.
    pub fn get(&self, capability: Capability, index: usize) -> Result<CharacteristicRef> {
        self.list(capability)
            .get(index)
            .copied()
            .ok_or(BleLinkError::NoCharacteristic { capability, index })
    }

    /// Readable characteristics.
    pub fn read(&self) -> &[CharacteristicRef] {
        &self.read
    }

    /// Characteristics writable with acknowledgement.
    pub fn write_with_response(&self) -> &[CharacteristicRef] {
        &self.write_with_response
    }

    /// Characteristics writable without acknowledgement.
    pub fn write_without_response(&self) -> &[CharacteristicRef] {
        &self.write_without_response
    }

    /// Notifying characteristics.
    pub fn notify(&self) -> &[CharacteristicRef] {
        &self.notify
    }

    /// Check if every list is empty.
    pub fn is_empty(&self) -> bool {
        Capability::ALL.iter().all(|c| self.list(*c).is_empty())
    }

    /// Empty every list.
    pub fn clear(&mut self) {
        self.read.clear();
        self.write_with_response.clear();
        self.write_without_response.clear();
        self.notify.clear();
    }

    fn list_mut(&mut self, capability: Capability) -> &mut Vec<CharacteristicRef> {
        match capability {
            Capability::Read => &mut self.read,
            Capability::WriteWithResponse => &mut self.write_with_response,
            Capability::WriteWithoutResponse => &mut self.write_without_response,
            Capability::Notify => &mut self.notify,
        }
    }
}

/// Classify a peripheral's discovered characteristics.
///
/// Identifiers are normalized to 128-bit form and properties to a single
/// capability set before bucketing, so the result does not depend on the
/// platform beyond parsing.
///
/// # Errors
///
/// Returns `InvalidUuid` if any identifier cannot be normalized; no partial
/// index is produced.
pub fn classify(records: &[RawCapabilityRecord], platform: Platform) -> Result<CapabilityIndex> {
    let mut index = CapabilityIndex::new();

    for raw in records {
        index.insert(&raw.normalize(platform)?);
    }

    for capability in Capability::ALL {
        tracing::debug!(
            %capability,
            characteristics = ?index.list(capability).iter().map(ToString::to_string).collect::<Vec<_>>(),
            "Classified characteristics"
        );
    }

    Ok(index)
}
