//! Capability module - GATT characteristic classification.
//!
//! After service discovery the transport reports every characteristic with
//! its property flags. [`classify`] turns that report into a
//! [`CapabilityIndex`]: four ordered lists (read, write with response, write
//! without response, notify) that the connection selects from by position.
//!
//! # Example
//!
//! ```
//! use blelink::capability::{classify, Capability, Platform, RawCapabilityRecord};
//!
//! let records: Vec<RawCapabilityRecord> = serde_json::from_str(r#"[
//!     {"service": "fff0", "characteristic": "fff1", "properties": {"Notify": "Notify"}},
//!     {"service": "fff0", "characteristic": "fff2", "properties": {"Write": "Write"}}
//! ]"#).unwrap();
//!
//! let index = classify(&records, Platform::Android).unwrap();
//! let notify = index.get(Capability::Notify, 0).unwrap();
//!
//! assert_eq!(
//!     notify.to_string(),
//!     "0000FFF0-0000-1000-8000-00805F9B34FB/0000FFF1-0000-1000-8000-00805F9B34FB"
//! );
//! ```

mod identifier;
mod index;
mod record;

pub use identifier::{canonical_string, from_short, normalize_uuid, BASE_UUID};
pub use index::{classify, CapabilityIndex, CharacteristicRef};
pub use record::{
    Capabilities, Capability, CapabilityRecord, PeripheralInfo, Platform, RawCapabilityRecord,
    RawProperties,
};
