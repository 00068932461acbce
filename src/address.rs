//! Hardware address extraction from advertising data.
//!
//! iOS hides the peripheral's MAC address behind a per-app identifier, so
//! devices that want to be recognised embed it in the manufacturer data of
//! their advertisement, least significant byte first. This module turns that
//! back into the usual `AA:BB:CC:DD:EE:FF` form.

use serde::Deserialize;

use crate::codec::HexCodec;
use crate::error::{BleLinkError, Result};

/// Manufacturer-specific data block of an advertisement.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManufacturerData {
    /// Payload as hex text.
    #[serde(default)]
    pub data: Option<String>,
}

/// Advertising payload of a discovered peripheral.
///
/// Matches the JSON shape of react-native-ble-manager; unknown fields are
/// ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Advertisement {
    /// Advertised local name.
    #[serde(default)]
    pub local_name: Option<String>,
    /// Manufacturer-specific data.
    #[serde(default)]
    pub manufacturer_data: Option<ManufacturerData>,
}

impl Advertisement {
    /// Hardware address embedded in the manufacturer data, if any.
    pub fn mac_address(&self) -> Result<Option<String>> {
        let data = self
            .manufacturer_data
            .as_ref()
            .and_then(|m| m.data.as_deref());
        extract_address(data)
    }
}

/// Recover a colon-separated hardware address from hex manufacturer data.
///
/// `None` or empty data means the advertisement carries no address, which
/// is not an error.
///
/// # Errors
///
/// - `InvalidAddressLength` for an odd number of hex digits.
/// - `InvalidHex` for non-hex characters.
///
/// # Example
///
/// ```
/// use blelink::address::extract_address;
///
/// assert_eq!(
///     extract_address(Some("010000caea80")).unwrap().as_deref(),
///     Some("80:EA:CA:00:00:01")
/// );
/// assert_eq!(extract_address(None).unwrap(), None);
/// ```
pub fn extract_address(manufacturer_data: Option<&str>) -> Result<Option<String>> {
    let Some(data) = manufacturer_data.filter(|d| !d.is_empty()) else {
        return Ok(None);
    };

    if data.len() % 2 != 0 {
        return Err(BleLinkError::InvalidAddressLength(data.len()));
    }

    let bytes = HexCodec::decode(data)?;
    Ok(Some(format_address(&bytes)))
}

/// Render bytes in reverse order as colon-separated upper-case hex pairs.
pub fn format_address(bytes: &[u8]) -> String {
    bytes
        .iter()
        .rev()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(":")
}
