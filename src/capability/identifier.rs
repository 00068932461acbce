//! Service and characteristic identifier normalization.
//!
//! Peripherals advertise Bluetooth SIG assigned numbers in their shortened
//! 16- or 32-bit form, and vendor services in full 128-bit form. Everything
//! is widened onto the Bluetooth Base UUID
//! (`00000000-0000-1000-8000-00805F9B34FB`) so the capability lists compare
//! and print uniformly.

use uuid::Uuid;

use crate::codec::HexCodec;
use crate::error::{BleLinkError, Result};

/// The Bluetooth Base UUID, `00000000-0000-1000-8000-00805F9B34FB`.
pub const BASE_UUID: Uuid = Uuid::from_u128(0x0000_0000_0000_1000_8000_0080_5F9B_34FB);

/// Shortened identifiers occupy the top 32 bits of the base UUID.
const SHORT_UUID_SHIFT: u32 = 96;

/// Widen a 16-, 32- or 128-bit identifier to its canonical 128-bit form.
///
/// # Example
///
/// ```
/// use blelink::capability::{canonical_string, normalize_uuid};
///
/// let uuid = normalize_uuid("fe00").unwrap();
/// assert_eq!(canonical_string(&uuid), "0000FE00-0000-1000-8000-00805F9B34FB");
/// ```
pub fn normalize_uuid(id: &str) -> Result<Uuid> {
    let id = id.trim();

    match id.len() {
        4 | 8 if HexCodec::is_hex(id) => {
            let short = u32::from_str_radix(id, 16)
                .map_err(|e| BleLinkError::InvalidUuid(format!("{id}: {e}")))?;
            Ok(from_short(short))
        }
        _ => Uuid::parse_str(id).map_err(|e| BleLinkError::InvalidUuid(format!("{id}: {e}"))),
    }
}

/// Expand an assigned number onto the Bluetooth Base UUID.
#[inline]
pub fn from_short(short: u32) -> Uuid {
    Uuid::from_u128(BASE_UUID.as_u128() | (u128::from(short) << SHORT_UUID_SHIFT))
}

/// Render an identifier as upper-case hyphenated text.
pub fn canonical_string(uuid: &Uuid) -> String {
    uuid.hyphenated()
        .encode_upper(&mut Uuid::encode_buffer())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_16_bit() {
        let uuid = normalize_uuid("FE00").unwrap();
        assert_eq!(canonical_string(&uuid), "0000FE00-0000-1000-8000-00805F9B34FB");
    }

    #[test]
    fn test_16_bit_lowercase() {
        let uuid = normalize_uuid("180d").unwrap();
        assert_eq!(canonical_string(&uuid), "0000180D-0000-1000-8000-00805F9B34FB");
        assert_eq!(uuid, from_short(0x180D));
    }

    #[test]
    fn test_32_bit() {
        let uuid = normalize_uuid("0000fff0").unwrap();
        assert_eq!(canonical_string(&uuid), "0000FFF0-0000-1000-8000-00805F9B34FB");

        let uuid = normalize_uuid("12345678").unwrap();
        assert_eq!(canonical_string(&uuid), "12345678-0000-1000-8000-00805F9B34FB");
    }

    #[test]
    fn test_128_bit_upper_cased() {
        let uuid = normalize_uuid("6e400001-b5a3-f393-e0a9-e50e24dcca9e").unwrap();
        assert_eq!(canonical_string(&uuid), "6E400001-B5A3-F393-E0A9-E50E24DCCA9E");
    }

    #[test]
    fn test_short_and_long_forms_agree() {
        let short = normalize_uuid("2A37").unwrap();
        let long = normalize_uuid("00002a37-0000-1000-8000-00805f9b34fb").unwrap();
        assert_eq!(short, long);
    }

    #[test]
    fn test_surrounding_whitespace() {
        assert_eq!(normalize_uuid(" FE00 ").unwrap(), from_short(0xFE00));
    }

    #[test]
    fn test_invalid() {
        assert!(matches!(normalize_uuid("FE0"), Err(BleLinkError::InvalidUuid(_))));
        assert!(matches!(normalize_uuid("XYZW"), Err(BleLinkError::InvalidUuid(_))));
        assert!(matches!(normalize_uuid(""), Err(BleLinkError::InvalidUuid(_))));
    }

    #[test]
    fn test_base_uuid() {
        assert_eq!(
            canonical_string(&BASE_UUID),
            "00000000-0000-1000-8000-00805F9B34FB"
        );
    }
}
