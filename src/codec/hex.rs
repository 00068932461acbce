//! Hex codec - upper-case hexadecimal text.

use crate::error::{BleLinkError, Result};

/// Hex codec for the notification stream.
pub struct HexCodec;

impl HexCodec {
    /// Encode bytes as upper-case hex text.
    #[inline]
    pub fn encode(data: &[u8]) -> String {
        hex::encode_upper(data)
    }

    /// Decode hex text of either case into bytes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHex` for odd-length input or non-hex characters.
    pub fn decode(text: &str) -> Result<Vec<u8>> {
        hex::decode(text).map_err(|e| BleLinkError::InvalidHex(format!("{text:?}: {e}")))
    }

    /// Check that every character is a hex digit (any case).
    ///
    /// Unlike [`HexCodec::decode`] this accepts odd lengths, since a chunk
    /// boundary may fall between the two digits of a byte.
    #[inline]
    pub fn is_hex(text: &str) -> bool {
        text.bytes().all(|b| b.is_ascii_hexdigit())
    }
}
