//! Wire format constants and framing.
//!
//! Frames travel as hexadecimal text, two characters per byte:
//! ```text
//! ┌────────┬──────┬─────────┬──────────────────┬────────┐
//! │ Head   │ Len  │ Command │ Payload          │ Trail  │
//! │ FE FD  │ 1 B  │ 1 B     │ Len - 1 bytes    │ FC FB  │
//! └────────┴──────┴─────────┴──────────────────┴────────┘
//! ```
//!
//! `Len` counts the command byte plus the payload, so it ranges 1..=255.

use crate::codec::HexCodec;
use crate::error::{BleLinkError, Result};

/// Head marker bytes.
pub const HEAD: [u8; 2] = [0xFE, 0xFD];

/// Trail marker bytes.
pub const TRAIL: [u8; 2] = [0xFC, 0xFB];

/// Head marker as upper-case hex text.
pub const HEAD_HEX: &str = "FEFD";

/// Trail marker as upper-case hex text.
pub const TRAIL_HEX: &str = "FCFB";

/// Bytes taken by the marker and length fields around command + payload.
pub const OVERHEAD_SIZE: usize = HEAD.len() + 1 + TRAIL.len();

/// Largest command + payload the LEN byte can describe.
pub const MAX_FRAME_DATA: usize = u8::MAX as usize;

/// Validate the size of command + payload and return its LEN byte.
#[inline]
pub fn frame_len(data_len: usize) -> Result<u8> {
    if data_len == 0 {
        return Err(BleLinkError::EmptyFrame);
    }
    u8::try_from(data_len).map_err(|_| BleLinkError::InputTooLarge(data_len))
}

/// Wrap command + payload bytes in head, length and trail.
///
/// # Example
///
/// ```
/// use blelink::protocol::encode;
///
/// let bytes = encode(&[0x8D, 0x01, 0x02, 0x03]).unwrap();
/// assert_eq!(bytes, [0xFE, 0xFD, 0x04, 0x8D, 0x01, 0x02, 0x03, 0xFC, 0xFB]);
/// ```
pub fn encode(command_and_payload: &[u8]) -> Result<Vec<u8>> {
    let len = frame_len(command_and_payload.len())?;

    let mut buf = Vec::with_capacity(OVERHEAD_SIZE + command_and_payload.len());
    buf.extend_from_slice(&HEAD);
    buf.push(len);
    buf.extend_from_slice(command_and_payload);
    buf.extend_from_slice(&TRAIL);
    Ok(buf)
}

/// Wrap hex-encoded command + payload in head, length and trail.
///
/// Output is upper-case regardless of the input's case.
///
/// # Example
///
/// ```
/// use blelink::protocol::encode_hex;
///
/// assert_eq!(encode_hex("0a").unwrap(), "FEFD010AFCFB");
/// ```
pub fn encode_hex(command_and_payload: &str) -> Result<String> {
    let data = HexCodec::decode(command_and_payload)?;
    let len = frame_len(data.len())?;

    let mut out = String::with_capacity(2 * (OVERHEAD_SIZE + data.len()));
    out.push_str(HEAD_HEX);
    out.push_str(&HexCodec::encode(&[len]));
    out.push_str(&HexCodec::encode(&data));
    out.push_str(TRAIL_HEX);
    Ok(out)
}
