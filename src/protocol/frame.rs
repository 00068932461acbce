//! Frame struct with typed accessors.
//!
//! Represents one complete protocol message: a command byte plus payload.
//! Uses `bytes::Bytes` so frames can be handed to several sinks without
//! copying the payload.
//!
//! # Example
//!
//! ```
//! use blelink::protocol::Frame;
//! use bytes::Bytes;
//!
//! let frame = Frame::new(0x8D, Bytes::from_static(&[1, 2, 3]));
//!
//! assert_eq!(frame.command(), 0x8D);
//! assert_eq!(frame.declared_len(), 4);
//! assert_eq!(frame.encode_hex().unwrap(), "FEFD048D010203FCFB");
//! ```

use bytes::Bytes;

use super::wire_format::encode;
use crate::codec::HexCodec;
use crate::error::Result;

/// A complete protocol frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Command opcode.
    pub command: u8,
    /// Payload bytes following the command.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame from command and payload.
    pub fn new(command: u8, payload: Bytes) -> Self {
        Self { command, payload }
    }

    /// Create a frame from command and raw bytes (copies data).
    pub fn from_parts(command: u8, payload: &[u8]) -> Self {
        Self {
            command,
            payload: Bytes::copy_from_slice(payload),
        }
    }

    /// Get the command opcode.
    #[inline]
    pub fn command(&self) -> u8 {
        self.command
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Get the payload length.
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Value of the LEN byte for this frame (command + payload).
    #[inline]
    pub fn declared_len(&self) -> usize {
        1 + self.payload.len()
    }

    /// Command followed by payload, as it appears between LEN and the trail.
    pub fn command_and_payload(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.declared_len());
        buf.push(self.command);
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// Encode the frame into wire bytes.
    ///
    /// Fails with `InputTooLarge` if the payload exceeds 254 bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        encode(&self.command_and_payload())
    }

    /// Encode the frame into upper-case hex text.
    pub fn encode_hex(&self) -> Result<String> {
        Ok(HexCodec::encode(&self.encode()?))
    }
}
