//! Protocol module - wire format, framing, and frame types.
//!
//! This module implements the hex framing used on the notification channel:
//! - Head/LEN/trail encoding
//! - Reassembly buffer for chunked notifications
//! - Frame struct with typed accessors

mod frame;
mod frame_buffer;
mod wire_format;

pub use frame::Frame;
pub use frame_buffer::{FrameBuffer, MAX_FRAME_HEX};
pub use wire_format::{
    encode, encode_hex, frame_len, HEAD, HEAD_HEX, MAX_FRAME_DATA, OVERHEAD_SIZE, TRAIL,
    TRAIL_HEX,
};
