//! Reassembly buffer for chunked notification data.
//!
//! BLE notifications are bounded by the negotiated MTU, so a frame may be
//! split over several chunks, and a stack may also coalesce chunks. The
//! buffer accumulates upper-case hex text until a trail marker closes the
//! frame, then validates the LEN byte against what actually arrived.
//!
//! State machine:
//! - `Idle`: no head marker at the start of the buffer
//! - `AwaitingTrail`: head marker seen, waiting for the trail marker
//!
//! There is no resynchronizing state. A second head marker arriving before
//! the trail is absorbed into the current frame, which then fails length
//! validation or ages out. Recovery is always drop-and-restart.
//!
//! Nothing caps the buffer while chunks keep arriving inside the inactivity
//! window. Past [`MAX_FRAME_HEX`] digits a frame in flight can no longer
//! validate; this is logged once and the data is kept until the trail or the
//! timeout drops it.
//!
//! # Example
//!
//! ```
//! use blelink::protocol::FrameBuffer;
//!
//! let mut buffer = FrameBuffer::new();
//!
//! assert!(buffer.push("fefd048d01").unwrap().is_none());
//! let frame = buffer.push("0203fcfb").unwrap().unwrap();
//!
//! assert_eq!(frame.command(), 0x8D);
//! assert_eq!(frame.payload(), &[1, 2, 3]);
//! assert!(buffer.is_empty());
//! ```

use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};

use super::wire_format::{HEAD, HEAD_HEX, MAX_FRAME_DATA, OVERHEAD_SIZE, TRAIL_HEX};
use super::Frame;
use crate::codec::HexCodec;
use crate::error::{BleLinkError, Result};

/// Smallest complete frame in bytes: markers, LEN and the command byte.
const MIN_FRAME_SIZE: usize = OVERHEAD_SIZE + 1;

/// Hex digits of the largest frame LEN can describe.
pub const MAX_FRAME_HEX: usize = 2 * (OVERHEAD_SIZE + MAX_FRAME_DATA);

/// Hex digits before the LEN byte.
const LEN_OFFSET: usize = HEAD.len() * 2;

/// State machine for frame reassembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// No head marker at the start of the buffer.
    Idle,
    /// Head marker matched; LEN is known once its byte has arrived.
    AwaitingTrail { declared_len: Option<u8> },
}

/// Per-connection buffer that turns hex chunks into frames.
///
/// Holds at most one frame in flight. Never share one between connections.
#[derive(Debug)]
pub struct FrameBuffer {
    /// Accumulated upper-case hex text.
    buffer: BytesMut,
    /// Current reassembly state.
    state: State,
    /// When the last chunk was appended.
    last_activity: Option<Instant>,
}

impl FrameBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(2 * (MIN_FRAME_SIZE + 64)),
            state: State::Idle,
            last_activity: None,
        }
    }

    /// Append a hex chunk and return the frame it completes, if any.
    ///
    /// The chunk may be in either case and may end in the middle of a byte.
    ///
    /// # Errors
    ///
    /// - `InvalidHex` if the chunk contains non-hex characters. The buffer
    ///   is left untouched.
    /// - `MalformedFrame` if a trail marker closed a frame whose LEN byte
    ///   disagrees with the bytes received. The buffer is cleared.
    pub fn push(&mut self, chunk: &str) -> Result<Option<Frame>> {
        if !HexCodec::is_hex(chunk) {
            return Err(BleLinkError::InvalidHex(chunk.to_string()));
        }
        if chunk.is_empty() {
            return Ok(None);
        }

        let start = self.buffer.len();
        self.buffer.extend_from_slice(chunk.as_bytes());
        self.buffer[start..].make_ascii_uppercase();
        self.last_activity = Some(Instant::now());

        if self.buffer.starts_with(HEAD_HEX.as_bytes()) {
            self.state = State::AwaitingTrail {
                declared_len: self.read_declared_len(),
            };
        }

        if start <= MAX_FRAME_HEX && self.exceeds_max_frame() {
            tracing::debug!(
                buffered = self.buffer.len(),
                limit = MAX_FRAME_HEX,
                "Frame in flight is longer than any valid frame"
            );
        }

        if !self.ends_with_trail() {
            return Ok(None);
        }

        let declared = match self.state {
            State::AwaitingTrail { declared_len } => declared_len,
            State::Idle => None,
        };
        let actual = self.buffer.len() / 2 - OVERHEAD_SIZE;

        if declared.map(usize::from) != Some(actual) {
            self.clear();
            return Err(BleLinkError::MalformedFrame { declared, actual });
        }

        let frame = self.take_frame()?;
        Ok(Some(frame))
    }

    /// Append raw notification bytes.
    ///
    /// Equivalent to pushing their hex encoding.
    pub fn push_bytes(&mut self, data: &[u8]) -> Result<Option<Frame>> {
        self.push(&HexCodec::encode(data))
    }

    /// Discard whatever is buffered because the inactivity window elapsed.
    ///
    /// Returns `FrameTimeout` if a frame was in flight. Data that never
    /// started with a head marker is dropped without an error.
    pub fn expire(&mut self) -> Option<BleLinkError> {
        if self.buffer.is_empty() {
            return None;
        }

        let was_awaiting = self.is_awaiting_trail();
        self.clear();
        was_awaiting.then_some(BleLinkError::FrameTimeout)
    }

    /// Expire the buffer if nothing was appended for `delay` before `now`.
    ///
    /// For hosts that drive the inactivity window by polling instead of a
    /// timer task.
    pub fn expire_stale(&mut self, now: Instant, delay: Duration) -> Option<BleLinkError> {
        match self.last_activity {
            Some(at) if now.saturating_duration_since(at) >= delay => self.expire(),
            _ => None,
        }
    }

    /// Check if a head marker has been seen and the trail is outstanding.
    #[inline]
    pub fn is_awaiting_trail(&self) -> bool {
        matches!(self.state, State::AwaitingTrail { .. })
    }

    /// Check if the frame in flight has outgrown the largest valid frame.
    ///
    /// Such a frame can only end as `MalformedFrame` or `FrameTimeout`.
    #[inline]
    pub fn exceeds_max_frame(&self) -> bool {
        self.is_awaiting_trail() && self.buffer.len() > MAX_FRAME_HEX
    }

    /// LEN byte of the frame in flight, once it has arrived.
    #[inline]
    pub fn declared_len(&self) -> Option<u8> {
        match self.state {
            State::AwaitingTrail { declared_len } => declared_len,
            State::Idle => None,
        }
    }

    /// When the last chunk was appended, if anything is buffered.
    #[inline]
    pub fn last_activity(&self) -> Option<Instant> {
        self.last_activity
    }

    /// Get the buffered data as hex text.
    pub fn as_hex(&self) -> &str {
        std::str::from_utf8(&self.buffer).unwrap_or_default()
    }

    /// Get the number of buffered hex digits.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::Idle;
        self.last_activity = None;
    }

    fn read_declared_len(&self) -> Option<u8> {
        let digits = self.buffer.get(LEN_OFFSET..LEN_OFFSET + 2)?;
        let digits = std::str::from_utf8(digits).ok()?;
        u8::from_str_radix(digits, 16).ok()
    }

    /// A trail only counts on a byte boundary and after a minimal frame,
    /// otherwise it overlaps the head or LEN.
    fn ends_with_trail(&self) -> bool {
        self.buffer.len() % 2 == 0
            && self.buffer.len() >= 2 * MIN_FRAME_SIZE
            && self.buffer.ends_with(TRAIL_HEX.as_bytes())
    }

    fn take_frame(&mut self) -> Result<Frame> {
        let text = std::str::from_utf8(&self.buffer)
            .map_err(|e| BleLinkError::InvalidHex(e.to_string()))?;
        let bytes = Bytes::from(HexCodec::decode(text)?);
        self.clear();

        let command = bytes[HEAD.len() + 1];
        let payload = bytes.slice(HEAD.len() + 2..bytes.len() - 2);
        Ok(Frame::new(command, payload))
    }

    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match self.state {
            State::Idle => "Idle",
            State::AwaitingTrail { .. } => "AwaitingTrail",
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
