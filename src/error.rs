//! Error types for blelink.

use thiserror::Error;

use crate::capability::Capability;

/// Main error type for all blelink operations.
///
/// Every variant is a local, recoverable condition. None of them implies the
/// peripheral should be disconnected; that policy belongs to the caller.
#[derive(Debug, Error)]
pub enum BleLinkError {
    /// A trail marker closed a frame whose LEN byte disagrees with the
    /// number of command + payload bytes actually received.
    ///
    /// `declared` is `None` when the buffer never started with a head marker.
    #[error("Malformed frame: declared length {declared:?}, received {actual} bytes")]
    MalformedFrame {
        /// Length announced by the LEN byte.
        declared: Option<u8>,
        /// Command + payload bytes between LEN and the trail marker.
        actual: usize,
    },

    /// An incomplete frame aged out before its trail marker arrived.
    #[error("Frame timed out waiting for trail marker")]
    FrameTimeout,

    /// Command + payload does not fit the single-byte LEN field.
    #[error("Frame input too large: {0} bytes (max 255)")]
    InputTooLarge(usize),

    /// A frame needs at least the command byte.
    #[error("Frame input is empty")]
    EmptyFrame,

    /// Manufacturer data with an odd number of hex digits.
    #[error("Invalid address length: {0} hex digits")]
    InvalidAddressLength(usize),

    /// Input that should be hexadecimal text is not.
    #[error("Invalid hex input: {0}")]
    InvalidHex(String),

    /// A service or characteristic identifier that is not a 16-, 32- or
    /// 128-bit UUID.
    #[error("Invalid UUID: {0}")]
    InvalidUuid(String),

    /// No characteristic at the requested position of a capability list.
    #[error("No {capability} characteristic at index {index}")]
    NoCharacteristic {
        /// Capability list that was queried.
        capability: Capability,
        /// Requested position.
        index: usize,
    },

    /// No connection registered under the given identifier.
    #[error("Unknown connection: {0}")]
    UnknownConnection(String),

    /// A connection is already registered under the given identifier.
    #[error("Connection already registered: {0}")]
    DuplicateConnection(String),

    /// Error reported by the external BLE transport.
    #[error("Transport error: {0}")]
    Transport(String),

    /// JSON deserialization error (peripheral info, config).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using BleLinkError.
pub type Result<T> = std::result::Result<T, BleLinkError>;
