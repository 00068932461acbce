//! # blelink
//!
//! Framing and characteristic bookkeeping for BLE peripherals that speak a
//! small hex-framed command protocol over GATT notifications.
//!
//! ## Architecture
//!
//! - **Decoder**: reassembles `FEFD LEN CMD PAYLOAD FCFB` frames from
//!   notification chunks, with a per-connection inactivity timeout
//! - **Capabilities**: normalizes discovered characteristics from Android or
//!   iOS into read / write / notify lists
//! - **Connection**: one peripheral's decoder, capability index and
//!   [`Transport`], managed in bulk by [`ConnectionManager`]
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use blelink::{ChannelSink, ConnectionEvent, ConnectionManager, MemoryTransport};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> blelink::Result<()> {
//! let (sink, mut events) = ChannelSink::channel();
//! let mut manager = ConnectionManager::new(Arc::new(MemoryTransport::new()))
//!     .with_sink(Arc::new(sink));
//!
//! manager.connect_with("band", &[])?;
//! manager.on_notification_chunk("band", "FEFD048D01")?;
//! manager.on_notification_chunk("band", "0203FCFB")?;
//!
//! match events.try_recv() {
//!     Ok(ConnectionEvent::Frame { frame, .. }) => assert_eq!(frame.command(), 0x8D),
//!     other => panic!("unexpected event: {other:?}"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod capability;
pub mod codec;
pub mod config;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod transport;

mod connection;
mod decoder;
mod manager;

pub use address::{extract_address, Advertisement};
pub use capability::{classify, Capability, CapabilityIndex, PeripheralInfo, Platform};
pub use config::DecoderConfig;
pub use connection::{Connection, ConnectionBuilder};
pub use decoder::FrameDecoder;
pub use error::{BleLinkError, Result};
pub use handler::{ChannelSink, CommandRegistry, ConnectionEvent, DecodeErrorKind, EventSink};
pub use manager::ConnectionManager;
pub use protocol::{encode, encode_hex, Frame};
pub use transport::{MemoryTransport, Transport};
