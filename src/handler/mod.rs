//! Handler module - what happens to decoded frames.
//!
//! Provides:
//! - [`EventSink`] - receives frames and decode errors from a connection
//! - [`ChannelSink`] - forwards them into a tokio channel
//! - [`CommandRegistry`] - dispatches frames to handlers by command byte
//!
//! # Example
//!
//! ```ignore
//! use blelink::handler::CommandRegistry;
//!
//! let mut registry = CommandRegistry::new();
//!
//! registry.register(0x8D, |connection: &str, payload: &[u8]| {
//!     tracing::info!(connection, ?payload, "Battery report");
//! });
//! registry.set_error_handler(|connection: &str, kind| {
//!     tracing::warn!(connection, %kind, "Frame dropped");
//! });
//! ```

mod registry;
mod sink;

pub use registry::{CommandHandler, CommandRegistry, ErrorHandler};
pub use sink::{ChannelSink, ConnectionEvent, DecodeErrorKind, EventSink, NullSink};
