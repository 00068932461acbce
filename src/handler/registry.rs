//! Command registry for dispatching frames by command byte.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use blelink::handler::{CommandRegistry, EventSink};
//! use blelink::protocol::Frame;
//!
//! let seen = Arc::new(AtomicUsize::new(0));
//! let counter = seen.clone();
//!
//! let mut registry = CommandRegistry::new();
//! registry.register(0x8D, move |_connection: &str, payload: &[u8]| {
//!     counter.fetch_add(payload.len(), Ordering::SeqCst);
//! });
//!
//! registry.on_frame("dev-1", &Frame::from_parts(0x8D, &[1, 2, 3]));
//! assert_eq!(seen.load(Ordering::SeqCst), 3);
//! ```

use std::collections::HashMap;

use super::sink::{DecodeErrorKind, EventSink};
use crate::protocol::Frame;

/// Trait for command handler functions.
pub trait CommandHandler: Send + Sync + 'static {
    /// Handle the payload of one frame.
    fn call(&self, connection_id: &str, payload: &[u8]);
}

impl<F> CommandHandler for F
where
    F: Fn(&str, &[u8]) + Send + Sync + 'static,
{
    fn call(&self, connection_id: &str, payload: &[u8]) {
        self(connection_id, payload)
    }
}

/// Trait for decode error handler functions.
pub trait ErrorHandler: Send + Sync + 'static {
    /// Handle a dropped frame.
    fn call(&self, connection_id: &str, kind: DecodeErrorKind);
}

impl<F> ErrorHandler for F
where
    F: Fn(&str, DecodeErrorKind) + Send + Sync + 'static,
{
    fn call(&self, connection_id: &str, kind: DecodeErrorKind) {
        self(connection_id, kind)
    }
}

/// Registry mapping command bytes to handlers.
///
/// Implements [`EventSink`], so it can be handed straight to a connection.
/// Frames with no registered handler are logged and dropped.
#[derive(Default)]
pub struct CommandRegistry {
    /// Handlers by command byte.
    commands: HashMap<u8, Box<dyn CommandHandler>>,
    /// Called for every dropped frame, if set.
    on_error: Option<Box<dyn ErrorHandler>>,
}

impl CommandRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for a command, replacing any previous one.
    pub fn register<H: CommandHandler>(&mut self, command: u8, handler: H) {
        if self.commands.insert(command, Box::new(handler)).is_some() {
            tracing::debug!(command = format_args!("{command:02X}"), "Replaced command handler");
        }
    }

    /// Register the handler for dropped frames.
    pub fn set_error_handler<H: ErrorHandler>(&mut self, handler: H) {
        self.on_error = Some(Box::new(handler));
    }

    /// Check if a command has a handler.
    pub fn contains(&self, command: u8) -> bool {
        self.commands.contains_key(&command)
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Check if no command is registered.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Dispatch a frame to its handler.
    ///
    /// Returns `false` if no handler is registered for the command.
    pub fn dispatch(&self, connection_id: &str, frame: &Frame) -> bool {
        match self.commands.get(&frame.command()) {
            Some(handler) => {
                handler.call(connection_id, frame.payload());
                true
            }
            None => {
                tracing::debug!(
                    connection_id,
                    command = format_args!("{:02X}", frame.command()),
                    payload_len = frame.payload_len(),
                    "No handler for command"
                );
                false
            }
        }
    }
}

impl EventSink for CommandRegistry {
    fn on_frame(&self, connection_id: &str, frame: &Frame) {
        self.dispatch(connection_id, frame);
    }

    fn on_decode_error(&self, connection_id: &str, kind: DecodeErrorKind) {
        match &self.on_error {
            Some(handler) => handler.call(connection_id, kind),
            None => tracing::debug!(connection_id, %kind, "Unhandled decode error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_register_command() {
        let mut registry = CommandRegistry::new();
        assert!(registry.is_empty());

        registry.register(0x8D, |_: &str, _: &[u8]| {});

        assert!(registry.contains(0x8D));
        assert!(!registry.contains(0x8E));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_dispatch_routes_by_command() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = CommandRegistry::new();

        let log = seen.clone();
        registry.register(0x01, move |conn: &str, payload: &[u8]| {
            log.lock().unwrap().push((conn.to_string(), 0x01, payload.to_vec()));
        });
        let log = seen.clone();
        registry.register(0x02, move |conn: &str, payload: &[u8]| {
            log.lock().unwrap().push((conn.to_string(), 0x02, payload.to_vec()));
        });

        assert!(registry.dispatch("a", &Frame::from_parts(0x02, &[9])));
        assert!(registry.dispatch("b", &Frame::from_parts(0x01, &[])));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ("a".to_string(), 0x02, vec![9]),
                ("b".to_string(), 0x01, vec![])
            ]
        );
    }

    #[test]
    fn test_unknown_command() {
        let registry = CommandRegistry::new();
        assert!(!registry.dispatch("a", &Frame::from_parts(0x7F, &[])));
    }

    #[test]
    fn test_register_replaces() {
        let hits = Arc::new(Mutex::new(0));
        let mut registry = CommandRegistry::new();

        registry.register(0x01, |_: &str, _: &[u8]| panic!("replaced handler called"));
        let counter = hits.clone();
        registry.register(0x01, move |_: &str, _: &[u8]| *counter.lock().unwrap() += 1);

        registry.on_frame("a", &Frame::from_parts(0x01, &[]));
        assert_eq!(*hits.lock().unwrap(), 1);
    }

    #[test]
    fn test_decode_error_handler() {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let mut registry = CommandRegistry::new();

        // Without a handler the error is only logged.
        registry.on_decode_error("a", DecodeErrorKind::FrameTimeout);

        let log = errors.clone();
        registry.set_error_handler(move |conn: &str, kind: DecodeErrorKind| {
            log.lock().unwrap().push((conn.to_string(), kind));
        });
        registry.on_decode_error("a", DecodeErrorKind::FrameTimeout);

        assert_eq!(
            *errors.lock().unwrap(),
            vec![("a".to_string(), DecodeErrorKind::FrameTimeout)]
        );
    }
}
