//! Event sinks - where decoded frames and decode errors go.
//!
//! The decoder never dispatches commands itself. It reports to an
//! [`EventSink`], either synchronously from `ingest` or from its timeout
//! task, so implementations must be `Send + Sync`.

use thiserror::Error;
use tokio::sync::mpsc;

use crate::error::BleLinkError;
use crate::protocol::Frame;

/// Non-fatal decode failures reported to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeErrorKind {
    /// The LEN byte disagreed with the bytes received; the frame was dropped.
    #[error("malformed frame (declared {declared:?}, received {actual})")]
    MalformedFrame {
        /// Length announced by the LEN byte.
        declared: Option<u8>,
        /// Command + payload bytes actually received.
        actual: usize,
    },
    /// No trail marker arrived within the inactivity window.
    #[error("frame timeout")]
    FrameTimeout,
}

impl DecodeErrorKind {
    /// Map a crate error to its decode kind, if it is one.
    pub fn from_error(error: &BleLinkError) -> Option<Self> {
        match *error {
            BleLinkError::MalformedFrame { declared, actual } => {
                Some(DecodeErrorKind::MalformedFrame { declared, actual })
            }
            BleLinkError::FrameTimeout => Some(DecodeErrorKind::FrameTimeout),
            _ => None,
        }
    }
}

/// Receiver of decoder output for one or more connections.
pub trait EventSink: Send + Sync + 'static {
    /// A complete, length-validated frame arrived.
    fn on_frame(&self, connection_id: &str, frame: &Frame);

    /// A frame was dropped.
    fn on_decode_error(&self, connection_id: &str, kind: DecodeErrorKind);
}

/// Sink that ignores everything.
///
/// Useful when the caller consumes `ingest` return values directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn on_frame(&self, _connection_id: &str, _frame: &Frame) {}

    fn on_decode_error(&self, _connection_id: &str, _kind: DecodeErrorKind) {}
}

/// Decoder output as a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// See [`EventSink::on_frame`].
    Frame {
        /// Connection the frame arrived on.
        connection_id: String,
        /// The decoded frame.
        frame: Frame,
    },
    /// See [`EventSink::on_decode_error`].
    DecodeError {
        /// Connection the error occurred on.
        connection_id: String,
        /// What went wrong.
        kind: DecodeErrorKind,
    },
}

/// Sink that forwards events into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ConnectionEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver for its events.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ConnectionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: ConnectionEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("Event receiver dropped, discarding decoder event");
        }
    }
}

impl EventSink for ChannelSink {
    fn on_frame(&self, connection_id: &str, frame: &Frame) {
        self.send(ConnectionEvent::Frame {
            connection_id: connection_id.to_string(),
            frame: frame.clone(),
        });
    }

    fn on_decode_error(&self, connection_id: &str, kind: DecodeErrorKind) {
        self.send(ConnectionEvent::DecodeError {
            connection_id: connection_id.to_string(),
            kind,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_sink_forwards() {
        let (sink, mut rx) = ChannelSink::channel();
        let frame = Frame::from_parts(0x8D, &[1]);

        sink.on_frame("dev-1", &frame);
        sink.on_decode_error("dev-1", DecodeErrorKind::FrameTimeout);

        assert_eq!(
            rx.try_recv().unwrap(),
            ConnectionEvent::Frame {
                connection_id: "dev-1".to_string(),
                frame
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            ConnectionEvent::DecodeError {
                connection_id: "dev-1".to_string(),
                kind: DecodeErrorKind::FrameTimeout
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_sink_receiver_dropped() {
        let (sink, rx) = ChannelSink::channel();
        drop(rx);

        // Must not panic.
        sink.on_decode_error("dev-1", DecodeErrorKind::FrameTimeout);
    }

    #[test]
    fn test_kind_from_error() {
        let err = BleLinkError::MalformedFrame {
            declared: Some(4),
            actual: 3,
        };
        assert_eq!(
            DecodeErrorKind::from_error(&err),
            Some(DecodeErrorKind::MalformedFrame {
                declared: Some(4),
                actual: 3
            })
        );
        assert_eq!(
            DecodeErrorKind::from_error(&BleLinkError::FrameTimeout),
            Some(DecodeErrorKind::FrameTimeout)
        );
        assert_eq!(DecodeErrorKind::from_error(&BleLinkError::EmptyFrame), None);
    }
}
