//! Per-connection frame decoder with an inactivity timeout.
//!
//! Wraps a [`FrameBuffer`] with the one asynchronous piece of the protocol:
//! a timer that drops an incomplete frame when no chunk has arrived for
//! `delay_time`.
//!
//! # Timer discipline
//!
//! ```text
//! ingest ─► push ─► data still buffered? ─► yes ─► abort old timer, arm new one
//!                                        └► no  ─► abort old timer
//! reset / drop ─────────────────────────────────► abort old timer
//! ```
//!
//! Exactly one timer is armed per decoder. Aborting a tokio task does not
//! stop one that already woke up and is waiting for the lock, so every
//! buffer mutation bumps a generation counter and a timer only acts if the
//! generation it was armed with is still current. A stale timer can
//! therefore never clear a frame that started after it was armed, nor
//! report a timeout for a frame that was already emitted or rejected.
//!
//! # Without a runtime
//!
//! Notifications may arrive on a native callback thread with no tokio
//! runtime. No timer is armed there; instead each `ingest` first expires a
//! buffer that has been idle for `delay_time`, and hosts may call
//! [`FrameDecoder::expire_stale`] themselves to age out a frame whose
//! remaining chunks never come.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::codec::HexCodec;
use crate::config::DecoderConfig;
use crate::error::{BleLinkError, Result};
use crate::handler::{DecodeErrorKind, EventSink};
use crate::protocol::{Frame, FrameBuffer};

/// Buffer state shared with the timer task.
#[derive(Debug, Default)]
struct Shared {
    buffer: FrameBuffer,
    /// Bumped on every mutation; identifies the armed timer.
    generation: u64,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Frame decoder for one connection.
///
/// `ingest` takes `&mut self`: notifications of one connection must be
/// processed one at a time, in arrival order. Decoders of different
/// connections are fully independent.
pub struct FrameDecoder {
    connection_id: Arc<str>,
    shared: Arc<Mutex<Shared>>,
    timer: Option<JoinHandle<()>>,
    delay_time: Duration,
    sink: Arc<dyn EventSink>,
}

impl FrameDecoder {
    /// Create a decoder reporting to `sink`.
    pub fn new(
        connection_id: impl Into<Arc<str>>,
        config: DecoderConfig,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            connection_id: connection_id.into(),
            shared: Arc::new(Mutex::new(Shared::default())),
            timer: None,
            delay_time: config.delay_time,
            sink,
        }
    }

    /// Feed one hex chunk from the notification channel.
    ///
    /// A completed frame is passed to the sink and returned. A frame that
    /// fails length validation is reported to the sink as
    /// [`DecodeErrorKind::MalformedFrame`] and returned as `Err`; the
    /// decoder stays usable.
    ///
    /// # Errors
    ///
    /// - `MalformedFrame` when a trail marker closed an inconsistent frame.
    /// - `InvalidHex` when the chunk is not hex text; nothing is buffered
    ///   and the timer is left as it was.
    pub fn ingest(&mut self, chunk: &str) -> Result<Option<Frame>> {
        let runtime = Handle::try_current().ok();
        if runtime.is_none() {
            self.expire_stale();
        }

        let mut shared = lock(&self.shared);
        let result = shared.buffer.push(chunk);
        if matches!(result, Err(BleLinkError::InvalidHex(_))) {
            return result;
        }

        shared.generation += 1;
        let generation = shared.generation;
        let pending = !shared.buffer.is_empty();
        drop(shared);

        self.cancel_timer();
        if let (true, Some(runtime)) = (pending, runtime) {
            self.arm_timer(&runtime, generation);
        }

        match result {
            Ok(Some(frame)) => {
                tracing::debug!(
                    connection_id = %self.connection_id,
                    command = format_args!("{:02X}", frame.command()),
                    payload_len = frame.payload_len(),
                    "Frame received"
                );
                self.sink.on_frame(&self.connection_id, &frame);
                Ok(Some(frame))
            }
            Err(BleLinkError::MalformedFrame { declared, actual }) => {
                tracing::warn!(
                    connection_id = %self.connection_id,
                    ?declared,
                    actual,
                    "Dropping frame with length mismatch"
                );
                self.sink.on_decode_error(
                    &self.connection_id,
                    DecodeErrorKind::MalformedFrame { declared, actual },
                );
                Err(BleLinkError::MalformedFrame { declared, actual })
            }
            other => other,
        }
    }

    /// Feed raw notification bytes.
    pub fn ingest_bytes(&mut self, data: &[u8]) -> Result<Option<Frame>> {
        self.ingest(&HexCodec::encode(data))
    }

    /// Drop any buffered data and cancel the timer.
    ///
    /// Called on disconnect; nothing is reported to the sink.
    pub fn reset(&mut self) {
        {
            let mut shared = lock(&self.shared);
            shared.buffer.clear();
            shared.generation += 1;
        }
        self.cancel_timer();
    }

    /// Drop buffered data that has been idle for `delay_time`.
    ///
    /// Returns `FrameTimeout`, after reporting it to the sink, if a frame was
    /// in flight. Only needed when ingesting outside a tokio runtime, where
    /// no timer runs.
    pub fn expire_stale(&mut self) -> Option<DecodeErrorKind> {
        let (expired, discarded) = {
            let mut shared = lock(&self.shared);
            let discarded = shared.buffer.len();
            let expired = shared.buffer.expire_stale(Instant::now(), self.delay_time);
            if discarded == 0 || !shared.buffer.is_empty() {
                return None;
            }
            shared.generation += 1;
            (expired, discarded)
        };

        self.cancel_timer();
        report_expiry(
            &self.connection_id,
            self.sink.as_ref(),
            self.delay_time,
            expired,
            discarded,
        )
    }

    /// Connection this decoder belongs to.
    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    /// Inactivity window before an incomplete frame is dropped.
    pub fn delay_time(&self) -> Duration {
        self.delay_time
    }

    /// Check if a head marker was seen and the trail is outstanding.
    pub fn is_awaiting_trail(&self) -> bool {
        lock(&self.shared).buffer.is_awaiting_trail()
    }

    /// Number of buffered hex digits.
    pub fn buffered_len(&self) -> usize {
        lock(&self.shared).buffer.len()
    }

    /// Check if the inactivity timer is armed.
    pub fn has_pending_timer(&self) -> bool {
        self.timer.as_ref().is_some_and(|timer| !timer.is_finished())
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    fn arm_timer(&mut self, runtime: &Handle, generation: u64) {
        let shared = Arc::clone(&self.shared);
        let sink = Arc::clone(&self.sink);
        let connection_id = Arc::clone(&self.connection_id);
        let delay_time = self.delay_time;

        self.timer = Some(runtime.spawn(async move {
            tokio::time::sleep(delay_time).await;

            let (expired, discarded) = {
                let mut shared = lock(&shared);
                if shared.generation != generation {
                    return;
                }
                shared.generation += 1;
                let discarded = shared.buffer.len();
                (shared.buffer.expire(), discarded)
            };

            report_expiry(&connection_id, sink.as_ref(), delay_time, expired, discarded);
        }));
    }
}

/// Log an expired buffer and report a timed-out frame to the sink.
fn report_expiry(
    connection_id: &str,
    sink: &dyn EventSink,
    delay_time: Duration,
    expired: Option<BleLinkError>,
    discarded: usize,
) -> Option<DecodeErrorKind> {
    match expired.as_ref().and_then(DecodeErrorKind::from_error) {
        Some(kind) => {
            tracing::warn!(
                connection_id,
                discarded,
                "Incomplete frame timed out after {:?}",
                delay_time
            );
            sink.on_decode_error(connection_id, kind);
            Some(kind)
        }
        None => {
            tracing::debug!(connection_id, discarded, "Discarding unframed data");
            None
        }
    }
}

impl Drop for FrameDecoder {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

impl std::fmt::Debug for FrameDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameDecoder")
            .field("connection_id", &self.connection_id)
            .field("delay_time", &self.delay_time)
            .field("buffered_len", &self.buffered_len())
            .field("has_pending_timer", &self.has_pending_timer())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{ChannelSink, ConnectionEvent};
    use tokio::sync::mpsc::UnboundedReceiver;

    fn decoder() -> (FrameDecoder, UnboundedReceiver<ConnectionEvent>) {
        let (sink, rx) = ChannelSink::channel();
        let decoder = FrameDecoder::new("dev-1", DecoderConfig::default(), Arc::new(sink));
        (decoder, rx)
    }

    fn drain(rx: &mut UnboundedReceiver<ConnectionEvent>) -> Vec<ConnectionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn timeout_event() -> ConnectionEvent {
        ConnectionEvent::DecodeError {
            connection_id: "dev-1".to_string(),
            kind: DecodeErrorKind::FrameTimeout,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_frame_is_reported() {
        let (mut decoder, mut rx) = decoder();

        let frame = decoder.ingest("FEFD048D010203FCFB").unwrap().unwrap();

        assert_eq!(frame, Frame::from_parts(0x8D, &[1, 2, 3]));
        assert_eq!(
            drain(&mut rx),
            vec![ConnectionEvent::Frame {
                connection_id: "dev-1".to_string(),
                frame
            }]
        );
        assert!(!decoder.has_pending_timer());
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_frame_times_out() {
        let (mut decoder, mut rx) = decoder();

        assert!(decoder.ingest("FEFD048D").unwrap().is_none());
        assert!(decoder.is_awaiting_trail());
        assert!(decoder.has_pending_timer());

        tokio::time::sleep(Duration::from_millis(301)).await;

        assert_eq!(drain(&mut rx), vec![timeout_event()]);
        assert_eq!(decoder.buffered_len(), 0);
        assert!(!decoder.is_awaiting_trail());
    }

    #[tokio::test(start_paused = true)]
    async fn test_chunks_within_window_decode() {
        let (mut decoder, mut rx) = decoder();

        decoder.ingest("FEFD048D").unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        decoder.ingest("0102").unwrap();
        // 400 ms since the head, but only 200 ms since the last chunk.
        tokio::time::sleep(Duration::from_millis(200)).await;
        let frame = decoder.ingest("03FCFB").unwrap();

        assert!(frame.is_some());
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_cancels_timer() {
        let (mut decoder, mut rx) = decoder();

        decoder.ingest("FEFD048D01").unwrap();
        let err = decoder.ingest("02FCFB").unwrap_err();
        assert!(matches!(err, BleLinkError::MalformedFrame { .. }));
        assert!(!decoder.has_pending_timer());

        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(
            drain(&mut rx),
            vec![ConnectionEvent::DecodeError {
                connection_id: "dev-1".to_string(),
                kind: DecodeErrorKind::MalformedFrame {
                    declared: Some(4),
                    actual: 2
                }
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_cancels_timer() {
        let (mut decoder, mut rx) = decoder();

        decoder.ingest("FEFD048D").unwrap();
        tokio::time::sleep(Duration::from_millis(299)).await;
        decoder.reset();
        assert!(!decoder.has_pending_timer());

        // A new frame starts just before the old timer would have fired.
        decoder.ingest("FEFD020B").unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;

        assert_eq!(decoder.buffered_len(), 8);
        assert!(drain(&mut rx).is_empty());

        let frame = decoder.ingest("07FCFB").unwrap().unwrap();
        assert_eq!(frame, Frame::from_parts(0x0B, &[0x07]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_timeout() {
        let (mut decoder, mut rx) = decoder();

        decoder.ingest("FEFD04").unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        let frame = decoder.ingest("FEFD010AFCFB").unwrap();

        assert_eq!(frame, Some(Frame::from_parts(0x0A, &[])));
        assert_eq!(drain(&mut rx).first(), Some(&timeout_event()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unframed_data_dropped_silently() {
        let (mut decoder, mut rx) = decoder();

        decoder.ingest("0102").unwrap();
        assert!(!decoder.is_awaiting_trail());
        tokio::time::sleep(Duration::from_millis(301)).await;

        assert_eq!(decoder.buffered_len(), 0);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_hex_keeps_timer() {
        let (mut decoder, mut rx) = decoder();

        decoder.ingest("FEFD04").unwrap();
        assert!(decoder.ingest("zz").is_err());
        assert!(decoder.has_pending_timer());

        tokio::time::sleep(Duration::from_millis(301)).await;
        assert_eq!(drain(&mut rx), vec![timeout_event()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_delay() {
        let (sink, mut rx) = ChannelSink::channel();
        let config = DecoderConfig::with_delay_time(Duration::from_millis(50));
        let mut decoder = FrameDecoder::new("dev-1", config, Arc::new(sink));

        decoder.ingest_bytes(&[0xFE, 0xFD, 0x02]).unwrap();
        tokio::time::sleep(Duration::from_millis(51)).await;

        assert_eq!(drain(&mut rx), vec![timeout_event()]);
        assert_eq!(decoder.delay_time(), Duration::from_millis(50));
    }

    #[test]
    fn test_ingest_without_runtime() {
        let (mut decoder, mut rx) = decoder();

        assert!(decoder.ingest("FEFD048D").unwrap().is_none());
        assert!(!decoder.has_pending_timer());
        let frame = decoder.ingest("010203FCFB").unwrap().unwrap();

        assert_eq!(frame, Frame::from_parts(0x8D, &[1, 2, 3]));
        assert_eq!(
            drain(&mut rx),
            vec![ConnectionEvent::Frame {
                connection_id: "dev-1".to_string(),
                frame
            }]
        );
    }

    #[test]
    fn test_stale_frame_expires_on_next_chunk_without_runtime() {
        let (sink, mut rx) = ChannelSink::channel();
        let config = DecoderConfig::with_delay_time(Duration::from_millis(20));
        let mut decoder = FrameDecoder::new("dev-1", config, Arc::new(sink));

        decoder.ingest("FEFD048D").unwrap();
        std::thread::sleep(Duration::from_millis(40));
        let frame = decoder.ingest("FEFD010AFCFB").unwrap();

        assert_eq!(frame, Some(Frame::from_parts(0x0A, &[])));
        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], timeout_event());
    }

    #[test]
    fn test_expire_stale_polling() {
        let (sink, mut rx) = ChannelSink::channel();
        let config = DecoderConfig::with_delay_time(Duration::from_millis(10));
        let mut decoder = FrameDecoder::new("dev-1", config, Arc::new(sink));

        decoder.ingest("FEFD04").unwrap();
        assert_eq!(decoder.expire_stale(), None);
        assert_eq!(decoder.buffered_len(), 6);

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(decoder.expire_stale(), Some(DecodeErrorKind::FrameTimeout));
        assert_eq!(decoder.buffered_len(), 0);
        assert_eq!(decoder.expire_stale(), None);
        assert_eq!(drain(&mut rx), vec![timeout_event()]);
    }

    #[test]
    fn test_expire_stale_drops_unframed_data_silently() {
        let (sink, mut rx) = ChannelSink::channel();
        let config = DecoderConfig::with_delay_time(Duration::from_millis(10));
        let mut decoder = FrameDecoder::new("dev-1", config, Arc::new(sink));

        decoder.ingest("0102").unwrap();
        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(decoder.expire_stale(), None);
        assert_eq!(decoder.buffered_len(), 0);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_timer() {
        let (mut decoder, mut rx) = decoder();

        decoder.ingest("FEFD04").unwrap();
        drop(decoder);
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(drain(&mut rx).is_empty());
    }
}
