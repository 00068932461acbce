//! Connection context for one peripheral.
//!
//! A [`Connection`] ties together the pieces a connected peripheral needs:
//! the frame decoder fed by its notifications, the capability index built
//! from service discovery, and the transport used to reach it. Outgoing
//! payloads are framed before they are written.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use blelink::{ConnectionBuilder, MemoryTransport, Platform};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> blelink::Result<()> {
//! let transport = Arc::new(MemoryTransport::new());
//! let mut conn = ConnectionBuilder::new("AA:BB")
//!     .platform(Platform::Ios)
//!     .build(transport);
//!
//! assert!(conn.capabilities().is_empty());
//! conn.disconnect();
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::capability::{classify, Capability, CapabilityIndex, PeripheralInfo, Platform};
use crate::capability::{CharacteristicRef, RawCapabilityRecord};
use crate::config::DecoderConfig;
use crate::decoder::FrameDecoder;
use crate::error::Result;
use crate::handler::{EventSink, NullSink};
use crate::protocol::{encode, Frame};
use crate::transport::Transport;

/// Builder for a [`Connection`].
pub struct ConnectionBuilder {
    id: String,
    platform: Platform,
    config: DecoderConfig,
    sink: Arc<dyn EventSink>,
}

impl ConnectionBuilder {
    /// Create a builder for the peripheral `id`.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            platform: Platform::Android,
            config: DecoderConfig::default(),
            sink: Arc::new(NullSink),
        }
    }

    /// Platform whose property format discovery results use.
    ///
    /// Default: Android
    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Set the decoder configuration.
    pub fn config(mut self, config: DecoderConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the partial frame timeout.
    ///
    /// Default: 300 ms
    pub fn delay_time(mut self, delay_time: Duration) -> Self {
        self.config.delay_time = delay_time;
        self
    }

    /// Set where decoded frames and decode errors are delivered.
    ///
    /// Default: [`NullSink`]
    pub fn sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Build the connection over `transport`.
    pub fn build<T: Transport>(self, transport: Arc<T>) -> Connection<T> {
        let decoder = FrameDecoder::new(self.id.as_str(), self.config, self.sink);
        Connection {
            id: self.id,
            platform: self.platform,
            decoder,
            index: CapabilityIndex::new(),
            transport,
        }
    }
}

/// A connected peripheral.
pub struct Connection<T: Transport> {
    id: String,
    platform: Platform,
    decoder: FrameDecoder,
    index: CapabilityIndex,
    transport: Arc<T>,
}

impl<T: Transport> Connection<T> {
    /// Peripheral identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Platform used when classifying.
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Current capability index.
    pub fn capabilities(&self) -> &CapabilityIndex {
        &self.index
    }

    /// The connection's frame decoder.
    pub fn decoder(&self) -> &FrameDecoder {
        &self.decoder
    }

    /// Replace the capability index from discovered characteristics.
    ///
    /// The previous index is dropped first; on error the connection is
    /// left with an empty index.
    pub fn classify(&mut self, records: &[RawCapabilityRecord]) -> Result<&CapabilityIndex> {
        self.index.clear();
        self.index = classify(records, self.platform)?;

        tracing::info!(
            connection_id = %self.id,
            read = self.index.read().len(),
            write = self.index.write_with_response().len(),
            write_without_response = self.index.write_without_response().len(),
            notify = self.index.notify().len(),
            "Capabilities classified"
        );
        Ok(&self.index)
    }

    /// Classify from a full discovery result.
    pub fn classify_peripheral(&mut self, info: &PeripheralInfo) -> Result<&CapabilityIndex> {
        self.classify(&info.characteristics)
    }

    /// Feed one hex notification chunk to the decoder.
    pub fn on_notification_chunk(&mut self, chunk: &str) -> Result<Option<Frame>> {
        self.decoder.ingest(chunk)
    }

    /// Feed one raw notification value to the decoder.
    pub fn on_notification_bytes(&mut self, data: &[u8]) -> Result<Option<Frame>> {
        self.decoder.ingest_bytes(data)
    }

    /// Frame `command_and_payload` and write it with response to the
    /// `index`-th writable characteristic.
    pub async fn write(&self, command_and_payload: &[u8], index: usize) -> Result<()> {
        let target = self.index.get(Capability::WriteWithResponse, index)?;
        let bytes = encode(command_and_payload)?;
        tracing::debug!(connection_id = %self.id, %target, len = bytes.len(), "Writing frame");
        self.transport.write(&self.id, target, bytes).await
    }

    /// Frame `command_and_payload` and write it without response to the
    /// `index`-th characteristic supporting that.
    pub async fn write_without_response(
        &self,
        command_and_payload: &[u8],
        index: usize,
    ) -> Result<()> {
        let target = self.index.get(Capability::WriteWithoutResponse, index)?;
        let bytes = encode(command_and_payload)?;
        tracing::debug!(
            connection_id = %self.id,
            %target,
            len = bytes.len(),
            "Writing frame without response"
        );
        self.transport
            .write_without_response(&self.id, target, bytes)
            .await
    }

    /// Write a frame with response.
    pub async fn send_frame(&self, frame: &Frame, index: usize) -> Result<()> {
        self.write(&frame.command_and_payload(), index).await
    }

    /// Read the raw value of the `index`-th readable characteristic.
    pub async fn read(&self, index: usize) -> Result<Vec<u8>> {
        let target = self.index.get(Capability::Read, index)?;
        self.transport.read(&self.id, target).await
    }

    /// Read the `index`-th readable characteristic as text.
    ///
    /// Invalid UTF-8 sequences are replaced rather than rejected.
    pub async fn read_string(&self, index: usize) -> Result<String> {
        let bytes = self.read(index).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Subscribe to the `index`-th notifying characteristic.
    pub async fn start_notification(&self, index: usize) -> Result<CharacteristicRef> {
        let target = self.index.get(Capability::Notify, index)?;
        self.transport.start_notification(&self.id, target).await?;
        tracing::debug!(connection_id = %self.id, %target, "Notifications started");
        Ok(target)
    }

    /// Unsubscribe from the `index`-th notifying characteristic.
    pub async fn stop_notification(&self, index: usize) -> Result<CharacteristicRef> {
        let target = self.index.get(Capability::Notify, index)?;
        self.transport.stop_notification(&self.id, target).await?;
        tracing::debug!(connection_id = %self.id, %target, "Notifications stopped");
        Ok(target)
    }

    /// Drop buffered data and forget capabilities.
    pub fn disconnect(&mut self) {
        self.decoder.reset();
        self.index.clear();
        tracing::info!(connection_id = %self.id, "Disconnected");
    }
}

impl<T: Transport> std::fmt::Debug for Connection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("platform", &self.platform)
            .field("decoder", &self.decoder)
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}
