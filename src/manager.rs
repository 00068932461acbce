//! Registry of live connections.
//!
//! Routes notification chunks by connection identifier so several
//! peripherals can stream at once, each through its own decoder.

use std::collections::HashMap;
use std::sync::Arc;

use crate::capability::{PeripheralInfo, Platform, RawCapabilityRecord};
use crate::config::DecoderConfig;
use crate::connection::{Connection, ConnectionBuilder};
use crate::error::{BleLinkError, Result};
use crate::handler::{EventSink, NullSink};
use crate::protocol::Frame;
use crate::transport::Transport;

/// Owns one [`Connection`] per connected peripheral.
pub struct ConnectionManager<T: Transport> {
    transport: Arc<T>,
    sink: Arc<dyn EventSink>,
    config: DecoderConfig,
    platform: Platform,
    connections: HashMap<String, Connection<T>>,
}

impl<T: Transport> ConnectionManager<T> {
    /// Create a manager whose connections report to [`NullSink`].
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            sink: Arc::new(NullSink),
            config: DecoderConfig::default(),
            platform: Platform::Android,
            connections: HashMap::new(),
        }
    }

    /// Share `sink` between all connections created from now on.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Decoder configuration for new connections.
    pub fn with_config(mut self, config: DecoderConfig) -> Self {
        self.config = config;
        self
    }

    /// Platform used to classify new connections.
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Register a connected peripheral and classify its characteristics.
    pub fn connect(&mut self, info: &PeripheralInfo) -> Result<&mut Connection<T>> {
        self.connect_with(&info.id, &info.characteristics)
    }

    /// Register `id` with already discovered characteristics.
    ///
    /// # Errors
    ///
    /// - `DuplicateConnection` if `id` is already connected.
    /// - `InvalidUuid` if classification fails; nothing is registered.
    pub fn connect_with(
        &mut self,
        id: &str,
        records: &[RawCapabilityRecord],
    ) -> Result<&mut Connection<T>> {
        if self.connections.contains_key(id) {
            return Err(BleLinkError::DuplicateConnection(id.to_string()));
        }

        let mut connection = ConnectionBuilder::new(id)
            .platform(self.platform)
            .config(self.config)
            .sink(Arc::clone(&self.sink))
            .build(Arc::clone(&self.transport));
        connection.classify(records)?;

        tracing::info!(connection_id = %id, active = self.connections.len() + 1, "Connected");
        Ok(self.connections.entry(id.to_string()).or_insert(connection))
    }

    /// Route a notification chunk to its connection's decoder.
    pub fn on_notification_chunk(&mut self, id: &str, chunk: &str) -> Result<Option<Frame>> {
        self.get_mut(id)?.on_notification_chunk(chunk)
    }

    /// Tear down `id`, cancelling its pending timeout.
    pub fn disconnect(&mut self, id: &str) -> Result<()> {
        let mut connection = self
            .connections
            .remove(id)
            .ok_or_else(|| BleLinkError::UnknownConnection(id.to_string()))?;
        connection.disconnect();
        Ok(())
    }

    /// Tear down every connection.
    pub fn disconnect_all(&mut self) {
        for (_, mut connection) in self.connections.drain() {
            connection.disconnect();
        }
    }

    /// Look up a connection.
    pub fn get(&self, id: &str) -> Result<&Connection<T>> {
        self.connections
            .get(id)
            .ok_or_else(|| BleLinkError::UnknownConnection(id.to_string()))
    }

    /// Look up a connection mutably.
    pub fn get_mut(&mut self, id: &str) -> Result<&mut Connection<T>> {
        self.connections
            .get_mut(id)
            .ok_or_else(|| BleLinkError::UnknownConnection(id.to_string()))
    }

    /// Whether `id` is connected.
    pub fn contains(&self, id: &str) -> bool {
        self.connections.contains_key(id)
    }

    /// Identifiers of connected peripherals, in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.connections.keys().map(String::as_str)
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether no peripheral is connected.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{ChannelSink, ConnectionEvent, DecodeErrorKind};
    use crate::transport::MemoryTransport;
    use std::time::Duration;

    fn manager() -> (
        ConnectionManager<MemoryTransport>,
        tokio::sync::mpsc::UnboundedReceiver<ConnectionEvent>,
    ) {
        let (sink, rx) = ChannelSink::channel();
        let manager = ConnectionManager::new(Arc::new(MemoryTransport::new()))
            .with_sink(Arc::new(sink))
            .with_platform(Platform::Ios);
        (manager, rx)
    }

    #[tokio::test]
    async fn test_connect_and_disconnect() {
        let (mut manager, _rx) = manager();

        manager.connect_with("a", &[]).unwrap();
        assert!(manager.contains("a"));
        assert_eq!(manager.len(), 1);

        assert!(matches!(
            manager.connect_with("a", &[]),
            Err(BleLinkError::DuplicateConnection(id)) if id == "a"
        ));

        manager.disconnect("a").unwrap();
        assert!(manager.is_empty());
        assert!(matches!(
            manager.disconnect("a"),
            Err(BleLinkError::UnknownConnection(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_connection_chunk() {
        let (mut manager, _rx) = manager();
        assert!(matches!(
            manager.on_notification_chunk("ghost", "FEFD"),
            Err(BleLinkError::UnknownConnection(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connections_decode_independently() {
        let (mut manager, mut rx) = manager();
        manager.connect_with("a", &[]).unwrap();
        manager.connect_with("b", &[]).unwrap();

        manager.on_notification_chunk("a", "FEFD048D01").unwrap();
        manager.on_notification_chunk("b", "FEFD010A").unwrap();
        let frame = manager.on_notification_chunk("b", "FCFB").unwrap();
        assert_eq!(frame, Some(Frame::from_parts(0x0A, &[])));

        tokio::time::sleep(Duration::from_millis(301)).await;

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                ConnectionEvent::Frame {
                    connection_id: "b".to_string(),
                    frame: Frame::from_parts(0x0A, &[]),
                },
                ConnectionEvent::DecodeError {
                    connection_id: "a".to_string(),
                    kind: DecodeErrorKind::FrameTimeout,
                },
            ]
        );
    }

    #[test]
    fn test_routes_chunks_on_plain_thread() {
        let (mut manager, mut rx) = manager();
        manager.connect_with("a", &[]).unwrap();

        assert!(manager.on_notification_chunk("a", "FEFD04").unwrap().is_none());
        let frame = manager.on_notification_chunk("a", "8D010203FCFB").unwrap();

        assert_eq!(frame, Some(Frame::from_parts(0x8D, &[1, 2, 3])));
        assert_eq!(
            rx.try_recv().unwrap(),
            ConnectionEvent::Frame {
                connection_id: "a".to_string(),
                frame: Frame::from_parts(0x8D, &[1, 2, 3]),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_all_cancels_timers() {
        let (mut manager, mut rx) = manager();
        manager.connect_with("a", &[]).unwrap();
        manager.on_notification_chunk("a", "FEFD04").unwrap();

        manager.disconnect_all();
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert!(manager.is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_connect_from_peripheral_info() {
        let (mut manager, _rx) = manager();
        let info = PeripheralInfo::from_json(
            r#"{
                "id": "80:EA:CA:00:00:01",
                "characteristics": [
                    {"service": "FFF0", "characteristic": "FFF1", "properties": ["Notify"]}
                ]
            }"#,
        )
        .unwrap();

        let connection = manager.connect(&info).unwrap();
        assert_eq!(connection.capabilities().notify().len(), 1);
        assert_eq!(manager.ids().collect::<Vec<_>>(), vec!["80:EA:CA:00:00:01"]);
    }

    #[tokio::test]
    async fn test_failed_classification_is_not_registered() {
        let (mut manager, _rx) = manager();
        let records = vec![RawCapabilityRecord {
            service: "zz".to_string(),
            characteristic: "FFF1".to_string(),
            properties: crate::capability::RawProperties::Listed(vec![]),
        }];

        assert!(manager.connect_with("a", &records).is_err());
        assert!(!manager.contains("a"));
    }
}
