//! Replay - feed recorded notification chunks through a decoder.
//!
//! Reads stdin line by line. Each line is one notification chunk in hex,
//! optionally prefixed with a connection id (`band FEFD048D`). A line of the
//! form `+250` waits that many milliseconds, which lets a capture reproduce
//! the partial frame timeout.
//!
//! # Running
//!
//! ```text
//! printf 'FEFD048D01\n0203FCFB\nFEFD02\n+400\n' \
//!     | RUST_LOG=debug cargo run --example replay
//! ```

use std::sync::Arc;
use std::time::Duration;

use blelink::{ChannelSink, ConnectionEvent, ConnectionManager, DecoderConfig, MemoryTransport};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONNECTION: &str = "replay";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = match std::env::var("BLELINK_CONFIG") {
        Ok(json) => DecoderConfig::from_json(&json)?,
        Err(_) => DecoderConfig::default(),
    };

    let (sink, mut events) = ChannelSink::channel();
    let mut manager = ConnectionManager::new(Arc::new(MemoryTransport::new()))
        .with_sink(Arc::new(sink))
        .with_config(config);

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                ConnectionEvent::Frame {
                    connection_id,
                    frame,
                } => tracing::info!(
                    %connection_id,
                    command = format_args!("{:02X}", frame.command()),
                    payload = %blelink::codec::HexCodec::encode(frame.payload()),
                    "Frame"
                ),
                ConnectionEvent::DecodeError {
                    connection_id,
                    kind,
                } => tracing::warn!(%connection_id, %kind, "Dropped"),
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(ms) = line.strip_prefix('+') {
            tokio::time::sleep(Duration::from_millis(ms.parse()?)).await;
            continue;
        }

        let (id, chunk) = line
            .split_once(char::is_whitespace)
            .map(|(id, chunk)| (id, chunk.trim()))
            .unwrap_or((DEFAULT_CONNECTION, line));

        if !manager.contains(id) {
            manager.connect_with(id, &[])?;
        }
        if let Err(e) = manager.on_notification_chunk(id, chunk) {
            tracing::debug!(connection_id = %id, error = %e, "Chunk rejected");
        }
    }

    // Let pending timeouts fire before tearing down.
    tokio::time::sleep(config.delay_time).await;
    manager.disconnect_all();
    drop(manager);
    printer.await?;

    Ok(())
}
