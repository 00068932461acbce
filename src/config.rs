//! Decoder configuration.
//!
//! The only tunable is the inactivity window after which an incomplete
//! frame is dropped. 100 ms is usually enough between notifications of one
//! frame; the default leaves headroom for slow stacks.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use blelink::config::DecoderConfig;
//!
//! let config = DecoderConfig::from_json(r#"{"delay_time_ms": 500}"#).unwrap();
//! assert_eq!(config.delay_time, Duration::from_millis(500));
//!
//! let config = DecoderConfig::from_json("{}").unwrap();
//! assert_eq!(config, DecoderConfig::default());
//! ```

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Result;

/// Default inactivity window before an incomplete frame is dropped.
pub const DEFAULT_DELAY_TIME: Duration = Duration::from_millis(300);

/// Configuration for a connection's frame decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Inactivity window after the last chunk of an incomplete frame.
    #[serde(
        rename = "delay_time_ms",
        serialize_with = "serialize_millis",
        deserialize_with = "deserialize_millis"
    )]
    pub delay_time: Duration,
}

impl DecoderConfig {
    /// Create a config with a custom inactivity window.
    pub fn with_delay_time(delay_time: Duration) -> Self {
        Self { delay_time }
    }

    /// Parse a config from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            delay_time: DEFAULT_DELAY_TIME,
        }
    }
}

fn serialize_millis<S: Serializer>(
    value: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
}

fn deserialize_millis<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_millis)
}
