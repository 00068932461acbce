//! Transport module - the BLE stack seen from this crate.
//!
//! Scanning, connecting and GATT I/O belong to the platform BLE stack. The
//! crate only needs the handful of GATT operations behind [`Transport`];
//! implement it over whatever stack the application uses (btleplug, a
//! mobile bridge, a test double).
//!
//! [`MemoryTransport`] records every operation and serves canned reads, for
//! tests and offline replay.

mod memory;

use std::future::Future;
use std::pin::Pin;

use crate::capability::CharacteristicRef;
use crate::error::Result;

pub use memory::{MemoryTransport, TransportOp};

/// Boxed future for transport results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// GATT operations on a connected peripheral.
pub trait Transport: Send + Sync + 'static {
    /// Write with an ATT acknowledgement.
    fn write<'a>(
        &'a self,
        peripheral_id: &'a str,
        target: CharacteristicRef,
        data: Vec<u8>,
    ) -> BoxFuture<'a, Result<()>>;

    /// Write without acknowledgement.
    fn write_without_response<'a>(
        &'a self,
        peripheral_id: &'a str,
        target: CharacteristicRef,
        data: Vec<u8>,
    ) -> BoxFuture<'a, Result<()>>;

    /// Read the current value.
    fn read<'a>(
        &'a self,
        peripheral_id: &'a str,
        target: CharacteristicRef,
    ) -> BoxFuture<'a, Result<Vec<u8>>>;

    /// Subscribe to notifications.
    fn start_notification<'a>(
        &'a self,
        peripheral_id: &'a str,
        target: CharacteristicRef,
    ) -> BoxFuture<'a, Result<()>>;

    /// Unsubscribe from notifications.
    fn stop_notification<'a>(
        &'a self,
        peripheral_id: &'a str,
        target: CharacteristicRef,
    ) -> BoxFuture<'a, Result<()>>;
}
