//! In-memory transport.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{BoxFuture, Transport};
use crate::capability::CharacteristicRef;
use crate::error::{BleLinkError, Result};

/// One recorded GATT operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportOp {
    /// `write` call.
    Write {
        /// Peripheral written to.
        peripheral_id: String,
        /// Characteristic written to.
        target: CharacteristicRef,
        /// Bytes written.
        data: Vec<u8>,
    },
    /// `write_without_response` call.
    WriteWithoutResponse {
        /// Peripheral written to.
        peripheral_id: String,
        /// Characteristic written to.
        target: CharacteristicRef,
        /// Bytes written.
        data: Vec<u8>,
    },
    /// `read` call.
    Read {
        /// Peripheral read from.
        peripheral_id: String,
        /// Characteristic read.
        target: CharacteristicRef,
    },
    /// `start_notification` call.
    StartNotification {
        /// Peripheral subscribed to.
        peripheral_id: String,
        /// Characteristic subscribed to.
        target: CharacteristicRef,
    },
    /// `stop_notification` call.
    StopNotification {
        /// Peripheral unsubscribed from.
        peripheral_id: String,
        /// Characteristic unsubscribed from.
        target: CharacteristicRef,
    },
}

/// Transport that records operations instead of touching a radio.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    ops: Mutex<Vec<TransportOp>>,
    values: Mutex<HashMap<CharacteristicRef, Vec<u8>>>,
}

impl MemoryTransport {
    /// Create an empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value returned by reads of `target`.
    pub fn set_value(&self, target: CharacteristicRef, value: impl Into<Vec<u8>>) {
        relock(&self.values).insert(target, value.into());
    }

    /// Operations recorded so far.
    pub fn ops(&self) -> Vec<TransportOp> {
        relock(&self.ops).clone()
    }

    /// Take and clear the recorded operations.
    pub fn take_ops(&self) -> Vec<TransportOp> {
        std::mem::take(&mut *relock(&self.ops))
    }

    fn record(&self, op: TransportOp) {
        relock(&self.ops).push(op);
    }
}

fn relock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Transport for MemoryTransport {
    fn write<'a>(
        &'a self,
        peripheral_id: &'a str,
        target: CharacteristicRef,
        data: Vec<u8>,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.record(TransportOp::Write {
                peripheral_id: peripheral_id.to_string(),
                target,
                data,
            });
            Ok(())
        })
    }

    fn write_without_response<'a>(
        &'a self,
        peripheral_id: &'a str,
        target: CharacteristicRef,
        data: Vec<u8>,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.record(TransportOp::WriteWithoutResponse {
                peripheral_id: peripheral_id.to_string(),
                target,
                data,
            });
            Ok(())
        })
    }

    fn read<'a>(
        &'a self,
        peripheral_id: &'a str,
        target: CharacteristicRef,
    ) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(async move {
            self.record(TransportOp::Read {
                peripheral_id: peripheral_id.to_string(),
                target,
            });
            relock(&self.values)
                .get(&target)
                .cloned()
                .ok_or_else(|| BleLinkError::Transport(format!("no value for {target}")))
        })
    }

    fn start_notification<'a>(
        &'a self,
        peripheral_id: &'a str,
        target: CharacteristicRef,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.record(TransportOp::StartNotification {
                peripheral_id: peripheral_id.to_string(),
                target,
            });
            Ok(())
        })
    }

    fn stop_notification<'a>(
        &'a self,
        peripheral_id: &'a str,
        target: CharacteristicRef,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.record(TransportOp::StopNotification {
                peripheral_id: peripheral_id.to_string(),
                target,
            });
            Ok(())
        })
    }
}
