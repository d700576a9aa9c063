//! Persistence collaborator seam — device record store and change observer.

use async_trait::async_trait;
use meshwatch_common::StoreError;

/// Abstract key/value record store holding each device's label set.
///
/// The production implementation is whatever database the embedding hub
/// uses; tests use an in-memory map. The engine only reads and rewrites
/// whole label sets — one `set_labels` call is one logical transaction.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Current label set for a device, or `None` if the device has no
    /// persisted record yet.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the store cannot be reached or the read
    /// is rejected.
    async fn labels(&self, node_id: &str) -> Result<Option<Vec<String>>, StoreError>;

    /// Replace a device's label set.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the write is rejected; the previous set
    /// is assumed intact in that case.
    async fn set_labels(&self, node_id: &str, labels: Vec<String>) -> Result<(), StoreError>;
}

/// Best-effort notification that a device's label set changed.
///
/// Fire and forget: the reconciliation write has already landed when this
/// runs, and nothing the observer does can roll it back.
pub trait StatusObserver: Send + Sync {
    fn notify(&self, node_id: &str, labels: &[String]);
}

/// Observer that drops every notification. Useful for probe-only callers
/// that never reconcile.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl StatusObserver for NullObserver {
    fn notify(&self, _node_id: &str, _labels: &[String]) {}
}
