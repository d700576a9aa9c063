//! Reconciliation of derived status into persisted device labels.
//!
//! Idempotent by construction: a record whose managed labels already match
//! the desired set produces zero store writes, so repeated sweeps of a
//! stable fleet cause no write amplification.

use meshwatch_common::{StatusRecord, StoreError};

use crate::domain::labels;
use crate::store::{RecordStore, StatusObserver};

/// Result of one reconciliation pass. Store failures are values here, not
/// errors — this method never propagates across the reconcile boundary.
#[derive(Debug)]
pub enum ReconcileOutcome {
    /// The record already matched; no write was issued.
    Unchanged,
    /// The record was rewritten and observers were notified.
    Updated,
    /// The store rejected the read or write; the cause is retained for
    /// logging.
    Failed(StoreError),
}

pub struct Reconciler<S, O> {
    store: S,
    observer: O,
}

impl<S: RecordStore, O: StatusObserver> Reconciler<S, O> {
    pub fn new(store: S, observer: O) -> Self {
        Self { store, observer }
    }

    /// Bring the persisted labels for `node_id` in line with `status`.
    ///
    /// Foreign labels survive untouched. After a successful write the
    /// observer is notified with the new label set; nothing the observer
    /// does can roll the write back.
    pub async fn reconcile(&self, node_id: &str, status: &StatusRecord) -> ReconcileOutcome {
        let current = match self.store.labels(node_id).await {
            Ok(labels) => labels.unwrap_or_default(),
            Err(err) => return ReconcileOutcome::Failed(err),
        };

        let desired = labels::desired_labels(status);
        let plan = labels::plan(&current, &desired);
        if plan.is_empty() {
            tracing::debug!(node_id = %node_id, "labels already converged");
            return ReconcileOutcome::Unchanged;
        }

        let next = labels::apply(&current, &desired);
        if let Err(err) = self.store.set_labels(node_id, next.clone()).await {
            return ReconcileOutcome::Failed(err);
        }

        tracing::info!(
            node_id = %node_id,
            added = plan.to_add.len(),
            removed = plan.to_remove.len(),
            "labels updated"
        );
        self.observer.notify(node_id, &next);
        ReconcileOutcome::Updated
    }
}
