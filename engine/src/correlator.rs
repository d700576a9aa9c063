//! Command dispatch and reply correlation.
//!
//! Every dispatched command gets a fresh correlation id and a slot in a
//! sharded in-flight table; the hub feeds every inbound agent message to
//! [`CommandCorrelator::handle_inbound`], which routes replies back by id.
//! Removal from the table is the single arbitration point between a reply
//! and the timeout: whichever removes the entry first settles the probe,
//! and the loser finds the entry gone and does nothing.

use std::time::Duration;

use dashmap::DashMap;
use meshwatch_common::{FailureReason, ProbeResult};
use tokio::sync::oneshot;

use crate::domain::probe::ProbeCommand;
use crate::hub::LiveAgent;

pub struct CommandCorrelator {
    pending: DashMap<String, oneshot::Sender<String>>,
    timeout: Duration,
}

impl CommandCorrelator {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            pending: DashMap::new(),
            timeout,
        }
    }

    /// Number of commands currently awaiting a reply.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Send `command` to `agent` and await the correlated reply.
    ///
    /// Settles exactly once: with the reply payload, with `SendFailed`
    /// immediately if the channel rejects the frame (the timeout window is
    /// not consumed), or with `Timeout` after the deadline. Never returns
    /// an error — failures are folded into the result.
    pub async fn dispatch<A: LiveAgent + ?Sized>(
        &self,
        agent: &A,
        command: &ProbeCommand,
    ) -> ProbeResult {
        let correlation_id = command.correlation_id.clone();

        let frame = match command.to_frame() {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!(
                    node_id = %command.node_id,
                    error = %err,
                    "failed to serialize command frame"
                );
                return ProbeResult::failure(FailureReason::SendFailed);
            }
        };

        let (tx, mut rx) = oneshot::channel();
        self.pending.insert(correlation_id.clone(), tx);
        tracing::debug!(
            node_id = %command.node_id,
            correlation_id = %correlation_id,
            "command dispatched"
        );

        if let Err(err) = agent.send(frame) {
            self.pending.remove(&correlation_id);
            tracing::warn!(
                node_id = %command.node_id,
                correlation_id = %correlation_id,
                error = %err,
                "channel rejected command"
            );
            return ProbeResult::failure(FailureReason::SendFailed);
        }

        match tokio::time::timeout(self.timeout, &mut rx).await {
            Ok(Ok(raw)) => ProbeResult::reply(raw),
            // Sender dropped without a value; treat as an expired probe.
            Ok(Err(_)) => {
                self.pending.remove(&correlation_id);
                ProbeResult::failure(FailureReason::Timeout)
            }
            Err(_elapsed) => {
                if self.pending.remove(&correlation_id).is_some() {
                    tracing::debug!(
                        correlation_id = %correlation_id,
                        "command timed out"
                    );
                    ProbeResult::failure(FailureReason::Timeout)
                } else {
                    // A reply won the race at the deadline boundary; the
                    // payload is already buffered in the channel.
                    match rx.await {
                        Ok(raw) => ProbeResult::reply(raw),
                        Err(_) => ProbeResult::failure(FailureReason::Timeout),
                    }
                }
            }
        }
    }

    /// Inspect one inbound frame from any agent.
    ///
    /// Frames that are not `runcommands` replies, or whose correlation id is
    /// unknown or absent, are silently ignored — they belong to other
    /// subsystems sharing the channel.
    pub fn handle_inbound(&self, raw: &[u8]) {
        let Ok(frame) = serde_json::from_slice::<serde_json::Value>(raw) else {
            return;
        };
        if frame.get("action").and_then(serde_json::Value::as_str) != Some("runcommands") {
            return;
        }
        let Some(correlation_id) = frame.get("responseid").and_then(serde_json::Value::as_str)
        else {
            return;
        };
        // Single mutation point: remove settles the race against the timeout.
        let Some((_, reply)) = self.pending.remove(correlation_id) else {
            return;
        };

        let payload = frame
            .get("console")
            .or_else(|| frame.get("result"))
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string();

        tracing::debug!(correlation_id = %correlation_id, "reply matched");
        // The dispatcher may have given up between removal and here; a
        // dropped receiver is fine.
        let _ = reply.send(payload);
    }
}
