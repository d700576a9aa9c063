//! Hub collaborator seam — live agent handles and the connection registry.
//!
//! The embedding hub server owns the websocket (or equivalent) connections;
//! the engine only ever sees them through these traits, which keeps every
//! component testable with canned doubles and keeps the wire transport out
//! of the core entirely.

use meshwatch_common::{AgentSummary, SendError};

/// One live, authenticated agent connection.
///
/// Handles are cheap to clone (implementations typically wrap an `Arc`) and
/// may go stale at any moment — a send to a vanished agent fails with
/// [`SendError`], it never panics.
pub trait LiveAgent: Send + Sync {
    /// Canonical long-form node id, e.g. `node//9f2c41d8`.
    fn node_id(&self) -> String;

    /// Stable database identity, when the hub tracks one. Survives
    /// reconnects, unlike the connection key.
    fn db_id(&self) -> Option<String> {
        None
    }

    /// Human-readable machine name, when known.
    fn name(&self) -> Option<String> {
        None
    }

    /// Operating system description, when known.
    fn os(&self) -> Option<String> {
        None
    }

    /// Queue one outbound frame on the agent's channel.
    ///
    /// This is a synchronous queue write: failure means the channel rejected
    /// the frame right now (agent gone, queue closed), not that the agent
    /// failed to act on it.
    ///
    /// # Errors
    ///
    /// Returns a [`SendError`] if the connection is gone or the channel
    /// refuses the write.
    fn send(&self, frame: Vec<u8>) -> Result<(), SendError>;

    /// Inventory row for this connection.
    fn summary(&self) -> AgentSummary {
        AgentSummary {
            node_id: self.node_id(),
            name: self.name(),
            os: self.os(),
        }
    }
}

/// Registry of currently connected agents, owned by the hub.
pub trait ConnectionRegistry: Send + Sync {
    type Agent: LiveAgent + Clone + Send + Sync;

    /// Exact lookup by canonical long-form node id.
    fn lookup(&self, node_id: &str) -> Option<Self::Agent>;

    /// Snapshot of every live connection. Order is not guaranteed.
    fn list_live(&self) -> Vec<Self::Agent>;
}
