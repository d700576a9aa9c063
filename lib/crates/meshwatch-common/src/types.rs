use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// State of the monitored service on the agent host.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    Running,
    NotRunning,
    /// The service is not installed on the host.
    NotFound,
    /// The probe output carried no recognizable service marker.
    #[default]
    Unknown,
}

impl ServiceState {
    /// Parse a `svc=<word>` marker value. Case-insensitive; anything
    /// unrecognized maps to [`ServiceState::Unknown`].
    #[must_use]
    pub fn from_marker(word: &str) -> Self {
        match word.trim().to_ascii_lowercase().as_str() {
            "running" => Self::Running,
            "notrunning" => Self::NotRunning,
            "notfound" => Self::NotFound,
            _ => Self::Unknown,
        }
    }

    /// Short lowercase word used when rendering the managed service label.
    #[must_use]
    pub fn as_label(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::NotRunning => "stopped",
            Self::NotFound => "missing",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Running => "Running",
            Self::NotRunning => "NotRunning",
            Self::NotFound => "NotFound",
            Self::Unknown => "Unknown",
        };
        write!(f, "{s}")
    }
}

/// Single human status word derived from the raw port signals.
///
/// The priority order is part of the contract: the primary (first
/// configured) port listening wins, else the secondary port, else offline.
/// Service state does not participate in the derivation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompositeStatus {
    AppOnline,
    NotSignedIn,
    Offline,
}

impl std::fmt::Display for CompositeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::AppOnline => "App Online",
            Self::NotSignedIn => "Not signed in",
            Self::Offline => "Offline",
        };
        write!(f, "{s}")
    }
}

/// Typed projection of one probe's raw output.
///
/// A pure value: it says what the output claimed, not whether the probe
/// reached the agent — that distinction lives on [`ProbeResult::ok`]. An
/// absent port marker is recorded as closed, indistinguishable from an
/// explicit `false` marker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusRecord {
    pub service: ServiceState,
    /// Listening state per monitored port.
    pub ports: BTreeMap<u16, bool>,
    pub composite: CompositeStatus,
}

impl StatusRecord {
    /// Whether the given monitored port was seen listening.
    /// Unmonitored ports report `false`.
    #[must_use]
    pub fn port_open(&self, port: u16) -> bool {
        self.ports.get(&port).copied().unwrap_or(false)
    }
}

/// Why a probe failed to produce a status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The identifier resolved to no live agent. Expected, not exceptional.
    NotFound,
    /// The agent's channel rejected the write.
    SendFailed,
    /// No reply arrived within the deadline.
    Timeout,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotFound => "not found",
            Self::SendFailed => "send failed",
            Self::Timeout => "timeout",
        };
        write!(f, "{s}")
    }
}

/// Outcome of one probe. Always a value, never an error: callers branch on
/// `ok`/`reason` instead of catching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,
    pub raw_output: String,
    /// Only present when `ok` — a failed probe must not masquerade as
    /// "service down" or "port closed".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusRecord>,
    /// Whether this result was served from the TTL cache.
    #[serde(default)]
    pub cached: bool,
    pub observed_at: DateTime<Utc>,
}

impl ProbeResult {
    /// A failed probe with the given reason and no status.
    #[must_use]
    pub fn failure(reason: FailureReason) -> Self {
        Self {
            ok: false,
            reason: Some(reason),
            raw_output: String::new(),
            status: None,
            cached: false,
            observed_at: Utc::now(),
        }
    }

    /// A successful reply whose output has not been parsed yet.
    #[must_use]
    pub fn reply(raw_output: String) -> Self {
        Self {
            ok: true,
            reason: None,
            raw_output,
            status: None,
            cached: false,
            observed_at: Utc::now(),
        }
    }
}

/// One live connection, as reported by the agent inventory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentSummary {
    pub node_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
}

/// The agent's channel rejected an outbound frame.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("agent is no longer connected")]
    Disconnected,
    #[error("channel rejected the frame: {0}")]
    Channel(String),
}

/// The record store rejected a read or write.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record for '{0}' not found")]
    MissingRecord(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store rejected the write: {0}")]
    Rejected(String),
}
