//! Probe commands — the batch payload executed on the agent and the wire
//! frame that carries it.

use serde::Serialize;
use uuid::Uuid;

use crate::config::ProbeSpec;

/// What a probe command checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    /// Service state only.
    ServiceCheck,
    /// Listen-port state only.
    PortCheck,
    /// Service state plus every monitored port.
    Combined,
}

/// One command ready for dispatch. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct ProbeCommand {
    pub kind: ProbeKind,
    pub node_id: String,
    /// Literal batch script executed on the agent.
    pub payload: String,
    pub wants_reply: bool,
    pub correlation_id: String,
}

/// `runcommands` frame as the hub protocol expects it on the wire.
#[derive(Serialize)]
struct CommandFrame<'a> {
    action: &'static str,
    #[serde(rename = "type")]
    shell: &'static str,
    cmds: Vec<&'a str>,
    #[serde(rename = "runAsUser")]
    run_as_user: bool,
    reply: bool,
    responseid: &'a str,
}

impl ProbeCommand {
    /// Build a command for `node_id` with a fresh correlation id.
    #[must_use]
    pub fn new(kind: ProbeKind, node_id: &str, spec: &ProbeSpec) -> Self {
        Self {
            kind,
            node_id: node_id.to_string(),
            payload: render_script(kind, spec),
            wants_reply: true,
            correlation_id: new_correlation_id(),
        }
    }

    /// Serialize to the JSON frame sent over the agent channel.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json::Error` if serialization fails.
    pub fn to_frame(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&CommandFrame {
            action: "runcommands",
            shell: "bat",
            cmds: vec![self.payload.as_str()],
            run_as_user: false,
            reply: self.wants_reply,
            responseid: &self.correlation_id,
        })
    }
}

/// Fresh correlation id: a fixed prefix plus a UUIDv7, so ids carry a
/// millisecond timestamp component and a random component and sort by
/// issue time.
#[must_use]
pub fn new_correlation_id() -> String {
    format!("mw-{}", Uuid::now_v7())
}

/// Render the batch script for one probe.
///
/// The script prints one `key=value` marker per check: `svc=<state>` for the
/// service and `p<port>=True|False` per port. Everything is plain `cmd`
/// built-ins — no elevation needed on the agent.
#[must_use]
pub fn render_script(kind: ProbeKind, spec: &ProbeSpec) -> String {
    let mut parts = Vec::new();
    if matches!(kind, ProbeKind::ServiceCheck | ProbeKind::Combined) {
        parts.push(service_script(&spec.service));
    }
    if matches!(kind, ProbeKind::PortCheck | ProbeKind::Combined) {
        parts.extend(spec.ports.iter().map(|&port| port_script(port)));
    }
    parts.join(" & ")
}

fn service_script(service: &str) -> String {
    format!(
        "sc query \"{service}\" | findstr /I RUNNING >nul && echo svc=Running || \
         (sc query \"{service}\" | findstr /I STOPPED >nul && echo svc=NotRunning || \
         (sc query \"{service}\" >nul 2>&1 && echo svc=Unknown || echo svc=NotFound))"
    )
}

fn port_script(port: u16) -> String {
    format!("(netstat -an | findstr /C::{port} >nul && echo p{port}=True || echo p{port}=False)")
}
