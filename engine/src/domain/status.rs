//! Tolerant parsing of probe output into a typed status.
//!
//! The raw text comes back from a remotely executed batch script and may be
//! wrapped in prompts, banners, or unrelated output. Each marker is matched
//! independently, so reordering or interleaving never breaks extraction, and
//! every input — including the empty string — yields a `StatusRecord`.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use meshwatch_common::{CompositeStatus, ServiceState, StatusRecord};
use regex::Regex;

// Literal pattern; construction cannot fail.
#[allow(clippy::expect_used)]
fn service_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bsvc\s*=\s*([A-Za-z]+)").expect("valid literal pattern"))
}

/// Whether the output marks `port` as listening.
///
/// An absent marker reads as closed — the same as an explicit `false`.
/// Whether the probe reached the agent at all is carried by
/// `ProbeResult::ok`, never here.
#[must_use]
pub fn port_marked_open(raw: &str, port: u16) -> bool {
    let pattern = format!(r"(?i)\bp{port}\s*=\s*(true|false)");
    Regex::new(&pattern)
        .ok()
        .and_then(|re| {
            re.captures(raw)
                .and_then(|captures| captures.get(1))
                .map(|value| value.as_str().eq_ignore_ascii_case("true"))
        })
        .unwrap_or(false)
}

/// Parse raw probe output into a typed status for the given monitored ports.
///
/// Total over arbitrary input: missing or garbled markers degrade to
/// `Unknown` (service) or closed (ports), never to an error.
#[must_use]
pub fn parse(raw: &str, ports: &[u16]) -> StatusRecord {
    let service = service_marker()
        .captures(raw)
        .and_then(|captures| captures.get(1))
        .map_or(ServiceState::Unknown, |word| {
            ServiceState::from_marker(word.as_str())
        });

    let port_map: BTreeMap<u16, bool> = ports
        .iter()
        .map(|&port| (port, port_marked_open(raw, port)))
        .collect();

    let composite = derive_composite(ports, &port_map);

    StatusRecord {
        service,
        ports: port_map,
        composite,
    }
}

/// Fixed-priority composite derivation, part of the contract:
/// the primary (first listed) port listening wins `AppOnline`; else any
/// lower-priority port listening yields `NotSignedIn`; else `Offline`.
/// Service state does not participate.
#[must_use]
pub fn derive_composite(priority: &[u16], open: &BTreeMap<u16, bool>) -> CompositeStatus {
    let mut ports = priority.iter();
    let Some(primary) = ports.next() else {
        return CompositeStatus::Offline;
    };
    if open.get(primary).copied().unwrap_or(false) {
        return CompositeStatus::AppOnline;
    }
    if ports.any(|port| open.get(port).copied().unwrap_or(false)) {
        return CompositeStatus::NotSignedIn;
    }
    CompositeStatus::Offline
}
