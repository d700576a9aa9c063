//! Managed-label naming convention.
//!
//! The reconciliation engine owns every label under the `meshwatch:` prefix
//! on a device record and rewrites them freely; labels outside the prefix
//! are foreign and must survive updates untouched. The predicate lives here,
//! next to the renderers, so every call site shares one definition instead
//! of repeating inline pattern matches.

use crate::types::ServiceState;

/// Prefix marking a label as owned by the reconciliation engine.
pub const LABEL_PREFIX: &str = "meshwatch:";

/// Whether a label belongs to the managed (engine-owned) subset.
#[must_use]
pub fn is_managed(label: &str) -> bool {
    label.starts_with(LABEL_PREFIX)
}

/// Render the managed label for one monitored port.
/// Format: `meshwatch:port:20707=open`.
#[must_use]
pub fn port_label(port: u16, open: bool) -> String {
    let state = if open { "open" } else { "closed" };
    format!("{LABEL_PREFIX}port:{port}={state}")
}

/// Render the managed label for the monitored service.
/// Format: `meshwatch:svc=running`.
#[must_use]
pub fn service_label(state: ServiceState) -> String {
    format!("{LABEL_PREFIX}svc={}", state.as_label())
}
