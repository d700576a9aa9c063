//! Label planning — the minimal add/remove update that brings a device
//! record's managed labels in line with a freshly derived status.
//!
//! Foreign labels (anything outside the `meshwatch:` prefix) never appear
//! in a plan and are carried through `apply` untouched, in their original
//! order.

use std::collections::BTreeSet;

use meshwatch_common::{StatusRecord, is_managed, port_label, service_label};

/// Managed labels implied by a status. Deterministic: one label for the
/// service state plus one per monitored port, in ascending port order.
#[must_use]
pub fn desired_labels(status: &StatusRecord) -> Vec<String> {
    let mut labels = vec![service_label(status.service)];
    labels.extend(
        status
            .ports
            .iter()
            .map(|(&port, &open)| port_label(port, open)),
    );
    labels
}

/// The add/remove delta between a record's current labels and the desired
/// managed set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelPlan {
    pub to_add: Vec<String>,
    pub to_remove: Vec<String>,
}

impl LabelPlan {
    /// An empty plan means the record is already converged and no write
    /// may be issued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Diff the managed subset of `current` against `desired`.
#[must_use]
pub fn plan(current: &[String], desired: &[String]) -> LabelPlan {
    let current_managed: BTreeSet<&str> = current
        .iter()
        .map(String::as_str)
        .filter(|label| is_managed(label))
        .collect();
    let desired_set: BTreeSet<&str> = desired.iter().map(String::as_str).collect();

    LabelPlan {
        to_add: desired_set
            .difference(&current_managed)
            .map(ToString::to_string)
            .collect(),
        to_remove: current_managed
            .difference(&desired_set)
            .map(ToString::to_string)
            .collect(),
    }
}

/// The full label set after applying `desired`: foreign labels first, in
/// their original order, then the desired managed labels sorted.
#[must_use]
pub fn apply(current: &[String], desired: &[String]) -> Vec<String> {
    let mut next: Vec<String> = current
        .iter()
        .filter(|label| !is_managed(label))
        .cloned()
        .collect();
    let mut managed: Vec<String> = desired.to_vec();
    managed.sort();
    next.extend(managed);
    next
}
