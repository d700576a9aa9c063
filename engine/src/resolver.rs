//! Target resolution — mapping a caller-supplied identifier to one live
//! agent handle.
//!
//! Callers pass whatever they have: the canonical `node//<suffix>` form, the
//! bare suffix, a stable database id, or a fragment. Resolution runs an
//! explicit chain of strategies in strict priority order and short-circuits
//! on the first hit. Absence is a normal outcome, never an error.

use crate::hub::{ConnectionRegistry, LiveAgent};

/// Canonical node id prefix used by the hub.
pub const NODE_ID_PREFIX: &str = "node//";

/// Normalize an identifier to the canonical long form.
#[must_use]
pub fn canonical(identifier: &str) -> String {
    if identifier
        .get(..NODE_ID_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(NODE_ID_PREFIX))
    {
        identifier.to_string()
    } else {
        format!("{NODE_ID_PREFIX}{identifier}")
    }
}

/// The short form of an identifier: the part after the canonical prefix.
#[must_use]
pub fn short_form(identifier: &str) -> &str {
    if identifier
        .get(..NODE_ID_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(NODE_ID_PREFIX))
    {
        &identifier[NODE_ID_PREFIX.len()..]
    } else {
        identifier
    }
}

/// Resolve `identifier` against the live registry.
///
/// Strategies, first match wins:
/// 1. exact lookup of the normalized long form;
/// 2. exact short-form suffix match against each live handle;
/// 3. exact match against a handle's stable database id;
/// 4. substring containment of the short form within a handle's node id —
///    ambiguous on collision, settled deterministically by taking the first
///    match in lexicographic node-id order.
#[must_use]
pub fn resolve<R: ConnectionRegistry>(registry: &R, identifier: &str) -> Option<R::Agent> {
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return None;
    }

    if let Some(agent) = registry.lookup(&canonical(identifier)) {
        return Some(agent);
    }

    let mut live = registry.list_live();
    live.sort_by_key(LiveAgent::node_id);
    let short = short_form(identifier);

    exact_suffix(&live, short)
        .or_else(|| stable_db_id(&live, identifier))
        .or_else(|| containment(&live, short))
}

fn exact_suffix<A: LiveAgent + Clone>(live: &[A], short: &str) -> Option<A> {
    live.iter()
        .find(|agent| short_form(&agent.node_id()) == short)
        .cloned()
}

fn stable_db_id<A: LiveAgent + Clone>(live: &[A], identifier: &str) -> Option<A> {
    live.iter()
        .find(|agent| agent.db_id().as_deref() == Some(identifier))
        .cloned()
}

fn containment<A: LiveAgent + Clone>(live: &[A], short: &str) -> Option<A> {
    live.iter()
        .find(|agent| agent.node_id().contains(short))
        .cloned()
}
