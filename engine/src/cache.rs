//! TTL-bounded result cache keyed by canonical node id.
//!
//! Backed by a sharded map, so probes of unrelated targets never contend.
//! Eviction is lazy: a stale entry is dropped when read past its TTL or
//! replaced on the next write; there is no background collector.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use meshwatch_common::StatusRecord;

/// A fresh cached status, as handed back to callers.
#[derive(Debug, Clone)]
pub struct CachedStatus {
    pub status: StatusRecord,
    pub raw_output: String,
    /// When the underlying probe observed the agent.
    pub observed_at: DateTime<Utc>,
}

struct Entry {
    status: StatusRecord,
    raw_output: String,
    observed_at: DateTime<Utc>,
    stored_at: Instant,
}

pub struct ResultCache {
    ttl: Duration,
    entries: DashMap<String, Entry>,
}

impl ResultCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    /// Fresh cached status for `node_id`, or `None` past the TTL.
    /// A stale hit behaves exactly like a miss and evicts the entry.
    #[must_use]
    pub fn get(&self, node_id: &str) -> Option<CachedStatus> {
        if let Some(entry) = self.entries.get(node_id) {
            if entry.stored_at.elapsed() < self.ttl {
                return Some(CachedStatus {
                    status: entry.status.clone(),
                    raw_output: entry.raw_output.clone(),
                    observed_at: entry.observed_at,
                });
            }
        }
        // Stale or absent; drop the entry if it is still stale (a concurrent
        // put may have refreshed it in the meantime).
        self.entries
            .remove_if(node_id, |_, entry| entry.stored_at.elapsed() >= self.ttl);
        None
    }

    /// Store a fresh status, replacing any previous entry for the target.
    pub fn put(
        &self,
        node_id: &str,
        status: StatusRecord,
        raw_output: String,
        observed_at: DateTime<Utc>,
    ) {
        self.entries.insert(
            node_id.to_string(),
            Entry {
                status,
                raw_output,
                observed_at,
                stored_at: Instant::now(),
            },
        );
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
