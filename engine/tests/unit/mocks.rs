//! Shared mock infrastructure for unit tests.
//!
//! Provides canned hub and store collaborators so each test file doesn't
//! have to re-define the same boilerplate.

#![allow(clippy::expect_used)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use meshwatch_engine::common::{SendError, StoreError};
use meshwatch_engine::hub::{ConnectionRegistry, LiveAgent};
use meshwatch_engine::store::{RecordStore, StatusObserver};
use meshwatch_engine::{EngineConfig, ProbeEngine};
use tokio::sync::mpsc;

pub type TestEngine = ProbeEngine<MockRegistry, MemoryStore, RecordingObserver>;

// ── Agent double ──────────────────────────────────────────────────────────────

/// Agent whose outbound frames land in an mpsc channel held by the test,
/// which can then feed crafted replies back through `handle_inbound`.
#[derive(Clone)]
pub struct ScriptedAgent {
    pub node_id: String,
    pub db_id: Option<String>,
    outbox: mpsc::UnboundedSender<Vec<u8>>,
    pub sends: Arc<AtomicUsize>,
    fail_send: bool,
}

impl ScriptedAgent {
    /// A healthy agent plus the receiving end of its channel.
    pub fn live(node_id: &str) -> (Self, mpsc::UnboundedReceiver<Vec<u8>>) {
        let (outbox, rx) = mpsc::unbounded_channel();
        (
            Self {
                node_id: node_id.to_string(),
                db_id: None,
                outbox,
                sends: Arc::new(AtomicUsize::new(0)),
                fail_send: false,
            },
            rx,
        )
    }

    /// An agent whose channel rejects every write.
    pub fn dead(node_id: &str) -> Self {
        let (outbox, _rx) = mpsc::unbounded_channel();
        Self {
            node_id: node_id.to_string(),
            db_id: None,
            outbox,
            sends: Arc::new(AtomicUsize::new(0)),
            fail_send: true,
        }
    }

    pub fn send_count(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }
}

impl LiveAgent for ScriptedAgent {
    fn node_id(&self) -> String {
        self.node_id.clone()
    }

    fn db_id(&self) -> Option<String> {
        self.db_id.clone()
    }

    fn send(&self, frame: Vec<u8>) -> Result<(), SendError> {
        if self.fail_send {
            return Err(SendError::Disconnected);
        }
        self.sends.fetch_add(1, Ordering::SeqCst);
        let _ = self.outbox.send(frame);
        Ok(())
    }
}

// ── Registry double ───────────────────────────────────────────────────────────

pub struct MockRegistry {
    agents: Vec<ScriptedAgent>,
}

impl MockRegistry {
    pub fn with(agents: Vec<ScriptedAgent>) -> Self {
        Self { agents }
    }
}

impl ConnectionRegistry for MockRegistry {
    type Agent = ScriptedAgent;

    fn lookup(&self, node_id: &str) -> Option<ScriptedAgent> {
        self.agents
            .iter()
            .find(|agent| agent.node_id == node_id)
            .cloned()
    }

    fn list_live(&self) -> Vec<ScriptedAgent> {
        self.agents.clone()
    }
}

// ── Store and observer doubles ────────────────────────────────────────────────

/// In-memory record store counting writes; optionally rejects them.
/// Clones share state, so tests can keep a handle after the engine takes
/// ownership of its copy.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    records: Mutex<HashMap<String, Vec<String>>>,
    writes: AtomicUsize,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn failing() -> Self {
        Self {
            inner: Arc::new(StoreInner {
                fail_writes: true,
                ..StoreInner::default()
            }),
        }
    }

    pub fn seeded(node_id: &str, labels: &[&str]) -> Self {
        let store = Self::default();
        store.inner.records.lock().expect("lock").insert(
            node_id.to_string(),
            labels.iter().map(ToString::to_string).collect(),
        );
        store
    }

    pub fn writes(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    pub fn labels_of(&self, node_id: &str) -> Vec<String> {
        self.inner
            .records
            .lock()
            .expect("lock")
            .get(node_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn labels(&self, node_id: &str) -> Result<Option<Vec<String>>, StoreError> {
        Ok(self
            .inner
            .records
            .lock()
            .expect("lock")
            .get(node_id)
            .cloned())
    }

    async fn set_labels(&self, node_id: &str, labels: Vec<String>) -> Result<(), StoreError> {
        if self.inner.fail_writes {
            return Err(StoreError::Unavailable("write rejected".to_string()));
        }
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        self.inner
            .records
            .lock()
            .expect("lock")
            .insert(node_id.to_string(), labels);
        Ok(())
    }
}

/// Observer recording every notification. Clones share state.
#[derive(Clone, Default)]
pub struct RecordingObserver {
    seen: Arc<Mutex<Vec<(String, Vec<String>)>>>,
}

impl RecordingObserver {
    pub fn notifications(&self) -> Vec<(String, Vec<String>)> {
        self.seen.lock().expect("lock").clone()
    }
}

impl StatusObserver for RecordingObserver {
    fn notify(&self, node_id: &str, labels: &[String]) {
        self.seen
            .lock()
            .expect("lock")
            .push((node_id.to_string(), labels.to_vec()));
    }
}

// ── Harness helpers ───────────────────────────────────────────────────────────

/// Engine over the given agents with default config and a fresh store.
pub fn engine_with(agents: Vec<ScriptedAgent>) -> Arc<TestEngine> {
    engine_with_store(agents, MemoryStore::default())
}

/// Engine over the given agents and store. The store (and the returned
/// observer) are cloneable handles — keep one to inspect state afterwards.
pub fn engine_with_store(agents: Vec<ScriptedAgent>, store: MemoryStore) -> Arc<TestEngine> {
    Arc::new(ProbeEngine::new(
        EngineConfig::default(),
        MockRegistry::with(agents),
        store,
        RecordingObserver::default(),
    ))
}

/// Engine plus live handles to its store and observer.
pub fn engine_with_handles(
    agents: Vec<ScriptedAgent>,
    store: MemoryStore,
) -> (Arc<TestEngine>, MemoryStore, RecordingObserver) {
    let observer = RecordingObserver::default();
    let engine = Arc::new(ProbeEngine::new(
        EngineConfig::default(),
        MockRegistry::with(agents),
        store.clone(),
        observer.clone(),
    ));
    (engine, store, observer)
}

/// Build the reply frame an agent would send for a captured command frame.
pub fn reply_for(command_frame: &[u8], console: &str) -> Vec<u8> {
    let frame: serde_json::Value =
        serde_json::from_slice(command_frame).expect("parse command frame");
    let correlation_id = frame["responseid"].as_str().expect("responseid");
    serde_json::to_vec(&serde_json::json!({
        "action": "runcommands",
        "responseid": correlation_id,
        "console": console,
    }))
    .expect("serialize reply frame")
}

/// Pump task: answer every captured command with the same console output.
pub fn answer_all(
    engine: Arc<TestEngine>,
    mut rx: mpsc::UnboundedReceiver<Vec<u8>>,
    console: &'static str,
) {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            engine.handle_inbound(&reply_for(&frame, console));
        }
    });
}
