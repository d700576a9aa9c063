//! Probe orchestration — resolver, correlator, parser, cache, and
//! reconciliation composed behind one surface.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::join_all;
use meshwatch_common::{AgentSummary, FailureReason, ProbeResult};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::cache::ResultCache;
use crate::config::EngineConfig;
use crate::correlator::CommandCorrelator;
use crate::domain::probe::{ProbeCommand, ProbeKind};
use crate::domain::status;
use crate::hub::{ConnectionRegistry, LiveAgent};
use crate::reconcile::{ReconcileOutcome, Reconciler};
use crate::resolver;
use crate::store::{RecordStore, StatusObserver};

/// The probe and reconciliation engine.
///
/// One instance per hub process. All methods take `&self`; the engine is
/// safe to share behind an `Arc` and to probe many targets concurrently —
/// only concurrent probes of the *same* target are coalesced onto a single
/// dispatch.
pub struct ProbeEngine<R, S, O>
where
    R: ConnectionRegistry,
    S: RecordStore,
    O: StatusObserver,
{
    registry: R,
    correlator: CommandCorrelator,
    cache: ResultCache,
    reconciler: Reconciler<S, O>,
    config: EngineConfig,
    /// Per-target coalescing: while a probe is in flight, later callers
    /// subscribe to its result instead of double-dispatching.
    in_flight: DashMap<String, broadcast::Sender<ProbeResult>>,
}

impl<R, S, O> ProbeEngine<R, S, O>
where
    R: ConnectionRegistry,
    S: RecordStore,
    O: StatusObserver,
{
    #[must_use]
    pub fn new(config: EngineConfig, registry: R, store: S, observer: O) -> Self {
        Self {
            registry,
            correlator: CommandCorrelator::new(config.probe.timeout()),
            cache: ResultCache::new(config.cache.ttl()),
            reconciler: Reconciler::new(store, observer),
            config,
            in_flight: DashMap::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of dispatched commands still awaiting a reply.
    #[must_use]
    pub fn pending_commands(&self) -> usize {
        self.correlator.pending_count()
    }

    /// Feed one inbound frame from any agent into the correlator.
    /// The hub calls this for every message; unrelated frames are ignored.
    pub fn handle_inbound(&self, frame: &[u8]) {
        self.correlator.handle_inbound(frame);
    }

    /// Inventory of every live connection, sorted by node id.
    #[must_use]
    pub fn list_agents(&self) -> Vec<AgentSummary> {
        let mut summaries: Vec<AgentSummary> = self
            .registry
            .list_live()
            .iter()
            .map(LiveAgent::summary)
            .collect();
        summaries.sort_by(|a, b| a.node_id.cmp(&b.node_id));
        summaries
    }

    /// Probe one target by any accepted identifier form.
    ///
    /// Never fails: an unresolvable identifier yields
    /// `ok: false, reason: NotFound` without touching the channel.
    pub async fn probe(&self, identifier: &str) -> ProbeResult {
        match resolver::resolve(&self.registry, identifier) {
            Some(agent) => self.probe_agent(&agent).await,
            None => {
                tracing::debug!(identifier, "probe target not live");
                ProbeResult::failure(FailureReason::NotFound)
            }
        }
    }

    /// Probe every live agent once, best effort.
    ///
    /// One target's failure is its own entry's `reason`; it never aborts
    /// the rest of the sweep. Successful results are reconciled into the
    /// record store.
    pub async fn sweep(&self) -> Vec<(String, ProbeResult)> {
        let agents = self.registry.list_live();
        tracing::debug!(agents = agents.len(), "sweep started");

        let probes = agents
            .iter()
            .map(|agent| async move { (agent.node_id(), self.probe_agent(agent).await) });
        let results = join_all(probes).await;

        for (node_id, result) in &results {
            if let Some(status) = result.status.as_ref() {
                match self.reconciler.reconcile(node_id, status).await {
                    ReconcileOutcome::Failed(err) => {
                        tracing::warn!(node_id = %node_id, error = %err, "reconciliation failed");
                    }
                    outcome => {
                        tracing::debug!(node_id = %node_id, ?outcome, "reconciled");
                    }
                }
            }
        }

        let ok = results.iter().filter(|(_, result)| result.ok).count();
        tracing::info!(total = results.len(), ok, "sweep finished");
        results
    }

    /// Sweep on the configured interval until cancelled.
    /// The first sweep runs immediately.
    pub async fn run_periodic(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.sweep.interval());
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.sweep().await;
                }
                () = cancel.cancelled() => {
                    tracing::info!("sweep loop shutting down");
                    break;
                }
            }
        }
    }

    /// Probe a resolved handle, coalescing concurrent probes of one target.
    async fn probe_agent(&self, agent: &R::Agent) -> ProbeResult {
        let node_id = agent.node_id();
        loop {
            match self.in_flight.entry(node_id.clone()) {
                Entry::Occupied(entry) => {
                    let mut waiter = entry.get().subscribe();
                    // Release the shard lock before awaiting.
                    drop(entry);
                    tracing::debug!(node_id = %node_id, "joining in-flight probe");
                    match waiter.recv().await {
                        Ok(result) => return result,
                        // The owner vanished without broadcasting; start over.
                        Err(_) => continue,
                    }
                }
                Entry::Vacant(entry) => {
                    let (tx, _rx) = broadcast::channel(8);
                    entry.insert(tx.clone());
                    let result = self.probe_live(agent, &node_id).await;
                    self.in_flight.remove(&node_id);
                    // No waiters is fine.
                    let _ = tx.send(result.clone());
                    return result;
                }
            }
        }
    }

    /// The uncoalesced probe path: cache consult, dispatch, parse, cache fill.
    async fn probe_live(&self, agent: &R::Agent, node_id: &str) -> ProbeResult {
        if let Some(hit) = self.cache.get(node_id) {
            tracing::debug!(node_id = %node_id, "probe served from cache");
            return ProbeResult {
                ok: true,
                reason: None,
                raw_output: hit.raw_output,
                status: Some(hit.status),
                cached: true,
                observed_at: hit.observed_at,
            };
        }

        let command = ProbeCommand::new(ProbeKind::Combined, node_id, &self.config.probe);
        let mut result = self.correlator.dispatch(agent, &command).await;

        if result.ok {
            let status = status::parse(&result.raw_output, &self.config.probe.ports);
            self.cache.put(
                node_id,
                status.clone(),
                result.raw_output.clone(),
                result.observed_at,
            );
            result.status = Some(status);
        }
        result
    }
}
