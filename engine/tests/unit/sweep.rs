//! Sweep flows: fleet-wide probing, per-target failure isolation, and
//! reconciliation into the record store.

#![allow(clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use meshwatch_engine::common::FailureReason;
use tokio_util::sync::CancellationToken;

use crate::mocks::{MemoryStore, ScriptedAgent, answer_all, engine_with_handles};

#[tokio::test]
async fn sweep_probes_every_live_agent_and_reconciles() {
    let (first, first_rx) = ScriptedAgent::live("node//aaa111");
    let (second, second_rx) = ScriptedAgent::live("node//bbb222");
    let (engine, store, observer) =
        engine_with_handles(vec![first, second], MemoryStore::default());
    answer_all(
        Arc::clone(&engine),
        first_rx,
        "svc=Running\np20707=True\np20773=False",
    );
    answer_all(
        Arc::clone(&engine),
        second_rx,
        "svc=NotRunning\np20707=False\np20773=False",
    );

    let results = engine.sweep().await;
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|(_, result)| result.ok));

    assert!(
        store
            .labels_of("node//aaa111")
            .contains(&"meshwatch:port:20707=open".to_string())
    );
    assert!(
        store
            .labels_of("node//bbb222")
            .contains(&"meshwatch:svc=stopped".to_string())
    );
    assert_eq!(observer.notifications().len(), 2);
}

#[tokio::test]
async fn one_dead_agent_does_not_abort_the_sweep() {
    let (healthy, healthy_rx) = ScriptedAgent::live("node//aaa111");
    let dead = ScriptedAgent::dead("node//bbb222");
    let (engine, _store, _observer) =
        engine_with_handles(vec![healthy, dead], MemoryStore::default());
    answer_all(Arc::clone(&engine), healthy_rx, "svc=Running\np20707=True");

    let mut results = engine.sweep().await;
    results.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(results.len(), 2);

    let (_, healthy_result) = &results[0];
    assert!(healthy_result.ok);

    let (dead_id, dead_result) = &results[1];
    assert_eq!(dead_id, "node//bbb222");
    assert!(!dead_result.ok);
    assert_eq!(dead_result.reason, Some(FailureReason::SendFailed));
}

#[tokio::test]
async fn converged_target_produces_zero_store_writes() {
    let (agent, rx) = ScriptedAgent::live("node//aaa111");
    let seeded = MemoryStore::seeded(
        "node//aaa111",
        &[
            "site:berlin",
            "meshwatch:svc=running",
            "meshwatch:port:20707=open",
            "meshwatch:port:20773=closed",
        ],
    );
    let (engine, store, observer) = engine_with_handles(vec![agent], seeded);
    answer_all(
        Arc::clone(&engine),
        rx,
        "svc=Running\np20707=True\np20773=False",
    );

    engine.sweep().await;
    assert_eq!(store.writes(), 0);
    assert!(observer.notifications().is_empty());
}

#[tokio::test]
async fn sweep_converges_after_the_first_write() {
    let (agent, rx) = ScriptedAgent::live("node//aaa111");
    let seeded = MemoryStore::seeded("node//aaa111", &["site:berlin"]);
    let (engine, store, _observer) = engine_with_handles(vec![agent], seeded);
    answer_all(
        Arc::clone(&engine),
        rx,
        "svc=Running\np20707=True\np20773=False",
    );

    engine.sweep().await;
    assert_eq!(store.writes(), 1);

    // Foreign label survived the rewrite.
    assert!(
        store
            .labels_of("node//aaa111")
            .contains(&"site:berlin".to_string())
    );

    // A second sweep re-probes (from cache) and converges without writing.
    engine.sweep().await;
    assert_eq!(store.writes(), 1);
}

#[tokio::test]
async fn store_failure_does_not_poison_the_probe_result_or_cache() {
    let (agent, rx) = ScriptedAgent::live("node//aaa111");
    let (engine, store, observer) = engine_with_handles(vec![agent], MemoryStore::failing());
    answer_all(Arc::clone(&engine), rx, "svc=Running\np20707=True");

    let results = engine.sweep().await;
    let (_, result) = &results[0];
    assert!(result.ok, "probe result survives a failed reconciliation");
    assert_eq!(store.writes(), 0);
    assert!(observer.notifications().is_empty());

    // The freshly probed status is still cached and servable.
    let cached = engine.probe("aaa111").await;
    assert!(cached.ok);
    assert!(cached.cached);
}

#[tokio::test(start_paused = true)]
async fn periodic_runner_sweeps_until_cancelled() {
    let (agent, rx) = ScriptedAgent::live("node//aaa111");
    let (engine, store, _observer) =
        engine_with_handles(vec![agent], MemoryStore::default());
    answer_all(Arc::clone(&engine), rx, "svc=Running\np20707=True");

    let cancel = CancellationToken::new();
    let runner = {
        let engine = Arc::clone(&engine);
        let cancel = cancel.clone();
        tokio::spawn(async move { engine.run_periodic(cancel).await })
    };

    // The first sweep fires immediately on the first tick.
    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();
    runner.await.expect("runner completes");

    assert_eq!(store.writes(), 1);
}
