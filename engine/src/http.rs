//! Admin HTTP bridge — thin glue over the engine surface.
//!
//! Mounted by the embedding hub under its admin tree; authentication and
//! rendering are the hub's business. Every endpoint answers 200 with a JSON
//! body — probe failures are values in the body, mirroring the engine
//! contract.

use std::sync::Arc;

use axum::extract::Path;
use axum::routing::get;
use axum::{Json, Router};
use meshwatch_common::{AgentSummary, ProbeResult};
use serde::Serialize;

use crate::engine::ProbeEngine;
use crate::hub::ConnectionRegistry;
use crate::store::{RecordStore, StatusObserver};

#[derive(Serialize)]
struct HealthzResponse {
    ok: bool,
    service: String,
    ports: Vec<u16>,
    live_agents: usize,
}

#[derive(Serialize)]
struct AgentsResponse {
    ok: bool,
    agents: Vec<AgentSummary>,
}

#[derive(Serialize)]
struct ProbeResponse {
    id: String,
    #[serde(flatten)]
    result: ProbeResult,
}

/// Build the admin router over a shared engine.
///
/// Routes: `GET /healthz`, `GET /agents`, `GET /probe/{id}`.
pub fn admin_router<R, S, O>(engine: Arc<ProbeEngine<R, S, O>>) -> Router
where
    R: ConnectionRegistry + 'static,
    R::Agent: 'static,
    S: RecordStore + 'static,
    O: StatusObserver + 'static,
{
    let healthz_engine = Arc::clone(&engine);
    let agents_engine = Arc::clone(&engine);
    let probe_engine = engine;

    Router::new()
        .route(
            "/healthz",
            get(move || {
                let engine = Arc::clone(&healthz_engine);
                async move {
                    let config = engine.config();
                    Json(HealthzResponse {
                        ok: true,
                        service: config.probe.service.clone(),
                        ports: config.probe.ports.clone(),
                        live_agents: engine.list_agents().len(),
                    })
                }
            }),
        )
        .route(
            "/agents",
            get(move || {
                let engine = Arc::clone(&agents_engine);
                async move {
                    Json(AgentsResponse {
                        ok: true,
                        agents: engine.list_agents(),
                    })
                }
            }),
        )
        .route(
            "/probe/{id}",
            get(move |Path(id): Path<String>| {
                let engine = Arc::clone(&probe_engine);
                async move {
                    let result = engine.probe(&id).await;
                    Json(ProbeResponse { id, result })
                }
            }),
        )
}
