//! meshwatch engine — probes mesh-connected agents for service and port
//! state, correlates asynchronous command replies, and reconciles derived
//! status into persisted device labels.
//!
//! The engine is transport-agnostic: the embedding hub supplies live
//! connections through the [`hub`] traits, persistence through the
//! [`store`] traits, and feeds every inbound agent frame to
//! [`ProbeEngine::handle_inbound`].

pub mod cache;
pub mod config;
pub mod correlator;
pub mod domain;
pub mod engine;
pub mod http;
pub mod hub;
pub mod reconcile;
pub mod resolver;
pub mod store;

pub use config::EngineConfig;
pub use engine::ProbeEngine;
pub use http::admin_router;
pub use reconcile::{ReconcileOutcome, Reconciler};

pub use meshwatch_common as common;
