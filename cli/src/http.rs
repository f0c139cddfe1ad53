//! Metrics exposition endpoint.
//!
//! A single `GET /metrics` route. Every request reads the current snapshot
//! through the scheduler's accessor and renders it fresh; nothing here ever
//! triggers a scan or blocks on one. Before the first successful scan the
//! empty-snapshot render is served, never an error.

use std::sync::Arc;

use axum::{Router, extract::State, http::header, response::IntoResponse, routing::get};

use probr_core::exporter;
use probr_core::scheduler::Scheduler;

#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<Scheduler>,
    pub group: String,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .with_state(state)
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let (snapshot, stats) = state.scheduler.observe();
    let body = exporter::render(&snapshot, &stats, &state.group);
    ([(header::CONTENT_TYPE, exporter::CONTENT_TYPE)], body)
}
