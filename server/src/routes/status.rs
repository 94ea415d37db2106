//! Dashboard status endpoint.
//!
//! `GET /api/status` returns the same counters the dashboard shows: uptime,
//! memory, commands executed, live sessions, and tasks recorded.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::AppState;

/// `GET /api/status` — dashboard counters.
pub async fn status(State(state): State<AppState>) -> Json<Value> {
    let dispatcher = &state.dispatcher;
    let sample = dispatcher.monitor().sample();
    let active_sessions = dispatcher.sessions().count().await;

    Json(json!({
        "status": "online",
        "uptime_secs": sample.uptime_seconds,
        "memory_bytes": sample.memory_bytes,
        "commands_executed": dispatcher.commands_executed(),
        "active_sessions": active_sessions,
        "total_tasks": dispatcher.tasks().total(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
