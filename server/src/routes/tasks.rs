//! Task log endpoint.
//!
//! `GET /api/tasks?limit=N` — the most recent commands and their outcomes.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::AppState;

/// Query parameters for `GET /api/tasks`.
#[derive(Deserialize)]
pub struct TasksQuery {
    /// Maximum number of entries to return. Defaults to 10, capped at the log size.
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    10
}

/// `GET /api/tasks` — newest entries, oldest first.
pub async fn get_tasks(State(state): State<AppState>, Query(query): Query<TasksQuery>) -> Json<Value> {
    let tasks = state.dispatcher.tasks();
    let limit = query.limit.min(tasks.capacity());
    let entries = tasks.recent(limit).await;
    Json(json!({
        "tasks": entries,
        "total_tasks": tasks.total(),
    }))
}
