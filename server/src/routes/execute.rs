//! One-shot command execution over HTTP.
//!
//! `POST /api/execute` runs a command line through the same dispatcher as the
//! WebSocket path. The caller has no session, so the reply comes back in the
//! response body; results of broadcast commands still reach every connected
//! WebSocket session.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::tasks::TaskOrigin;
use crate::AppState;

/// Request body for `POST /api/execute`.
#[derive(Deserialize)]
pub struct ExecuteRequest {
    /// Command line, e.g. `calculate:2+2`.
    #[serde(default)]
    pub command: String,
}

/// Response body for `POST /api/execute`.
#[derive(Serialize)]
pub struct ExecuteResponse {
    pub success: bool,
    pub command: String,
    /// Reply text on success, error message on failure.
    pub result: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<u64>,
    pub broadcast: bool,
    /// Error code, only on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

/// `POST /api/execute` — run one command.
///
/// # Errors
///
/// - `400 Bad Request` with `{"success":false}` — command missing or blank
///
/// Command-level failures (unknown command, bad expression) are reported with
/// `200` and `success: false`, mirroring the reply a WebSocket client gets.
pub async fn execute(
    State(state): State<AppState>,
    Json(payload): Json<ExecuteRequest>,
) -> Result<Json<ExecuteResponse>, (StatusCode, Json<Value>)> {
    if payload.command.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "error": "No command provided"})),
        ));
    }

    let response = match state.dispatcher.execute(TaskOrigin::Rest, &payload.command).await {
        Ok(executed) => ExecuteResponse {
            success: true,
            command: payload.command,
            result: executed.result.text,
            task_id: Some(executed.task_id),
            broadcast: executed.result.broadcast,
            code: None,
        },
        Err(e) => ExecuteResponse {
            success: false,
            command: payload.command,
            result: e.to_string(),
            task_id: None,
            broadcast: false,
            code: Some(e.code()),
        },
    };
    Ok(Json(response))
}
