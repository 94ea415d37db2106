//! HTTP route handlers and router assembly.
//!
//! Each sub-module corresponds to an API endpoint group. There is no
//! authentication; every endpoint is public.

pub mod execute;
pub mod health;
pub mod status;
pub mod tasks;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{ws, AppState};

/// Build the full application router: REST endpoints plus the WebSocket upgrade.
pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/api/health", get(health::health))
        .route("/api/status", get(status::status))
        .route("/api/execute", post(execute::execute))
        .route("/api/tasks", get(tasks::get_tasks));

    let api_routes = if state.config.server.cors_permissive {
        api_routes.layer(CorsLayer::permissive())
    } else {
        api_routes
    };

    Router::new()
        .merge(api_routes)
        .route("/api/ws", get(ws::ws_upgrade))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    fn app() -> (Router, AppState) {
        let state = AppState::new(Config::default()).unwrap();
        (router(state.clone()), state)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_execute(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/execute")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["sessions"], 0);
    }

    #[tokio::test]
    async fn test_execute_success() {
        let (app, _) = app();
        let response = app
            .oneshot(post_execute(r#"{"command":"calculate:2+2"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["result"], "4");
        assert_eq!(json["task_id"], 1);
        assert_eq!(json["broadcast"], false);
    }

    #[tokio::test]
    async fn test_execute_command_error() {
        let (app, _) = app();
        let response = app
            .oneshot(post_execute(r#"{"command":"calculate:5/0"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "INVALID_EXPRESSION");
    }

    #[tokio::test]
    async fn test_execute_blank_is_bad_request() {
        let (app, _) = app();
        let response = app.oneshot(post_execute(r#"{"command":"  "}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn test_status_and_tasks_reflect_execution() {
        let (app, _) = app();
        for cmd in ["help", "system:memory", "nope"] {
            let body = format!(r#"{{"command":"{cmd}"}}"#);
            app.clone().oneshot(post_execute(&body)).await.unwrap();
        }

        let response = app
            .clone()
            .oneshot(Request::get("/api/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["status"], "online");
        assert_eq!(json["commands_executed"], 3);
        assert_eq!(json["total_tasks"], 3);
        assert_eq!(json["active_sessions"], 0);

        let response = app
            .oneshot(Request::get("/api/tasks?limit=2").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(response).await;
        let tasks = json["tasks"].as_array().unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0]["command"], "system:memory");
        assert_eq!(tasks[1]["status"], "failed");
        assert_eq!(tasks[1]["origin"]["kind"], "rest");
        assert_eq!(json["total_tasks"], 3);
    }
}
