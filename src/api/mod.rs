//! HTTP API module
//!
//! This module is the UI binding layer: it attaches and detaches the
//! foreground surface and forwards user actions to its controller.

pub mod handlers;
pub mod responses;

use std::sync::Arc;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/surface/open", post(open_surface_handler))
        .route("/surface/close", post(close_surface_handler))
        .route("/timer", get(timer_handler))
        .route("/timer/start", post(start_handler))
        .route("/timer/pause", post(pause_handler))
        .route("/timer/reset", post(reset_handler))
        .route("/settings", get(get_settings_handler).put(put_settings_handler))
        .route("/blocklist", get(blocklist_handler).post(add_blocked_handler))
        .route("/blocklist/enabled", put(blocking_enabled_handler))
        .route("/blocklist/check", get(check_blocked_handler))
        .route("/blocklist/:domain", delete(remove_blocked_handler))
        .route("/alerts", get(alerts_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bridge,
        clock::ManualClock,
        services::{BroadcastAlerts, LogNotifier},
        state::foreground::Collaborators,
        store::MemoryStore,
    };
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const T0: i64 = 1_700_000_000_000;

    fn app() -> (Router, Arc<AppState>) {
        let (tx, mut rx) = bridge::channel(32);
        tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                envelope.respond(bridge::Response::ok("ok"));
            }
        });

        let deps = Collaborators {
            store: Arc::new(MemoryStore::new()),
            bridge: tx,
            notifier: Arc::new(LogNotifier),
            clock: Arc::new(ManualClock::new(T0)),
        };
        let state = Arc::new(AppState::new(
            deps,
            Arc::new(BroadcastAlerts::default()),
            20554,
            "127.0.0.1".to_string(),
        ));
        (create_router(Arc::clone(&state)), state)
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn timer_requires_attached_surface() {
        let (app, _) = app();
        let (status, _) = call(&app, "POST", "/timer/start", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn start_pause_reset_flow() {
        let (app, state) = app();

        let (status, body) = call(&app, "POST", "/surface/open", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!({"state": "idle"}));
        assert_eq!(body["display"], json!("25:00"));

        let (_, body) = call(&app, "POST", "/timer/start", None).await;
        assert_eq!(body["status"], json!({"state": "running", "mode": "focus"}));
        assert_eq!(body["timer"]["endTime"], json!(T0 + 1_500_000));

        let (_, body) = call(&app, "POST", "/timer/pause", None).await;
        assert_eq!(body["status"], json!({"state": "paused", "mode": "focus"}));

        let (_, body) = call(&app, "POST", "/timer/reset", None).await;
        assert_eq!(body["status"], json!({"state": "idle"}));
        assert_eq!(state.get_last_action().0.as_deref(), Some("reset"));

        let (_, body) = call(&app, "POST", "/surface/close", None).await;
        assert_eq!(body["message"], json!("Surface detached"));
        assert!(state.foreground().is_none());
    }

    #[tokio::test]
    async fn settings_are_parsed_leniently() {
        let (app, _) = app();
        let (status, body) = call(
            &app,
            "PUT",
            "/settings",
            Some(json!({"focusMinutes": "50", "restMinutes": "abc", "totalCycles": 2})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"focusMinutes": 50, "restMinutes": 5, "totalCycles": 2}));

        call(&app, "POST", "/surface/open", None).await;
        let (_, body) = call(&app, "GET", "/timer", None).await;
        assert_eq!(body["display"], json!("50:00"));
    }

    #[tokio::test]
    async fn blocklist_endpoints() {
        let (app, _) = app();

        let (status, _) = call(&app, "POST", "/blocklist", Some(json!({"domain": "https://www.reddit.com/"}))).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = call(&app, "POST", "/blocklist", Some(json!({"domain": "reddit.com"}))).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(&app, "POST", "/blocklist", Some(json!({"domain": "   "}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (_, body) = call(&app, "GET", "/blocklist/check?url=old.reddit.com", None).await;
        assert_eq!(body["blocked"], json!(false));

        call(&app, "PUT", "/blocklist/enabled", Some(json!({"enabled": true}))).await;
        let (_, body) = call(&app, "GET", "/blocklist/check?url=old.reddit.com", None).await;
        assert_eq!(body["blocked"], json!(true));

        let (status, body) = call(&app, "DELETE", "/blocklist/reddit.com", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["blockedWebsites"], json!([]));
        let (status, _) = call(&app, "DELETE", "/blocklist/reddit.com", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn status_and_health() {
        let (app, _) = app();
        let (_, body) = call(&app, "GET", "/status", None).await;
        assert_eq!(body["surface_attached"], json!(false));
        assert_eq!(body["port"], json!(20554));

        let (status, body) = call(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("ok"));
    }
}
