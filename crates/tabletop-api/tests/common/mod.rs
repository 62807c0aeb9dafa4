//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use sqlx::PgPool;
use tabletop_core::clock::Clock;
use tabletop_store::pg_snapshot_repository::PgSnapshotRepository;
use tabletop_test_support::fixed_clock;
use tower::ServiceExt;
use uuid::Uuid;

use tabletop_api::build_router;
use tabletop_api::state::AppState;

/// Application state backed by a real `PgSnapshotRepository`, a fixed clock,
/// and a fresh battle table. Two states built from the same pool behave like
/// two server processes sharing one database.
pub fn test_state(pool: PgPool) -> AppState {
    let clock: Arc<dyn Clock> = Arc::new(fixed_clock());
    AppState::new(clock, Arc::new(PgSnapshotRepository::new(pool)))
}

/// Build the full app router. Uses the same route structure as `main.rs`.
pub fn build_test_app(state: &AppState) -> Router {
    build_router(state.clone())
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap()
    };

    (status, json)
}

/// Send a request with a JSON body and return the response.
pub async fn send_json(
    app: Router,
    method: &str,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    send(app, request).await
}

/// Send a request without a body and return the response.
pub async fn send_empty(app: Router, method: &str, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    send_empty(app, "GET", uri).await
}

/// Waits until the background snapshot write for `battle_id` has reached
/// `version`.
///
/// # Panics
///
/// Panics if the snapshot does not show up within five seconds.
pub async fn wait_for_snapshot(pool: &PgPool, battle_id: Uuid, version: i64) {
    for _ in 0..100 {
        let stored: Option<i64> =
            sqlx::query_scalar("SELECT version FROM battle_snapshots WHERE aggregate_id = $1")
                .bind(battle_id)
                .fetch_optional(pool)
                .await
                .unwrap();
        if stored.is_some_and(|v| v >= version) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("snapshot for {battle_id} never reached version {version}");
}
