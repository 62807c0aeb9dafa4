//! Tabletop battle API: HTTP surface for the battle turn scheduler.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Builds the full application router.
pub fn build_router(state: AppState) -> Router {
    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/battles/{battle_id}", routes::battle::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
