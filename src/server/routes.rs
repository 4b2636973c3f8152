// src/server/routes.rs

//! Axum router for the repoatlas service.
//!
//! - `/` and `/mirrorlist` answer mirrorlist queries
//! - `/repodiff`, `/repohealth`, `/repomirror` drive the other pipelines
//! - `/favicon.ico` answers 200 with an empty body so browser noise does not
//!   pollute the request stats
//! - `/health` and `/health.html` are liveness endpoints
//! - `/stats` serves the request-stats snapshot
//! - `/pub/` serves the locally mirrored tree, only when `pub/` existed at
//!   startup

use crate::server::{handlers, stats, AppState};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{middleware, Json, Router};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tracing::info;

/// Create the application router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route("/", get(handlers::mirrorlist))
        .route("/mirrorlist", get(handlers::mirrorlist))
        .route("/repodiff", get(handlers::repodiff))
        .route("/repohealth", get(handlers::repohealth))
        .route("/repomirror", get(handlers::repomirror))
        .route("/favicon.ico", get(favicon))
        .route("/health", get(keepalive))
        .route("/health.html", get(keepalive))
        .route("/stats", get(stats_snapshot));

    if let Some(pub_dir) = &state.config.pub_dir {
        info!(path = "/pub", "serving filesystem");
        router = router.nest_service("/pub", ServeDir::new(pub_dir));
    }

    router
        .layer(middleware::from_fn_with_state(
            state.stats.clone(),
            stats::track_requests,
        ))
        .with_state(state)
}

/// Answering the favicon request keeps invalid-request noise out of the
/// stats; 200 with zero body bytes.
async fn favicon() -> StatusCode {
    StatusCode::OK
}

async fn keepalive() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain")],
        "ALIVE\n",
    )
}

async fn stats_snapshot(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.stats.snapshot().await)
}
