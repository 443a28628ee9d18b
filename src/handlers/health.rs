use crate::handlers::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::json;
use tracing::error;

/// Basic up/down status
async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "up",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Liveness: the process is running
async fn liveness() -> impl IntoResponse {
    Json(json!({ "status": "alive" }))
}

/// Readiness: the database answers
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ready" }))),
        Err(e) => {
            error!(error = %e, "Readiness check failed: database unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "not ready", "reason": "database unreachable" })),
            )
        }
    }
}

pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/live", get(liveness))
        .route("/health/ready", get(readiness))
}
