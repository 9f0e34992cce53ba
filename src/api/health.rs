/// Health check endpoints
///
/// `/health` is the basic status document. `/health/live` only proves the
/// process answers; `/health/ready` also pings the storage backend and
/// returns 503 when it is unreachable.
use crate::{api::middleware::method_not_allowed, context::AppContext};
use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use chrono::Utc;
use serde_json::{json, Value};

/// Build health check routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health_basic).fallback(method_not_allowed))
        .route("/health/live", get(liveness_probe))
        .route("/health/ready", get(readiness_probe))
}

/// Basic health check
pub async fn health_basic(State(ctx): State<AppContext>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now(),
        "version": ctx.config.service.version,
    }))
}

pub async fn liveness_probe() -> Json<Value> {
    Json(json!({
        "status": "alive",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub async fn readiness_probe(
    State(ctx): State<AppContext>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if let Err(e) = ctx.store.ping().await {
        tracing::warn!(error = %e, backend = ctx.store.backend_name(), "readiness probe failed");
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unavailable",
                "storage": ctx.store.backend_name(),
            })),
        ));
    }

    Ok(Json(json!({
        "status": "ready",
        "storage": ctx.store.backend_name(),
        "version": env!("CARGO_PKG_VERSION")
    })))
}
