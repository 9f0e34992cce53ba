/// HTTP server setup and routing
use crate::{
    context::AppContext,
    error::{QuizError, QuizResult},
};
use axum::{
    http::{header, Method},
    Router,
};
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Build the main application router
///
/// Every OPTIONS request is answered by the CORS layer with an empty 200.
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(86400));

    Router::new()
        .merge(crate::api::routes())
        .fallback(not_found)
        // Provide state - converts Router<AppContext> to Router<()>
        .with_state(ctx)
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

/// 404 handler
async fn not_found() -> QuizError {
    QuizError::NotFound("Endpoint not found".to_string())
}

/// Start the HTTP server
pub async fn serve(ctx: AppContext) -> QuizResult<()> {
    let addr = format!("{}:{}", ctx.config.service.hostname, ctx.config.service.port);

    info!("Quiz server listening on {}", addr);
    info!("   Service URL: {}", ctx.service_url());
    info!("   Storage backend: {}", ctx.config.storage.backend.name());

    let app = build_router(ctx);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| QuizError::Internal(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| QuizError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
