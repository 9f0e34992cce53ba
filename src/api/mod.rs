/// API routes and handlers
pub mod admin;
pub mod auth;
pub mod health;
pub mod middleware;
pub mod quiz;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(quiz::routes())
        .merge(admin::routes())
}
