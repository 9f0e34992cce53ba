/// Admin API endpoints
use crate::{
    admin::AdminUserUpdate,
    api::middleware::{method_not_allowed, JsonBody},
    auth::AdminAuthContext,
    context::AppContext,
    error::{QuizError, QuizResult},
    store::UserId,
};
use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};

/// Build admin routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/admin/users", get(list_users).fallback(method_not_allowed))
        .route(
            "/admin/users/:id",
            put(update_user).fallback(method_not_allowed),
        )
        .route(
            "/admin/statistics",
            get(statistics).fallback(method_not_allowed),
        )
        .route("/admin/system", get(system).fallback(method_not_allowed))
}

async fn list_users(
    State(ctx): State<AppContext>,
    _auth: AdminAuthContext,
) -> QuizResult<Json<Value>> {
    let users = ctx.admin_service.list_users().await?;

    Ok(Json(json!({
        "success": true,
        "data": users,
    })))
}

async fn update_user(
    State(ctx): State<AppContext>,
    auth: AdminAuthContext,
    Path(user_id): Path<String>,
    JsonBody(update): JsonBody<AdminUserUpdate>,
) -> QuizResult<Json<Value>> {
    let user_id: UserId = user_id
        .parse()
        .map_err(|_| QuizError::Validation("Invalid user id".to_string()))?;
    let user = ctx
        .admin_service
        .update_user(&auth.user, user_id, update)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": user,
    })))
}

async fn statistics(
    State(ctx): State<AppContext>,
    _auth: AdminAuthContext,
) -> QuizResult<Json<Value>> {
    let stats = ctx.admin_service.statistics().await?;

    Ok(Json(json!({
        "success": true,
        "data": stats,
        "timestamp": Utc::now(),
    })))
}

async fn system(
    State(ctx): State<AppContext>,
    _auth: AdminAuthContext,
) -> Json<Value> {
    let system = ctx.admin_service.system_info().await;

    Json(json!({
        "success": true,
        "system": system,
    }))
}
