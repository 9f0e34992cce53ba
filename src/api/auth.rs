/// Auth API endpoints: register, login, profile, settings, logout
use crate::{
    account::{LoginRequest, RegisterRequest, UpdateSettingsRequest},
    api::middleware::{method_not_allowed, JsonBody},
    auth::OptionalBearer,
    context::AppContext,
    error::{QuizError, QuizResult},
};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

/// Build auth routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route(
            "/auth/register",
            post(register).fallback(method_not_allowed),
        )
        .route("/auth/login", post(login).fallback(method_not_allowed))
        .route("/auth/profile", get(profile).fallback(method_not_allowed))
        .route(
            "/auth/settings",
            get(get_settings)
                .put(update_settings)
                .fallback(method_not_allowed),
        )
        .route("/auth/logout", post(logout).fallback(method_not_allowed))
}

async fn register(
    State(ctx): State<AppContext>,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> QuizResult<Json<Value>> {
    ctx.rate_limiter.check_register()?;

    let response = ctx.account_manager.register(request).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Registration successful",
        "user": response.user,
        "token": response.token,
    })))
}

async fn login(
    State(ctx): State<AppContext>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> QuizResult<Json<Value>> {
    ctx.rate_limiter.check_login()?;

    let response = ctx.account_manager.login(request).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Login successful",
        "user": response.user,
        "token": response.token,
    })))
}

fn require_token(token: Option<String>) -> QuizResult<String> {
    token.ok_or_else(|| QuizError::Authentication("Authentication required".to_string()))
}

async fn profile(
    State(ctx): State<AppContext>,
    OptionalBearer(token): OptionalBearer,
) -> QuizResult<Json<Value>> {
    let token = require_token(token)?;
    let profile = ctx.account_manager.profile(&token).await?;

    Ok(Json(json!({
        "success": true,
        "user": profile,
    })))
}

async fn get_settings(
    State(ctx): State<AppContext>,
    OptionalBearer(token): OptionalBearer,
) -> QuizResult<Json<Value>> {
    let settings = ctx.account_manager.settings(&require_token(token)?).await?;

    Ok(Json(json!({
        "success": true,
        "settings": settings,
    })))
}

async fn update_settings(
    State(ctx): State<AppContext>,
    OptionalBearer(token): OptionalBearer,
    JsonBody(request): JsonBody<UpdateSettingsRequest>,
) -> QuizResult<Json<Value>> {
    let profile = ctx
        .account_manager
        .update_settings(&require_token(token)?, request)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Settings updated successfully",
        "settings": profile.settings,
        "user": profile,
    })))
}

async fn logout(
    State(ctx): State<AppContext>,
    OptionalBearer(token): OptionalBearer,
) -> QuizResult<Json<Value>> {
    ctx.account_manager.logout(token.as_deref()).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Logout successful",
    })))
}
