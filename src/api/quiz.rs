/// Quiz API endpoints
use crate::{
    api::middleware::{method_not_allowed, JsonBody},
    auth::AuthContext,
    context::AppContext,
    error::QuizResult,
    quiz::{LeaderboardPeriod, SubmitAnswerRequest},
};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct LeaderboardQuery {
    period: Option<String>,
}

/// Build quiz routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/quiz/tables", get(list_tables).fallback(method_not_allowed))
        .route(
            "/quiz/questions/:table",
            get(list_questions).fallback(method_not_allowed),
        )
        .route(
            "/quiz/leaderboard",
            get(leaderboard).fallback(method_not_allowed),
        )
        .route(
            "/quiz/submit-answer",
            post(submit_answer).fallback(method_not_allowed),
        )
}

async fn list_tables(State(ctx): State<AppContext>) -> QuizResult<Json<Value>> {
    let tables = ctx.quiz_service.list_tables().await?;

    Ok(Json(json!({
        "success": true,
        "data": tables,
    })))
}

async fn list_questions(
    State(ctx): State<AppContext>,
    Path(table): Path<String>,
) -> QuizResult<Json<Value>> {
    let questions = ctx.quiz_service.list_questions(&table).await?;

    Ok(Json(json!({
        "success": true,
        "table": table,
        "count": questions.len(),
        "data": questions,
    })))
}

async fn leaderboard(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Query(query): Query<LeaderboardQuery>,
) -> QuizResult<Json<Value>> {
    let period = LeaderboardPeriod::parse(query.period.as_deref());
    let board = ctx.quiz_service.leaderboard(auth.user.id, period).await?;

    Ok(Json(json!({
        "success": true,
        "data": board,
    })))
}

async fn submit_answer(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    JsonBody(request): JsonBody<SubmitAnswerRequest>,
) -> QuizResult<Json<Value>> {
    let submitted = ctx
        .quiz_service
        .submit_answer(&auth.token, request)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Answer submitted",
        "data": submitted,
    })))
}
