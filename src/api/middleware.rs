/// Request helpers shared by the API handlers
use crate::error::QuizError;
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::{header, HeaderMap},
    Json,
};
use serde::de::DeserializeOwned;

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// JSON body whose rejections use the error envelope
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = QuizError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(QuizError::Validation(rejection_message(&rejection))),
        }
    }
}

fn rejection_message(rejection: &JsonRejection) -> String {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            "Expected Content-Type: application/json".to_string()
        }
        _ => format!("Invalid JSON body: {}", rejection.body_text()),
    }
}

/// Fallback for a known path called with the wrong verb
pub async fn method_not_allowed() -> QuizError {
    QuizError::MethodNotAllowed
}
