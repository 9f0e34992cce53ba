/// Authentication extractors and utilities
use crate::{
    api::middleware::extract_bearer_token,
    context::AppContext,
    error::QuizError,
    store::{Role, User},
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Authenticated context - extracts and validates session from request
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub token: String,
    pub user: User,
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = QuizError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)
            .ok_or_else(|| QuizError::Authentication("Authentication required".to_string()))?;

        let user = state.account_manager.authenticate(&token).await?;

        Ok(AuthContext { token, user })
    }
}

/// Bearer token if one was sent; never rejects
#[derive(Debug, Clone)]
pub struct OptionalBearer(pub Option<String>);

#[async_trait]
impl FromRequestParts<AppContext> for OptionalBearer {
    type Rejection = QuizError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        Ok(OptionalBearer(extract_bearer_token(&parts.headers)))
    }
}

/// Admin authentication context - requires admin role
///
/// A missing or invalid session is 401; a valid session for a non-admin is 403.
#[derive(Debug, Clone)]
pub struct AdminAuthContext {
    pub token: String,
    pub user: User,
}

#[async_trait]
impl FromRequestParts<AppContext> for AdminAuthContext {
    type Rejection = QuizError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let AuthContext { token, user } = AuthContext::from_request_parts(parts, state).await?;

        if user.role != Role::Admin {
            tracing::warn!(user_id = user.id, "admin endpoint called by non-admin");
            return Err(QuizError::Authorization(
                "Admin access required".to_string(),
            ));
        }

        Ok(AdminAuthContext { token, user })
    }
}
