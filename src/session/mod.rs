/// Session management
///
/// Opaque bearer tokens mapped to sessions in the store.
use crate::{
    crypto::generate_token,
    error::{QuizError, QuizResult},
    store::{QuizStore, Session, UserId},
};
use std::sync::Arc;
use tracing::debug;

/// Session manager service
pub struct SessionManager {
    store: Arc<dyn QuizStore>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn QuizStore>) -> Self {
        Self { store }
    }

    /// Issue a fresh session for a user
    pub async fn create(&self, user_id: UserId) -> QuizResult<Session> {
        let token = generate_token();
        let session = self.store.create_session(user_id, &token).await?;
        debug!(user_id, "session created");
        Ok(session)
    }

    /// Resolve a bearer token to its active session
    pub async fn validate(&self, token: &str) -> QuizResult<Session> {
        let session = self
            .store
            .find_session_by_token(token)
            .await?
            .ok_or_else(|| QuizError::Authentication("Invalid or expired token".to_string()))?;

        if session.is_expired() {
            self.store.delete_session(token).await?;
            return Err(QuizError::Authentication(
                "Invalid or expired token".to_string(),
            ));
        }

        Ok(session)
    }

    /// Delete a session; revoking an unknown token is not an error
    pub async fn revoke(&self, token: &str) -> QuizResult<()> {
        if self.store.delete_session(token).await? {
            debug!("session revoked");
        }
        Ok(())
    }

    /// Drop all expired sessions, returning how many were removed
    pub async fn sweep_expired(&self) -> QuizResult<u64> {
        self.store.delete_expired_sessions().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::PasswordHasher;
    use crate::store::{memory::MemoryStore, SeedData};
    use chrono::Duration;

    fn manager(ttl: Duration) -> SessionManager {
        let seed = SeedData::new(&PasswordHasher::new("s", 10), "a", "b");
        SessionManager::new(Arc::new(MemoryStore::new(seed, ttl)))
    }

    #[tokio::test]
    async fn test_create_and_validate() {
        let sessions = manager(Duration::hours(24));

        let session = sessions.create(2).await.unwrap();
        assert_eq!(session.token.len(), 64);

        let validated = sessions.validate(&session.token).await.unwrap();
        assert_eq!(validated.user_id, 2);
    }

    #[tokio::test]
    async fn test_tokens_are_distinct_per_login() {
        let sessions = manager(Duration::hours(24));
        let first = sessions.create(1).await.unwrap();
        let second = sessions.create(1).await.unwrap();
        assert_ne!(first.token, second.token);
        assert!(sessions.validate(&first.token).await.is_ok());
        assert!(sessions.validate(&second.token).await.is_ok());
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let sessions = manager(Duration::hours(24));
        let session = sessions.create(1).await.unwrap();

        sessions.revoke(&session.token).await.unwrap();
        sessions.revoke(&session.token).await.unwrap();

        assert!(matches!(
            sessions.validate(&session.token).await,
            Err(QuizError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn test_expired_session_rejected() {
        let sessions = manager(Duration::milliseconds(-1));
        let session = sessions.create(1).await.unwrap();
        assert!(matches!(
            sessions.validate(&session.token).await,
            Err(QuizError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_token_rejected() {
        let sessions = manager(Duration::hours(1));
        assert!(sessions.validate("deadbeef").await.is_err());
    }
}
