/// Background task implementations
use crate::{context::AppContext, error::QuizResult};

/// Remove expired sessions from the store
pub async fn cleanup_expired_sessions(ctx: &AppContext) -> QuizResult<u64> {
    ctx.session_manager.sweep_expired().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::crypto::PasswordHasher;
    use crate::store::{memory::MemoryStore, QuizStore, SeedData};
    use chrono::Duration;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_cleanup_counts_expired_sessions() {
        let hasher = PasswordHasher::new("s", 10);
        let seed = SeedData::new(&hasher, "a", "b");
        let store: Arc<dyn QuizStore> =
            Arc::new(MemoryStore::new(seed, Duration::milliseconds(-1)));
        store.create_session(1, "one").await.unwrap();
        store.create_session(2, "two").await.unwrap();

        let ctx = AppContext::with_store(ServerConfig::for_testing(), store, hasher);
        assert_eq!(cleanup_expired_sessions(&ctx).await.unwrap(), 2);
        assert_eq!(cleanup_expired_sessions(&ctx).await.unwrap(), 0);
    }
}
