/// Storage System
///
/// Users, sessions and quiz content behind one contract with three
/// interchangeable backends: process memory, JSON documents (local files
/// or a GitHub repository) and a Redis key-value store.

pub mod github;
pub mod json;
pub mod kv;
pub mod memory;
pub mod models;
pub mod seed;

pub use models::*;
pub use seed::SeedData;

use crate::{
    config::{ServerConfig, StorageBackendConfig},
    error::QuizResult,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Storage backend trait
///
/// Session lookups enforce expiry themselves: an expired session is
/// deleted and reported as not found.
#[async_trait]
pub trait QuizStore: Send + Sync {
    /// Short backend name for logs and diagnostics
    fn backend_name(&self) -> &'static str;

    async fn find_user_by_id(&self, id: UserId) -> QuizResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> QuizResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> QuizResult<Option<User>>;

    /// Assign the next sequential id, stamp creation time, mark active
    async fn create_user(&self, new_user: NewUser) -> QuizResult<User>;

    async fn update_user(&self, id: UserId, update: UserUpdate) -> QuizResult<Option<User>>;

    async fn list_users(&self) -> QuizResult<Vec<User>>;

    /// Create a session expiring one TTL from now
    async fn create_session(&self, user_id: UserId, token: &str) -> QuizResult<Session>;

    async fn find_session_by_token(&self, token: &str) -> QuizResult<Option<Session>>;

    /// Returns whether a session was removed
    async fn delete_session(&self, token: &str) -> QuizResult<bool>;

    /// Remove every expired session, returning how many were removed
    async fn delete_expired_sessions(&self) -> QuizResult<u64>;

    async fn list_quiz_tables(&self) -> QuizResult<Vec<QuizTable>>;

    async fn get_table_by_name(&self, name: &str) -> QuizResult<Option<QuizTable>>;

    async fn list_questions_by_table(&self, name: &str) -> QuizResult<Vec<Question>>;

    async fn find_question_by_id(&self, id: i64) -> QuizResult<Option<Question>>;

    /// Check that the backend is reachable
    async fn ping(&self) -> QuizResult<()>;
}

/// Build the configured backend, seeding it when empty
pub async fn create_store(config: &ServerConfig, seed: SeedData) -> QuizResult<Arc<dyn QuizStore>> {
    let ttl = config.session_ttl();

    let store: Arc<dyn QuizStore> = match &config.storage.backend {
        StorageBackendConfig::Memory => Arc::new(memory::MemoryStore::new(seed, ttl)),
        StorageBackendConfig::Json {
            data_directory,
            github,
        } => {
            let source: Arc<dyn json::DocumentSource> = match github {
                Some(github) => Arc::new(github::GithubDocuments::new(github.clone())?),
                None => Arc::new(json::LocalDocuments::new(data_directory.clone())),
            };
            Arc::new(json::JsonStore::open(source, seed, ttl).await?)
        }
        StorageBackendConfig::Kv {
            redis_url,
            key_prefix,
        } => {
            let kv = kv::RedisKeyValue::connect(redis_url).await?;
            Arc::new(kv::KvStore::open(Arc::new(kv), key_prefix.clone(), seed, ttl).await?)
        }
    };

    tracing::info!(backend = store.backend_name(), "storage backend ready");

    Ok(store)
}
