/// Application context and dependency injection
use crate::{
    account::AccountManager,
    admin::AdminService,
    config::ServerConfig,
    crypto::PasswordHasher,
    error::QuizResult,
    quiz::QuizService,
    rate_limit::RateLimiter,
    session::SessionManager,
    store::{self, QuizStore, SeedData},
};
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub store: Arc<dyn QuizStore>,
    pub session_manager: Arc<SessionManager>,
    pub account_manager: Arc<AccountManager>,
    pub quiz_service: Arc<QuizService>,
    pub admin_service: Arc<AdminService>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> QuizResult<Self> {
        config.validate()?;

        let hasher = PasswordHasher::new(
            config.authentication.password_salt.clone(),
            config.authentication.password_iterations,
        );
        let seed = SeedData::new(
            &hasher,
            &config.authentication.seed_admin_password,
            &config.authentication.seed_student_password,
        );

        let store = store::create_store(&config, seed).await?;
        Ok(Self::with_store(config, store, hasher))
    }

    /// Wire the services around an already opened store
    pub fn with_store(
        config: ServerConfig,
        store: Arc<dyn QuizStore>,
        hasher: PasswordHasher,
    ) -> Self {
        let session_manager = Arc::new(SessionManager::new(store.clone()));
        let account_manager = Arc::new(AccountManager::new(
            store.clone(),
            session_manager.clone(),
            hasher,
        ));
        let quiz_service = Arc::new(QuizService::new(store.clone(), session_manager.clone()));
        let admin_service = Arc::new(AdminService::new(
            store.clone(),
            config.storage.backend.name(),
            &config.service.version,
        ));
        let rate_limiter = Arc::new(RateLimiter::new(&config.rate_limit));

        Self {
            config: Arc::new(config),
            store,
            session_manager,
            account_manager,
            quiz_service,
            admin_service,
            rate_limiter,
        }
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
