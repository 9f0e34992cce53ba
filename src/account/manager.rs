/// Account manager: credentials, registration and session issuance
use crate::{
    account::{
        AuthResponse, LoginRequest, PublicUser, RegisterRequest, UpdateSettingsRequest,
        UserProfile,
    },
    crypto::PasswordHasher,
    error::{QuizError, QuizResult},
    session::SessionManager,
    store::{BattleStats, NewUser, QuizStore, Role, User, UserSettings, UserUpdate},
};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use validator::{Validate, ValidationErrors};

const DEFAULT_AVATAR: &str = "👤";
const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// Account manager service
pub struct AccountManager {
    store: Arc<dyn QuizStore>,
    sessions: Arc<SessionManager>,
    hasher: PasswordHasher,
    // Held across "check uniqueness then create user"
    registration_lock: Mutex<()>,
}

impl AccountManager {
    pub fn new(
        store: Arc<dyn QuizStore>,
        sessions: Arc<SessionManager>,
        hasher: PasswordHasher,
    ) -> Self {
        Self {
            store,
            sessions,
            hasher,
            registration_lock: Mutex::new(()),
        }
    }

    /// Verify credentials and issue a session
    ///
    /// An unknown username and a wrong password produce the same error.
    pub async fn login(&self, request: LoginRequest) -> QuizResult<AuthResponse> {
        let username = request.username.trim();
        if username.is_empty() || request.password.is_empty() {
            return Err(QuizError::Validation(
                "Username and password are required".to_string(),
            ));
        }

        let user = match self.store.find_user_by_username(username).await? {
            Some(user) if self.hasher.verify(&request.password, &user.password_hash) => user,
            _ => {
                debug!(username, "login rejected");
                return Err(QuizError::Authentication(INVALID_CREDENTIALS.to_string()));
            }
        };

        if !user.is_active {
            warn!(user_id = user.id, "login attempt on disabled account");
            return Err(QuizError::Authorization("Account is disabled".to_string()));
        }

        let user = self
            .store
            .update_user(
                user.id,
                UserUpdate {
                    last_login: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await?
            .unwrap_or(user);

        let session = self.sessions.create(user.id).await?;
        info!(user_id = user.id, "user logged in");

        Ok(AuthResponse {
            user: PublicUser::from(&user),
            token: session.token,
        })
    }

    /// Create a student account and log it in
    pub async fn register(&self, request: RegisterRequest) -> QuizResult<AuthResponse> {
        let request = request.normalized();
        request
            .validate()
            .map_err(|e| validation_message(e, &["username", "password", "email"]))?;

        let user = {
            let _guard = self.registration_lock.lock().await;

            if self
                .store
                .find_user_by_username(&request.username)
                .await?
                .is_some()
            {
                return Err(QuizError::Conflict("Username already exists".to_string()));
            }
            if let Some(email) = &request.email {
                if self.store.find_user_by_email(email).await?.is_some() {
                    return Err(QuizError::Conflict("Email already exists".to_string()));
                }
            }

            self.store
                .create_user(NewUser {
                    username: request.username,
                    email: request.email,
                    password_hash: self.hasher.hash(&request.password),
                    role: Role::Student,
                    avatar: DEFAULT_AVATAR.to_string(),
                    settings: UserSettings::default(),
                    battle_stats: BattleStats::default(),
                })
                .await?
        };

        let session = self.sessions.create(user.id).await?;
        info!(user_id = user.id, username = %user.username, "user registered");

        Ok(AuthResponse {
            user: PublicUser::from(&user),
            token: session.token,
        })
    }

    /// Resolve a bearer token to the user behind it
    pub async fn authenticate(&self, token: &str) -> QuizResult<User> {
        let session = self.sessions.validate(token).await?;

        let user = self
            .store
            .find_user_by_id(session.user_id)
            .await?
            .ok_or_else(|| QuizError::Authentication("User not found".to_string()))?;

        if !user.is_active {
            return Err(QuizError::Authorization("Account is disabled".to_string()));
        }

        Ok(user)
    }

    /// The caller's own profile
    pub async fn profile(&self, token: &str) -> QuizResult<UserProfile> {
        let user = self.authenticate(token).await?;
        Ok(UserProfile::from(&user))
    }

    pub async fn settings(&self, token: &str) -> QuizResult<UserSettings> {
        Ok(self.authenticate(token).await?.settings)
    }

    /// Merge new settings and optionally replace the avatar
    pub async fn update_settings(
        &self,
        token: &str,
        request: UpdateSettingsRequest,
    ) -> QuizResult<UserProfile> {
        let user = self.authenticate(token).await?;

        if request.settings.is_none() && request.avatar.is_none() {
            return Err(QuizError::Validation(
                "No settings data provided".to_string(),
            ));
        }
        request
            .validate()
            .map_err(|e| validation_message(e, &["avatar"]))?;
        if let Some(theme) = request.settings.as_ref().and_then(|s| s.theme.as_deref()) {
            if theme.trim().is_empty() {
                return Err(QuizError::Validation("Theme cannot be empty".to_string()));
            }
        }

        let updated = self
            .store
            .update_user(
                user.id,
                UserUpdate {
                    avatar: request.avatar,
                    settings: request.settings,
                    ..Default::default()
                },
            )
            .await?
            .ok_or_else(|| QuizError::NotFound("User not found".to_string()))?;

        debug!(user_id = updated.id, "settings updated");
        Ok(UserProfile::from(&updated))
    }

    /// End a session; a missing or unknown token still succeeds
    pub async fn logout(&self, token: Option<&str>) -> QuizResult<()> {
        if let Some(token) = token {
            self.sessions.revoke(token).await?;
        }
        Ok(())
    }
}

/// First failing rule, checked in `fields` order
fn validation_message(errors: ValidationErrors, fields: &[&str]) -> QuizError {
    let field_errors = errors.field_errors();
    let message = fields
        .iter()
        .filter_map(|field| field_errors.get(*field))
        .flat_map(|errors| errors.iter())
        .find_map(|error| error.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Invalid request data".to_string());
    QuizError::Validation(message)
}
