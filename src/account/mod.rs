/// Account management system
///
/// Handles login, registration, profiles and logout, plus the public
/// projections of a user record that are safe to return to clients.

mod manager;

pub use manager::AccountManager;

use crate::store::{BattleStats, Role, SettingsPatch, User, UserId, UserSettings};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Registration request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(
        length(min = 3, max = 20, message = "Username must be 3-20 characters"),
        custom(function = "validate_username")
    )]
    pub username: String,

    #[serde(default)]
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
}

impl RegisterRequest {
    /// Trim the username and treat a blank email as absent
    pub fn normalized(mut self) -> Self {
        self.username = self.username.trim().to_string();
        self.email = self
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        self
    }
}

fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        Ok(())
    } else {
        let mut error = ValidationError::new("username_chars");
        error.message =
            Some("Username may only contain letters, digits, '_', '.' and '-'".into());
        Err(error)
    }
}

/// Settings update; `settings` is merged field by field
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateSettingsRequest {
    #[serde(default)]
    pub settings: Option<SettingsPatch>,

    #[validate(length(min = 1, max = 16, message = "Avatar must be 1-16 characters"))]
    pub avatar: Option<String>,
}

/// User fields visible to everyone who can see the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: UserId,
    pub username: String,
    pub email: Option<String>,
    pub role: Role,
    pub avatar: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            avatar: user.avatar.clone(),
        }
    }
}

/// The caller's own profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: PublicUser,
    pub settings: UserSettings,
    pub battle_stats: BattleStats,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            user: user.into(),
            settings: user.settings.clone(),
            battle_stats: user.battle_stats.clone(),
        }
    }
}

/// User as listed in the admin dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminUserView {
    #[serde(flatten)]
    pub user: PublicUser,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl From<&User> for AdminUserView {
    fn from(user: &User) -> Self {
        Self {
            user: user.into(),
            created_at: user.created_at,
            last_login: user.last_login,
            is_active: user.is_active,
        }
    }
}

/// Login and registration result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: PublicUser,
    pub token: String,
}
