/// Storage records: users, sessions, quiz tables and questions
use crate::error::{QuizError, QuizResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Sequential user identifier
pub type UserId = i64;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Student => "student",
        }
    }

    pub fn from_str(s: &str) -> QuizResult<Self> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "student" => Ok(Role::Student),
            _ => Err(QuizError::Validation(format!("Invalid role: {}", s))),
        }
    }
}

/// Per-user frontend preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    pub theme: String,
    pub notifications: bool,
    pub auto_next: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            theme: "orange".to_string(),
            notifications: true,
            auto_next: false,
        }
    }
}

impl UserSettings {
    /// Overwrite the fields present in `patch`
    pub fn merge(&mut self, patch: SettingsPatch) {
        if let Some(theme) = patch.theme {
            self.theme = theme;
        }
        if let Some(notifications) = patch.notifications {
            self.notifications = notifications;
        }
        if let Some(auto_next) = patch.auto_next {
            self.auto_next = auto_next;
        }
    }
}

/// Partial settings; absent fields keep their stored value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsPatch {
    pub theme: Option<String>,
    pub notifications: Option<bool>,
    pub auto_next: Option<bool>,
}

/// Battle mode rating and record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleStats {
    pub rating: i32,
    pub wins: u32,
    pub losses: u32,
}

impl Default for BattleStats {
    fn default() -> Self {
        Self {
            rating: 1500,
            wins: 0,
            losses: 0,
        }
    }
}

/// User record in the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub avatar: String,
    #[serde(default)]
    pub settings: UserSettings,
    #[serde(default)]
    pub battle_stats: BattleStats,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl User {
    /// Build the stored record for a freshly assigned id
    pub fn from_new(id: UserId, new_user: NewUser) -> Self {
        Self {
            id,
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            role: new_user.role,
            avatar: new_user.avatar,
            settings: new_user.settings,
            battle_stats: new_user.battle_stats,
            created_at: Utc::now(),
            last_login: None,
            is_active: true,
        }
    }

    /// Merge a partial update into this record
    pub fn apply(&mut self, update: UserUpdate) {
        if let Some(last_login) = update.last_login {
            self.last_login = Some(last_login);
        }
        if let Some(role) = update.role {
            self.role = role;
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        if let Some(avatar) = update.avatar {
            self.avatar = avatar;
        }
        if let Some(patch) = update.settings {
            self.settings.merge(patch);
        }
    }
}

/// Fields supplied when creating a user; id and timestamps are assigned by the store
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub avatar: String,
    pub settings: UserSettings,
    pub battle_stats: BattleStats,
}

/// Partial user update
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub last_login: Option<DateTime<Utc>>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub avatar: Option<String>,
    /// Merged into the stored settings
    pub settings: Option<SettingsPatch>,
}

/// Session record in the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: UserId, token: &str, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            token: token.to_string(),
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// Active while `created_at <= now < expires_at`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Whole seconds left before expiry, zero once expired
    pub fn remaining_secs(&self) -> u64 {
        (self.expires_at - Utc::now()).num_seconds().max(0) as u64
    }
}

/// Quiz table (a named question set)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizTable {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub category: String,
    /// Denormalized; stores recompute it from the question records
    pub question_count: u32,
    pub created_at: DateTime<Utc>,
}

/// One of the three answer options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnswerOption {
    A,
    B,
    C,
}

impl AnswerOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerOption::A => "A",
            AnswerOption::B => "B",
            AnswerOption::C => "C",
        }
    }

    pub fn parse(s: &str) -> QuizResult<Self> {
        match s.trim().to_uppercase().as_str() {
            "A" => Ok(AnswerOption::A),
            "B" => Ok(AnswerOption::B),
            "C" => Ok(AnswerOption::C),
            _ => Err(QuizError::Validation(format!(
                "Answer must be one of A, B or C (got {:?})",
                s
            ))),
        }
    }
}

/// Question record in the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub table_name: String,
    pub question: String,
    pub answer_a: String,
    pub answer_b: String,
    pub answer_c: String,
    pub correct_answer: AnswerOption,
    pub explanation: String,
    pub difficulty: u8,
    pub category: String,
}

/// Overwrite each table's question_count with the number of its questions
pub fn recount_questions(tables: &mut [QuizTable], questions: &[Question]) {
    for table in tables.iter_mut() {
        table.question_count = questions
            .iter()
            .filter(|q| q.table_name == table.name)
            .count() as u32;
    }
}
