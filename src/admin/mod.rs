/// Admin dashboard services
///
/// Every operation here assumes the caller has already been resolved to an
/// admin user (see `auth::AdminAuthContext`).
use crate::{
    account::AdminUserView,
    error::{QuizError, QuizResult},
    store::{QuizStore, Role, User, UserId, UserUpdate},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// User counts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStatistics {
    pub total: usize,
    pub active: usize,
    pub admins: usize,
    pub students: usize,
}

/// Quiz content counts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizStatistics {
    pub tables: usize,
    pub total_questions: u64,
    pub categories: Vec<String>,
}

/// Process facts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStatistics {
    pub uptime_seconds: u64,
    pub storage_backend: String,
    pub version: String,
}

/// Admin statistics payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statistics {
    pub users: UserStatistics,
    pub quiz: QuizStatistics,
    pub system: SystemStatistics,
}

/// Admin system status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub status: String,
    pub storage_backend: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

/// Role or active-flag change requested by an admin
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminUserUpdate {
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// Admin service
pub struct AdminService {
    store: Arc<dyn QuizStore>,
    storage_backend: String,
    version: String,
    started_at: Instant,
}

impl AdminService {
    pub fn new(store: Arc<dyn QuizStore>, storage_backend: &str, version: &str) -> Self {
        Self {
            store,
            storage_backend: storage_backend.to_string(),
            version: version.to_string(),
            started_at: Instant::now(),
        }
    }

    pub async fn list_users(&self) -> QuizResult<Vec<AdminUserView>> {
        let users = self.store.list_users().await?;
        Ok(users.iter().map(AdminUserView::from).collect())
    }

    pub async fn statistics(&self) -> QuizResult<Statistics> {
        let users = self.store.list_users().await?;
        let tables = self.store.list_quiz_tables().await?;

        let categories: BTreeSet<String> = tables.iter().map(|t| t.category.clone()).collect();

        Ok(Statistics {
            users: UserStatistics {
                total: users.len(),
                active: users.iter().filter(|u| u.is_active).count(),
                admins: users.iter().filter(|u| u.role == Role::Admin).count(),
                students: users.iter().filter(|u| u.role == Role::Student).count(),
            },
            quiz: QuizStatistics {
                tables: tables.len(),
                total_questions: tables.iter().map(|t| t.question_count as u64).sum(),
                categories: categories.into_iter().collect(),
            },
            system: SystemStatistics {
                uptime_seconds: self.started_at.elapsed().as_secs(),
                storage_backend: self.storage_backend.clone(),
                version: self.version.clone(),
            },
        })
    }

    /// Change a user's role or active flag
    ///
    /// Accounts are never deleted; deactivation flips `is_active`. An admin
    /// cannot demote or deactivate their own account.
    pub async fn update_user(
        &self,
        admin: &User,
        user_id: UserId,
        update: AdminUserUpdate,
    ) -> QuizResult<AdminUserView> {
        if update.role.is_none() && update.is_active.is_none() {
            return Err(QuizError::Validation(
                "Nothing to update: provide role or is_active".to_string(),
            ));
        }

        if admin.id == user_id
            && (update.role == Some(Role::Student) || update.is_active == Some(false))
        {
            return Err(QuizError::Validation(
                "Admins cannot demote or deactivate themselves".to_string(),
            ));
        }

        let user = self
            .store
            .update_user(
                user_id,
                UserUpdate {
                    role: update.role,
                    is_active: update.is_active,
                    ..Default::default()
                },
            )
            .await?
            .ok_or_else(|| QuizError::NotFound("User not found".to_string()))?;

        info!(
            admin_id = admin.id,
            user_id,
            role = user.role.as_str(),
            is_active = user.is_active,
            "user updated by admin"
        );

        Ok(AdminUserView::from(&user))
    }

    pub async fn system_info(&self) -> SystemInfo {
        let status = match self.store.ping().await {
            Ok(()) => "healthy",
            Err(_) => "degraded",
        };

        SystemInfo {
            status: status.to_string(),
            storage_backend: self.storage_backend.clone(),
            version: self.version.clone(),
            timestamp: Utc::now(),
        }
    }
}
