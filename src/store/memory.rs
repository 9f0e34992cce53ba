/// In-memory storage backend
use crate::{
    error::{QuizError, QuizResult},
    store::{
        models::recount_questions, NewUser, Question, QuizStore, QuizTable, SeedData, Session,
        User, UserId, UserUpdate,
    },
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug)]
struct MemoryData {
    users: Vec<User>,
    sessions: HashMap<String, Session>,
    tables: Vec<QuizTable>,
    questions: Vec<Question>,
    next_user_id: UserId,
}

/// Volatile store living for the lifetime of the process
///
/// Every collection sits behind one lock, so read-modify-write sequences
/// such as "check username then insert" are atomic within the process.
pub struct MemoryStore {
    data: RwLock<MemoryData>,
    session_ttl: Duration,
}

impl MemoryStore {
    pub fn new(seed: SeedData, session_ttl: Duration) -> Self {
        let next_user_id = seed.max_user_id() + 1;
        Self {
            data: RwLock::new(MemoryData {
                users: seed.users,
                sessions: HashMap::new(),
                tables: seed.tables,
                questions: seed.questions,
                next_user_id,
            }),
            session_ttl,
        }
    }
}

#[async_trait]
impl QuizStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn find_user_by_id(&self, id: UserId) -> QuizResult<Option<User>> {
        let data = self.data.read().await;
        Ok(data.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> QuizResult<Option<User>> {
        let data = self.data.read().await;
        Ok(data.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> QuizResult<Option<User>> {
        let data = self.data.read().await;
        Ok(data
            .users
            .iter()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned())
    }

    async fn create_user(&self, new_user: NewUser) -> QuizResult<User> {
        let mut data = self.data.write().await;

        if data.users.iter().any(|u| u.username == new_user.username) {
            return Err(QuizError::Conflict("Username already exists".to_string()));
        }
        if let Some(email) = new_user.email.as_deref() {
            if data.users.iter().any(|u| u.email.as_deref() == Some(email)) {
                return Err(QuizError::Conflict("Email already exists".to_string()));
            }
        }

        let id = data.next_user_id;
        data.next_user_id += 1;

        let user = User::from_new(id, new_user);
        data.users.push(user.clone());

        Ok(user)
    }

    async fn update_user(&self, id: UserId, update: UserUpdate) -> QuizResult<Option<User>> {
        let mut data = self.data.write().await;
        Ok(data.users.iter_mut().find(|u| u.id == id).map(|user| {
            user.apply(update);
            user.clone()
        }))
    }

    async fn list_users(&self) -> QuizResult<Vec<User>> {
        Ok(self.data.read().await.users.clone())
    }

    async fn create_session(&self, user_id: UserId, token: &str) -> QuizResult<Session> {
        let session = Session::new(user_id, token, self.session_ttl);
        self.data
            .write()
            .await
            .sessions
            .insert(token.to_string(), session.clone());
        Ok(session)
    }

    async fn find_session_by_token(&self, token: &str) -> QuizResult<Option<Session>> {
        let mut data = self.data.write().await;

        match data.sessions.get(token) {
            Some(session) if session.is_expired() => {
                data.sessions.remove(token);
                Ok(None)
            }
            Some(session) => Ok(Some(session.clone())),
            None => Ok(None),
        }
    }

    async fn delete_session(&self, token: &str) -> QuizResult<bool> {
        Ok(self.data.write().await.sessions.remove(token).is_some())
    }

    async fn delete_expired_sessions(&self) -> QuizResult<u64> {
        let now = Utc::now();
        let mut data = self.data.write().await;
        let before = data.sessions.len();
        data.sessions.retain(|_, s| !s.is_expired_at(now));
        Ok((before - data.sessions.len()) as u64)
    }

    async fn list_quiz_tables(&self) -> QuizResult<Vec<QuizTable>> {
        let data = self.data.read().await;
        let mut tables = data.tables.clone();
        recount_questions(&mut tables, &data.questions);
        Ok(tables)
    }

    async fn get_table_by_name(&self, name: &str) -> QuizResult<Option<QuizTable>> {
        let data = self.data.read().await;
        let mut table: Vec<QuizTable> = data
            .tables
            .iter()
            .filter(|t| t.name == name)
            .cloned()
            .collect();
        recount_questions(&mut table, &data.questions);
        Ok(table.into_iter().next())
    }

    async fn list_questions_by_table(&self, name: &str) -> QuizResult<Vec<Question>> {
        let data = self.data.read().await;
        Ok(data
            .questions
            .iter()
            .filter(|q| q.table_name == name)
            .cloned()
            .collect())
    }

    async fn find_question_by_id(&self, id: i64) -> QuizResult<Option<Question>> {
        let data = self.data.read().await;
        Ok(data.questions.iter().find(|q| q.id == id).cloned())
    }

    async fn ping(&self) -> QuizResult<()> {
        Ok(())
    }
}
