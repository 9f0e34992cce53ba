/// JSON document storage backend
///
/// Three documents hold all state: `users.json`, `sessions.json` and
/// `questions.json`. Every call re-reads the documents it touches and
/// writes back what it changed, so several processes may share one
/// directory (or one GitHub repository) as long as they do not race.
use crate::{
    error::{QuizError, QuizResult},
    store::{
        models::recount_questions, NewUser, Question, QuizStore, QuizTable, SeedData, Session,
        User, UserId, UserUpdate,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::{fs, sync::Mutex};

pub const USERS_DOCUMENT: &str = "users.json";
pub const SESSIONS_DOCUMENT: &str = "sessions.json";
pub const QUESTIONS_DOCUMENT: &str = "questions.json";

/// Where JSON documents are read from and written to
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Read a document, `None` when it does not exist yet
    async fn read(&self, name: &str) -> QuizResult<Option<String>>;

    /// Create or replace a document
    async fn write(&self, name: &str, contents: &str) -> QuizResult<()>;

    /// Human-readable location for logs
    fn describe(&self) -> String;
}

/// Documents in a local directory
#[derive(Clone)]
pub struct LocalDocuments {
    directory: PathBuf,
}

impl LocalDocuments {
    pub fn new(directory: PathBuf) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl DocumentSource for LocalDocuments {
    async fn read(&self, name: &str) -> QuizResult<Option<String>> {
        match fs::read_to_string(self.directory.join(name)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, name: &str, contents: &str) -> QuizResult<()> {
        fs::create_dir_all(&self.directory).await?;

        // Write then rename so readers never see a half-written document
        let path = self.directory.join(name);
        let tmp = self.directory.join(format!(".{}.tmp", name));
        fs::write(&tmp, contents).await?;
        fs::rename(&tmp, &path).await?;

        Ok(())
    }

    fn describe(&self) -> String {
        self.directory.display().to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DocumentMetadata {
    last_updated: DateTime<Utc>,
}

impl Default for DocumentMetadata {
    fn default() -> Self {
        Self {
            last_updated: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct UsersDocument {
    users: Vec<User>,
    next_id: UserId,
    #[serde(default)]
    metadata: DocumentMetadata,
}

impl UsersDocument {
    fn next_user_id(&self) -> UserId {
        let after_max = self.users.iter().map(|u| u.id).max().unwrap_or(0) + 1;
        self.next_id.max(after_max)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SessionsDocument {
    sessions: Vec<Session>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct QuestionsDocument {
    quiz_tables: Vec<QuizTable>,
    questions: Vec<Question>,
}

/// Store backed by JSON documents
pub struct JsonStore {
    source: Arc<dyn DocumentSource>,
    // Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
    session_ttl: Duration,
}

impl JsonStore {
    /// Open the store, writing seed documents for any that are missing
    pub async fn open(
        source: Arc<dyn DocumentSource>,
        seed: SeedData,
        session_ttl: Duration,
    ) -> QuizResult<Self> {
        let store = Self {
            source,
            lock: Mutex::new(()),
            session_ttl,
        };

        if store.source.read(USERS_DOCUMENT).await?.is_none() {
            let next_id = seed.max_user_id() + 1;
            store
                .save(
                    USERS_DOCUMENT,
                    &UsersDocument {
                        users: seed.users,
                        next_id,
                        metadata: DocumentMetadata::default(),
                    },
                )
                .await?;
            tracing::info!(location = %store.source.describe(), "seeded users document");
        }

        if store.source.read(SESSIONS_DOCUMENT).await?.is_none() {
            store
                .save(SESSIONS_DOCUMENT, &SessionsDocument::default())
                .await?;
        }

        if store.source.read(QUESTIONS_DOCUMENT).await?.is_none() {
            store
                .save(
                    QUESTIONS_DOCUMENT,
                    &QuestionsDocument {
                        quiz_tables: seed.tables,
                        questions: seed.questions,
                    },
                )
                .await?;
            tracing::info!(location = %store.source.describe(), "seeded questions document");
        }

        Ok(store)
    }

    async fn load<T: DeserializeOwned + Default>(&self, name: &str) -> QuizResult<T> {
        match self.source.read(name).await? {
            Some(contents) => Ok(serde_json::from_str(&contents)?),
            None => {
                tracing::warn!(document = name, "document missing, using empty default");
                Ok(T::default())
            }
        }
    }

    async fn save<T: Serialize>(&self, name: &str, document: &T) -> QuizResult<()> {
        let contents = serde_json::to_string_pretty(document)?;
        self.source.write(name, &contents).await
    }

    async fn save_users(&self, mut document: UsersDocument) -> QuizResult<()> {
        document.metadata.last_updated = Utc::now();
        self.save(USERS_DOCUMENT, &document).await
    }
}

#[async_trait]
impl QuizStore for JsonStore {
    fn backend_name(&self) -> &'static str {
        "json"
    }

    async fn find_user_by_id(&self, id: UserId) -> QuizResult<Option<User>> {
        let _guard = self.lock.lock().await;
        let document: UsersDocument = self.load(USERS_DOCUMENT).await?;
        Ok(document.users.into_iter().find(|u| u.id == id))
    }

    async fn find_user_by_username(&self, username: &str) -> QuizResult<Option<User>> {
        let _guard = self.lock.lock().await;
        let document: UsersDocument = self.load(USERS_DOCUMENT).await?;
        Ok(document.users.into_iter().find(|u| u.username == username))
    }

    async fn find_user_by_email(&self, email: &str) -> QuizResult<Option<User>> {
        let _guard = self.lock.lock().await;
        let document: UsersDocument = self.load(USERS_DOCUMENT).await?;
        Ok(document
            .users
            .into_iter()
            .find(|u| u.email.as_deref() == Some(email)))
    }

    async fn create_user(&self, new_user: NewUser) -> QuizResult<User> {
        let _guard = self.lock.lock().await;
        let mut document: UsersDocument = self.load(USERS_DOCUMENT).await?;

        if document.users.iter().any(|u| u.username == new_user.username) {
            return Err(QuizError::Conflict("Username already exists".to_string()));
        }
        if let Some(email) = new_user.email.as_deref() {
            if document
                .users
                .iter()
                .any(|u| u.email.as_deref() == Some(email))
            {
                return Err(QuizError::Conflict("Email already exists".to_string()));
            }
        }

        let id = document.next_user_id();
        document.next_id = id + 1;

        let user = User::from_new(id, new_user);
        document.users.push(user.clone());
        self.save_users(document).await?;

        Ok(user)
    }

    async fn update_user(&self, id: UserId, update: UserUpdate) -> QuizResult<Option<User>> {
        let _guard = self.lock.lock().await;
        let mut document: UsersDocument = self.load(USERS_DOCUMENT).await?;

        let updated = match document.users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                user.apply(update);
                user.clone()
            }
            None => return Ok(None),
        };

        self.save_users(document).await?;
        Ok(Some(updated))
    }

    async fn list_users(&self) -> QuizResult<Vec<User>> {
        let _guard = self.lock.lock().await;
        let document: UsersDocument = self.load(USERS_DOCUMENT).await?;
        Ok(document.users)
    }

    async fn create_session(&self, user_id: UserId, token: &str) -> QuizResult<Session> {
        let _guard = self.lock.lock().await;
        let mut document: SessionsDocument = self.load(SESSIONS_DOCUMENT).await?;

        let session = Session::new(user_id, token, self.session_ttl);
        document.sessions.retain(|s| s.token != token);
        document.sessions.push(session.clone());
        self.save(SESSIONS_DOCUMENT, &document).await?;

        Ok(session)
    }

    async fn find_session_by_token(&self, token: &str) -> QuizResult<Option<Session>> {
        let _guard = self.lock.lock().await;
        let mut document: SessionsDocument = self.load(SESSIONS_DOCUMENT).await?;

        let Some(index) = document.sessions.iter().position(|s| s.token == token) else {
            return Ok(None);
        };

        if document.sessions[index].is_expired() {
            document.sessions.remove(index);
            self.save(SESSIONS_DOCUMENT, &document).await?;
            return Ok(None);
        }

        Ok(Some(document.sessions.swap_remove(index)))
    }

    async fn delete_session(&self, token: &str) -> QuizResult<bool> {
        let _guard = self.lock.lock().await;
        let mut document: SessionsDocument = self.load(SESSIONS_DOCUMENT).await?;

        let before = document.sessions.len();
        document.sessions.retain(|s| s.token != token);
        if document.sessions.len() == before {
            return Ok(false);
        }

        self.save(SESSIONS_DOCUMENT, &document).await?;
        Ok(true)
    }

    async fn delete_expired_sessions(&self) -> QuizResult<u64> {
        let _guard = self.lock.lock().await;
        let mut document: SessionsDocument = self.load(SESSIONS_DOCUMENT).await?;

        let now = Utc::now();
        let before = document.sessions.len();
        document.sessions.retain(|s| !s.is_expired_at(now));
        let removed = (before - document.sessions.len()) as u64;

        if removed > 0 {
            self.save(SESSIONS_DOCUMENT, &document).await?;
        }
        Ok(removed)
    }

    async fn list_quiz_tables(&self) -> QuizResult<Vec<QuizTable>> {
        let _guard = self.lock.lock().await;
        let mut document: QuestionsDocument = self.load(QUESTIONS_DOCUMENT).await?;
        recount_questions(&mut document.quiz_tables, &document.questions);
        Ok(document.quiz_tables)
    }

    async fn get_table_by_name(&self, name: &str) -> QuizResult<Option<QuizTable>> {
        let _guard = self.lock.lock().await;
        let mut document: QuestionsDocument = self.load(QUESTIONS_DOCUMENT).await?;
        document.quiz_tables.retain(|t| t.name == name);
        recount_questions(&mut document.quiz_tables, &document.questions);
        Ok(document.quiz_tables.into_iter().next())
    }

    async fn list_questions_by_table(&self, name: &str) -> QuizResult<Vec<Question>> {
        let _guard = self.lock.lock().await;
        let document: QuestionsDocument = self.load(QUESTIONS_DOCUMENT).await?;
        Ok(document
            .questions
            .into_iter()
            .filter(|q| q.table_name == name)
            .collect())
    }

    async fn find_question_by_id(&self, id: i64) -> QuizResult<Option<Question>> {
        let _guard = self.lock.lock().await;
        let document: QuestionsDocument = self.load(QUESTIONS_DOCUMENT).await?;
        Ok(document.questions.into_iter().find(|q| q.id == id))
    }

    async fn ping(&self) -> QuizResult<()> {
        self.source.read(USERS_DOCUMENT).await.map(|_| ())
    }
}
