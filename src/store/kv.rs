/// Key-value storage backend
///
/// Records are JSON values under prefixed keys, with explicit index keys
/// for username and email lookups:
///
/// - `{prefix}metadata` marks a seeded keyspace
/// - `{prefix}users:next_id` holds the last assigned user id (INCR)
/// - `{prefix}users:all` lists every user id
/// - `{prefix}user:{id}`, `{prefix}user:username:{name}`, `{prefix}user:email:{email}`
/// - `{prefix}session:{token}` expires through the key TTL
/// - `{prefix}quiz:tables`, `{prefix}quiz:questions:{table}`, `{prefix}question:{id}`
use crate::{
    error::{QuizError, QuizResult},
    store::{
        models::recount_questions, NewUser, Question, QuizStore, QuizTable, SeedData, Session,
        User, UserId, UserUpdate,
    },
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Minimal key-value contract the store needs
#[async_trait]
pub trait KeyValue: Send + Sync {
    async fn get(&self, key: &str) -> QuizResult<Option<String>>;

    /// Set a value, with an expiry in seconds when `ttl_secs` is given
    async fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> QuizResult<()>;

    /// Returns whether the key existed
    async fn del(&self, key: &str) -> QuizResult<bool>;

    /// Atomically increment an integer key, returning the new value
    async fn incr(&self, key: &str) -> QuizResult<i64>;

    /// Set only when the key is absent, returning whether it was set
    async fn set_nx(&self, key: &str, value: &str) -> QuizResult<bool>;

    async fn ping(&self) -> QuizResult<()>;
}

/// Redis connection
#[derive(Clone)]
pub struct RedisKeyValue {
    connection: ConnectionManager,
}

impl RedisKeyValue {
    pub async fn connect(redis_url: &str) -> QuizResult<Self> {
        info!("Connecting to Redis at {}", redis_url);

        let client = Client::open(redis_url).map_err(|e| {
            error!("Failed to create Redis client: {}", e);
            QuizError::Internal(format!("Redis client creation failed: {}", e))
        })?;

        let connection = ConnectionManager::new(client).await.map_err(|e| {
            error!("Failed to connect to Redis: {}", e);
            QuizError::Internal(format!("Redis connection failed: {}", e))
        })?;

        info!("Redis connection established");

        Ok(Self { connection })
    }
}

#[async_trait]
impl KeyValue for RedisKeyValue {
    async fn get(&self, key: &str) -> QuizResult<Option<String>> {
        let mut conn = self.connection.clone();
        Ok(conn.get(key).await?)
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> QuizResult<()> {
        let mut conn = self.connection.clone();
        match ttl_secs {
            Some(ttl) => {
                let _: () = conn.set_ex(key, value, ttl.max(1)).await?;
            }
            None => {
                let _: () = conn.set(key, value).await?;
            }
        }
        Ok(())
    }

    async fn del(&self, key: &str) -> QuizResult<bool> {
        let mut conn = self.connection.clone();
        let removed: i64 = conn.del(key).await?;
        Ok(removed > 0)
    }

    async fn incr(&self, key: &str) -> QuizResult<i64> {
        let mut conn = self.connection.clone();
        Ok(conn.incr(key, 1).await?)
    }

    async fn set_nx(&self, key: &str, value: &str) -> QuizResult<bool> {
        let mut conn = self.connection.clone();
        Ok(conn.set_nx(key, value).await?)
    }

    async fn ping(&self) -> QuizResult<()> {
        let mut conn = self.connection.clone();
        let _pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

/// Store over any [`KeyValue`] implementation
pub struct KvStore {
    kv: Arc<dyn KeyValue>,
    prefix: String,
    // Serializes read-modify-write of user records and the user id list
    write_lock: Mutex<()>,
    session_ttl: Duration,
}

impl KvStore {
    /// Open the store, seeding the keyspace on first use
    pub async fn open(
        kv: Arc<dyn KeyValue>,
        prefix: String,
        seed: SeedData,
        session_ttl: Duration,
    ) -> QuizResult<Self> {
        let store = Self {
            kv,
            prefix,
            write_lock: Mutex::new(()),
            session_ttl,
        };

        // Marker goes in only after a complete seed
        let metadata_key = store.key("metadata");
        if store.kv.get(&metadata_key).await?.is_none() {
            store.seed(seed).await?;
            let metadata = serde_json::json!({
                "initialized": true,
                "created_at": Utc::now(),
            });
            store.kv.set(&metadata_key, &metadata.to_string(), None).await?;
            info!(prefix = %store.prefix, "seeded key-value store");
        }

        Ok(store)
    }

    async fn seed(&self, seed: SeedData) -> QuizResult<()> {
        let mut ids = Vec::with_capacity(seed.users.len());
        for user in &seed.users {
            self.put_json(&self.user_key(user.id), user).await?;
            self.kv
                .set(&self.username_key(&user.username), &user.id.to_string(), None)
                .await?;
            if let Some(email) = &user.email {
                self.kv
                    .set(&self.email_key(email), &user.id.to_string(), None)
                    .await?;
            }
            ids.push(user.id);
        }
        self.put_json(&self.key("users:all"), &ids).await?;
        self.kv
            .set(
                &self.key("users:next_id"),
                &seed.max_user_id().to_string(),
                None,
            )
            .await?;

        let mut tables = seed.tables;
        recount_questions(&mut tables, &seed.questions);
        for table in &tables {
            let questions: Vec<&Question> = seed
                .questions
                .iter()
                .filter(|q| q.table_name == table.name)
                .collect();
            self.put_json(&self.questions_key(&table.name), &questions)
                .await?;
        }
        for question in &seed.questions {
            self.put_json(&self.key(&format!("question:{}", question.id)), question)
                .await?;
        }
        self.put_json(&self.key("quiz:tables"), &tables).await?;

        Ok(())
    }

    fn key(&self, suffix: &str) -> String {
        format!("{}{}", self.prefix, suffix)
    }

    fn user_key(&self, id: UserId) -> String {
        self.key(&format!("user:{}", id))
    }

    fn username_key(&self, username: &str) -> String {
        self.key(&format!("user:username:{}", username))
    }

    fn email_key(&self, email: &str) -> String {
        self.key(&format!("user:email:{}", email))
    }

    fn session_key(&self, token: &str) -> String {
        self.key(&format!("session:{}", token))
    }

    fn questions_key(&self, table: &str) -> String {
        self.key(&format!("quiz:questions:{}", table))
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> QuizResult<Option<T>> {
        match self.kv.get(key).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn put_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> QuizResult<()> {
        let json = serde_json::to_string(value)?;
        self.kv.set(key, &json, None).await
    }

    /// Write the record and append its id to the user list
    async fn write_new_user(&self, user: &User) -> QuizResult<()> {
        let _guard = self.write_lock.lock().await;
        self.put_json(&self.user_key(user.id), user).await?;

        let all_key = self.key("users:all");
        let mut ids: Vec<UserId> = self.get_json(&all_key).await?.unwrap_or_default();
        ids.push(user.id);
        self.put_json(&all_key, &ids).await
    }

    async fn user_by_index(&self, index_key: &str) -> QuizResult<Option<User>> {
        match self.kv.get(index_key).await? {
            Some(id) => {
                let id: UserId = id.parse().map_err(|_| {
                    QuizError::Internal(format!("Corrupt user index at {}", index_key))
                })?;
                self.get_json(&self.user_key(id)).await
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl QuizStore for KvStore {
    fn backend_name(&self) -> &'static str {
        "kv"
    }

    async fn find_user_by_id(&self, id: UserId) -> QuizResult<Option<User>> {
        self.get_json(&self.user_key(id)).await
    }

    async fn find_user_by_username(&self, username: &str) -> QuizResult<Option<User>> {
        self.user_by_index(&self.username_key(username)).await
    }

    async fn find_user_by_email(&self, email: &str) -> QuizResult<Option<User>> {
        self.user_by_index(&self.email_key(email)).await
    }

    async fn create_user(&self, new_user: NewUser) -> QuizResult<User> {
        let username_key = self.username_key(&new_user.username);
        if self.kv.get(&username_key).await?.is_some() {
            return Err(QuizError::Conflict("Username already exists".to_string()));
        }
        let email_key = new_user.email.as_deref().map(|e| self.email_key(e));
        if let Some(email_key) = &email_key {
            if self.kv.get(email_key).await?.is_some() {
                return Err(QuizError::Conflict("Email already exists".to_string()));
            }
        }

        let id = self.kv.incr(&self.key("users:next_id")).await?;

        // Claim the indexes; a concurrent writer may have won since the check
        if !self.kv.set_nx(&username_key, &id.to_string()).await? {
            return Err(QuizError::Conflict("Username already exists".to_string()));
        }
        if let Some(email_key) = &email_key {
            if !self.kv.set_nx(email_key, &id.to_string()).await? {
                self.kv.del(&username_key).await?;
                return Err(QuizError::Conflict("Email already exists".to_string()));
            }
        }

        let user = User::from_new(id, new_user);
        if let Err(e) = self.write_new_user(&user).await {
            warn!(user_id = id, error = %e, "rolling back partially created user");
            self.kv.del(&self.user_key(id)).await.ok();
            self.kv.del(&username_key).await.ok();
            if let Some(email_key) = &email_key {
                self.kv.del(email_key).await.ok();
            }
            return Err(e);
        }

        debug!(user_id = id, "created user");
        Ok(user)
    }

    async fn update_user(&self, id: UserId, update: UserUpdate) -> QuizResult<Option<User>> {
        let _guard = self.write_lock.lock().await;
        let key = self.user_key(id);
        let Some(mut user) = self.get_json::<User>(&key).await? else {
            return Ok(None);
        };

        user.apply(update);
        self.put_json(&key, &user).await?;
        Ok(Some(user))
    }

    async fn list_users(&self) -> QuizResult<Vec<User>> {
        let ids: Vec<UserId> = self
            .get_json(&self.key("users:all"))
            .await?
            .unwrap_or_default();

        let mut users = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(user) = self.find_user_by_id(id).await? {
                users.push(user);
            }
        }
        Ok(users)
    }

    async fn create_session(&self, user_id: UserId, token: &str) -> QuizResult<Session> {
        let session = Session::new(user_id, token, self.session_ttl);
        let json = serde_json::to_string(&session)?;
        self.kv
            .set(
                &self.session_key(token),
                &json,
                Some(session.remaining_secs()),
            )
            .await?;
        Ok(session)
    }

    async fn find_session_by_token(&self, token: &str) -> QuizResult<Option<Session>> {
        let key = self.session_key(token);
        match self.get_json::<Session>(&key).await? {
            Some(session) if session.is_expired() => {
                self.kv.del(&key).await?;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn delete_session(&self, token: &str) -> QuizResult<bool> {
        self.kv.del(&self.session_key(token)).await
    }

    async fn delete_expired_sessions(&self) -> QuizResult<u64> {
        // Session keys carry their own TTL
        Ok(0)
    }

    async fn list_quiz_tables(&self) -> QuizResult<Vec<QuizTable>> {
        let mut tables: Vec<QuizTable> = self
            .get_json(&self.key("quiz:tables"))
            .await?
            .unwrap_or_default();
        for table in tables.iter_mut() {
            let questions = self.list_questions_by_table(&table.name).await?;
            table.question_count = questions.len() as u32;
        }
        Ok(tables)
    }

    async fn get_table_by_name(&self, name: &str) -> QuizResult<Option<QuizTable>> {
        Ok(self
            .list_quiz_tables()
            .await?
            .into_iter()
            .find(|t| t.name == name))
    }

    async fn list_questions_by_table(&self, name: &str) -> QuizResult<Vec<Question>> {
        Ok(self
            .get_json(&self.questions_key(name))
            .await?
            .unwrap_or_default())
    }

    async fn find_question_by_id(&self, id: i64) -> QuizResult<Option<Question>> {
        self.get_json(&self.key(&format!("question:{}", id))).await
    }

    async fn ping(&self) -> QuizResult<()> {
        self.kv.ping().await
    }
}
