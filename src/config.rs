/// Configuration management for the quiz server
use crate::error::{QuizError, QuizResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub jobs: JobsConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackendConfig,
}

/// Which storage backend serves users, sessions and questions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StorageBackendConfig {
    /// Volatile process memory, seeded at startup
    Memory,
    /// JSON documents re-read and rewritten on every call
    Json {
        data_directory: PathBuf,
        github: Option<GithubStorageConfig>,
    },
    /// Redis with explicit secondary-index keys
    Kv {
        redis_url: String,
        key_prefix: String,
    },
}

impl StorageBackendConfig {
    /// Short name used in logs and the admin system endpoint
    pub fn name(&self) -> &'static str {
        match self {
            StorageBackendConfig::Memory => "memory",
            StorageBackendConfig::Json { github: None, .. } => "json",
            StorageBackendConfig::Json { github: Some(_), .. } => "json+github",
            StorageBackendConfig::Kv { .. } => "kv",
        }
    }
}

/// GitHub repository used as the JSON document store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubStorageConfig {
    pub owner: String,
    pub repo: String,
    pub branch: Option<String>,
    #[serde(skip_serializing)]
    pub token: String,
    /// Path prefix inside the repository, e.g. "data"
    pub path_prefix: String,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Application-wide PBKDF2 salt (no per-user salt)
    pub password_salt: String,
    pub password_iterations: u32,
    pub session_ttl_hours: i64,
    #[serde(skip_serializing)]
    pub seed_admin_password: String,
    #[serde(skip_serializing)]
    pub seed_student_password: String,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub login_per_minute: u32,
    pub register_per_minute: u32,
}

/// Background job configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    pub session_sweep_enabled: bool,
    pub session_sweep_interval_secs: u64,
}

/// Longest accepted session lifetime (one year)
pub const MAX_SESSION_TTL_HOURS: i64 = 8760;

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "quiz_server=debug,tower_http=debug";

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directives
    pub level: String,
    pub json: bool,
}

impl LoggingConfig {
    /// Filter built from `level`, or the default directives when it does not parse
    pub fn env_filter(&self) -> tracing_subscriber::EnvFilter {
        tracing_subscriber::EnvFilter::try_new(&self.level)
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> QuizResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("QUIZ_HOSTNAME").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("QUIZ_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| QuizError::Validation("Invalid port number".to_string()))?;
        let version =
            env::var("QUIZ_VERSION").unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());

        let backend = match env::var("QUIZ_STORAGE_BACKEND")
            .unwrap_or_else(|_| "memory".to_string())
            .to_lowercase()
            .as_str()
        {
            "memory" => StorageBackendConfig::Memory,
            "json" => {
                let data_directory: PathBuf = env::var("QUIZ_DATA_DIRECTORY")
                    .unwrap_or_else(|_| "./data".to_string())
                    .into();

                let github = if env::var("QUIZ_GITHUB_STORAGE").as_deref() == Ok("1") {
                    Some(GithubStorageConfig {
                        owner: env::var("QUIZ_GITHUB_OWNER").map_err(|_| {
                            QuizError::Validation("GitHub owner required".to_string())
                        })?,
                        repo: env::var("QUIZ_GITHUB_REPO").map_err(|_| {
                            QuizError::Validation("GitHub repository required".to_string())
                        })?,
                        branch: env::var("QUIZ_GITHUB_BRANCH").ok(),
                        token: env::var("QUIZ_GITHUB_TOKEN").map_err(|_| {
                            QuizError::Validation("GitHub token required".to_string())
                        })?,
                        path_prefix: env::var("QUIZ_GITHUB_PATH_PREFIX")
                            .unwrap_or_else(|_| "data".to_string()),
                    })
                } else {
                    None
                };

                StorageBackendConfig::Json {
                    data_directory,
                    github,
                }
            }
            "kv" => StorageBackendConfig::Kv {
                redis_url: env::var("QUIZ_REDIS_URL").unwrap_or_default(),
                key_prefix: env::var("QUIZ_KV_KEY_PREFIX").unwrap_or_else(|_| "quiz:".to_string()),
            },
            other => {
                return Err(QuizError::Validation(format!(
                    "Unknown storage backend: {}",
                    other
                )))
            }
        };

        let password_salt =
            env::var("QUIZ_PASSWORD_SALT").unwrap_or_else(|_| "quiz-salt-2025".to_string());
        let password_iterations = env_parse("QUIZ_PASSWORD_ITERATIONS", 10_000u32);
        let session_ttl_hours = env_parse("QUIZ_SESSION_TTL_HOURS", 24i64);
        let seed_admin_password =
            env::var("QUIZ_SEED_ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string());
        let seed_student_password =
            env::var("QUIZ_SEED_STUDENT_PASSWORD").unwrap_or_else(|_| "student123".to_string());

        let rate_limit = RateLimitConfig {
            enabled: env_parse("QUIZ_RATE_LIMITS_ENABLED", true),
            login_per_minute: env_parse("QUIZ_LOGIN_PER_MINUTE", 10u32),
            register_per_minute: env_parse("QUIZ_REGISTER_PER_MINUTE", 5u32),
        };

        let jobs = JobsConfig {
            session_sweep_enabled: env_parse("QUIZ_SESSION_SWEEP_ENABLED", true),
            session_sweep_interval_secs: env_parse("QUIZ_SESSION_SWEEP_INTERVAL_SECS", 3600u64),
        };

        let level = env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());
        let json = env::var("QUIZ_LOG_FORMAT")
            .map(|f| f.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
            },
            storage: StorageConfig { backend },
            authentication: AuthConfig {
                password_salt,
                password_iterations,
                session_ttl_hours,
                seed_admin_password,
                seed_student_password,
            },
            rate_limit,
            jobs,
            logging: LoggingConfig { level, json },
        })
    }

    /// In-memory configuration without rate limits or background sweeps
    pub fn for_testing() -> Self {
        ServerConfig {
            service: ServiceConfig {
                hostname: "127.0.0.1".to_string(),
                port: 0,
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            storage: StorageConfig {
                backend: StorageBackendConfig::Memory,
            },
            authentication: AuthConfig {
                password_salt: "quiz-salt-2025".to_string(),
                password_iterations: 10_000,
                session_ttl_hours: 24,
                seed_admin_password: "admin123".to_string(),
                seed_student_password: "student123".to_string(),
            },
            rate_limit: RateLimitConfig {
                enabled: false,
                login_per_minute: 10,
                register_per_minute: 5,
            },
            jobs: JobsConfig {
                session_sweep_enabled: false,
                session_sweep_interval_secs: 3600,
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
                json: false,
            },
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> QuizResult<()> {
        if self.service.hostname.is_empty() {
            return Err(QuizError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.authentication.password_salt.is_empty() {
            return Err(QuizError::Validation(
                "Password salt cannot be empty".to_string(),
            ));
        }

        if self.authentication.password_iterations == 0 {
            return Err(QuizError::Validation(
                "Password iterations must be positive".to_string(),
            ));
        }

        if self.authentication.session_ttl_hours <= 0 {
            return Err(QuizError::Validation(
                "Session TTL must be positive".to_string(),
            ));
        }

        if self.authentication.session_ttl_hours > MAX_SESSION_TTL_HOURS {
            return Err(QuizError::Validation(format!(
                "Session TTL cannot exceed {} hours",
                MAX_SESSION_TTL_HOURS
            )));
        }

        if let StorageBackendConfig::Kv { redis_url, .. } = &self.storage.backend {
            if redis_url.is_empty() {
                return Err(QuizError::Validation(
                    "QUIZ_REDIS_URL is required for the kv backend".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Session lifetime as a chrono duration
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.authentication.session_ttl_hours)
    }
}
