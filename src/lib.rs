/// Quiz Server - quiz web application backend
///
/// Accounts with opaque session tokens, quiz tables and questions, and an
/// admin dashboard, served over HTTP with axum on one of three storage
/// backends (memory, JSON documents, Redis).

pub mod account;
pub mod admin;
pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod crypto;
pub mod error;
pub mod jobs;
pub mod quiz;
pub mod rate_limit;
pub mod server;
pub mod session;
pub mod store;

pub use config::ServerConfig;
pub use context::AppContext;
pub use error::{QuizError, QuizResult};
