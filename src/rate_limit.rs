/// Rate Limiting System
///
/// Process-wide limits on the credential endpoints. Login and register
/// each get their own per-minute budget.
use crate::{
    config::RateLimitConfig,
    error::{QuizError, QuizResult},
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorLimiter,
};
use std::{num::NonZeroU32, sync::Arc, time::Duration};

type DirectLimiter = GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Rate limiter manager
#[derive(Clone)]
pub struct RateLimiter {
    login: Option<Arc<DirectLimiter>>,
    register: Option<Arc<DirectLimiter>>,
}

fn per_minute(requests: u32, fallback: NonZeroU32) -> Arc<DirectLimiter> {
    let quota = Quota::per_minute(NonZeroU32::new(requests).unwrap_or(fallback));
    Arc::new(GovernorLimiter::direct(quota))
}

fn check(limiter: &Option<Arc<DirectLimiter>>) -> QuizResult<()> {
    match limiter {
        Some(limiter) if limiter.check().is_err() => {
            tracing::warn!("rate limit exceeded");
            Err(QuizError::RateLimitExceeded {
                retry_after: Duration::from_secs(60),
            })
        }
        _ => Ok(()),
    }
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }

        Self {
            login: Some(per_minute(config.login_per_minute, NonZeroU32::MIN)),
            register: Some(per_minute(config.register_per_minute, NonZeroU32::MIN)),
        }
    }

    /// Limiter that never rejects
    pub fn disabled() -> Self {
        Self {
            login: None,
            register: None,
        }
    }

    pub fn check_login(&self) -> QuizResult<()> {
        check(&self.login)
    }

    pub fn check_register(&self) -> QuizResult<()> {
        check(&self.register)
    }
}
