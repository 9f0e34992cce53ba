use crate::config::JobsConfig;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info};

pub mod tasks;

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<crate::context::AppContext>,
    config: JobsConfig,
}

impl JobScheduler {
    pub fn new(context: Arc<crate::context::AppContext>) -> Self {
        let config = context.config.jobs.clone();
        Self { context, config }
    }

    /// Start all enabled background jobs
    pub fn start(self: Arc<Self>) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        if self.config.session_sweep_enabled {
            handles.push(tokio::spawn(Self::expired_session_cleanup_job(Arc::clone(
                &self,
            ))));
        }

        info!(jobs = handles.len(), "Background jobs started");
        handles
    }

    /// Sweep expired sessions on a fixed interval
    async fn expired_session_cleanup_job(scheduler: Arc<Self>) {
        let period = Duration::from_secs(scheduler.config.session_sweep_interval_secs.max(1));
        let mut interval = interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            match tasks::cleanup_expired_sessions(&scheduler.context).await {
                Ok(count) => {
                    if count > 0 {
                        info!("Cleaned up {} expired sessions", count);
                    }
                }
                Err(e) => error!("Failed to cleanup expired sessions: {}", e),
            }
        }
    }
}
