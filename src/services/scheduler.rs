use anyhow::Result;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::services::credentials::CredentialService;

/// Periodic maintenance: purges reset tokens that are used or expired.
pub struct Scheduler {
    credentials: Arc<CredentialService>,
    cron_expression: String,
}

impl Scheduler {
    pub fn new(credentials: Arc<CredentialService>, cron_expression: impl Into<String>) -> Self {
        Self {
            credentials,
            cron_expression: cron_expression.into(),
        }
    }

    /// Starts the job scheduler. Keep the returned handle alive and call
    /// `shutdown` on it when the server stops.
    pub async fn start(&self) -> Result<JobScheduler> {
        let sched = JobScheduler::new().await?;

        let credentials = Arc::clone(&self.credentials);
        let job = Job::new_async(self.cron_expression.as_str(), move |_uuid, _lock| {
            let credentials = Arc::clone(&credentials);
            Box::pin(async move {
                run_token_cleanup(&credentials).await;
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;

        info!("Token cleanup scheduled: {}", self.cron_expression);
        Ok(sched)
    }
}

pub async fn run_token_cleanup(credentials: &CredentialService) {
    let start = std::time::Instant::now();
    info!(event = "job_started", job_name = "purge_reset_tokens", "Purging stale reset tokens");

    match credentials.purge_stale_tokens().await {
        Ok(removed) => info!(
            event = "job_finished",
            job_name = "purge_reset_tokens",
            removed,
            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Reset token purge finished"
        ),
        Err(e) => error!(
            event = "job_failed",
            job_name = "purge_reset_tokens",
            error = %e,
            "Reset token purge failed"
        ),
    }
}
