//! Weekday trigger for the digest pipeline.
//!
//! Each trigger runs the pipeline on the blocking pool. A failed or panicking
//! run is logged and dropped; the scheduler keeps waiting for the next trigger.
//! A trigger that fires while a run is still going is skipped.

use anyhow::{Context, Result};
use chrono::Local;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::pipeline::RunOutcome;

pub type RunFn = dyn Fn() -> Result<RunOutcome> + Send + Sync;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerResult {
    Completed,
    Failed,
    Skipped,
}

pub struct DigestScheduler {
    run: Arc<RunFn>,
    running: Mutex<()>,
}

impl DigestScheduler {
    pub fn new(run: Arc<RunFn>) -> Self {
        Self {
            run,
            running: Mutex::new(()),
        }
    }

    pub async fn trigger(&self) -> TriggerResult {
        let Ok(_guard) = self.running.try_lock() else {
            warn!("Previous digest run still in progress, skipping this trigger");
            return TriggerResult::Skipped;
        };

        let run = Arc::clone(&self.run);
        match tokio::task::spawn_blocking(move || run()).await {
            Ok(Ok(outcome)) => {
                match outcome {
                    RunOutcome::Sent { jobs } => info!(jobs, "Scheduled run sent digest"),
                    RunOutcome::Rendered { jobs, .. } => info!(jobs, "Scheduled run rendered digest"),
                    RunOutcome::NoListings | RunOutcome::NoMatches => {
                        info!(?outcome, "Scheduled run finished without a digest")
                    }
                }
                TriggerResult::Completed
            }
            Ok(Err(e)) => {
                error!("Agent failed: {:#}", e);
                TriggerResult::Failed
            }
            Err(e) => {
                error!("Agent run aborted: {}", e);
                TriggerResult::Failed
            }
        }
    }

    /// Registers the cron trigger (local time) and starts the scheduler.
    pub async fn start(self: Arc<Self>, schedule: &str) -> Result<JobScheduler> {
        let this = Arc::clone(&self);
        let job = Job::new_async_tz(schedule, Local, move |_uuid, _lock| {
            let this = Arc::clone(&this);
            Box::pin(async move {
                this.trigger().await;
            })
        })
        .with_context(|| format!("Invalid digest schedule '{schedule}'"))?;

        let scheduler = JobScheduler::new()
            .await
            .context("Failed to create job scheduler")?;
        scheduler.add(job).await?;
        scheduler.start().await?;

        info!(schedule, "Scheduler started, waiting for the next trigger");
        Ok(scheduler)
    }
}

/// Runs the scheduler until Ctrl-C.
pub async fn run_forever(scheduler: Arc<DigestScheduler>, schedule: &str) -> Result<()> {
    let mut jobs = scheduler.start(schedule).await?;
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutting down scheduler");
    jobs.shutdown().await?;
    Ok(())
}
