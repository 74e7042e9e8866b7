//! Cron-style job scheduler using tokio-cron-scheduler.

use std::future::Future;

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use uuid::Uuid;

const DEFAULT_SWEEP_SCHEDULE: &str = "0 * * * * *";

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Jobs are registered but never fire when false.
    pub enabled: bool,
    /// Cron expression (six fields, seconds first) for the rate limit sweep.
    pub sweep_schedule: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sweep_schedule: DEFAULT_SWEEP_SCHEDULE.to_string(),
        }
    }
}

impl SchedulerConfig {
    /// Read `SCHEDULER_ENABLED` and `RATE_LIMIT_SWEEP_CRON`.
    pub fn from_env() -> Self {
        let enabled = match std::env::var("SCHEDULER_ENABLED") {
            Ok(v) => !matches!(v.trim().to_lowercase().as_str(), "false" | "0" | "off"),
            Err(_) => true,
        };
        Self {
            enabled,
            sweep_schedule: std::env::var("RATE_LIMIT_SWEEP_CRON")
                .unwrap_or_else(|_| DEFAULT_SWEEP_SCHEDULE.to_string()),
        }
    }
}

/// Named cron jobs on a shared `JobScheduler`.
pub struct Scheduler {
    inner: JobScheduler,
    enabled: bool,
    jobs: Vec<(&'static str, Uuid)>,
}

impl Scheduler {
    pub async fn new(config: &SchedulerConfig) -> Result<Self, JobSchedulerError> {
        Ok(Self {
            inner: JobScheduler::new().await?,
            enabled: config.enabled,
            jobs: Vec::new(),
        })
    }

    /// Register `task` to run on `schedule`.
    pub async fn add_cron<F, Fut>(
        &mut self,
        name: &'static str,
        schedule: &str,
        task: F,
    ) -> Result<Uuid, JobSchedulerError>
    where
        F: Fn() -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let job = Job::new_async(schedule, move |_id, _lock| {
            let task = task.clone();
            Box::pin(async move {
                tracing::debug!(job = name, "Cron job firing");
                task().await;
            })
        })?;

        let id = self.inner.add(job).await?;
        self.jobs.push((name, id));
        tracing::info!(job = name, schedule = %schedule, job_id = %id, "Cron job registered");
        Ok(id)
    }

    /// Names of the registered jobs.
    pub fn job_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.jobs.iter().map(|(name, _)| *name)
    }

    pub async fn start(&self) -> Result<(), JobSchedulerError> {
        let jobs: Vec<_> = self.job_names().collect();
        if !self.enabled {
            tracing::info!(?jobs, "Scheduler disabled, jobs will not fire");
            return Ok(());
        }

        self.inner.start().await?;
        tracing::info!(?jobs, "Scheduler started");
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<(), JobSchedulerError> {
        self.inner.shutdown().await?;
        tracing::info!("Scheduler stopped");
        Ok(())
    }
}
