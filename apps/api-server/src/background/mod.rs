//! Background jobs.

pub mod scheduler;

use std::sync::Arc;

use counsel_infra::InMemoryRateLimiter;

pub use scheduler::{Scheduler, SchedulerConfig};

const RATE_LIMIT_SWEEP_JOB: &str = "rate-limit-sweep";

/// Start the scheduler with the rate limit sweep registered.
///
/// Returns `None` when counters are not kept in this process.
pub async fn start(
    config: SchedulerConfig,
    limiter: Option<Arc<InMemoryRateLimiter>>,
) -> anyhow::Result<Option<Scheduler>> {
    let Some(limiter) = limiter else {
        tracing::info!("No local rate limit counters, sweep not scheduled");
        return Ok(None);
    };

    let mut scheduler = Scheduler::new(&config).await?;
    scheduler
        .add_cron(RATE_LIMIT_SWEEP_JOB, &config.sweep_schedule, move || {
            let limiter = limiter.clone();
            async move {
                let removed = limiter.sweep_expired().await;
                if removed > 0 {
                    tracing::info!(removed, "Expired rate limit counters swept");
                }
            }
        })
        .await?;
    scheduler.start().await?;

    Ok(Some(scheduler))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disabled(schedule: &str) -> SchedulerConfig {
        SchedulerConfig {
            enabled: false,
            sweep_schedule: schedule.to_string(),
        }
    }

    #[tokio::test]
    async fn test_nothing_scheduled_without_local_counters() {
        let scheduler = start(disabled("0 * * * * *"), None).await.unwrap();
        assert!(scheduler.is_none());
    }

    #[tokio::test]
    async fn test_sweep_registered_for_local_counters() {
        let limiter = Arc::new(InMemoryRateLimiter::new());
        let scheduler = start(disabled("0 * * * * *"), Some(limiter))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(scheduler.job_names().collect::<Vec<_>>(), vec![RATE_LIMIT_SWEEP_JOB]);
    }

    #[tokio::test]
    async fn test_invalid_schedule_is_rejected() {
        let limiter = Arc::new(InMemoryRateLimiter::new());
        assert!(start(disabled("every minute"), Some(limiter)).await.is_err());
    }
}
