//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! recurring stock sync when a schedule is configured.

use std::sync::Arc;
use std::time::Duration;

use stocklink_core::AppConfig;
use stocklink_sync::{ScheduledRun, SyncOrchestrator};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process. Dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// the cron expression is rejected, or the scheduler fails to start.
pub async fn build_scheduler(
    sync: SyncOrchestrator,
    config: Arc<AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    match config.cron_schedule.as_deref() {
        Some(schedule) if !config.cron_shop_ids.is_empty() => {
            register_stock_sync_job(&scheduler, schedule, sync, Arc::clone(&config)).await?;
        }
        Some(_) => tracing::warn!("cron schedule set but no shop ids configured; job disabled"),
        None => tracing::info!("no cron schedule configured; scheduled sync disabled"),
    }

    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_stock_sync_job(
    scheduler: &JobScheduler,
    schedule: &str,
    sync: SyncOrchestrator,
    config: Arc<AppConfig>,
) -> Result<(), JobSchedulerError> {
    let sync = Arc::new(sync);

    let job = Job::new_async(schedule, move |_uuid, _lock| {
        let sync = Arc::clone(&sync);
        let config = Arc::clone(&config);

        Box::pin(async move {
            tracing::info!(shops = config.cron_shop_ids.len(), "scheduler: starting stock sync");
            run_stock_sync_job(&sync, &config).await;
            tracing::info!("scheduler: stock sync complete");
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(schedule, "scheduled stock sync registered");
    Ok(())
}

/// One scheduled pass over every configured shop. A failing shop is logged
/// and does not stop the others.
async fn run_stock_sync_job(sync: &SyncOrchestrator, config: &AppConfig) {
    let delay = Duration::from_millis(config.cron_delay_ms);
    let max_products = config.cron_max_products.max(1);
    for &shop_id in &config.cron_shop_ids {
        match sync
            .run_scheduled(shop_id, max_products, delay)
            .await
        {
            Ok(ScheduledRun::NoValidToken) => {
                tracing::warn!(shop_id, "scheduler: no valid token, shop skipped");
            }
            Ok(ScheduledRun::Completed { summary, next_run }) => {
                tracing::info!(
                    shop_id,
                    processed = summary.processed,
                    successful = summary.successful,
                    failed = summary.failed,
                    skipped = summary.skipped,
                    ?next_run,
                    "scheduler: shop synced"
                );
            }
            Err(e) => {
                tracing::error!(shop_id, error = %e, "scheduler: shop sync failed");
            }
        }
    }
}
