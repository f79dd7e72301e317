//! Scheduled background tasks using tokio-cron-scheduler.
//!
//! Expired cache entries are only dropped lazily on read, so a durable cache
//! would grow without bound. An hourly sweep keeps it trimmed.
//!
//! ```text
//! Scheduler (every hour)
//!     │
//!     └─► coordinator.sweep_cache()
//! ```

use std::sync::Arc;

use anyhow::Result;
use provider_fallback::FallbackCoordinator;
use tokio_cron_scheduler::{Job, JobScheduler};

/// Start all scheduled tasks
pub async fn start_scheduler(coordinator: Arc<FallbackCoordinator>) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    // Cache sweep - runs every hour
    let sweep_coordinator = coordinator.clone();
    let sweep_job = Job::new_async("0 0 * * * *", move |_uuid, _lock| {
        let coordinator = sweep_coordinator.clone();
        Box::pin(async move {
            run_cache_sweep(&coordinator).await;
        })
    })?;

    scheduler.add(sweep_job).await?;
    scheduler.start().await?;

    tracing::info!("Scheduled tasks started (cache sweep every hour)");
    Ok(scheduler)
}

/// Drop expired cache entries.
async fn run_cache_sweep(coordinator: &FallbackCoordinator) {
    if coordinator.is_shut_down() {
        return;
    }
    let removed = coordinator.sweep_cache().await;
    tracing::info!(removed, "Periodic cache sweep complete");
}
