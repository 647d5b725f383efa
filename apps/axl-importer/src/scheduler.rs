//! Service mode: periodic call updates and hourly directory syncs.

use std::time::Duration;

use chrono::{Local, Timelike};
use tokio::signal;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use axl_store::{DirectoryStore, MaintenanceStore};

use crate::sync::SyncJob;

const DIRECTORY_TICK: Duration = Duration::from_secs(60 * 60);

/// Whether `hour` (0-23, local time) is a configured import hour.
pub fn is_import_hour(import_hours: &[u32], hour: u32) -> bool {
    import_hours.contains(&hour)
}

/// Runs both loops until the token is cancelled.
pub struct Scheduler<S> {
    job: SyncJob<S>,
    shutdown: CancellationToken,
}

impl<S> Scheduler<S>
where
    S: DirectoryStore + MaintenanceStore + 'static,
{
    pub fn new(job: SyncJob<S>, shutdown: CancellationToken) -> Self {
        Self { job, shutdown }
    }

    pub async fn run(self) {
        info!("Starting scheduled routines");
        let calls = tokio::spawn(call_update_loop(self.job.clone(), self.shutdown.clone()));
        let directory = tokio::spawn(directory_loop(self.job, self.shutdown.clone()));

        let (calls, directory) = tokio::join!(calls, directory);
        if let Err(e) = calls {
            error!(error = %e, "Call update routine aborted");
        }
        if let Err(e) = directory {
            error!(error = %e, "Directory sync routine aborted");
        }
        info!("Scheduled routines stopped");
    }
}

/// First run is immediate.
async fn call_update_loop<S>(job: SyncJob<S>, shutdown: CancellationToken)
where
    S: DirectoryStore + MaintenanceStore + 'static,
{
    let minutes = u64::from(job.config().processing.update_interval_minutes);
    let mut ticker = interval(Duration::from_secs(minutes * 60));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                debug!("Call update routine shutdown");
                return;
            }
            _ = ticker.tick() => {
                trace!("Process call updates");
                if let Err(e) = job.run_call_update().await {
                    error!(error = %e, code = e.error_code(), "Call update run failed");
                }
            }
        }
    }
}

/// Ticks hourly; runs only during configured import hours.
async fn directory_loop<S>(job: SyncJob<S>, shutdown: CancellationToken)
where
    S: DirectoryStore + MaintenanceStore + 'static,
{
    let mut ticker = interval_at(Instant::now() + DIRECTORY_TICK, DIRECTORY_TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                debug!("Directory sync routine shutdown");
                return;
            }
            _ = ticker.tick() => {
                let hour = Local::now().hour();
                if !is_import_hour(&job.config().processing.user_import_hours, hour) {
                    trace!(hour, "Not an import hour");
                    continue;
                }
                if let Err(e) = job.run_directory_sync().await {
                    error!(error = %e, code = e.error_code(), transient = e.is_transient(), "Directory sync run failed");
                }
            }
        }
    }
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, stopping"),
        _ = terminate => info!("Received SIGTERM, stopping"),
    }
}
