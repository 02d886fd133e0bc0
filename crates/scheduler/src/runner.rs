//! JobRunner - spawns a worker task per job and manages graceful shutdown.

use chrono::Timelike;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument};

use crate::job::{hour_in_window, JobSchedule, PeriodicJob};

/// Spawns job workers.
pub struct JobRunner;

impl JobRunner {
    /// Start a worker for `job`: one run immediately, then one per period.
    pub fn spawn<J>(job: J, schedule: JobSchedule) -> JobHandle
    where
        J: PeriodicJob + Send + Sync + 'static,
    {
        let name = job.name().to_string();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let worker_name = name.clone();
        let worker = tokio::spawn(async move {
            job_worker(job, schedule, shutdown_rx, worker_name).await;
        });

        info!(job = %name, period_secs = schedule.period.as_secs_f64(), "job scheduled");

        JobHandle {
            name,
            shutdown_tx,
            worker,
        }
    }
}

/// Handle to a running job worker.
pub struct JobHandle {
    name: String,
    shutdown_tx: watch::Sender<bool>,
    worker: JoinHandle<()>,
}

impl JobHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stop the timer and wait for the worker. An in-flight run finishes (or
    /// times out) naturally; it is never aborted.
    #[instrument(name = "job_handle_shutdown", skip(self), fields(job = %self.name))]
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.worker.await {
            error!(job = %self.name, error = ?e, "job worker panicked");
        }
        debug!(job = %self.name, "job worker stopped");
    }
}

/// Worker loop: fixed-cadence ticks with skipped backlog, local-hour gate,
/// shutdown between runs.
async fn job_worker<J: PeriodicJob>(
    job: J,
    schedule: JobSchedule,
    mut shutdown_rx: watch::Receiver<bool>,
    name: String,
) {
    let mut ticker = tokio::time::interval(schedule.period);
    // A run longer than the period must not cause a burst of catch-up ticks.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    debug!(job = %name, "job worker started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Some(window) = schedule.active_hours {
                    let hour = chrono::Local::now().hour();
                    if !hour_in_window(hour, window) {
                        debug!(job = %name, hour, "outside active hours, tick skipped");
                        continue;
                    }
                }
                // The select is over; a shutdown signal arriving now waits
                // for this run to finish.
                job.run_once().await;
            }
            _ = shutdown_rx.changed() => {
                break;
            }
        }
    }
}
