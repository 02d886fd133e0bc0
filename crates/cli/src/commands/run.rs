//! `run` command implementation.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use observability::CycleAggregator;
use scheduler::{JobRunner, JobSchedule};

use crate::cli::RunArgs;
use crate::engine::{build_engine, load_plan, SyncCycleJob};

/// Execute the `run` command: start the scheduled service.
pub async fn run_service(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading plan");
    let plan = load_plan(&args.config)?;

    if args.dry_run {
        info!("Dry run mode - plan is valid, exiting");
        super::info::print_plan_summary(&plan, false);
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let (_store, orchestrator) = build_engine(&plan);

    let mut config = plan.to_engine_config();
    if args.interval != 0 {
        info!(interval_secs = args.interval, "Overriding cycle interval from CLI");
        config.cycle_interval = Duration::from_secs(args.interval);
    }

    let mut schedule = JobSchedule::every(config.cycle_interval);
    if let Some((start, end)) = config.active_hours {
        schedule = schedule.with_active_hours(start, end);
    }

    let aggregator = Arc::new(Mutex::new(CycleAggregator::new()));
    let job = SyncCycleJob::new(Arc::clone(&orchestrator), Arc::clone(&aggregator));
    let handle = JobRunner::spawn(job, schedule);

    info!(
        interval_secs = config.cycle_interval.as_secs(),
        active_hours = ?config.active_hours,
        "Sync service running, press Ctrl+C to stop"
    );

    shutdown_signal().await;
    warn!("Received shutdown signal, stopping service...");

    // Timers stop; an in-flight cycle finishes or times out naturally.
    handle.shutdown().await;

    let summary = aggregator.lock().unwrap().summary();
    println!("\n{summary}");

    info!("attsync finished");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
