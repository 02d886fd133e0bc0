//! `sync` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{CycleOutcome, CycleReport};

use crate::cli::SyncArgs;
use crate::engine::{build_engine, load_plan};

#[derive(Serialize)]
struct CycleJson<'a> {
    outcome: CycleOutcome,
    devices: &'a [contracts::DeviceSyncReport],
    events_fetched: usize,
    entries_stored: usize,
    duplicates: usize,
    unresolved: usize,
    duration_ms: u64,
}

/// Execute the `sync` command: one full cycle, then exit.
pub async fn run_sync(args: &SyncArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading plan");
    let plan = load_plan(&args.config)?;
    let (_store, orchestrator) = build_engine(&plan);

    let report = orchestrator.sync_all_devices().await;
    observability::record_cycle(&report);

    if args.json {
        let json = serde_json::to_string_pretty(&CycleJson {
            outcome: report.outcome,
            devices: &report.devices,
            events_fetched: report.totals.fetched,
            entries_stored: report.totals.stored,
            duplicates: report.totals.duplicates,
            unresolved: report.totals.unresolved,
            duration_ms: report.duration.as_millis() as u64,
        })
        .context("Failed to serialize cycle report")?;
        println!("{json}");
    } else {
        print_cycle_report(&report);
    }

    if report.devices_failed > 0 {
        anyhow::bail!("{} device(s) failed to sync", report.devices_failed)
    }
    Ok(())
}

fn print_cycle_report(report: &CycleReport) {
    match report.outcome {
        CycleOutcome::Completed => {
            println!(
                "✓ Cycle completed in {:.2}s: {} device(s), {} ok, {} failed",
                report.duration.as_secs_f64(),
                report.devices_total(),
                report.devices_succeeded,
                report.devices_failed
            );
            println!(
                "  Events: {} fetched, {} stored, {} duplicates, {} unresolved",
                report.totals.fetched,
                report.totals.stored,
                report.totals.duplicates,
                report.totals.unresolved
            );
            for device in &report.devices {
                match &device.error {
                    None => println!(
                        "  - {}: {} fetched, {} stored",
                        device.device_id, device.stats.fetched, device.stats.stored
                    ),
                    Some(error) => println!("  - {}: FAILED ({error})", device.device_id),
                }
            }
        }
        CycleOutcome::SkippedOverlap => println!("✗ Cycle skipped: another cycle is in flight"),
        CycleOutcome::Disabled => println!("✗ Cycle skipped: engine is disabled"),
        CycleOutcome::Aborted => println!("✗ Cycle aborted before the device fan-out"),
    }
}
