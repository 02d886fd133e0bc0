//! `sync-device` and `test-device` command implementations.

use anyhow::Result;
use tracing::info;

use crate::cli::DeviceArgs;
use crate::engine::{build_engine, load_plan};
use crate::error::CliError;

/// Execute the `sync-device` command.
pub async fn run_sync_device(args: &DeviceArgs) -> Result<()> {
    let plan = load_plan(&args.config)?;
    let (_store, orchestrator) = build_engine(&plan);

    info!(device_id = %args.device_id, "Forcing device sync");
    let stored = orchestrator
        .sync_device_by_id(&args.device_id)
        .await
        .map_err(|e| CliError::DeviceOperation {
            device_id: args.device_id.clone(),
            message: e.to_string(),
        })?;

    println!("✓ Device '{}' synced, {stored} new entries", args.device_id);
    Ok(())
}

/// Execute the `test-device` command.
pub async fn run_test_device(args: &DeviceArgs) -> Result<()> {
    let plan = load_plan(&args.config)?;
    let (_store, orchestrator) = build_engine(&plan);

    info!(device_id = %args.device_id, "Testing device connection");
    let reachable = orchestrator
        .test_device_connection(&args.device_id)
        .await
        .map_err(|e| CliError::DeviceOperation {
            device_id: args.device_id.clone(),
            message: e.to_string(),
        })?;

    if reachable {
        println!("✓ Device '{}' is reachable", args.device_id);
        Ok(())
    } else {
        println!("✗ Device '{}' did not answer", args.device_id);
        anyhow::bail!("connection test failed")
    }
}
