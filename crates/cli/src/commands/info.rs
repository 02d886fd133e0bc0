//! `info` command implementation.

use anyhow::{Context, Result};
use tracing::info;

use contracts::SyncPlan;

use crate::cli::InfoArgs;
use crate::engine::load_plan;

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Reading plan");
    let plan = load_plan(&args.config)?;

    if args.json {
        let json =
            config_loader::PlanLoader::to_json(&plan).context("Failed to serialize plan")?;
        println!("{json}");
        return Ok(());
    }

    print_plan_summary(&plan, args.devices);
    Ok(())
}

/// Print a human-readable plan summary.
pub fn print_plan_summary(plan: &SyncPlan, with_devices: bool) {
    println!("\n=== Plan Summary ===\n");
    println!("Engine:");
    println!("  Cycle interval: {}s", plan.engine.cycle_interval_secs);
    println!("  Device timeout: {}s", plan.engine.device_timeout_secs);
    println!("  Enabled: {}", plan.engine.enabled);
    if let Some([start, end]) = plan.engine.active_hours {
        println!("  Active hours: {start:02}:00-{end:02}:59");
    }

    println!("\nPolicy:");
    println!("  Office start: {}", plan.policy.office_start.format("%H:%M"));
    println!("  Grace: {} min", plan.policy.grace_minutes);
    println!("  UTC offset: {} min", plan.policy.utc_offset_minutes);

    println!(
        "\nDevices ({}), Employees ({})",
        plan.devices.len(),
        plan.employees.len()
    );

    if with_devices {
        for device in &plan.devices {
            let state = if device.active { "active" } else { "inactive" };
            println!(
                "  - {} [{}] ({}, {})",
                device.id, device.device_type, device.name, state
            );
        }
    }

    println!();
}
