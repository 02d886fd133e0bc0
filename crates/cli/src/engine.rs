//! Engine wiring shared by the CLI commands.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tracing::info;

use contracts::SyncPlan;
use device_gateway::VendorFactory;
use observability::CycleAggregator;
use scheduler::PeriodicJob;
use store::MemoryStore;
use sync_engine::SyncOrchestrator;

use crate::error::CliError;

/// The concrete orchestrator every command works with.
pub type Engine = SyncOrchestrator<MemoryStore, VendorFactory>;

/// Load and validate a plan file.
pub fn load_plan(path: &Path) -> Result<SyncPlan> {
    if !path.exists() {
        return Err(CliError::plan_not_found(path.display().to_string()).into());
    }

    let plan = config_loader::PlanLoader::load_from_path(path)
        .map_err(|e| CliError::plan_load(e.to_string()))
        .with_context(|| format!("Failed to load plan from {}", path.display()))?;

    info!(
        devices = plan.devices.len(),
        employees = plan.employees.len(),
        cycle_interval_secs = plan.engine.cycle_interval_secs,
        "Plan loaded"
    );

    Ok(plan)
}

/// Seed the store from the plan and build the orchestrator on top of it.
pub fn build_engine(plan: &SyncPlan) -> (Arc<MemoryStore>, Arc<Engine>) {
    let store = Arc::new(MemoryStore::from_plan(plan));
    let factory = Arc::new(VendorFactory::new());
    let orchestrator = Arc::new(SyncOrchestrator::new(
        Arc::clone(&store),
        factory,
        plan.to_engine_config(),
    ));
    (store, orchestrator)
}

/// The scheduled sync cycle: one orchestrator run per tick.
pub struct SyncCycleJob {
    orchestrator: Arc<Engine>,
    aggregator: Arc<Mutex<CycleAggregator>>,
}

impl SyncCycleJob {
    pub fn new(orchestrator: Arc<Engine>, aggregator: Arc<Mutex<CycleAggregator>>) -> Self {
        Self {
            orchestrator,
            aggregator,
        }
    }
}

impl PeriodicJob for SyncCycleJob {
    fn name(&self) -> &str {
        "attendance-sync"
    }

    async fn run_once(&self) {
        let report = self.orchestrator.sync_all_devices().await;
        observability::record_cycle(&report);
        self.aggregator.lock().unwrap().update(&report);
    }
}
