//! Ingestion and cycle statistics - Sync Engine output

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::DeviceId;

/// Counters for one ingested batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    /// Events handed over by the transport
    pub fetched: usize,
    /// New canonical entries persisted and merged
    pub stored: usize,
    /// Near-duplicates rejected by the dedup window
    pub duplicates: usize,
    /// Events whose external code matched no employee
    pub unresolved: usize,
    /// Events dropped by an unexpected per-event failure
    pub failures: usize,
}

impl BatchStats {
    pub fn absorb(&mut self, other: &BatchStats) {
        self.fetched += other.fetched;
        self.stored += other.stored;
        self.duplicates += other.duplicates;
        self.unresolved += other.unresolved;
        self.failures += other.failures;
    }
}

/// How one device fared in a cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSyncReport {
    pub device_id: DeviceId,

    /// Batch counters; zeroed when the device failed before ingesting
    pub stats: BatchStats,

    /// Failure message recorded on the registry row, if any
    pub error: Option<String>,
}

/// Why a cycle did or did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Ran to the join point (individual devices may still have failed)
    Completed,
    /// A cycle was already in flight; nothing was ingested
    SkippedOverlap,
    /// The engine is globally disabled; nothing was ingested
    Disabled,
    /// A cycle-level failure ended the cycle before the fan-out
    Aborted,
}

/// Outcome of one orchestrator cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub outcome: CycleOutcome,

    /// Per-device results, one entry per active device
    pub devices: Vec<DeviceSyncReport>,

    /// Batch counters summed over all succeeding devices
    pub totals: BatchStats,

    pub devices_succeeded: usize,

    pub devices_failed: usize,

    pub duration: Duration,
}

impl CycleReport {
    /// Report for a cycle that never fanned out.
    pub fn empty(outcome: CycleOutcome) -> Self {
        Self {
            outcome,
            devices: Vec::new(),
            totals: BatchStats::default(),
            devices_succeeded: 0,
            devices_failed: 0,
            duration: Duration::ZERO,
        }
    }

    pub fn devices_total(&self) -> usize {
        self.devices.len()
    }
}
