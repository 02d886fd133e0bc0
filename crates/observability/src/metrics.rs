//! Cycle metric recording and in-memory aggregation.

use std::collections::HashMap;

use contracts::{CycleOutcome, CycleReport};
use metrics::gauge;

/// Record the "last cycle" gauges from a finished report.
///
/// Counters for cycles, device outcomes and event dispositions are emitted
/// inline by the engine crates; these gauges answer "what did the most
/// recent cycle look like" on a dashboard.
pub fn record_cycle(report: &CycleReport) {
    gauge!("attsync_last_cycle_devices").set(report.devices_total() as f64);
    gauge!("attsync_last_cycle_devices_failed").set(report.devices_failed as f64);
    gauge!("attsync_last_cycle_events_fetched").set(report.totals.fetched as f64);
    gauge!("attsync_last_cycle_entries_stored").set(report.totals.stored as f64);
    gauge!("attsync_last_cycle_duration_seconds").set(report.duration.as_secs_f64());
}

/// Aggregates cycle reports in memory for the CLI summary.
#[derive(Debug, Clone, Default)]
pub struct CycleAggregator {
    /// Cycles that ran to the join point
    pub completed: u64,

    /// Cycles skipped by the reentrancy guard
    pub skipped: u64,

    /// Cycles no-opped by the kill switch
    pub disabled: u64,

    /// Cycles ended early by a cycle-level failure
    pub aborted: u64,

    /// Device outcomes across all completed cycles
    pub device_successes: u64,
    pub device_failures: u64,

    /// Event dispositions across all completed cycles
    pub events_fetched: u64,
    pub entries_stored: u64,
    pub duplicates: u64,
    pub unresolved: u64,

    /// Cycle wall-clock statistics (seconds)
    pub duration: RunningStats,

    /// Failure counts per device
    pub failures_by_device: HashMap<String, u64>,
}

impl CycleAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, report: &CycleReport) {
        match report.outcome {
            CycleOutcome::Completed => self.completed += 1,
            CycleOutcome::SkippedOverlap => {
                self.skipped += 1;
                return;
            }
            CycleOutcome::Disabled => {
                self.disabled += 1;
                return;
            }
            CycleOutcome::Aborted => {
                self.aborted += 1;
                return;
            }
        }

        self.device_successes += report.devices_succeeded as u64;
        self.device_failures += report.devices_failed as u64;
        self.events_fetched += report.totals.fetched as u64;
        self.entries_stored += report.totals.stored as u64;
        self.duplicates += report.totals.duplicates as u64;
        self.unresolved += report.totals.unresolved as u64;
        self.duration.push(report.duration.as_secs_f64());

        for device in &report.devices {
            if device.error.is_some() {
                *self
                    .failures_by_device
                    .entry(device.device_id.to_string())
                    .or_insert(0) += 1;
            }
        }
    }

    pub fn summary(&self) -> CycleSummary {
        CycleSummary {
            completed: self.completed,
            skipped: self.skipped,
            disabled: self.disabled,
            aborted: self.aborted,
            device_successes: self.device_successes,
            device_failures: self.device_failures,
            events_fetched: self.events_fetched,
            entries_stored: self.entries_stored,
            duplicates: self.duplicates,
            unresolved: self.unresolved,
            mean_cycle_seconds: self.duration.mean(),
            max_cycle_seconds: self.duration.max(),
            failures_by_device: self.failures_by_device.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Point-in-time summary for printing.
#[derive(Debug, Clone, Default)]
pub struct CycleSummary {
    pub completed: u64,
    pub skipped: u64,
    pub disabled: u64,
    pub aborted: u64,
    pub device_successes: u64,
    pub device_failures: u64,
    pub events_fetched: u64,
    pub entries_stored: u64,
    pub duplicates: u64,
    pub unresolved: u64,
    pub mean_cycle_seconds: f64,
    pub max_cycle_seconds: f64,
    pub failures_by_device: HashMap<String, u64>,
}

impl std::fmt::Display for CycleSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Sync Cycle Summary ===")?;
        writeln!(
            f,
            "Cycles: {} completed, {} skipped, {} disabled, {} aborted",
            self.completed, self.skipped, self.disabled, self.aborted
        )?;
        writeln!(
            f,
            "Devices: {} ok, {} failed",
            self.device_successes, self.device_failures
        )?;
        writeln!(
            f,
            "Events: {} fetched, {} stored, {} duplicates, {} unresolved",
            self.events_fetched, self.entries_stored, self.duplicates, self.unresolved
        )?;
        writeln!(
            f,
            "Cycle time: mean {:.3}s, max {:.3}s",
            self.mean_cycle_seconds, self.max_cycle_seconds
        )?;

        if !self.failures_by_device.is_empty() {
            writeln!(f, "Failures by device:")?;
            let mut rows: Vec<_> = self.failures_by_device.iter().collect();
            rows.sort();
            for (device, count) in rows {
                writeln!(f, "  {device}: {count}")?;
            }
        }

        Ok(())
    }
}

/// Online min/max/mean (Welford's algorithm, variance omitted since nothing
/// here displays it).
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
            self.mean += (value - self.mean) / self.count as f64;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{BatchStats, DeviceId, DeviceSyncReport};
    use std::time::Duration;

    fn completed_report() -> CycleReport {
        let mut report = CycleReport::empty(CycleOutcome::Completed);
        report.devices_succeeded = 1;
        report.devices_failed = 1;
        report.totals = BatchStats {
            fetched: 5,
            stored: 3,
            duplicates: 1,
            unresolved: 1,
            failures: 0,
        };
        report.devices = vec![
            DeviceSyncReport {
                device_id: DeviceId::from("a"),
                stats: report.totals,
                error: None,
            },
            DeviceSyncReport {
                device_id: DeviceId::from("b"),
                stats: BatchStats::default(),
                error: Some("timed out".into()),
            },
        ];
        report.duration = Duration::from_millis(250);
        report
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }
        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = CycleAggregator::new();
        aggregator.update(&completed_report());
        aggregator.update(&CycleReport::empty(CycleOutcome::SkippedOverlap));

        assert_eq!(aggregator.completed, 1);
        assert_eq!(aggregator.skipped, 1);
        assert_eq!(aggregator.entries_stored, 3);
        assert_eq!(aggregator.device_failures, 1);
        assert_eq!(aggregator.failures_by_device.get("b"), Some(&1));
        // Skipped cycles contribute nothing but their count.
        assert_eq!(aggregator.events_fetched, 5);
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = CycleAggregator::new();
        aggregator.update(&completed_report());
        let output = format!("{}", aggregator.summary());
        assert!(output.contains("1 completed"));
        assert!(output.contains("3 stored"));
        assert!(output.contains("1 duplicates"));
        assert!(output.contains("b: 1"));
    }
}
