//! Cycle orchestration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

use contracts::{
    BatchStats, CoreError, CycleOutcome, CycleReport, Device, DeviceSyncReport, DeviceTransport,
    EngineConfig, SyncStore, TransportFactory,
};
use ingestion::LogIngestor;

/// Resets the reentrancy flag on every exit path, including panics inside
/// the cycle future.
struct SyncingGuard<'a>(&'a AtomicBool);

impl Drop for SyncingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Device sync orchestrator.
///
/// Owned state is limited to two flags; everything else is shared through
/// `Arc` so per-device tasks can outlive the method that spawned them.
pub struct SyncOrchestrator<S, F>
where
    S: SyncStore + Send + Sync + 'static,
    F: TransportFactory + 'static,
{
    store: Arc<S>,
    factory: Arc<F>,
    ingestor: Arc<LogIngestor<S>>,
    config: EngineConfig,
    enabled: AtomicBool,
    syncing: AtomicBool,
}

impl<S, F> SyncOrchestrator<S, F>
where
    S: SyncStore + Send + Sync + 'static,
    F: TransportFactory + 'static,
    F::Transport: 'static,
{
    pub fn new(store: Arc<S>, factory: Arc<F>, config: EngineConfig) -> Self {
        let ingestor = Arc::new(LogIngestor::new(Arc::clone(&store)));
        let enabled = AtomicBool::new(config.enabled);
        Self {
            store,
            factory,
            ingestor,
            config,
            enabled,
            syncing: AtomicBool::new(false),
        }
    }

    /// Global kill switch. When disabled, [`Self::sync_all_devices`] is a
    /// no-op; manual per-device operations still work.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
        info!(enabled, "sync engine toggled");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Run one full cycle over all active devices.
    ///
    /// Returns immediately when the engine is disabled or a cycle is already
    /// in flight. One device's failure or timeout never prevents other
    /// devices' results from being committed.
    #[instrument(name = "sync_cycle", skip(self))]
    pub async fn sync_all_devices(&self) -> CycleReport {
        if !self.is_enabled() {
            debug!("engine disabled, skipping cycle");
            return self.finish_cycle(CycleReport::empty(CycleOutcome::Disabled));
        }

        if self
            .syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            info!("previous cycle still running, skipping");
            return self.finish_cycle(CycleReport::empty(CycleOutcome::SkippedOverlap));
        }
        let _guard = SyncingGuard(&self.syncing);

        let started = Instant::now();

        let devices = match self.store.list_active_devices().await {
            Ok(devices) => devices,
            Err(e) => {
                error!(error = %e, "could not load device registry, ending cycle");
                return self.finish_cycle(CycleReport::empty(CycleOutcome::Aborted));
            }
        };

        if devices.is_empty() {
            // Nothing to poll; stay silent.
            return self.finish_cycle(CycleReport {
                duration: started.elapsed(),
                ..CycleReport::empty(CycleOutcome::Completed)
            });
        }

        info!(devices = devices.len(), "sync cycle started");

        let mut tasks: JoinSet<(Device, Result<BatchStats, CoreError>)> = JoinSet::new();
        for device in devices {
            let factory = Arc::clone(&self.factory);
            let ingestor = Arc::clone(&self.ingestor);
            let timeout = self.config.device_timeout;
            tasks.spawn(async move {
                let result = Self::sync_device(factory, ingestor, &device, timeout).await;
                (device, result)
            });
        }

        let mut report = CycleReport::empty(CycleOutcome::Completed);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((device, result)) => {
                    let entry = self.commit_device_result(&device, &result).await;
                    if entry.error.is_none() {
                        report.devices_succeeded += 1;
                        report.totals.absorb(&entry.stats);
                    } else {
                        report.devices_failed += 1;
                    }
                    report.devices.push(entry);
                }
                Err(e) => {
                    // A panicked device task is contained like any failure,
                    // but without a device to write the error back to.
                    error!(error = %e, "device sync task panicked");
                    report.devices_failed += 1;
                }
            }
        }

        report.duration = started.elapsed();
        info!(
            devices_ok = report.devices_succeeded,
            devices_failed = report.devices_failed,
            stored = report.totals.stored,
            duplicates = report.totals.duplicates,
            duration_ms = report.duration.as_millis() as u64,
            "sync cycle finished"
        );
        self.finish_cycle(report)
    }

    /// Force one device's sync, bypassing the cycle.
    ///
    /// Fails when the device is missing or inactive. Returns the number of
    /// new entries stored.
    #[instrument(name = "sync_device_by_id", skip(self), fields(device_id = %id))]
    pub async fn sync_device_by_id(&self, id: &str) -> Result<usize, CoreError> {
        let device = self
            .store
            .get_device(id)
            .await?
            .ok_or_else(|| CoreError::DeviceNotFound {
                device_id: id.to_string(),
            })?;
        if !device.active {
            return Err(CoreError::DeviceInactive {
                device_id: id.to_string(),
            });
        }

        let result = Self::sync_device(
            Arc::clone(&self.factory),
            Arc::clone(&self.ingestor),
            &device,
            self.config.device_timeout,
        )
        .await;

        let entry = self.commit_device_result(&device, &result).await;
        match result {
            Ok(_) => Ok(entry.stats.stored),
            Err(e) => Err(e),
        }
    }

    /// Connect/disconnect round trip, no ingestion, no watermark movement.
    #[instrument(name = "test_device_connection", skip(self), fields(device_id = %id))]
    pub async fn test_device_connection(&self, id: &str) -> Result<bool, CoreError> {
        let device = self
            .store
            .get_device(id)
            .await?
            .ok_or_else(|| CoreError::DeviceNotFound {
                device_id: id.to_string(),
            })?;

        let mut transport = self.factory.create_transport(&device)?;
        let result = transport.test_connection().await;
        transport.disconnect().await;
        result
    }

    /// One device's isolated sync: construct → connect → fetch → disconnect
    /// → ingest, raced against the per-device timeout. On expiry the
    /// in-flight transport future is abandoned; transports clean up on drop.
    async fn sync_device(
        factory: Arc<F>,
        ingestor: Arc<LogIngestor<S>>,
        device: &Device,
        timeout: std::time::Duration,
    ) -> Result<BatchStats, CoreError> {
        let attempt = Self::run_device(factory, ingestor, device);
        match tokio::time::timeout(timeout, attempt).await {
            Ok(result) => result,
            Err(_) => Err(CoreError::SyncTimeout {
                device_id: device.id.to_string(),
                timeout_secs: timeout.as_secs(),
            }),
        }
    }

    async fn run_device(
        factory: Arc<F>,
        ingestor: Arc<LogIngestor<S>>,
        device: &Device,
    ) -> Result<BatchStats, CoreError> {
        let mut transport = factory.create_transport(device)?;

        if !transport.connect().await? {
            return Err(CoreError::IncompleteConnection {
                device_id: device.id.to_string(),
            });
        }

        let fetched = transport.fetch_logs(device.last_sync_at).await;
        // Disconnect regardless of the fetch result.
        transport.disconnect().await;
        let events = fetched?;

        debug!(
            device_id = %device.id,
            fetched = events.len(),
            since = ?device.last_sync_at,
            "device logs fetched"
        );

        Ok(ingestor.ingest_batch(&device.id, &events).await)
    }

    /// Write the outcome back to the registry row. Success and failure both
    /// advance the watermark; a device with zero new logs advances too.
    async fn commit_device_result(
        &self,
        device: &Device,
        result: &Result<BatchStats, CoreError>,
    ) -> DeviceSyncReport {
        let now = Utc::now();
        match result {
            Ok(stats) => {
                if let Err(e) = self.store.record_sync_success(device.id.as_str(), now).await {
                    error!(device_id = %device.id, error = %e, "could not record sync success");
                }
                metrics::counter!("attsync_device_sync_total", "status" => "ok").increment(1);
                DeviceSyncReport {
                    device_id: device.id.clone(),
                    stats: *stats,
                    error: None,
                }
            }
            Err(e) => {
                let message = e.to_string();
                warn!(device_id = %device.id, error = %message, "device sync failed");
                if let Err(e) = self
                    .store
                    .record_sync_failure(device.id.as_str(), now, &message)
                    .await
                {
                    error!(device_id = %device.id, error = %e, "could not record sync failure");
                }
                metrics::counter!("attsync_device_sync_total", "status" => "error").increment(1);
                DeviceSyncReport {
                    device_id: device.id.clone(),
                    stats: BatchStats::default(),
                    error: Some(message),
                }
            }
        }
    }

    fn finish_cycle(&self, report: CycleReport) -> CycleReport {
        metrics::counter!(
            "attsync_cycles_total",
            "outcome" => outcome_label(report.outcome)
        )
        .increment(1);
        if report.outcome == CycleOutcome::Completed {
            metrics::histogram!("attsync_cycle_duration_seconds")
                .record(report.duration.as_secs_f64());
        }
        report
    }
}

fn outcome_label(outcome: CycleOutcome) -> &'static str {
    match outcome {
        CycleOutcome::Completed => "completed",
        CycleOutcome::SkippedOverlap => "skipped_overlap",
        CycleOutcome::Disabled => "disabled",
        CycleOutcome::Aborted => "aborted",
    }
}
