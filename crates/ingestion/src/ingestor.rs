//! Batch ingestion with dedup, resolution and merge hand-off.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, instrument, warn};

use contracts::{
    dedup_window, BatchStats, CoreError, DeviceId, NewLogEntry, RawPunchEvent, SyncStore,
};
use ledger::AttendanceMerger;

enum EventOutcome {
    Stored,
    Duplicate,
    Unresolved,
}

/// Turns raw punch events into ledger state.
pub struct LogIngestor<S> {
    store: Arc<S>,
    merger: AttendanceMerger<S>,
}

impl<S> LogIngestor<S>
where
    S: SyncStore + Send + Sync,
{
    pub fn new(store: Arc<S>) -> Self {
        let merger = AttendanceMerger::new(Arc::clone(&store));
        Self { store, merger }
    }

    /// Ingest one device's batch, in the order the transport returned it
    /// (which is not assumed chronological).
    ///
    /// Per-event failures are logged and counted; the rest of the batch
    /// still goes through.
    #[instrument(
        name = "ingest_batch",
        skip(self, events),
        fields(device_id = %device_id, count = events.len())
    )]
    pub async fn ingest_batch(&self, device_id: &DeviceId, events: &[RawPunchEvent]) -> BatchStats {
        let mut stats = BatchStats {
            fetched: events.len(),
            ..Default::default()
        };

        for event in events {
            match self.ingest_event(device_id, event).await {
                Ok(EventOutcome::Stored) => stats.stored += 1,
                Ok(EventOutcome::Duplicate) => stats.duplicates += 1,
                Ok(EventOutcome::Unresolved) => stats.unresolved += 1,
                Err(e) => {
                    stats.failures += 1;
                    warn!(
                        device_id = %device_id,
                        external_code = %event.external_code,
                        error = %e,
                        "event dropped, continuing with batch"
                    );
                }
            }
        }

        metrics::counter!("attsync_events_ingested_total").increment(stats.stored as u64);
        metrics::counter!("attsync_events_duplicate_total").increment(stats.duplicates as u64);
        metrics::counter!("attsync_events_unresolved_total").increment(stats.unresolved as u64);
        if stats.failures > 0 {
            metrics::counter!("attsync_event_failures_total").increment(stats.failures as u64);
        }

        stats
    }

    async fn ingest_event(
        &self,
        device_id: &DeviceId,
        event: &RawPunchEvent,
    ) -> Result<EventOutcome, CoreError> {
        // Resolution comes first: the dedup key is the resolved employee, so
        // an event that matches nobody can never attach to the wrong row.
        let Some(employee_id) = self.store.resolve_employee(&event.external_code).await? else {
            warn!(
                device_id = %device_id,
                external_code = %event.external_code,
                "no employee for external code, skipping event"
            );
            return Ok(EventOutcome::Unresolved);
        };

        // Tolerates duplicate reads across polls and transport retries. Not
        // atomic with the insert below; overlapping cycles are kept out by
        // the orchestrator's reentrancy guard.
        if self
            .store
            .find_log_near(device_id, employee_id, event.punched_at, dedup_window())
            .await?
            .is_some()
        {
            debug!(
                device_id = %device_id,
                employee_id,
                punched_at = %event.punched_at,
                "near-duplicate punch, skipping"
            );
            return Ok(EventOutcome::Duplicate);
        }

        let entry_id = self
            .store
            .insert_log(NewLogEntry {
                device_id: device_id.clone(),
                employee_id,
                punched_at: event.punched_at,
                direction: event.direction,
                payload: event.payload.clone(),
            })
            .await?;

        self.merger
            .apply(employee_id, event.punched_at, event.direction)
            .await?;

        // Only a successfully merged entry counts as synced.
        self.store.mark_log_synced(entry_id, Utc::now()).await?;

        Ok(EventOutcome::Stored)
    }
}
