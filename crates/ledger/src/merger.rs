//! Attendance merge rules.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use contracts::{
    AttendanceRecord, AttendanceStatus, CoreError, EmployeeId, GracePolicy, PunchDirection,
    SyncStore,
};

/// What a merge did to the ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// No row existed for (employee, day); one was created
    Inserted,
    /// Existing row's check-in moved earlier (status recomputed)
    CheckInMoved,
    /// Existing row's check-out moved later
    CheckOutMoved,
    /// Event carried no new information
    Unchanged,
}

/// Folds punch events into the attendance ledger.
pub struct AttendanceMerger<S> {
    store: Arc<S>,
}

impl<S> AttendanceMerger<S>
where
    S: SyncStore + Send + Sync,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Current grace policy, inserting the default row when the settings
    /// store is empty.
    async fn ensure_policy(&self) -> Result<GracePolicy, CoreError> {
        if let Some(policy) = self.store.grace_policy().await? {
            return Ok(policy);
        }
        let default = GracePolicy::default();
        self.store.insert_grace_policy(&default).await?;
        // Re-read: a concurrent device task may have won the insert.
        Ok(self.store.grace_policy().await?.unwrap_or(default))
    }

    /// Apply one punch to the ledger.
    #[instrument(
        name = "ledger_apply",
        skip(self),
        fields(employee_id, punched_at = %punched_at, direction = %direction)
    )]
    pub async fn apply(
        &self,
        employee_id: EmployeeId,
        punched_at: DateTime<Utc>,
        direction: PunchDirection,
    ) -> Result<MergeOutcome, CoreError> {
        let policy = self.ensure_policy().await?;
        let day = policy.local_day(punched_at);
        let existing = self.store.attendance_for(employee_id, day).await?;

        let outcome = match direction {
            PunchDirection::In => match existing {
                None => {
                    let record = AttendanceRecord {
                        employee_id,
                        day,
                        check_in: Some(punched_at),
                        check_out: None,
                        status: policy.classify_checkin(punched_at),
                    };
                    self.store.upsert_attendance(&record).await?;
                    MergeOutcome::Inserted
                }
                Some(mut record) => {
                    // First-in-wins: only an earlier punch replaces the
                    // stored check-in, and only then is status recomputed.
                    let moves = match record.check_in {
                        Some(stored) => punched_at < stored,
                        None => true,
                    };
                    if moves {
                        record.check_in = Some(punched_at);
                        record.status = policy.classify_checkin(punched_at);
                        self.store.upsert_attendance(&record).await?;
                        MergeOutcome::CheckInMoved
                    } else {
                        MergeOutcome::Unchanged
                    }
                }
            },
            PunchDirection::Out => match existing {
                None => {
                    // An orphan check-out is kept, not discarded.
                    let record = AttendanceRecord {
                        employee_id,
                        day,
                        check_in: None,
                        check_out: Some(punched_at),
                        status: AttendanceStatus::Present,
                    };
                    self.store.upsert_attendance(&record).await?;
                    MergeOutcome::Inserted
                }
                Some(mut record) => {
                    // Last-out-wins; status belongs to the check-in side and
                    // is left untouched.
                    let moves = match record.check_out {
                        Some(stored) => punched_at > stored,
                        None => true,
                    };
                    if moves {
                        record.check_out = Some(punched_at);
                        self.store.upsert_attendance(&record).await?;
                        MergeOutcome::CheckOutMoved
                    } else {
                        MergeOutcome::Unchanged
                    }
                }
            },
        };

        if outcome != MergeOutcome::Unchanged {
            metrics::counter!(
                "attsync_ledger_merges_total",
                "outcome" => outcome_label(outcome)
            )
            .increment(1);
            debug!(employee_id, day = %day, outcome = ?outcome, "ledger row updated");
        }

        Ok(outcome)
    }
}

fn outcome_label(outcome: MergeOutcome) -> &'static str {
    match outcome {
        MergeOutcome::Inserted => "inserted",
        MergeOutcome::CheckInMoved => "check_in_moved",
        MergeOutcome::CheckOutMoved => "check_out_moved",
        MergeOutcome::Unchanged => "unchanged",
    }
}
