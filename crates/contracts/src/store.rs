//! SyncStore trait - persistence boundary of the engine
//!
//! One trait covering the collaborating record families: device registry
//! (watermark writes only), employee directory, HR settings, punch log and
//! attendance ledger. Reads and writes may block; no method holds a
//! cross-device lock.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::{
    AttendanceRecord, CoreError, Device, DeviceLogEntry, EmployeeId, GracePolicy, NewLogEntry,
};

/// Persistence operations used by the sync engine.
#[trait_variant::make(SyncStore: Send)]
pub trait LocalSyncStore {
    // ===== Device registry =====
    /// All devices flagged active, in registry order.
    async fn list_active_devices(&self) -> Result<Vec<Device>, CoreError>;

    async fn get_device(&self, id: &str) -> Result<Option<Device>, CoreError>;

    /// Advance the watermark and clear the error after a successful sync.
    async fn record_sync_success(&self, id: &str, at: DateTime<Utc>) -> Result<(), CoreError>;

    /// Record the failure message and still advance the watermark, so a
    /// perpetually failing device does not block its own future polls.
    async fn record_sync_failure(
        &self,
        id: &str,
        at: DateTime<Utc>,
        message: &str,
    ) -> Result<(), CoreError>;

    // ===== Employee directory =====
    /// Map a device-side employee code to an internal employee.
    async fn resolve_employee(&self, external_code: &str)
        -> Result<Option<EmployeeId>, CoreError>;

    // ===== HR settings =====
    async fn grace_policy(&self) -> Result<Option<GracePolicy>, CoreError>;

    /// Insert the default settings row; used when none exists yet.
    async fn insert_grace_policy(&self, policy: &GracePolicy) -> Result<(), CoreError>;

    // ===== Punch log =====
    /// Existing entry for the same device+employee within `window` of
    /// `around` (inclusive), if any.
    async fn find_log_near(
        &self,
        device_id: &str,
        employee_id: EmployeeId,
        around: DateTime<Utc>,
        window: Duration,
    ) -> Result<Option<DeviceLogEntry>, CoreError>;

    /// Persist a new entry; returns the assigned id.
    async fn insert_log(&self, entry: NewLogEntry) -> Result<u64, CoreError>;

    /// Flip the synced marker after a successful ledger merge.
    async fn mark_log_synced(&self, id: u64, at: DateTime<Utc>) -> Result<(), CoreError>;

    /// All entries for one device, oldest first.
    async fn logs_for_device(&self, device_id: &str) -> Result<Vec<DeviceLogEntry>, CoreError>;

    // ===== Attendance ledger =====
    async fn attendance_for(
        &self,
        employee_id: EmployeeId,
        day: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, CoreError>;

    /// Insert or replace the row for `(record.employee_id, record.day)`.
    async fn upsert_attendance(&self, record: &AttendanceRecord) -> Result<(), CoreError>;

    /// Every ledger row, unordered.
    async fn attendance_all(&self) -> Result<Vec<AttendanceRecord>, CoreError>;
}
