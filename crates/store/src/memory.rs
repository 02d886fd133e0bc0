//! In-memory SyncStore implementation
//!
//! HashMaps and Vecs behind RwLocks; no lock is held across an await point,
//! so the store is safe to share between concurrently syncing devices.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use contracts::{
    AttendanceRecord, CoreError, Device, DeviceLogEntry, EmployeeId, GracePolicy, NewLogEntry,
    SyncPlan, SyncStore,
};

/// In-memory store.
pub struct MemoryStore {
    /// Registry rows, registry order preserved
    devices: RwLock<Vec<Device>>,
    /// external code -> employee id
    employees: RwLock<HashMap<String, EmployeeId>>,
    /// HR settings row (at most one)
    policy: RwLock<Option<GracePolicy>>,
    /// Punch log, insertion order
    logs: RwLock<Vec<DeviceLogEntry>>,
    next_log_id: AtomicU64,
    /// (employee, local day) -> ledger row
    attendance: RwLock<HashMap<(EmployeeId, NaiveDate), AttendanceRecord>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            devices: RwLock::new(Vec::new()),
            employees: RwLock::new(HashMap::new()),
            policy: RwLock::new(None),
            logs: RwLock::new(Vec::new()),
            next_log_id: AtomicU64::new(1),
            attendance: RwLock::new(HashMap::new()),
        }
    }

    /// Seed devices, employee codes and the policy row from a plan.
    pub fn from_plan(plan: &SyncPlan) -> Self {
        let store = Self::new();
        for seed in &plan.devices {
            store.add_device(seed.to_device());
        }
        for employee in &plan.employees {
            for code in &employee.codes {
                store.add_employee_code(code, employee.id);
            }
        }
        *store.policy.write().unwrap() = Some(plan.policy.to_grace_policy());
        store
    }

    pub fn add_device(&self, device: Device) {
        self.devices.write().unwrap().push(device);
    }

    pub fn add_employee_code(&self, code: &str, employee_id: EmployeeId) {
        self.employees
            .write()
            .unwrap()
            .insert(code.to_string(), employee_id);
    }

    /// Number of persisted log entries.
    pub fn log_count(&self) -> usize {
        self.logs.read().unwrap().len()
    }

    fn update_device<F>(&self, id: &str, apply: F) -> Result<(), CoreError>
    where
        F: FnOnce(&mut Device),
    {
        let mut devices = self.devices.write().unwrap();
        match devices.iter_mut().find(|d| d.id == id) {
            Some(device) => {
                apply(device);
                Ok(())
            }
            None => Err(CoreError::DeviceNotFound {
                device_id: id.to_string(),
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncStore for MemoryStore {
    async fn list_active_devices(&self) -> Result<Vec<Device>, CoreError> {
        let devices = self.devices.read().unwrap();
        Ok(devices.iter().filter(|d| d.active).cloned().collect())
    }

    async fn get_device(&self, id: &str) -> Result<Option<Device>, CoreError> {
        let devices = self.devices.read().unwrap();
        Ok(devices.iter().find(|d| d.id == id).cloned())
    }

    async fn record_sync_success(&self, id: &str, at: DateTime<Utc>) -> Result<(), CoreError> {
        self.update_device(id, |device| {
            device.last_sync_at = Some(at);
            device.last_sync_error = None;
        })
    }

    async fn record_sync_failure(
        &self,
        id: &str,
        at: DateTime<Utc>,
        message: &str,
    ) -> Result<(), CoreError> {
        self.update_device(id, |device| {
            device.last_sync_at = Some(at);
            device.last_sync_error = Some(message.to_string());
        })
    }

    async fn resolve_employee(
        &self,
        external_code: &str,
    ) -> Result<Option<EmployeeId>, CoreError> {
        Ok(self.employees.read().unwrap().get(external_code).copied())
    }

    async fn grace_policy(&self) -> Result<Option<GracePolicy>, CoreError> {
        Ok(*self.policy.read().unwrap())
    }

    async fn insert_grace_policy(&self, policy: &GracePolicy) -> Result<(), CoreError> {
        let mut slot = self.policy.write().unwrap();
        if slot.is_none() {
            *slot = Some(*policy);
        }
        Ok(())
    }

    async fn find_log_near(
        &self,
        device_id: &str,
        employee_id: EmployeeId,
        around: DateTime<Utc>,
        window: Duration,
    ) -> Result<Option<DeviceLogEntry>, CoreError> {
        let logs = self.logs.read().unwrap();
        Ok(logs
            .iter()
            .find(|entry| {
                entry.device_id == device_id
                    && entry.employee_id == employee_id
                    && (entry.punched_at - around).abs() <= window
            })
            .cloned())
    }

    async fn insert_log(&self, entry: NewLogEntry) -> Result<u64, CoreError> {
        let id = self.next_log_id.fetch_add(1, Ordering::SeqCst);
        let mut logs = self.logs.write().unwrap();
        logs.push(DeviceLogEntry {
            id,
            device_id: entry.device_id,
            employee_id: entry.employee_id,
            punched_at: entry.punched_at,
            direction: entry.direction,
            payload: entry.payload,
            synced: false,
            synced_at: None,
        });
        Ok(id)
    }

    async fn mark_log_synced(&self, id: u64, at: DateTime<Utc>) -> Result<(), CoreError> {
        let mut logs = self.logs.write().unwrap();
        match logs.iter_mut().find(|entry| entry.id == id) {
            Some(entry) => {
                entry.synced = true;
                entry.synced_at = Some(at);
                Ok(())
            }
            None => Err(CoreError::store(format!("log entry {id} not found"))),
        }
    }

    async fn logs_for_device(&self, device_id: &str) -> Result<Vec<DeviceLogEntry>, CoreError> {
        let logs = self.logs.read().unwrap();
        let mut entries: Vec<DeviceLogEntry> = logs
            .iter()
            .filter(|entry| entry.device_id == device_id)
            .cloned()
            .collect();
        entries.sort_by_key(|entry| entry.punched_at);
        Ok(entries)
    }

    async fn attendance_for(
        &self,
        employee_id: EmployeeId,
        day: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, CoreError> {
        let attendance = self.attendance.read().unwrap();
        Ok(attendance.get(&(employee_id, day)).cloned())
    }

    async fn upsert_attendance(&self, record: &AttendanceRecord) -> Result<(), CoreError> {
        let mut attendance = self.attendance.write().unwrap();
        attendance.insert((record.employee_id, record.day), record.clone());
        Ok(())
    }

    async fn attendance_all(&self) -> Result<Vec<AttendanceRecord>, CoreError> {
        let attendance = self.attendance.read().unwrap();
        Ok(attendance.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use chrono::TimeZone;
    use contracts::{DeviceId, PunchDirection};

    fn sample_device(id: &str, active: bool) -> Device {
        Device {
            id: DeviceId::from(id),
            name: format!("Device {id}"),
            device_type: "mock".into(),
            connection: Default::default(),
            active,
            last_sync_at: None,
            last_sync_error: None,
        }
    }

    fn entry_at(secs: u32) -> NewLogEntry {
        NewLogEntry {
            device_id: "gate-1".into(),
            employee_id: 7,
            punched_at: Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, secs).unwrap(),
            direction: PunchDirection::In,
            payload: Bytes::new(),
        }
    }

    #[tokio::test]
    async fn test_active_filter() {
        let store = MemoryStore::new();
        store.add_device(sample_device("a", true));
        store.add_device(sample_device("b", false));

        let active = store.list_active_devices().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "a");
    }

    #[tokio::test]
    async fn test_watermark_updates() {
        let store = MemoryStore::new();
        store.add_device(sample_device("a", true));
        let at = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();

        store.record_sync_failure("a", at, "boom").await.unwrap();
        let device = store.get_device("a").await.unwrap().unwrap();
        assert_eq!(device.last_sync_at, Some(at));
        assert_eq!(device.last_sync_error.as_deref(), Some("boom"));

        let later = at + Duration::seconds(60);
        store.record_sync_success("a", later).await.unwrap();
        let device = store.get_device("a").await.unwrap().unwrap();
        assert_eq!(device.last_sync_at, Some(later));
        assert!(device.last_sync_error.is_none());
    }

    #[tokio::test]
    async fn test_record_on_unknown_device_errors() {
        let store = MemoryStore::new();
        let at = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        assert!(store.record_sync_success("ghost", at).await.is_err());
    }

    #[tokio::test]
    async fn test_find_log_near_window_inclusive() {
        let store = MemoryStore::new();
        store.insert_log(entry_at(0)).await.unwrap();

        let base = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let window = Duration::seconds(60);

        // 30s away: inside the window.
        let hit = store
            .find_log_near("gate-1", 7, base + Duration::seconds(30), window)
            .await
            .unwrap();
        assert!(hit.is_some());

        // Exactly 60s away: still a duplicate (inclusive bound).
        let hit = store
            .find_log_near("gate-1", 7, base + Duration::seconds(60), window)
            .await
            .unwrap();
        assert!(hit.is_some());

        // 90s away: distinct punch.
        let hit = store
            .find_log_near("gate-1", 7, base + Duration::seconds(90), window)
            .await
            .unwrap();
        assert!(hit.is_none());

        // Other employee never matches.
        let hit = store
            .find_log_near("gate-1", 8, base, window)
            .await
            .unwrap();
        assert!(hit.is_none());
    }

    #[tokio::test]
    async fn test_mark_log_synced() {
        let store = MemoryStore::new();
        let id = store.insert_log(entry_at(0)).await.unwrap();
        let at = Utc.with_ymd_and_hms(2025, 3, 10, 9, 1, 0).unwrap();
        store.mark_log_synced(id, at).await.unwrap();

        let logs = store.logs_for_device("gate-1").await.unwrap();
        assert!(logs[0].synced);
        assert_eq!(logs[0].synced_at, Some(at));
    }

    #[tokio::test]
    async fn test_policy_insert_keeps_existing() {
        let store = MemoryStore::new();
        assert!(store.grace_policy().await.unwrap().is_none());

        let first = GracePolicy::default();
        store.insert_grace_policy(&first).await.unwrap();

        let mut second = GracePolicy::default();
        second.grace_minutes = 30;
        store.insert_grace_policy(&second).await.unwrap();

        // First insert wins; the row is settings, not a log.
        assert_eq!(store.grace_policy().await.unwrap(), Some(first));
    }
}
