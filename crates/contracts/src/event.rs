//! Punch events - gateway output and the persisted log entry.
//!
//! Vendor payloads are normalized into [`RawPunchEvent`] at the transport
//! boundary; the original wire bytes ride along as an opaque audit
//! attachment and are never parsed downstream.

use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{DeviceId, EmployeeId};

/// Two punch records closer together than this, for the same device and
/// employee, are treated as one physical punch.
pub const DEDUP_WINDOW_SECS: i64 = 60;

/// The dedup window as a chrono duration.
pub fn dedup_window() -> Duration {
    Duration::seconds(DEDUP_WINDOW_SECS)
}

/// Direction of a punch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PunchDirection {
    In,
    Out,
}

impl std::fmt::Display for PunchDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PunchDirection::In => write!(f, "in"),
            PunchDirection::Out => write!(f, "out"),
        }
    }
}

/// Raw punch event as returned by a device transport.
///
/// Transient: the ingestor either persists it as a [`DeviceLogEntry`] or
/// drops it; it is never stored in this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPunchEvent {
    /// Device that produced the event
    pub device_id: DeviceId,

    /// Employee identifier as the device knows it (badge / enroll number)
    pub external_code: String,

    /// Punch timestamp, already normalized to UTC by the transport
    pub punched_at: DateTime<Utc>,

    /// In or out
    pub direction: PunchDirection,

    /// Opaque vendor payload (audit only)
    pub payload: Bytes,
}

/// Persisted, employee-resolved punch log entry.
///
/// Immutable after insert except for the synced marker. Invariant: no two
/// entries for the same device+employee lie within [`DEDUP_WINDOW_SECS`] of
/// each other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceLogEntry {
    /// Store-assigned identifier
    pub id: u64,

    /// Device that produced the punch
    pub device_id: DeviceId,

    /// Resolved internal employee
    pub employee_id: EmployeeId,

    /// Punch timestamp (UTC)
    pub punched_at: DateTime<Utc>,

    /// In or out
    pub direction: PunchDirection,

    /// Opaque vendor payload (audit only)
    pub payload: Bytes,

    /// Set once the entry has been folded into the attendance ledger
    pub synced: bool,

    /// When the entry was folded
    pub synced_at: Option<DateTime<Utc>>,
}

/// Insert shape for a new log entry; the store assigns the id and the entry
/// starts unsynced.
#[derive(Debug, Clone)]
pub struct NewLogEntry {
    pub device_id: DeviceId,
    pub employee_id: EmployeeId,
    pub punched_at: DateTime<Utc>,
    pub direction: PunchDirection,
    pub payload: Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_serde_tags() {
        assert_eq!(
            serde_json::to_string(&PunchDirection::In).unwrap(),
            "\"in\""
        );
        let parsed: PunchDirection = serde_json::from_str("\"out\"").unwrap();
        assert_eq!(parsed, PunchDirection::Out);
    }

    #[test]
    fn test_dedup_window_is_one_minute() {
        assert_eq!(dedup_window(), Duration::seconds(60));
    }
}
