//! Attendance ledger row and the grace-period policy.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::EmployeeId;

/// Classification of a ledger row, derived from its check-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Late,
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttendanceStatus::Present => write!(f, "present"),
            AttendanceStatus::Late => write!(f, "late"),
        }
    }
}

/// One ledger row per (employee, local calendar day).
///
/// Invariants maintained by the merger: `check_in` only ever moves earlier,
/// `check_out` only ever moves later, `status` is recomputed only when
/// `check_in` is overwritten. Rows are never deleted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub employee_id: EmployeeId,

    /// Local calendar day the punches belong to
    pub day: NaiveDate,

    pub check_in: Option<DateTime<Utc>>,

    pub check_out: Option<DateTime<Utc>>,

    pub status: AttendanceStatus,
}

/// Grace-period policy read from the HR settings store.
///
/// `utc_offset_minutes` is the fixed site offset used to place punches on
/// their local calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GracePolicy {
    /// Official office start time, site-local
    pub office_start: NaiveTime,

    /// Buffer after office start during which a check-in still counts on time
    pub grace_minutes: u32,

    /// Fixed site offset from UTC, in minutes
    pub utc_offset_minutes: i32,
}

impl Default for GracePolicy {
    fn default() -> Self {
        Self {
            office_start: NaiveTime::from_hms_opt(9, 0, 0).expect("valid time"),
            grace_minutes: 15,
            utc_offset_minutes: 0,
        }
    }
}

impl GracePolicy {
    fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset"))
    }

    /// Site-local wall-clock time of a punch.
    pub fn local_datetime(&self, at: DateTime<Utc>) -> NaiveDateTime {
        at.with_timezone(&self.offset()).naive_local()
    }

    /// Local calendar day a punch belongs to.
    pub fn local_day(&self, at: DateTime<Utc>) -> NaiveDate {
        self.local_datetime(at).date()
    }

    /// Latest local time that still counts as on-time for the given day.
    pub fn checkin_deadline(&self, day: NaiveDate) -> NaiveDateTime {
        day.and_time(self.office_start) + Duration::minutes(i64::from(self.grace_minutes))
    }

    /// Classify a check-in. Late only when strictly after the deadline;
    /// exactly at `office_start + grace` is still present.
    pub fn classify_checkin(&self, at: DateTime<Utc>) -> AttendanceStatus {
        let local = self.local_datetime(at);
        if local > self.checkin_deadline(local.date()) {
            AttendanceStatus::Late
        } else {
            AttendanceStatus::Present
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn policy(offset_minutes: i32) -> GracePolicy {
        GracePolicy {
            office_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            grace_minutes: 15,
            utc_offset_minutes: offset_minutes,
        }
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_grace_boundary_is_strict() {
        let p = policy(0);
        assert_eq!(
            p.classify_checkin(utc(2025, 3, 10, 9, 14, 59)),
            AttendanceStatus::Present
        );
        assert_eq!(
            p.classify_checkin(utc(2025, 3, 10, 9, 15, 0)),
            AttendanceStatus::Present
        );
        assert_eq!(
            p.classify_checkin(utc(2025, 3, 10, 9, 15, 1)),
            AttendanceStatus::Late
        );
    }

    #[test]
    fn test_local_day_crosses_midnight() {
        // UTC+06:00 site: 19:30 UTC is 01:30 next day local.
        let p = policy(360);
        assert_eq!(
            p.local_day(utc(2025, 3, 10, 19, 30, 0)),
            NaiveDate::from_ymd_opt(2025, 3, 11).unwrap()
        );
        // And a negative offset pulls the day back.
        let west = policy(-300);
        assert_eq!(
            west.local_day(utc(2025, 3, 10, 2, 0, 0)),
            NaiveDate::from_ymd_opt(2025, 3, 9).unwrap()
        );
    }

    #[test]
    fn test_classification_uses_local_clock() {
        // 03:10 UTC at a UTC+06:00 site is 09:10 local: inside grace.
        let p = policy(360);
        assert_eq!(
            p.classify_checkin(utc(2025, 3, 10, 3, 10, 0)),
            AttendanceStatus::Present
        );
        // 03:20 UTC is 09:20 local: late.
        assert_eq!(
            p.classify_checkin(utc(2025, 3, 10, 3, 20, 0)),
            AttendanceStatus::Late
        );
    }

    #[test]
    fn test_default_policy() {
        let p = GracePolicy::default();
        assert_eq!(p.office_start, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(p.grace_minutes, 15);
        assert_eq!(p.utc_offset_minutes, 0);
    }
}
