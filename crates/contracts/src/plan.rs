//! SyncPlan - Config Loader output
//!
//! Describes one site: engine tuning, grace policy, device seeds and the
//! employee directory seed. The CLI loads a plan and seeds the store from
//! it; in a deployment with a live registry only the `[engine]` and
//! `[policy]` tables matter.

use std::time::Duration;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::{ConnectionParams, Device, DeviceId, EmployeeId, GracePolicy};

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlanVersion {
    #[default]
    V1,
}

/// Complete site plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncPlan {
    /// Config version
    #[serde(default)]
    pub version: PlanVersion,

    /// Engine tuning
    #[serde(default)]
    pub engine: EngineSettings,

    /// Grace-period policy seed
    #[serde(default)]
    pub policy: PolicySettings,

    /// Device registry seed
    #[serde(default)]
    pub devices: Vec<DeviceSeed>,

    /// Employee directory seed
    #[serde(default)]
    pub employees: Vec<EmployeeSeed>,
}

/// Engine tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Seconds between scheduled sync cycles
    #[serde(default = "default_cycle_interval_secs")]
    pub cycle_interval_secs: u64,

    /// Per-device sync budget in seconds
    #[serde(default = "default_device_timeout_secs")]
    pub device_timeout_secs: u64,

    /// Global kill switch state at boot
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Optional local-hour gate `[start, end]` (inclusive) for the scheduled
    /// cycle; manual syncs ignore it
    #[serde(default)]
    pub active_hours: Option<[u32; 2]>,
}

fn default_cycle_interval_secs() -> u64 {
    60
}

fn default_device_timeout_secs() -> u64 {
    60
}

fn default_enabled() -> bool {
    true
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            cycle_interval_secs: default_cycle_interval_secs(),
            device_timeout_secs: default_device_timeout_secs(),
            enabled: default_enabled(),
            active_hours: None,
        }
    }
}

/// Grace-period policy seed, written to the HR settings store at boot when
/// it is empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicySettings {
    /// Office start time, "HH:MM" or "HH:MM:SS"
    #[serde(
        default = "default_office_start",
        with = "office_time",
        alias = "office_start_time"
    )]
    pub office_start: NaiveTime,

    #[serde(default = "default_grace_minutes")]
    pub grace_minutes: u32,

    /// Fixed site offset from UTC, in minutes
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

fn default_office_start() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).expect("valid time")
}

fn default_grace_minutes() -> u32 {
    15
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            office_start: default_office_start(),
            grace_minutes: default_grace_minutes(),
            utc_offset_minutes: 0,
        }
    }
}

impl PolicySettings {
    pub fn to_grace_policy(&self) -> GracePolicy {
        GracePolicy {
            office_start: self.office_start,
            grace_minutes: self.grace_minutes,
            utc_offset_minutes: self.utc_offset_minutes,
        }
    }
}

/// Device registry seed row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSeed {
    /// Unique identifier
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Vendor tag, e.g. "zk_net"
    pub device_type: String,

    #[serde(default = "default_device_active")]
    pub active: bool,

    #[serde(default)]
    pub connection: ConnectionParams,
}

fn default_device_active() -> bool {
    true
}

impl DeviceSeed {
    /// Registry row with an empty watermark.
    pub fn to_device(&self) -> Device {
        Device {
            id: DeviceId::from(self.id.as_str()),
            name: self.name.clone(),
            device_type: self.device_type.clone(),
            connection: self.connection.clone(),
            active: self.active,
            last_sync_at: None,
            last_sync_error: None,
        }
    }
}

/// Employee directory seed row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeSeed {
    /// Internal employee id
    pub id: EmployeeId,

    pub name: String,

    /// Device-side codes that resolve to this employee
    pub codes: Vec<String>,
}

/// Runtime engine configuration derived from a plan.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub cycle_interval: Duration,
    pub device_timeout: Duration,
    pub enabled: bool,
    pub active_hours: Option<(u32, u32)>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineSettings::default().to_engine_config()
    }
}

impl EngineSettings {
    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig {
            cycle_interval: Duration::from_secs(self.cycle_interval_secs),
            device_timeout: Duration::from_secs(self.device_timeout_secs),
            enabled: self.enabled,
            active_hours: self.active_hours.map(|[start, end]| (start, end)),
        }
    }
}

impl SyncPlan {
    pub fn to_engine_config(&self) -> EngineConfig {
        self.engine.to_engine_config()
    }
}

/// Serde helper accepting "HH:MM" and "HH:MM:SS" office start times.
mod office_time {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M"))
            .map_err(|e| serde::de::Error::custom(format!("invalid office_start '{raw}': {e}")))
    }
}
