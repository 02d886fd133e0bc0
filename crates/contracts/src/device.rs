//! Device registry row and connection parameters.
//!
//! The registry itself (CRUD, admin UI) lives outside this engine; the sync
//! side only reads rows and writes the watermark/error fields back.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::DeviceId;

/// Internal employee identifier, assigned by the employee directory.
pub type EmployeeId = u64;

/// Known vendor protocols.
///
/// The registry stores the tag as a free string; this is the parsed form the
/// gateway factory and the plan validator agree on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// Stateful binary protocol over TCP (ZK-style terminals)
    ZkNet,
    /// Vendor cloud API, HTTPS + API key
    CloudPunch,
    /// Generic JSON-over-HTTP poll
    HttpPull,
    /// Scripted in-process transport (tests, dry runs)
    Mock,
}

impl DeviceKind {
    /// Parse a registry tag. `None` for unrecognized tags; the caller decides
    /// how fatal that is.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "zk_net" => Some(Self::ZkNet),
            "cloud_punch" => Some(Self::CloudPunch),
            "http_pull" => Some(Self::HttpPull),
            "mock" => Some(Self::Mock),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::ZkNet => "zk_net",
            Self::CloudPunch => "cloud_punch",
            Self::HttpPull => "http_pull",
            Self::Mock => "mock",
        }
    }
}

/// One row of the device registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// Unique identifier
    pub id: DeviceId,

    /// Human-readable name shown to operators
    pub name: String,

    /// Vendor tag, e.g. "zk_net". Kept as an opaque string because the
    /// registry is external; the gateway factory parses it.
    pub device_type: String,

    /// Transport connection parameters
    #[serde(default)]
    pub connection: ConnectionParams,

    /// Only active devices participate in sync cycles
    #[serde(default = "default_active")]
    pub active: bool,

    /// Watermark: how far this device's event stream has been consumed
    #[serde(default)]
    pub last_sync_at: Option<DateTime<Utc>>,

    /// Message of the most recent failed sync, cleared on success
    #[serde(default)]
    pub last_sync_error: Option<String>,
}

fn default_active() -> bool {
    true
}

/// Transport connection parameters.
///
/// The common fields cover the shipped vendors; anything exotic goes into
/// `params`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionParams {
    /// TCP host for socket transports
    #[serde(default)]
    pub host: Option<String>,

    /// TCP port for socket transports
    #[serde(default)]
    pub port: Option<u16>,

    /// Base URL for HTTP transports
    #[serde(default)]
    pub endpoint: Option<String>,

    /// API key / token for authenticated HTTP transports
    #[serde(default)]
    pub api_key: Option<String>,

    /// Vendor-specific extras
    #[serde(default)]
    pub params: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_deserialize_defaults() {
        let json = r#"{
            "id": "gate-1",
            "name": "Main Gate",
            "device_type": "zk_net",
            "connection": { "host": "10.0.0.20", "port": 4370 }
        }"#;
        let device: Device = serde_json::from_str(json).unwrap();
        assert!(device.active);
        assert!(device.last_sync_at.is_none());
        assert!(device.last_sync_error.is_none());
        assert_eq!(device.connection.port, Some(4370));
    }
}
