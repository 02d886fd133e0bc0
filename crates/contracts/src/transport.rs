//! DeviceTransport trait - device capability abstraction
//!
//! One implementation per vendor protocol. Each transport privately owns its
//! connection state; nothing is shared between devices.

use chrono::{DateTime, Utc};

use crate::{CoreError, Device, RawPunchEvent};

/// Device capability set.
///
/// The orchestrator races transport calls against a timeout and abandons the
/// future on expiry; cancellation is not propagated. Implementations must
/// therefore release sockets and sessions on drop.
#[trait_variant::make(DeviceTransport: Send)]
pub trait LocalDeviceTransport {
    /// Registry id of the device this transport talks to (for logging/metrics)
    fn device_id(&self) -> &str;

    /// Establish the vendor session.
    ///
    /// Returns `Ok(false)` without touching the network when required
    /// connection parameters are missing on the registry row; `Err` for I/O
    /// failures.
    async fn connect(&mut self) -> Result<bool, CoreError>;

    /// Fetch punch events, incrementally from the watermark when one is
    /// given, the device's full retained history otherwise.
    ///
    /// Return order is whatever the vendor produces; callers must not assume
    /// chronological order.
    async fn fetch_logs(
        &mut self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RawPunchEvent>, CoreError>;

    /// Tear down the vendor session. Idempotent; safe to call when never
    /// connected.
    async fn disconnect(&mut self);

    /// Connect if needed and report whether the device answers.
    async fn test_connection(&mut self) -> Result<bool, CoreError>;
}

/// Builds a transport for a registry row.
///
/// The orchestrator is generic over this so tests inject scripted
/// transports. An unrecognized vendor tag is a fatal construction error,
/// never retried within a cycle.
pub trait TransportFactory: Send + Sync {
    type Transport: DeviceTransport + Send;

    fn create_transport(&self, device: &Device) -> Result<Self::Transport, CoreError>;
}
