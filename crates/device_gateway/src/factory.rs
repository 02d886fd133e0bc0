//! Transport factory
//!
//! Selects the vendor implementation from the registry row's type tag. An
//! unrecognized tag is fatal at construction and is never retried within a
//! cycle; the device stays unsyncable until its tag is corrected.

use chrono::{DateTime, Utc};
use tracing::instrument;

use contracts::{
    CoreError, Device, DeviceKind, DeviceTransport, RawPunchEvent, TransportFactory,
};

use crate::cloud_punch::CloudPunchTransport;
use crate::http_pull::HttpPullTransport;
use crate::mock::{MockScript, MockTransport};
use crate::zk_net::ZkNetTransport;

/// One transport per known vendor, behind a single concrete type so the
/// orchestrator needs no trait objects.
#[derive(Debug)]
pub enum DeviceGateway {
    ZkNet(ZkNetTransport),
    CloudPunch(CloudPunchTransport),
    HttpPull(HttpPullTransport),
    Mock(MockTransport),
}

impl DeviceTransport for DeviceGateway {
    fn device_id(&self) -> &str {
        match self {
            Self::ZkNet(t) => t.device_id(),
            Self::CloudPunch(t) => t.device_id(),
            Self::HttpPull(t) => t.device_id(),
            Self::Mock(t) => t.device_id(),
        }
    }

    async fn connect(&mut self) -> Result<bool, CoreError> {
        match self {
            Self::ZkNet(t) => t.connect().await,
            Self::CloudPunch(t) => t.connect().await,
            Self::HttpPull(t) => t.connect().await,
            Self::Mock(t) => t.connect().await,
        }
    }

    async fn fetch_logs(
        &mut self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RawPunchEvent>, CoreError> {
        match self {
            Self::ZkNet(t) => t.fetch_logs(since).await,
            Self::CloudPunch(t) => t.fetch_logs(since).await,
            Self::HttpPull(t) => t.fetch_logs(since).await,
            Self::Mock(t) => t.fetch_logs(since).await,
        }
    }

    async fn disconnect(&mut self) {
        match self {
            Self::ZkNet(t) => t.disconnect().await,
            Self::CloudPunch(t) => t.disconnect().await,
            Self::HttpPull(t) => t.disconnect().await,
            Self::Mock(t) => t.disconnect().await,
        }
    }

    async fn test_connection(&mut self) -> Result<bool, CoreError> {
        match self {
            Self::ZkNet(t) => t.test_connection().await,
            Self::CloudPunch(t) => t.test_connection().await,
            Self::HttpPull(t) => t.test_connection().await,
            Self::Mock(t) => t.test_connection().await,
        }
    }
}

/// Production factory: tag → vendor transport.
#[derive(Debug, Default, Clone)]
pub struct VendorFactory;

impl VendorFactory {
    pub fn new() -> Self {
        Self
    }
}

impl TransportFactory for VendorFactory {
    type Transport = DeviceGateway;

    #[instrument(
        name = "gateway_create_transport",
        skip(self, device),
        fields(device_id = %device.id, device_type = %device.device_type)
    )]
    fn create_transport(&self, device: &Device) -> Result<DeviceGateway, CoreError> {
        let kind = DeviceKind::from_tag(&device.device_type).ok_or_else(|| {
            CoreError::UnknownDeviceType {
                device_id: device.id.to_string(),
                tag: device.device_type.clone(),
            }
        })?;

        Ok(match kind {
            DeviceKind::ZkNet => DeviceGateway::ZkNet(ZkNetTransport::new(device)),
            DeviceKind::CloudPunch => DeviceGateway::CloudPunch(CloudPunchTransport::new(device)),
            DeviceKind::HttpPull => DeviceGateway::HttpPull(HttpPullTransport::new(device)),
            DeviceKind::Mock => {
                DeviceGateway::Mock(MockTransport::new(device.id.as_str(), MockScript::default()))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ConnectionParams, DeviceId};

    fn device_with_tag(tag: &str) -> Device {
        Device {
            id: DeviceId::from("d1"),
            name: "Device".into(),
            device_type: tag.into(),
            connection: ConnectionParams::default(),
            active: true,
            last_sync_at: None,
            last_sync_error: None,
        }
    }

    #[test]
    fn test_known_tags() {
        let factory = VendorFactory::new();
        for tag in ["zk_net", "cloud_punch", "http_pull", "mock"] {
            assert!(
                factory.create_transport(&device_with_tag(tag)).is_ok(),
                "tag {tag} should construct"
            );
        }
    }

    #[test]
    fn test_unknown_tag_is_fatal() {
        let factory = VendorFactory::new();
        let err = factory
            .create_transport(&device_with_tag("punchomatic"))
            .unwrap_err();
        assert!(matches!(err, CoreError::UnknownDeviceType { .. }));
        assert!(err.to_string().contains("punchomatic"));
    }
}
