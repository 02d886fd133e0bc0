//! Mock transport
//!
//! Scripted implementation for unit tests and dry runs, with injectable
//! failure scenarios and call recording.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::instrument;

use contracts::{
    CoreError, Device, DeviceTransport, RawPunchEvent, TransportFactory,
};

use crate::factory::DeviceGateway;

/// Script controlling a [`MockTransport`].
#[derive(Debug, Default, Clone)]
pub struct MockScript {
    /// Events "on the device"; fetch filters them against the watermark
    pub events: Vec<RawPunchEvent>,
    /// Pretend required connection parameters are missing
    pub missing_config: bool,
    /// Fail connect with this message
    pub fail_connect: Option<String>,
    /// Fail fetch_logs with this message
    pub fail_fetch: Option<String>,
    /// Sleep this long inside fetch_logs (timeout tests)
    pub fetch_delay: Option<Duration>,
}

/// Shared record of transport calls, for assertions.
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Scripted transport.
#[derive(Debug)]
pub struct MockTransport {
    device_id: String,
    script: MockScript,
    connected: bool,
    calls: CallLog,
}

impl MockTransport {
    pub fn new(device_id: impl Into<String>, script: MockScript) -> Self {
        Self {
            device_id: device_id.into(),
            script,
            connected: false,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handle for asserting which calls the orchestrator made.
    pub fn call_log(&self) -> CallLog {
        Arc::clone(&self.calls)
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }
}

impl DeviceTransport for MockTransport {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    #[instrument(name = "mock_connect", skip(self), fields(device_id = %self.device_id))]
    async fn connect(&mut self) -> Result<bool, CoreError> {
        self.record("connect");
        if self.script.missing_config {
            return Ok(false);
        }
        if let Some(message) = &self.script.fail_connect {
            return Err(CoreError::connection(&self.device_id, message.clone()));
        }
        self.connected = true;
        Ok(true)
    }

    async fn fetch_logs(
        &mut self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RawPunchEvent>, CoreError> {
        self.record("fetch_logs");
        if !self.connected {
            return Err(CoreError::connection(&self.device_id, "not connected"));
        }
        if let Some(delay) = self.script.fetch_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.script.fail_fetch {
            return Err(CoreError::connection(&self.device_id, message.clone()));
        }

        Ok(self
            .script
            .events
            .iter()
            .filter(|event| since.map_or(true, |floor| event.punched_at > floor))
            .cloned()
            .collect())
    }

    async fn disconnect(&mut self) {
        self.record("disconnect");
        self.connected = false;
    }

    async fn test_connection(&mut self) -> Result<bool, CoreError> {
        self.record("test_connection");
        self.connect().await
    }
}

/// Factory handing out scripted transports by device id.
///
/// Devices without a registered script get an empty one. Call logs are
/// shared per device so assertions survive the transport being dropped.
#[derive(Default)]
pub struct MockFactory {
    scripts: Mutex<HashMap<String, MockScript>>,
    call_logs: Mutex<HashMap<String, CallLog>>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_device(&self, device_id: &str, script: MockScript) {
        self.scripts
            .lock()
            .unwrap()
            .insert(device_id.to_string(), script);
    }

    /// Calls made against a device's transports, in order.
    pub fn calls_for(&self, device_id: &str) -> Vec<String> {
        self.call_logs
            .lock()
            .unwrap()
            .get(device_id)
            .map(|log| log.lock().unwrap().clone())
            .unwrap_or_default()
    }
}

impl TransportFactory for MockFactory {
    type Transport = DeviceGateway;

    fn create_transport(&self, device: &Device) -> Result<Self::Transport, CoreError> {
        let script = self
            .scripts
            .lock()
            .unwrap()
            .get(device.id.as_str())
            .cloned()
            .unwrap_or_default();

        let mut transport = MockTransport::new(device.id.as_str(), script);

        // Reuse the existing log so repeated create calls accumulate.
        let mut logs = self.call_logs.lock().unwrap();
        match logs.get(device.id.as_str()) {
            Some(existing) => transport.calls = Arc::clone(existing),
            None => {
                logs.insert(device.id.to_string(), transport.call_log());
            }
        }

        Ok(DeviceGateway::Mock(transport))
    }
}
