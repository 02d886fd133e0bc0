//! Generic JSON-over-HTTP poll transport.
//!
//! For homegrown punch clocks that expose a single endpoint returning a JSON
//! array of `{ "code", "time", "direction" }` rows. An optional API key is
//! sent as `X-Api-Key`.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use contracts::{CoreError, Device, DeviceId, DeviceTransport, PunchDirection, RawPunchEvent};

#[derive(Debug, Deserialize)]
struct PunchRow {
    code: String,
    /// RFC 3339
    time: String,
    direction: PunchDirection,
}

fn row_to_event(device_id: &DeviceId, row: &PunchRow) -> Option<RawPunchEvent> {
    let punched_at = match DateTime::parse_from_rfc3339(&row.time) {
        Ok(t) => t.with_timezone(&Utc),
        Err(e) => {
            warn!(
                device_id = %device_id,
                time = %row.time,
                error = %e,
                "punch row with unparseable time, skipping"
            );
            return None;
        }
    };

    let payload = serde_json::to_vec(&serde_json::json!({
        "code": row.code,
        "time": row.time,
        "direction": row.direction,
    }))
    .unwrap_or_default();

    Some(RawPunchEvent {
        device_id: device_id.clone(),
        external_code: row.code.clone(),
        punched_at,
        direction: row.direction,
        payload: Bytes::from(payload),
    })
}

/// Single-endpoint JSON poll transport.
#[derive(Debug)]
pub struct HttpPullTransport {
    device_id: DeviceId,
    endpoint: Option<String>,
    api_key: Option<String>,
    client: Option<reqwest::Client>,
}

impl HttpPullTransport {
    pub fn new(device: &Device) -> Self {
        Self {
            device_id: device.id.clone(),
            endpoint: device.connection.endpoint.clone(),
            api_key: device.connection.api_key.clone(),
            client: None,
        }
    }
}

impl DeviceTransport for HttpPullTransport {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    #[instrument(name = "http_pull_connect", skip(self), fields(device_id = %self.device_id))]
    async fn connect(&mut self) -> Result<bool, CoreError> {
        if self.endpoint.is_none() {
            return Ok(false);
        }
        if self.client.is_none() {
            self.client = Some(
                reqwest::Client::builder()
                    .build()
                    .map_err(|e| CoreError::connection(self.device_id.as_str(), e.to_string()))?,
            );
        }
        Ok(true)
    }

    #[instrument(
        name = "http_pull_fetch_logs",
        skip(self),
        fields(device_id = %self.device_id, since = ?since)
    )]
    async fn fetch_logs(
        &mut self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RawPunchEvent>, CoreError> {
        let (Some(client), Some(endpoint)) = (&self.client, &self.endpoint) else {
            return Err(CoreError::connection(
                self.device_id.as_str(),
                "not connected",
            ));
        };

        let mut request = client.get(endpoint.as_str());
        if let Some(key) = &self.api_key {
            request = request.header("X-Api-Key", key);
        }
        if let Some(since) = since {
            request = request.query(&[("since", since.to_rfc3339())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CoreError::connection(self.device_id.as_str(), e.to_string()))?;
        if !response.status().is_success() {
            return Err(CoreError::protocol(
                self.device_id.as_str(),
                format!("endpoint returned {}", response.status()),
            ));
        }

        let rows: Vec<PunchRow> = response
            .json()
            .await
            .map_err(|e| CoreError::protocol(self.device_id.as_str(), e.to_string()))?;

        let events: Vec<RawPunchEvent> = rows
            .iter()
            .filter_map(|row| row_to_event(&self.device_id, row))
            .collect();
        debug!(device_id = %self.device_id, count = events.len(), "punch rows fetched");
        Ok(events)
    }

    async fn disconnect(&mut self) {
        self.client = None;
    }

    async fn test_connection(&mut self) -> Result<bool, CoreError> {
        if !self.connect().await? {
            return Ok(false);
        }
        // The feed endpoint doubles as the health probe.
        match self.fetch_logs(Some(Utc::now())).await {
            Ok(_) => Ok(true),
            Err(CoreError::Connection { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
