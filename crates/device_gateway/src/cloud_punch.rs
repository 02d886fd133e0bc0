//! Vendor cloud transport: HTTPS + API key, paginated transaction feed.
//!
//! The feed is the usual attendance-cloud shape: `GET
//! {endpoint}/api/transactions` with `Authorization: Token <key>`, rows
//! carrying `emp_code` / `punch_time` / `punch_state` / `terminal_sn`, and a
//! `next` link for pagination.

use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use contracts::{CoreError, Device, DeviceId, DeviceTransport, PunchDirection, RawPunchEvent};

const PAGE_SIZE: usize = 200;
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One page of the transaction feed.
#[derive(Debug, Deserialize)]
struct TransactionPage {
    #[serde(default)]
    data: Vec<TransactionRow>,
    #[serde(default)]
    next: Option<String>,
}

/// One transaction row.
#[derive(Debug, Deserialize)]
struct TransactionRow {
    emp_code: String,
    punch_time: String,
    punch_state: String,
    #[serde(default)]
    terminal_sn: Option<String>,
}

fn parse_punch_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    // The feed's plain form carries no offset; the API reports UTC.
    NaiveDateTime::parse_from_str(raw, TIME_FORMAT)
        .ok()
        .map(|t| t.and_utc())
}

fn parse_punch_state(raw: &str) -> Option<PunchDirection> {
    match raw {
        "0" | "in" | "check_in" => Some(PunchDirection::In),
        "1" | "out" | "check_out" => Some(PunchDirection::Out),
        _ => None,
    }
}

fn row_to_event(device_id: &DeviceId, row: &TransactionRow) -> Option<RawPunchEvent> {
    let punched_at = match parse_punch_time(&row.punch_time) {
        Some(t) => t,
        None => {
            warn!(
                device_id = %device_id,
                punch_time = %row.punch_time,
                "transaction with unparseable punch_time, skipping"
            );
            return None;
        }
    };

    let direction = match parse_punch_state(&row.punch_state) {
        Some(d) => d,
        None => {
            warn!(
                device_id = %device_id,
                punch_state = %row.punch_state,
                "transaction with unknown punch_state, skipping"
            );
            return None;
        }
    };

    // Keep the whole row as the audit payload.
    let payload = serde_json::to_vec(&serde_json::json!({
        "emp_code": row.emp_code,
        "punch_time": row.punch_time,
        "punch_state": row.punch_state,
        "terminal_sn": row.terminal_sn,
    }))
    .unwrap_or_default();

    Some(RawPunchEvent {
        device_id: device_id.clone(),
        external_code: row.emp_code.clone(),
        punched_at,
        direction,
        payload: Bytes::from(payload),
    })
}

/// Cloud transaction-feed transport.
#[derive(Debug)]
pub struct CloudPunchTransport {
    device_id: DeviceId,
    endpoint: Option<String>,
    api_key: Option<String>,
    client: Option<reqwest::Client>,
}

impl CloudPunchTransport {
    pub fn new(device: &Device) -> Self {
        Self {
            device_id: device.id.clone(),
            endpoint: device.connection.endpoint.clone(),
            api_key: device.connection.api_key.clone(),
            client: None,
        }
    }

    fn session(&self) -> Result<(&reqwest::Client, &str, &str), CoreError> {
        match (&self.client, &self.endpoint, &self.api_key) {
            (Some(client), Some(endpoint), Some(key)) => {
                Ok((client, endpoint.trim_end_matches('/'), key))
            }
            _ => Err(CoreError::connection(
                self.device_id.as_str(),
                "not connected",
            )),
        }
    }

    async fn fetch_page(
        &self,
        url: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<TransactionPage, CoreError> {
        let (client, _, key) = self.session()?;

        let mut request = client
            .get(url)
            .header("Authorization", format!("Token {key}"));
        if let Some(since) = since {
            request = request.query(&[("start_time", since.format(TIME_FORMAT).to_string())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CoreError::connection(self.device_id.as_str(), e.to_string()))?;

        if !response.status().is_success() {
            return Err(CoreError::protocol(
                self.device_id.as_str(),
                format!("transaction feed returned {}", response.status()),
            ));
        }

        response
            .json::<TransactionPage>()
            .await
            .map_err(|e| CoreError::protocol(self.device_id.as_str(), e.to_string()))
    }
}

impl DeviceTransport for CloudPunchTransport {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    #[instrument(name = "cloud_punch_connect", skip(self), fields(device_id = %self.device_id))]
    async fn connect(&mut self) -> Result<bool, CoreError> {
        if self.endpoint.is_none() || self.api_key.is_none() {
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
        name = "cloud_punch_fetch_logs",
        skip(self),
        fields(device_id = %self.device_id, since = ?since)
    )]
    async fn fetch_logs(
        &mut self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RawPunchEvent>, CoreError> {
        let (_, endpoint, _) = self.session()?;
        let first_url = format!("{endpoint}/api/transactions?page_size={PAGE_SIZE}");

        let mut events = Vec::new();
        let mut url = Some(first_url);
        let mut first_page = true;
        while let Some(current) = url {
            // start_time only applies to the first request; next links carry
            // the cursor themselves.
            let page = self
                .fetch_page(&current, if first_page { since } else { None })
                .await?;
            first_page = false;
            events.extend(
                page.data
                    .iter()
                    .filter_map(|row| row_to_event(&self.device_id, row)),
            );
            url = page.next;
        }

        debug!(device_id = %self.device_id, count = events.len(), "transactions fetched");
        Ok(events)
    }

    async fn disconnect(&mut self) {
        // Stateless API; dropping the client closes pooled connections.
        self.client = None;
    }

    #[instrument(name = "cloud_punch_test", skip(self), fields(device_id = %self.device_id))]
    async fn test_connection(&mut self) -> Result<bool, CoreError> {
        if !self.connect().await? {
            return Ok(false);
        }
        let (client, endpoint, key) = self.session()?;
        let response = client
            .get(format!("{endpoint}/api/ping"))
            .header("Authorization", format!("Token {key}"))
            .send()
            .await
            .map_err(|e| CoreError::connection(self.device_id.as_str(), e.to_string()))?;
        Ok(response.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_deserialization() {
        let body = r#"{
            "count": 2,
            "next": "https://cloud.test/api/transactions?page=2",
            "previous": null,
            "msg": "success",
            "code": 0,
            "data": [
                {
                    "id": 11,
                    "emp_code": "0042",
                    "punch_time": "2025-03-10 09:05:00",
                    "punch_state": "0",
                    "terminal_sn": "A8N5210060001"
                },
                {
                    "id": 12,
                    "emp_code": "0042",
                    "punch_time": "2025-03-10 17:31:09",
                    "punch_state": "1",
                    "terminal_sn": "A8N5210060001"
                }
            ]
        }"#;
        let page: TransactionPage = serde_json::from_str(body).unwrap();
        assert_eq!(page.data.len(), 2);
        assert!(page.next.is_some());

        let device_id = DeviceId::from("cloud-1");
        let event = row_to_event(&device_id, &page.data[0]).unwrap();
        assert_eq!(event.external_code, "0042");
        assert_eq!(event.direction, PunchDirection::In);
        assert_eq!(event.punched_at.timestamp(), 1741597500);
    }

    #[test]
    fn test_punch_time_formats() {
        assert!(parse_punch_time("2025-03-10 09:05:00").is_some());
        assert!(parse_punch_time("2025-03-10T09:05:00Z").is_some());
        assert!(parse_punch_time("yesterday-ish").is_none());
    }

    #[test]
    fn test_punch_state_mapping() {
        assert_eq!(parse_punch_state("0"), Some(PunchDirection::In));
        assert_eq!(parse_punch_state("1"), Some(PunchDirection::Out));
        assert_eq!(parse_punch_state("check_out"), Some(PunchDirection::Out));
        assert_eq!(parse_punch_state("5"), None);
    }

    #[tokio::test]
    async fn test_connect_without_credentials_fails_fast() {
        let device = contracts::Device {
            id: DeviceId::from("cloud-1"),
            name: "Cloud Terminal".into(),
            device_type: "cloud_punch".into(),
            connection: Default::default(),
            active: true,
            last_sync_at: None,
            last_sync_error: None,
        };
        let mut transport = CloudPunchTransport::new(&device);
        assert_eq!(transport.connect().await.unwrap(), false);
    }
}
