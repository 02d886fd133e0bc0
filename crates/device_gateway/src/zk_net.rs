//! ZK-style stateful binary/TCP transport.
//!
//! Wire format (little-endian throughout): 8-byte frame header
//! `[cmd u16][session u16][reply u16][len u16]` followed by `len` payload
//! bytes. Attendance records in a `CMD_ATTLOG` reply are fixed 16-byte rows:
//! 9 bytes NUL-padded ASCII enroll code, u32 unix timestamp, u8 direction
//! (0 = in, 1 = out), 2 bytes reserved.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, instrument, warn};

use contracts::{CoreError, Device, DeviceId, DeviceTransport, PunchDirection, RawPunchEvent};

const CMD_CONNECT: u16 = 1000;
const CMD_EXIT: u16 = 1001;
const CMD_ATTLOG: u16 = 13;
const CMD_ACK_OK: u16 = 2000;

const HEADER_LEN: usize = 8;
const ATTLOG_RECORD_LEN: usize = 16;
const CODE_FIELD_LEN: usize = 9;

/// One decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Frame {
    cmd: u16,
    session: u16,
    reply: u16,
    payload: Vec<u8>,
}

fn encode_frame(cmd: u16, session: u16, reply: u16, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
    buf.extend_from_slice(&cmd.to_le_bytes());
    buf.extend_from_slice(&session.to_le_bytes());
    buf.extend_from_slice(&reply.to_le_bytes());
    buf.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    buf.extend_from_slice(payload);
    buf
}

fn parse_header(header: &[u8; HEADER_LEN]) -> (u16, u16, u16, u16) {
    let cmd = u16::from_le_bytes([header[0], header[1]]);
    let session = u16::from_le_bytes([header[2], header[3]]);
    let reply = u16::from_le_bytes([header[4], header[5]]);
    let len = u16::from_le_bytes([header[6], header[7]]);
    (cmd, session, reply, len)
}

/// Decode an ATTLOG payload into punch events.
///
/// Rows that do not decode (truncated tail, empty code, unparseable
/// timestamp) are skipped with a warning; one bad row must not poison the
/// batch.
fn parse_attlog(device_id: &DeviceId, payload: &[u8]) -> Vec<RawPunchEvent> {
    let mut events = Vec::with_capacity(payload.len() / ATTLOG_RECORD_LEN);

    for chunk in payload.chunks(ATTLOG_RECORD_LEN) {
        if chunk.len() < ATTLOG_RECORD_LEN {
            warn!(
                device_id = %device_id,
                tail = chunk.len(),
                "truncated attlog record, skipping"
            );
            continue;
        }

        let code_raw = &chunk[..CODE_FIELD_LEN];
        let code: String = code_raw
            .iter()
            .take_while(|&&b| b != 0)
            .map(|&b| b as char)
            .collect();
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_graphic()) {
            warn!(device_id = %device_id, "attlog record with invalid enroll code, skipping");
            continue;
        }

        let ts = u32::from_le_bytes([chunk[9], chunk[10], chunk[11], chunk[12]]);
        let Some(punched_at) = DateTime::<Utc>::from_timestamp(i64::from(ts), 0) else {
            warn!(device_id = %device_id, ts, "attlog record with invalid timestamp, skipping");
            continue;
        };

        let direction = match chunk[13] {
            0 => PunchDirection::In,
            1 => PunchDirection::Out,
            other => {
                warn!(device_id = %device_id, state = other, "unknown punch state, skipping");
                continue;
            }
        };

        events.push(RawPunchEvent {
            device_id: device_id.clone(),
            external_code: code,
            punched_at,
            direction,
            payload: Bytes::copy_from_slice(chunk),
        });
    }

    events
}

/// Stateful TCP transport for ZK-style terminals.
#[derive(Debug)]
pub struct ZkNetTransport {
    device_id: DeviceId,
    host: Option<String>,
    port: Option<u16>,
    stream: Option<TcpStream>,
    session: u16,
    reply: u16,
}

impl ZkNetTransport {
    pub fn new(device: &Device) -> Self {
        Self {
            device_id: device.id.clone(),
            host: device.connection.host.clone(),
            port: device.connection.port,
            stream: None,
            session: 0,
            reply: 0,
        }
    }

    async fn send_command(&mut self, cmd: u16, payload: &[u8]) -> Result<Frame, CoreError> {
        let device_id = self.device_id.clone();
        let session = self.session;
        self.reply = self.reply.wrapping_add(1);
        let reply = self.reply;

        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| CoreError::connection(device_id.as_str(), "not connected"))?;

        stream
            .write_all(&encode_frame(cmd, session, reply, payload))
            .await
            .map_err(|e| CoreError::connection(device_id.as_str(), e.to_string()))?;

        let mut header = [0u8; HEADER_LEN];
        stream
            .read_exact(&mut header)
            .await
            .map_err(|e| CoreError::connection(device_id.as_str(), e.to_string()))?;
        let (cmd, session, reply, len) = parse_header(&header);

        let mut payload = vec![0u8; usize::from(len)];
        stream
            .read_exact(&mut payload)
            .await
            .map_err(|e| CoreError::connection(device_id.as_str(), e.to_string()))?;

        Ok(Frame {
            cmd,
            session,
            reply,
            payload,
        })
    }
}

impl DeviceTransport for ZkNetTransport {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    #[instrument(name = "zk_net_connect", skip(self), fields(device_id = %self.device_id))]
    async fn connect(&mut self) -> Result<bool, CoreError> {
        if self.stream.is_some() {
            return Ok(true);
        }

        let (Some(host), Some(port)) = (self.host.clone(), self.port) else {
            return Ok(false);
        };

        let stream = TcpStream::connect((host.as_str(), port))
            .await
            .map_err(|e| CoreError::connection(self.device_id.as_str(), e.to_string()))?;
        self.stream = Some(stream);

        let ack = self.send_command(CMD_CONNECT, &[]).await?;
        if ack.cmd != CMD_ACK_OK {
            self.stream = None;
            return Err(CoreError::protocol(
                self.device_id.as_str(),
                format!("handshake rejected with command {}", ack.cmd),
            ));
        }

        // The terminal assigns the session id in its handshake ack.
        self.session = ack.session;
        debug!(device_id = %self.device_id, session = self.session, "terminal session open");
        Ok(true)
    }

    #[instrument(
        name = "zk_net_fetch_logs",
        skip(self),
        fields(device_id = %self.device_id, since = ?since)
    )]
    async fn fetch_logs(
        &mut self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RawPunchEvent>, CoreError> {
        // 0 asks for the full retained history.
        let floor = since
            .map(|t| u32::try_from(t.timestamp().max(0)).unwrap_or(u32::MAX))
            .unwrap_or(0);

        let reply = self.send_command(CMD_ATTLOG, &floor.to_le_bytes()).await?;
        if reply.cmd != CMD_ACK_OK {
            return Err(CoreError::protocol(
                self.device_id.as_str(),
                format!("attlog request rejected with command {}", reply.cmd),
            ));
        }

        let events = parse_attlog(&self.device_id, &reply.payload);
        debug!(device_id = %self.device_id, count = events.len(), "attlog fetched");
        Ok(events)
    }

    #[instrument(name = "zk_net_disconnect", skip(self), fields(device_id = %self.device_id))]
    async fn disconnect(&mut self) {
        if self.stream.is_some() {
            // Best-effort goodbye; the terminal reaps dead sessions anyway.
            if let Err(e) = self.send_command(CMD_EXIT, &[]).await {
                debug!(device_id = %self.device_id, error = %e, "exit command failed");
            }
        }
        self.stream = None;
        self.session = 0;
    }

    async fn test_connection(&mut self) -> Result<bool, CoreError> {
        self.connect().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attlog_record(code: &str, ts: u32, state: u8) -> Vec<u8> {
        let mut rec = vec![0u8; ATTLOG_RECORD_LEN];
        rec[..code.len()].copy_from_slice(code.as_bytes());
        rec[9..13].copy_from_slice(&ts.to_le_bytes());
        rec[13] = state;
        rec
    }

    #[test]
    fn test_frame_round_trip() {
        let encoded = encode_frame(CMD_ATTLOG, 7, 3, b"abc");
        assert_eq!(encoded.len(), HEADER_LEN + 3);

        let mut header = [0u8; HEADER_LEN];
        header.copy_from_slice(&encoded[..HEADER_LEN]);
        let (cmd, session, reply, len) = parse_header(&header);
        assert_eq!(cmd, CMD_ATTLOG);
        assert_eq!(session, 7);
        assert_eq!(reply, 3);
        assert_eq!(usize::from(len), 3);
        assert_eq!(&encoded[HEADER_LEN..], b"abc");
    }

    #[test]
    fn test_parse_attlog_rows() {
        let device_id = DeviceId::from("gate-1");
        let mut payload = attlog_record("0042", 1_700_000_000, 0);
        payload.extend(attlog_record("0099", 1_700_000_100, 1));

        let events = parse_attlog(&device_id, &payload);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].external_code, "0042");
        assert_eq!(events[0].direction, PunchDirection::In);
        assert_eq!(events[0].punched_at.timestamp(), 1_700_000_000);
        assert_eq!(events[1].external_code, "0099");
        assert_eq!(events[1].direction, PunchDirection::Out);
        // Raw row preserved as the audit payload.
        assert_eq!(events[1].payload.len(), ATTLOG_RECORD_LEN);
    }

    #[test]
    fn test_parse_attlog_skips_bad_rows() {
        let device_id = DeviceId::from("gate-1");
        let mut payload = attlog_record("", 1_700_000_000, 0); // empty code
        payload.extend(attlog_record("0007", 1_700_000_000, 9)); // unknown state
        payload.extend(attlog_record("0042", 1_700_000_000, 1)); // good
        payload.extend([1, 2, 3]); // truncated tail

        let events = parse_attlog(&device_id, &payload);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].external_code, "0042");
    }

    #[tokio::test]
    async fn test_connect_without_address_fails_fast() {
        let device = contracts::Device {
            id: DeviceId::from("gate-1"),
            name: "Main Gate".into(),
            device_type: "zk_net".into(),
            connection: Default::default(),
            active: true,
            last_sync_at: None,
            last_sync_error: None,
        };
        let mut transport = ZkNetTransport::new(&device);
        assert_eq!(transport.connect().await.unwrap(), false);
        // Disconnect on a never-connected transport is a no-op.
        transport.disconnect().await;
    }
}
