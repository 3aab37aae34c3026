use async_trait::async_trait;
use prost::Message;
use sha1::{Digest, Sha1};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info};

use super::proto::{self, Compression, PacketType};
use crate::config::CanalConfig;
use crate::error::{BridgeError, Result};
use crate::model::{Batch, ChangeEntry, EntryHeader, EntryKind};
use crate::source::{ChangeSource, SourceConnector};

/// Client identity Canal associates with a subscription.
pub const CLIENT_ID: &str = "1001";

/// Upper bound on a single frame; guards against a corrupt length prefix.
const MAX_FRAME_LEN: usize = 256 * 1024 * 1024;

/// Opens Canal sessions for one destination.
pub struct CanalConnector {
    config: CanalConfig,
    destination: String,
}

impl CanalConnector {
    pub fn new(config: CanalConfig, destination: impl Into<String>) -> Self {
        Self {
            config,
            destination: destination.into(),
        }
    }
}

#[async_trait]
impl SourceConnector for CanalConnector {
    type Source = CanalSession;

    async fn connect(&self) -> Result<CanalSession> {
        CanalSession::open(&self.config, &self.destination).await
    }
}

/// An authenticated connection to a Canal server.
pub struct CanalSession {
    stream: TcpStream,
    destination: String,
    so_timeout: Duration,
    fetch_timeout: Duration,
    connected: bool,
}

impl CanalSession {
    pub async fn open(config: &CanalConfig, destination: &str) -> Result<Self> {
        let stream = timeout(config.connect_timeout, TcpStream::connect(&config.addr))
            .await
            .map_err(|_| {
                BridgeError::Source(format!(
                    "connect to canal server {} timed out after {:?}",
                    config.addr, config.connect_timeout
                ))
            })?
            .map_err(|e| {
                BridgeError::Source(format!("connect to canal server {} failed: {}", config.addr, e))
            })?;
        stream.set_nodelay(true)?;

        let mut session = Self {
            stream,
            destination: destination.to_string(),
            so_timeout: config.so_timeout,
            fetch_timeout: config.fetch_timeout,
            connected: false,
        };

        session.handshake(config).await?;
        session.connected = true;

        info!(
            addr = %config.addr,
            destination = %destination,
            "Canal session established"
        );
        Ok(session)
    }

    async fn handshake(&mut self, config: &CanalConfig) -> Result<()> {
        let packet = self.read_packet(self.so_timeout).await?;
        if packet.version_or_default() != proto::PACKET_VERSION {
            return Err(BridgeError::Protocol(format!(
                "unsupported canal protocol version {}",
                packet.version_or_default()
            )));
        }
        if packet.r#type != PacketType::Handshake as i32 {
            return Err(BridgeError::Protocol(format!(
                "expected handshake, got packet type {}",
                packet.r#type
            )));
        }

        let handshake = proto::Handshake::decode(packet.body.as_slice())
            .map_err(|e| BridgeError::decode("canal handshake", e))?;

        let password = if config.password.is_empty() {
            Vec::new()
        } else {
            hex::encode(scramble411(config.password.as_bytes(), &handshake.seeds)).into_bytes()
        };
        let idle_ms = i32::try_from(self.so_timeout.as_millis()).unwrap_or(i32::MAX);

        let auth = proto::ClientAuth {
            username: config.username.clone(),
            password,
            net_read_timeout: Some(idle_ms),
            net_write_timeout: Some(idle_ms),
            destination: self.destination.clone(),
            client_id: CLIENT_ID.to_string(),
            filter: String::new(),
            start_timestamp: 0,
        };
        self.write_packet(PacketType::ClientAuthentication, auth.encode_to_vec())
            .await?;
        self.expect_ack("authentication").await
    }

    async fn read_packet(&mut self, wait: Duration) -> Result<proto::Packet> {
        let stream = &mut self.stream;
        let body = timeout(wait, async {
            let len = stream.read_u32().await? as usize;
            if len > MAX_FRAME_LEN {
                return Err(BridgeError::Protocol(format!(
                    "frame of {} bytes exceeds limit",
                    len
                )));
            }
            let mut buf = vec![0u8; len];
            stream.read_exact(&mut buf).await?;
            Ok::<_, BridgeError>(buf)
        })
        .await
        .map_err(|_| BridgeError::Source(format!("canal read timed out after {:?}", wait)))??;

        proto::Packet::decode(body.as_slice()).map_err(|e| BridgeError::decode("canal packet", e))
    }

    async fn write_packet(&mut self, packet_type: PacketType, body: Vec<u8>) -> Result<()> {
        let frame = proto::Packet::new(packet_type, body).encode_to_vec();
        let len = u32::try_from(frame.len())
            .map_err(|_| BridgeError::Protocol("outgoing frame too large".into()))?;

        self.stream.write_u32(len).await?;
        self.stream.write_all(&frame).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn expect_ack(&mut self, what: &str) -> Result<()> {
        let packet = self.read_packet(self.so_timeout).await?;
        if packet.r#type != PacketType::Ack as i32 {
            return Err(BridgeError::Protocol(format!(
                "expected ack for {}, got packet type {}",
                what, packet.r#type
            )));
        }
        let ack = proto::Ack::decode(packet.body.as_slice())
            .map_err(|e| BridgeError::decode("canal ack", e))?;
        match ack.error_code.unwrap_or(0) {
            0 => Ok(()),
            code => Err(BridgeError::Source(format!(
                "canal rejected {} ({}): {}",
                what, code, ack.error_message
            ))),
        }
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.connected {
            Ok(())
        } else {
            Err(BridgeError::Source("canal session is not connected".into()))
        }
    }
}

#[async_trait]
impl ChangeSource for CanalSession {
    async fn subscribe(&mut self, filter: Option<&str>) -> Result<()> {
        self.ensure_connected()?;
        let sub = proto::Sub {
            destination: self.destination.clone(),
            client_id: CLIENT_ID.to_string(),
            filter: filter.unwrap_or_default().to_string(),
        };
        self.write_packet(PacketType::Subscription, sub.encode_to_vec())
            .await?;
        self.expect_ack("subscription").await?;
        debug!(destination = %self.destination, filter = ?filter, "Subscribed");
        Ok(())
    }

    async fn get_without_ack(&mut self, max_batch_size: i32) -> Result<Batch> {
        self.ensure_connected()?;
        let fetch_ms = i64::try_from(self.fetch_timeout.as_millis()).unwrap_or(i64::MAX);
        let get = proto::Get {
            destination: self.destination.clone(),
            client_id: CLIENT_ID.to_string(),
            fetch_size: max_batch_size,
            timeout: Some(fetch_ms),
            unit: Some(proto::TIME_UNIT_MILLISECONDS),
            auto_ack: Some(false),
        };
        self.write_packet(PacketType::Get, get.encode_to_vec()).await?;

        // The server may legitimately hold the request for the fetch timeout.
        let packet = self.read_packet(self.so_timeout + self.fetch_timeout).await?;
        match PacketType::try_from(packet.r#type) {
            Ok(PacketType::Messages) => {
                match packet.compression_or_default() {
                    Compression::None | Compression::CompatibleProto2 => {}
                    other => {
                        return Err(BridgeError::Protocol(format!(
                            "compression {:?} is not supported",
                            other
                        )))
                    }
                }
                let messages = proto::Messages::decode(packet.body.as_slice())
                    .map_err(|e| BridgeError::decode("canal messages", e))?;
                let entries = messages
                    .messages
                    .iter()
                    .map(|raw| decode_entry(raw))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Batch {
                    id: messages.batch_id,
                    entries,
                })
            }
            Ok(PacketType::Ack) => {
                let ack = proto::Ack::decode(packet.body.as_slice())
                    .map_err(|e| BridgeError::decode("canal ack", e))?;
                Err(BridgeError::Source(format!(
                    "canal get failed: {}",
                    ack.error_message
                )))
            }
            _ => Err(BridgeError::Protocol(format!(
                "unexpected packet type {} in reply to get",
                packet.r#type
            ))),
        }
    }

    async fn ack(&mut self, batch_id: i64) -> Result<()> {
        self.ensure_connected()?;
        let ack = proto::ClientAck {
            destination: self.destination.clone(),
            client_id: CLIENT_ID.to_string(),
            batch_id,
        };
        self.write_packet(PacketType::ClientAck, ack.encode_to_vec())
            .await
    }

    async fn rollback(&mut self, batch_id: i64) -> Result<()> {
        self.ensure_connected()?;
        let rollback = proto::ClientRollback {
            destination: self.destination.clone(),
            client_id: CLIENT_ID.to_string(),
            batch_id,
        };
        self.write_packet(PacketType::ClientRollback, rollback.encode_to_vec())
            .await
    }

    async fn rollback_all(&mut self) -> Result<()> {
        // Batch id 0 rolls back every outstanding batch.
        self.rollback(0).await
    }

    async fn disconnect(&mut self) -> Result<()> {
        if !self.connected {
            return Ok(());
        }
        self.connected = false;
        self.stream.shutdown().await?;
        debug!(destination = %self.destination, "Canal session closed");
        Ok(())
    }
}

fn decode_entry(raw: &[u8]) -> Result<ChangeEntry> {
    let entry =
        proto::Entry::decode(raw).map_err(|e| BridgeError::decode("canal entry", e))?;

    let kind = match entry.entry_type_or_default() {
        Some(proto::EntryType::TransactionBegin) => EntryKind::TransactionBegin,
        Some(proto::EntryType::TransactionEnd) => EntryKind::TransactionEnd,
        Some(proto::EntryType::Heartbeat) => EntryKind::Heartbeat,
        Some(proto::EntryType::GtidLog) => EntryKind::Gtid,
        // Anything else is handed to the transformer as row data.
        _ => EntryKind::RowChange,
    };

    let header = entry
        .header
        .map(|h| EntryHeader {
            source_file: h.logfile_name,
            source_offset: h.logfile_offset,
            schema: h.schema_name,
            table: h.table_name,
        })
        .unwrap_or_default();

    Ok(ChangeEntry {
        kind,
        header,
        payload: entry.store_value,
    })
}

/// MySQL 4.1 password scramble: `SHA1(pw) XOR SHA1(seed + SHA1(SHA1(pw)))`.
pub fn scramble411(password: &[u8], seed: &[u8]) -> [u8; 20] {
    let stage1 = Sha1::digest(password);
    let stage2 = Sha1::digest(stage1);

    let mut hasher = Sha1::new();
    hasher.update(seed);
    hasher.update(stage2);
    let token = hasher.finalize();

    let mut out = [0u8; 20];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = token[i] ^ stage1[i];
    }
    out
}
