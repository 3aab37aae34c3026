/// Canal client tests against an in-process fake server speaking the
/// length-prefixed packet protocol.
use prost::Message;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use cdc_bridge_service::canal::proto::{self, PacketType};
use cdc_bridge_service::canal::{scramble411, CanalConnector, CLIENT_ID};
use cdc_bridge_service::config::CanalConfig;
use cdc_bridge_service::model::EntryKind;
use cdc_bridge_service::source::{ChangeSource, SourceConnector};

const SEEDS: &[u8] = b"0123456789abcdefghij";

/// How the fake server answers.
struct ServerScript {
    auth_error_code: i32,
    /// Replies to successive GET requests
    replies: VecDeque<proto::Packet>,
}

async fn read_frame(stream: &mut TcpStream) -> Option<proto::Packet> {
    let len = stream.read_u32().await.ok()? as usize;
    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf).await.ok()?;
    proto::Packet::decode(buf.as_slice()).ok()
}

async fn write_frame(stream: &mut TcpStream, packet: proto::Packet) {
    let frame = packet.encode_to_vec();
    stream.write_u32(frame.len() as u32).await.unwrap();
    stream.write_all(&frame).await.unwrap();
    stream.flush().await.unwrap();
}

fn ack(error_code: i32, message: &str) -> proto::Packet {
    let body = proto::Ack {
        error_code: Some(error_code),
        error_message: message.to_string(),
    };
    proto::Packet::new(PacketType::Ack, body.encode_to_vec())
}

/// Serve one connection and return every packet the client sent.
async fn spawn_server(mut script: ServerScript) -> (String, JoinHandle<Vec<proto::Packet>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let handshake = proto::Handshake {
            seeds: SEEDS.to_vec(),
            ..Default::default()
        };
        write_frame(
            &mut stream,
            proto::Packet::new(PacketType::Handshake, handshake.encode_to_vec()),
        )
        .await;

        let mut received = Vec::new();
        while let Some(packet) = read_frame(&mut stream).await {
            match PacketType::try_from(packet.r#type) {
                Ok(PacketType::ClientAuthentication) => {
                    write_frame(&mut stream, ack(script.auth_error_code, "auth failed")).await
                }
                Ok(PacketType::Subscription) => write_frame(&mut stream, ack(0, "")).await,
                Ok(PacketType::Get) => {
                    let reply = script.replies.pop_front().unwrap_or_else(|| {
                        let empty = proto::Messages {
                            batch_id: -1,
                            messages: Vec::new(),
                        };
                        proto::Packet::new(PacketType::Messages, empty.encode_to_vec())
                    });
                    write_frame(&mut stream, reply).await
                }
                _ => {}
            }
            received.push(packet);
        }
        received
    });

    (addr, handle)
}

fn config(addr: String, password: &str) -> CanalConfig {
    CanalConfig {
        addr,
        username: "canal".to_string(),
        password: password.to_string(),
        filter: None,
        batch_size: 100,
        fetch_timeout: Duration::from_millis(50),
        so_timeout: Duration::from_secs(5),
        connect_timeout: Duration::from_secs(5),
    }
}

fn messages(batch_id: i64, entries: Vec<proto::Entry>) -> proto::Packet {
    let body = proto::Messages {
        batch_id,
        messages: entries.iter().map(|e| e.encode_to_vec()).collect(),
    };
    proto::Packet::new(PacketType::Messages, body.encode_to_vec())
}

fn orders_entry(entry_type: proto::EntryType, offset: i64) -> proto::Entry {
    proto::Entry {
        header: Some(proto::Header {
            logfile_name: "mysql-bin.000003".to_string(),
            logfile_offset: offset,
            schema_name: "shop".to_string(),
            table_name: "orders".to_string(),
            ..Default::default()
        }),
        entry_type: Some(entry_type as i32),
        store_value: vec![0x10, 0x01],
    }
}

#[tokio::test]
async fn test_full_session() {
    let (addr, server) = spawn_server(ServerScript {
        auth_error_code: 0,
        replies: VecDeque::from(vec![messages(
            5,
            vec![
                orders_entry(proto::EntryType::TransactionBegin, 40),
                orders_entry(proto::EntryType::RowData, 42),
                orders_entry(proto::EntryType::TransactionEnd, 44),
            ],
        )]),
    })
    .await;

    let connector = CanalConnector::new(config(addr, "secret"), "example");
    let mut session = connector.connect().await.unwrap();
    session.subscribe(Some("shop\\..*")).await.unwrap();
    session.rollback_all().await.unwrap();

    let batch = session.get_without_ack(100).await.unwrap();
    assert_eq!(batch.id, 5);
    assert_eq!(batch.entries.len(), 3);
    assert_eq!(batch.entries[0].kind, EntryKind::TransactionBegin);
    assert_eq!(batch.entries[1].kind, EntryKind::RowChange);
    assert_eq!(batch.entries[1].header.source_offset, 42);
    assert_eq!(batch.entries[1].header.schema, "shop");
    assert_eq!(batch.entries[1].payload, vec![0x10, 0x01]);

    let empty = session.get_without_ack(100).await.unwrap();
    assert!(empty.is_noop());

    session.ack(5).await.unwrap();
    session.disconnect().await.unwrap();

    let received = server.await.unwrap();
    let types: Vec<i32> = received.iter().map(|p| p.r#type).collect();
    assert_eq!(
        types,
        vec![
            PacketType::ClientAuthentication as i32,
            PacketType::Subscription as i32,
            PacketType::ClientRollback as i32,
            PacketType::Get as i32,
            PacketType::Get as i32,
            PacketType::ClientAck as i32,
        ]
    );

    let auth = proto::ClientAuth::decode(received[0].body.as_slice()).unwrap();
    assert_eq!(auth.username, "canal");
    assert_eq!(auth.destination, "example");
    assert_eq!(auth.client_id, CLIENT_ID);
    assert_eq!(
        auth.password,
        hex::encode(scramble411(b"secret", SEEDS)).into_bytes()
    );

    let sub = proto::Sub::decode(received[1].body.as_slice()).unwrap();
    assert_eq!(sub.filter, "shop\\..*");

    let rollback = proto::ClientRollback::decode(received[2].body.as_slice()).unwrap();
    assert_eq!(rollback.batch_id, 0);

    let get = proto::Get::decode(received[3].body.as_slice()).unwrap();
    assert_eq!(get.fetch_size, 100);
    assert_eq!(get.auto_ack, Some(false));
    assert_eq!(get.timeout, Some(50));

    let client_ack = proto::ClientAck::decode(received[5].body.as_slice()).unwrap();
    assert_eq!(client_ack.batch_id, 5);
}

#[tokio::test]
async fn test_empty_password_is_sent_empty() {
    let (addr, server) = spawn_server(ServerScript {
        auth_error_code: 0,
        replies: VecDeque::new(),
    })
    .await;

    let mut session = CanalConnector::new(config(addr, ""), "example")
        .connect()
        .await
        .unwrap();
    session.disconnect().await.unwrap();

    let received = server.await.unwrap();
    let auth = proto::ClientAuth::decode(received[0].body.as_slice()).unwrap();
    assert!(auth.password.is_empty());
}

#[tokio::test]
async fn test_rejected_authentication() {
    let (addr, _server) = spawn_server(ServerScript {
        auth_error_code: 401,
        replies: VecDeque::new(),
    })
    .await;

    let err = CanalConnector::new(config(addr, "wrong"), "example")
        .connect()
        .await
        .err()
        .unwrap();
    assert_eq!(err.class(), "connection");
    assert!(err.to_string().contains("auth failed"));
}

#[tokio::test]
async fn test_get_error_ack() {
    let (addr, _server) = spawn_server(ServerScript {
        auth_error_code: 0,
        replies: VecDeque::from(vec![ack(400, "destination not subscribed")]),
    })
    .await;

    let mut session = CanalConnector::new(config(addr, "secret"), "example")
        .connect()
        .await
        .unwrap();
    let err = session.get_without_ack(10).await.unwrap_err();
    assert!(err.to_string().contains("destination not subscribed"));
}

#[tokio::test]
async fn test_unsupported_compression() {
    let mut compressed = messages(9, Vec::new());
    compressed.compression = Some(proto::Compression::Gzip as i32);
    let (addr, _server) = spawn_server(ServerScript {
        auth_error_code: 0,
        replies: VecDeque::from(vec![compressed]),
    })
    .await;

    let mut session = CanalConnector::new(config(addr, "secret"), "example")
        .connect()
        .await
        .unwrap();
    let err = session.get_without_ack(10).await.unwrap_err();
    assert_eq!(err.class(), "protocol");
}

#[tokio::test]
async fn test_connect_refused() {
    // Bind then drop to get a port nothing listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let err = CanalConnector::new(config(addr, "secret"), "example")
        .connect()
        .await
        .err()
        .unwrap();
    assert_eq!(err.class(), "connection");
}
