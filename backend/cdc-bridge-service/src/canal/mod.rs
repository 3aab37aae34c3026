//! Canal change-capture source.
//!
//! Speaks Canal's TCP protocol: 4-byte big-endian length-prefixed protobuf
//! packets, a handshake/auth exchange, then subscription, `get` without
//! auto-ack, and explicit ack/rollback by batch id.

mod client;
pub mod proto;

pub use client::{scramble411, CanalConnector, CanalSession, CLIENT_ID};
