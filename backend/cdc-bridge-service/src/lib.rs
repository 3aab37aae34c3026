//! # Binlog change-capture to Kafka bridge
//!
//! Consumes ordered batches of row-level change events from a Canal server
//! and publishes one JSON message per changed row to Kafka, topic
//! `sync_<schema>_<table>`. A batch is acknowledged upstream only after every
//! message derived from it has been confirmed by the broker; otherwise it is
//! rolled back and redelivered (at-least-once).
//!
//! ```text
//! Supervisor ─▶ ConsumptionLoop ─▶ BatchProcessor ─▶ transform ─▶ RecordPublisher ─▶ Kafka
//!     ▲               │  ack / rollback
//!     └── restart ◀───┴── source or decode failure
//! ```

pub mod backoff;
pub mod canal;
pub mod config;
pub mod consumer;
pub mod context;
pub mod error;
pub mod kafka;
pub mod metrics;
pub mod model;
pub mod processor;
pub mod publisher;
pub mod source;
pub mod supervisor;
pub mod transform;

pub use error::{BridgeError, PublishError, Result};
