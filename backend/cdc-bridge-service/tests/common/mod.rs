//! Shared fixtures for the integration tests: a scripted change source and a
//! recording broker sink, plus builders for Canal row-change entries.
#![allow(dead_code)]

use async_trait::async_trait;
use prost::Message;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use cdc_bridge_service::canal::proto;
use cdc_bridge_service::model::{Batch, ChangeEntry, EntryHeader, EntryKind};
use cdc_bridge_service::publisher::{BrokerSink, Confirmation, SinkFactory};
use cdc_bridge_service::source::{ChangeSource, SourceConnector};
use cdc_bridge_service::{BridgeError, PublishError, Result};

// ==================== Change source ====================

/// Everything a scripted source was asked to do.
#[derive(Debug, Default)]
pub struct SourceLog {
    pub connects: usize,
    /// Clock reading at each connect attempt
    pub connected_at: Vec<tokio::time::Instant>,
    pub subscriptions: Vec<Option<String>>,
    pub fetches: usize,
    pub acks: Vec<i64>,
    pub rollbacks: Vec<i64>,
    pub rollback_alls: usize,
    pub disconnects: usize,
}

/// Replays a fixed list of fetch results, then fails with a source error.
pub struct ScriptedSource {
    batches: VecDeque<Result<Batch>>,
    log: Arc<Mutex<SourceLog>>,
}

impl ScriptedSource {
    pub fn new(batches: Vec<Result<Batch>>) -> (Self, Arc<Mutex<SourceLog>>) {
        let log = Arc::new(Mutex::new(SourceLog::default()));
        (
            Self {
                batches: batches.into(),
                log: Arc::clone(&log),
            },
            log,
        )
    }
}

#[async_trait]
impl ChangeSource for ScriptedSource {
    async fn subscribe(&mut self, filter: Option<&str>) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .subscriptions
            .push(filter.map(str::to_string));
        Ok(())
    }

    async fn get_without_ack(&mut self, _max_batch_size: i32) -> Result<Batch> {
        self.log.lock().unwrap().fetches += 1;
        self.batches
            .pop_front()
            .unwrap_or_else(|| Err(BridgeError::Source("connection reset by peer".into())))
    }

    async fn ack(&mut self, batch_id: i64) -> Result<()> {
        self.log.lock().unwrap().acks.push(batch_id);
        Ok(())
    }

    async fn rollback(&mut self, batch_id: i64) -> Result<()> {
        self.log.lock().unwrap().rollbacks.push(batch_id);
        Ok(())
    }

    async fn rollback_all(&mut self) -> Result<()> {
        self.log.lock().unwrap().rollback_alls += 1;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.log.lock().unwrap().disconnects += 1;
        Ok(())
    }
}

/// Hands out one scripted session per connect; refuses once the scripts run out.
pub struct ScriptedConnector {
    cycles: Mutex<VecDeque<Vec<Result<Batch>>>>,
    log: Arc<Mutex<SourceLog>>,
}

impl ScriptedConnector {
    pub fn new(cycles: Vec<Vec<Result<Batch>>>) -> (Self, Arc<Mutex<SourceLog>>) {
        let log = Arc::new(Mutex::new(SourceLog::default()));
        (
            Self {
                cycles: Mutex::new(cycles.into()),
                log: Arc::clone(&log),
            },
            log,
        )
    }
}

#[async_trait]
impl SourceConnector for ScriptedConnector {
    type Source = ScriptedSource;

    async fn connect(&self) -> Result<ScriptedSource> {
        {
            let mut log = self.log.lock().unwrap();
            log.connects += 1;
            log.connected_at.push(tokio::time::Instant::now());
        }
        let batches = self
            .cycles
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| BridgeError::Source("connection refused".into()))?;
        Ok(ScriptedSource {
            batches: batches.into(),
            log: Arc::clone(&self.log),
        })
    }
}

// ==================== Broker sink ====================

/// Scripted broker answer for one send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Confirm,
    Reject,
    NoMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub topic: String,
    pub key: Vec<u8>,
    pub payload: String,
}

/// Records every send; answers from a script, confirming once it runs out.
#[derive(Clone, Default)]
pub struct RecordingSink {
    answers: Arc<Mutex<VecDeque<Answer>>>,
    pub sent: Arc<Mutex<Vec<SentMessage>>>,
    pub closes: Arc<AtomicUsize>,
}

impl RecordingSink {
    pub fn with_answers(answers: Vec<Answer>) -> Self {
        Self {
            answers: Arc::new(Mutex::new(answers.into())),
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrokerSink for RecordingSink {
    async fn send(
        &self,
        destination: &str,
        key: &[u8],
        payload: &str,
    ) -> std::result::Result<Option<Confirmation>, PublishError> {
        let offset = {
            let mut sent = self.sent.lock().unwrap();
            sent.push(SentMessage {
                topic: destination.to_string(),
                key: key.to_vec(),
                payload: payload.to_string(),
            });
            sent.len() as i64 - 1
        };

        let answer = self
            .answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Answer::Confirm);
        match answer {
            Answer::Confirm => Ok(Some(Confirmation {
                partition: 0,
                offset,
            })),
            Answer::Reject => Err(PublishError::Rejected("Message timed out".into())),
            Answer::NoMetadata => Ok(None),
        }
    }

    async fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Every created sink shares the same recording.
#[derive(Clone, Default)]
pub struct RecordingSinkFactory {
    pub sink: RecordingSink,
    pub creates: Arc<AtomicUsize>,
}

impl SinkFactory for RecordingSinkFactory {
    type Sink = RecordingSink;

    fn create(&self) -> Result<RecordingSink> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(self.sink.clone())
    }
}

// ==================== Entry builders ====================

pub fn column(name: &str, value: &str, updated: bool) -> proto::Column {
    proto::Column {
        name: name.to_string(),
        value: value.to_string(),
        updated,
        is_null: Some(false),
        ..Default::default()
    }
}

pub fn null_column(name: &str) -> proto::Column {
    proto::Column {
        name: name.to_string(),
        is_null: Some(true),
        ..Default::default()
    }
}

pub fn row(before: Vec<proto::Column>, after: Vec<proto::Column>) -> proto::RowData {
    proto::RowData {
        before_columns: before,
        after_columns: after,
        props: Vec::new(),
    }
}

pub fn header(schema: &str, table: &str, file: &str, offset: i64) -> EntryHeader {
    EntryHeader {
        source_file: file.to_string(),
        source_offset: offset,
        schema: schema.to_string(),
        table: table.to_string(),
    }
}

/// A row-change entry carrying an encoded `RowChange`.
pub fn row_entry(
    header: EntryHeader,
    event_type: proto::EventType,
    rows: Vec<proto::RowData>,
) -> ChangeEntry {
    let change = proto::RowChange {
        event_type: Some(event_type as i32),
        row_datas: rows,
        ..Default::default()
    };
    ChangeEntry {
        kind: EntryKind::RowChange,
        header,
        payload: change.encode_to_vec(),
    }
}

pub fn marker(kind: EntryKind) -> ChangeEntry {
    ChangeEntry {
        kind,
        header: header("shop", "orders", "mysql-bin.000003", 4),
        payload: Vec::new(),
    }
}

/// An insert into `shop.orders` with one row per id.
pub fn insert_orders(offset: i64, ids: &[i64]) -> ChangeEntry {
    row_entry(
        header("shop", "orders", "mysql-bin.000003", offset),
        proto::EventType::Insert,
        ids.iter()
            .map(|id| row(Vec::new(), vec![column("id", &id.to_string(), true)]))
            .collect(),
    )
}
