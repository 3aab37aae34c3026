//! Change record model.
//!
//! `ChangeEntry` and `Batch` are what the source hands to the bridge;
//! `ChangeRecord` is what gets published. Field order on the serde structs is
//! the wire order of the published JSON and must not be rearranged.

use serde::{Deserialize, Serialize};

/// Batch id the source uses for "nothing to deliver".
pub const EMPTY_BATCH_ID: i64 = -1;

/// Kind tag of an upstream entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    TransactionBegin,
    TransactionEnd,
    RowChange,
    Heartbeat,
    Gtid,
}

impl EntryKind {
    /// Only row changes carry a payload worth decoding.
    pub fn carries_rows(&self) -> bool {
        matches!(self, EntryKind::RowChange)
    }
}

/// Position and table of an upstream entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EntryHeader {
    pub source_file: String,
    pub source_offset: i64,
    pub schema: String,
    pub table: String,
}

/// A single entry of a change-capture batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEntry {
    pub kind: EntryKind,
    pub header: EntryHeader,
    /// Encoded row change; empty for non row entries
    pub payload: Vec<u8>,
}

/// A fetched change-capture batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub id: i64,
    pub entries: Vec<ChangeEntry>,
}

impl Batch {
    pub fn empty() -> Self {
        Self {
            id: EMPTY_BATCH_ID,
            entries: Vec::new(),
        }
    }

    /// A no-op fetch is neither acked nor rolled back.
    pub fn is_noop(&self) -> bool {
        self.id == EMPTY_BATCH_ID || self.entries.is_empty()
    }
}

/// Row-level DML operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    Insert,
    Update,
    Delete,
}

impl EventType {
    pub fn has_before(&self) -> bool {
        matches!(self, EventType::Update | EventType::Delete)
    }

    pub fn has_after(&self) -> bool {
        matches!(self, EventType::Update | EventType::Insert)
    }
}

/// One column of a row image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub value: Option<String>,
    #[serde(rename = "update")]
    pub updated: bool,
}

/// Header of a published record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordHead {
    #[serde(rename = "binlog_file")]
    pub source_file: String,
    #[serde(rename = "binlog_pos")]
    pub source_offset: i64,
    #[serde(rename = "db")]
    pub schema: String,
    pub table: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
}

/// One published row mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub head: RecordHead,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<Vec<Column>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<Vec<Column>>,
}

impl ChangeRecord {
    /// Render the record as the UTF-8 JSON message body.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
