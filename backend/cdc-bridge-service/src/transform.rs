//! Event transformer.
//!
//! Turns one upstream [`ChangeEntry`] into the ordered list of
//! [`ChangeRecord`]s to publish, and derives the destination topic and
//! partition key from the entry header.

use prost::Message;
use tracing::debug;

use crate::canal::proto;
use crate::error::{BridgeError, Result};
use crate::model::{ChangeEntry, ChangeRecord, Column, EntryHeader, EventType, RecordHead};

/// How the partition key is encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyEncoding {
    /// Offset truncated to a signed 32-bit integer. Lossy for offsets past
    /// `i32::MAX`, kept as the default for consumers that expect Kafka's
    /// IntegerSerializer keys.
    #[default]
    Int32,
    /// Full 64-bit offset, matching Kafka's LongSerializer.
    Int64,
}

impl std::str::FromStr for KeyEncoding {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int32" | "int" | "integer" => Ok(KeyEncoding::Int32),
            "int64" | "long" => Ok(KeyEncoding::Int64),
            other => Err(BridgeError::Config(format!(
                "unknown partition key encoding '{}' (expected int32 or int64)",
                other
            ))),
        }
    }
}

/// Message key sent alongside a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionKey {
    Int32(i32),
    Int64(i64),
}

impl PartitionKey {
    /// Big-endian bytes, as Kafka's Integer/Long serializers write them.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            PartitionKey::Int32(v) => v.to_be_bytes().to_vec(),
            PartitionKey::Int64(v) => v.to_be_bytes().to_vec(),
        }
    }
}

impl std::fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PartitionKey::Int32(v) => write!(f, "{}", v),
            PartitionKey::Int64(v) => write!(f, "{}", v),
        }
    }
}

/// Topic a table's changes are published to.
pub fn destination_for(header: &EntryHeader) -> String {
    format!("sync_{}_{}", header.schema, header.table)
}

pub fn partition_key(header: &EntryHeader, encoding: KeyEncoding) -> PartitionKey {
    match encoding {
        KeyEncoding::Int32 => PartitionKey::Int32(header.source_offset as i32),
        KeyEncoding::Int64 => PartitionKey::Int64(header.source_offset),
    }
}

/// Derive the records for one entry.
///
/// Non row entries yield nothing. A payload that does not decode fails the
/// whole batch.
pub fn transform(entry: &ChangeEntry) -> Result<Vec<ChangeRecord>> {
    if !entry.kind.carries_rows() {
        return Ok(Vec::new());
    }

    let header = &entry.header;
    let change = proto::RowChange::decode(entry.payload.as_slice()).map_err(|e| {
        BridgeError::decode(
            format!(
                "row change at {}:{} ({}.{})",
                header.source_file, header.source_offset, header.schema, header.table
            ),
            e,
        )
    })?;

    let event_type = match change.event_type_or_default() {
        Some(proto::EventType::Insert) => EventType::Insert,
        Some(proto::EventType::Update) => EventType::Update,
        Some(proto::EventType::Delete) => EventType::Delete,
        other => {
            debug!(
                schema = %header.schema,
                table = %header.table,
                event_type = ?other,
                is_ddl = change.is_ddl,
                "Skipping non-DML row change"
            );
            return Ok(Vec::new());
        }
    };

    let records = change
        .row_datas
        .iter()
        .map(|row| ChangeRecord {
            head: RecordHead {
                source_file: header.source_file.clone(),
                source_offset: header.source_offset,
                schema: header.schema.clone(),
                table: header.table.clone(),
                event_type,
            },
            before: event_type
                .has_before()
                .then(|| convert_columns(&row.before_columns)),
            after: event_type
                .has_after()
                .then(|| convert_columns(&row.after_columns)),
        })
        .collect();

    Ok(records)
}

fn convert_columns(columns: &[proto::Column]) -> Vec<Column> {
    columns
        .iter()
        .map(|c| Column {
            name: c.name.clone(),
            value: if c.is_null.unwrap_or(false) {
                None
            } else {
                Some(c.value.clone())
            },
            updated: c.updated,
        })
        .collect()
}
