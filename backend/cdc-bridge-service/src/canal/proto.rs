//! Canal protocol messages.
//!
//! Hand-maintained `prost` definitions for the subset of Canal's
//! `CanalProtocol.proto` (packet envelope) and `EntryProtocol.proto`
//! (binlog entries) the bridge needs. Canal's single-field `oneof
//! *_present` wrappers are modelled as proto3 `optional` fields, which share
//! the same wire encoding; the accessor methods apply Canal's proto2
//! defaults when the field is absent.

// ---------------------------------------------------------------------------
// Packet envelope
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Compression {
    CompatibleProto2 = 0,
    None = 1,
    Zlib = 2,
    Gzip = 3,
    Lzf = 4,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum PacketType {
    CompatibleProto2 = 0,
    Handshake = 1,
    ClientAuthentication = 2,
    Ack = 3,
    Subscription = 4,
    Unsubscription = 5,
    Get = 6,
    Messages = 7,
    ClientAck = 8,
    Shutdown = 9,
    Dump = 10,
    Heartbeat = 11,
    ClientRollback = 12,
}

pub const PACKET_MAGIC: i32 = 17;
pub const PACKET_VERSION: i32 = 1;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Packet {
    #[prost(int32, optional, tag = "1")]
    pub magic_number: ::core::option::Option<i32>,
    #[prost(int32, optional, tag = "2")]
    pub version: ::core::option::Option<i32>,
    #[prost(enumeration = "PacketType", tag = "3")]
    pub r#type: i32,
    #[prost(enumeration = "Compression", optional, tag = "4")]
    pub compression: ::core::option::Option<i32>,
    #[prost(bytes = "vec", tag = "5")]
    pub body: ::prost::alloc::vec::Vec<u8>,
}

impl Packet {
    pub fn new(packet_type: PacketType, body: Vec<u8>) -> Self {
        Self {
            magic_number: Some(PACKET_MAGIC),
            version: Some(PACKET_VERSION),
            r#type: packet_type as i32,
            compression: Some(Compression::None as i32),
            body,
        }
    }

    pub fn version_or_default(&self) -> i32 {
        self.version.unwrap_or(PACKET_VERSION)
    }

    pub fn compression_or_default(&self) -> Compression {
        self.compression
            .and_then(|c| Compression::try_from(c).ok())
            .unwrap_or(Compression::None)
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Handshake {
    #[prost(string, optional, tag = "1")]
    pub communication_encoding: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(bytes = "vec", tag = "2")]
    pub seeds: ::prost::alloc::vec::Vec<u8>,
    #[prost(enumeration = "Compression", tag = "3")]
    pub supported_compressions: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClientAuth {
    #[prost(string, tag = "1")]
    pub username: ::prost::alloc::string::String,
    #[prost(bytes = "vec", tag = "2")]
    pub password: ::prost::alloc::vec::Vec<u8>,
    #[prost(int32, optional, tag = "3")]
    pub net_read_timeout: ::core::option::Option<i32>,
    #[prost(int32, optional, tag = "4")]
    pub net_write_timeout: ::core::option::Option<i32>,
    #[prost(string, tag = "5")]
    pub destination: ::prost::alloc::string::String,
    #[prost(string, tag = "6")]
    pub client_id: ::prost::alloc::string::String,
    #[prost(string, tag = "7")]
    pub filter: ::prost::alloc::string::String,
    #[prost(int64, tag = "8")]
    pub start_timestamp: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Ack {
    #[prost(int32, optional, tag = "1")]
    pub error_code: ::core::option::Option<i32>,
    #[prost(string, tag = "2")]
    pub error_message: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClientAck {
    #[prost(string, tag = "1")]
    pub destination: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub client_id: ::prost::alloc::string::String,
    #[prost(int64, tag = "3")]
    pub batch_id: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Sub {
    #[prost(string, tag = "1")]
    pub destination: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub client_id: ::prost::alloc::string::String,
    #[prost(string, tag = "7")]
    pub filter: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Get {
    #[prost(string, tag = "1")]
    pub destination: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub client_id: ::prost::alloc::string::String,
    #[prost(int32, tag = "3")]
    pub fetch_size: i32,
    /// Server-side wait; -1 returns immediately.
    #[prost(int64, optional, tag = "4")]
    pub timeout: ::core::option::Option<i64>,
    /// `java.util.concurrent.TimeUnit` ordinal; 2 is milliseconds.
    #[prost(int32, optional, tag = "5")]
    pub unit: ::core::option::Option<i32>,
    #[prost(bool, optional, tag = "6")]
    pub auto_ack: ::core::option::Option<bool>,
}

pub const TIME_UNIT_MILLISECONDS: i32 = 2;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Messages {
    #[prost(int64, tag = "1")]
    pub batch_id: i64,
    #[prost(bytes = "vec", repeated, tag = "2")]
    pub messages: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClientRollback {
    #[prost(string, tag = "1")]
    pub destination: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub client_id: ::prost::alloc::string::String,
    #[prost(int64, tag = "3")]
    pub batch_id: i64,
}

// ---------------------------------------------------------------------------
// Binlog entries
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum EntryType {
    CompatibleProto2 = 0,
    TransactionBegin = 1,
    RowData = 2,
    TransactionEnd = 3,
    Heartbeat = 4,
    GtidLog = 5,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum EventType {
    CompatibleProto2 = 0,
    Insert = 1,
    Update = 2,
    Delete = 3,
    Create = 4,
    Alter = 5,
    Erase = 6,
    Query = 7,
    Truncate = 8,
    Rename = 9,
    CIndex = 10,
    DIndex = 11,
    Gtid = 12,
    XaCommit = 13,
    XaRollback = 14,
    MHeartbeat = 15,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Entry {
    #[prost(message, optional, tag = "1")]
    pub header: ::core::option::Option<Header>,
    #[prost(enumeration = "EntryType", optional, tag = "2")]
    pub entry_type: ::core::option::Option<i32>,
    #[prost(bytes = "vec", tag = "3")]
    pub store_value: ::prost::alloc::vec::Vec<u8>,
}

impl Entry {
    /// Entry kind; absent on the wire means row data.
    pub fn entry_type_or_default(&self) -> Option<EntryType> {
        match self.entry_type {
            None => Some(EntryType::RowData),
            Some(raw) => EntryType::try_from(raw).ok(),
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Pair {
    #[prost(string, tag = "1")]
    pub key: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub value: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Header {
    #[prost(int32, optional, tag = "1")]
    pub version: ::core::option::Option<i32>,
    #[prost(string, tag = "2")]
    pub logfile_name: ::prost::alloc::string::String,
    #[prost(int64, tag = "3")]
    pub logfile_offset: i64,
    #[prost(int64, tag = "4")]
    pub server_id: i64,
    #[prost(string, tag = "5")]
    pub serveren_code: ::prost::alloc::string::String,
    #[prost(int64, tag = "6")]
    pub execute_time: i64,
    #[prost(int32, optional, tag = "7")]
    pub source_type: ::core::option::Option<i32>,
    #[prost(string, tag = "9")]
    pub schema_name: ::prost::alloc::string::String,
    #[prost(string, tag = "10")]
    pub table_name: ::prost::alloc::string::String,
    #[prost(int64, tag = "11")]
    pub event_length: i64,
    #[prost(enumeration = "EventType", optional, tag = "12")]
    pub event_type: ::core::option::Option<i32>,
    #[prost(message, repeated, tag = "13")]
    pub props: ::prost::alloc::vec::Vec<Pair>,
    #[prost(string, tag = "14")]
    pub gtid: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Column {
    #[prost(int32, tag = "1")]
    pub index: i32,
    #[prost(int32, tag = "2")]
    pub sql_type: i32,
    #[prost(string, tag = "3")]
    pub name: ::prost::alloc::string::String,
    #[prost(bool, tag = "4")]
    pub is_key: bool,
    #[prost(bool, tag = "5")]
    pub updated: bool,
    #[prost(bool, optional, tag = "6")]
    pub is_null: ::core::option::Option<bool>,
    #[prost(message, repeated, tag = "7")]
    pub props: ::prost::alloc::vec::Vec<Pair>,
    #[prost(string, tag = "8")]
    pub value: ::prost::alloc::string::String,
    #[prost(int32, tag = "9")]
    pub length: i32,
    #[prost(string, tag = "10")]
    pub mysql_type: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RowData {
    #[prost(message, repeated, tag = "1")]
    pub before_columns: ::prost::alloc::vec::Vec<Column>,
    #[prost(message, repeated, tag = "2")]
    pub after_columns: ::prost::alloc::vec::Vec<Column>,
    #[prost(message, repeated, tag = "3")]
    pub props: ::prost::alloc::vec::Vec<Pair>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RowChange {
    #[prost(int64, tag = "1")]
    pub table_id: i64,
    #[prost(enumeration = "EventType", optional, tag = "2")]
    pub event_type: ::core::option::Option<i32>,
    #[prost(bool, tag = "10")]
    pub is_ddl: bool,
    #[prost(string, tag = "11")]
    pub sql: ::prost::alloc::string::String,
    #[prost(message, repeated, tag = "12")]
    pub row_datas: ::prost::alloc::vec::Vec<RowData>,
    #[prost(message, repeated, tag = "13")]
    pub props: ::prost::alloc::vec::Vec<Pair>,
    #[prost(string, tag = "14")]
    pub ddl_schema_name: ::prost::alloc::string::String,
}

impl RowChange {
    /// Event type; absent on the wire means UPDATE.
    pub fn event_type_or_default(&self) -> Option<EventType> {
        match self.event_type {
            None => Some(EventType::Update),
            Some(raw) => EventType::try_from(raw).ok(),
        }
    }
}
