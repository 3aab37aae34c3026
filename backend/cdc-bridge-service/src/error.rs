//! Error types for the change-capture bridge.

use thiserror::Error;

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Errors that end a consumption cycle and are handled by the supervisor.
///
/// Publish failures are deliberately not part of this enum: they are
/// recovered inside the batch processor and turn into a rollback.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// A change payload or entry envelope could not be decoded
    #[error("Decode error: {context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: prost::DecodeError,
    },

    /// The change-capture source is unreachable or rejected a request
    #[error("Source error: {0}")]
    Source(String),

    /// The change-capture source sent something outside the protocol
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The broker client could not be created or used
    #[error("Broker error: {0}")]
    Broker(String),

    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Socket level failure talking to the source
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Short failure class used in log lines and metric labels.
    pub fn class(&self) -> &'static str {
        match self {
            BridgeError::Decode { .. } => "decode",
            BridgeError::Source(_) | BridgeError::Io(_) => "connection",
            BridgeError::Protocol(_) => "protocol",
            BridgeError::Broker(_) => "broker",
            BridgeError::Config(_) => "config",
        }
    }

    pub(crate) fn decode(context: impl Into<String>, source: prost::DecodeError) -> Self {
        BridgeError::Decode {
            context: context.into(),
            source,
        }
    }
}

/// Failure of a single publish attempt.
#[derive(Error, Debug)]
pub enum PublishError {
    /// The broker refused or failed the send
    #[error("Publish failed: {0}")]
    Rejected(String),

    /// The broker answered without delivery metadata
    #[error("Broker returned no delivery confirmation")]
    Unconfirmed,

    /// The record could not be rendered as JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
