//! Publisher adapter.
//!
//! [`RecordPublisher`] serializes a [`ChangeRecord`], encodes its key and
//! waits on the broker's delivery report. The broker itself sits behind
//! [`BrokerSink`] so the batch processor can be driven without Kafka.

use async_trait::async_trait;
use tracing::debug;

use crate::error::{PublishError, Result};
use crate::model::ChangeRecord;
use crate::transform::PartitionKey;

/// Delivery metadata reported by the broker for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation {
    pub partition: i32,
    pub offset: i64,
}

/// Raw broker client.
///
/// `send` resolves once the broker has answered for this message. `Ok(None)`
/// means the broker answered without delivery metadata.
#[async_trait]
pub trait BrokerSink: Send + Sync {
    async fn send(
        &self,
        destination: &str,
        key: &[u8],
        payload: &str,
    ) -> std::result::Result<Option<Confirmation>, PublishError>;

    /// Flush and release the client.
    async fn close(&self) -> Result<()>;
}

/// Creates a fresh broker client for each supervisor cycle.
pub trait SinkFactory: Send + Sync {
    type Sink: BrokerSink;

    fn create(&self) -> Result<Self::Sink>;
}

/// Publishes change records one at a time, awaiting each confirmation.
pub struct RecordPublisher<S: BrokerSink> {
    sink: S,
    log_payloads: bool,
}

impl<S: BrokerSink> RecordPublisher<S> {
    pub fn new(sink: S, log_payloads: bool) -> Self {
        Self { sink, log_payloads }
    }

    /// Publish one record and wait for the broker's answer.
    ///
    /// A missing confirmation is reported as [`PublishError::Unconfirmed`],
    /// exactly like a failed send.
    pub async fn publish(
        &self,
        destination: &str,
        key: PartitionKey,
        record: &ChangeRecord,
    ) -> std::result::Result<Confirmation, PublishError> {
        let payload = record.to_json()?;

        let answer = self
            .sink
            .send(destination, &key.to_bytes(), &payload)
            .await;

        if self.log_payloads {
            let (partition, offset) = match &answer {
                Ok(Some(c)) => (Some(c.partition), Some(c.offset)),
                _ => (None, None),
            };
            debug!(
                topic = %destination,
                key = %key,
                partition = ?partition,
                offset = ?offset,
                failed = answer.is_err(),
                "data({}, {}, {})",
                destination,
                key,
                payload
            );
        }

        answer?.ok_or(PublishError::Unconfirmed)
    }

    pub async fn close(&self) -> Result<()> {
        self.sink.close().await
    }
}
