//! Batch processor.
//!
//! Transforms every entry of a batch and publishes the resulting records in
//! order. Publish failures do not stop the batch: the remaining records are
//! still attempted and the outcome reports the batch as failed, which the
//! loop turns into a rollback. A decode failure aborts the batch at once.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::context::StreamContext;
use crate::error::Result;
use crate::model::ChangeEntry;
use crate::publisher::{BrokerSink, RecordPublisher};
use crate::transform::{destination_for, partition_key, transform};

/// Publish tally for one batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Records derived from the batch
    pub records: usize,
    /// Records the broker confirmed
    pub confirmed: usize,
    /// Records that failed or were not confirmed
    pub failed: usize,
}

impl BatchOutcome {
    /// True only if every derived record was confirmed.
    pub fn succeeded(&self) -> bool {
        self.failed == 0
    }
}

pub struct BatchProcessor<S: BrokerSink> {
    publisher: RecordPublisher<S>,
    ctx: Arc<StreamContext>,
}

impl<S: BrokerSink> BatchProcessor<S> {
    pub fn new(publisher: RecordPublisher<S>, ctx: Arc<StreamContext>) -> Self {
        Self { publisher, ctx }
    }

    pub fn publisher(&self) -> &RecordPublisher<S> {
        &self.publisher
    }

    /// Process one batch.
    ///
    /// # Errors
    ///
    /// Returns the decode error of the first malformed entry; records already
    /// published before it stay published and will be duplicated when the
    /// batch is redelivered.
    pub async fn process_batch(&self, entries: &[ChangeEntry]) -> Result<BatchOutcome> {
        let mut outcome = BatchOutcome::default();

        for entry in entries {
            let records = transform(entry)?;
            if records.is_empty() {
                continue;
            }

            let topic = destination_for(&entry.header);
            let key = partition_key(&entry.header, self.ctx.key_encoding);

            for record in &records {
                outcome.records += 1;
                match self.publisher.publish(&topic, key, record).await {
                    Ok(_) => {
                        outcome.confirmed += 1;
                        self.ctx.metrics.records_published.inc();
                    }
                    Err(e) => {
                        outcome.failed += 1;
                        self.ctx.metrics.publish_failures.inc();
                        warn!(
                            destination = %self.ctx.destination,
                            topic = %topic,
                            key = %key,
                            error = %e,
                            "Kafka send failed, batch will be rolled back"
                        );
                    }
                }
            }
        }

        debug!(
            destination = %self.ctx.destination,
            entries = entries.len(),
            records = outcome.records,
            failed = outcome.failed,
            "Processed batch"
        );

        Ok(outcome)
    }
}
