use std::convert::Infallible;
use tracing::{debug, info, warn};

use crate::context::StreamContext;
use crate::error::Result;
use crate::processor::BatchProcessor;
use crate::publisher::BrokerSink;
use crate::source::ChangeSource;

/// What one fetch-process-settle iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Empty fetch; nothing acked or rolled back
    Idle,
    Acked(i64),
    RolledBack(i64),
}

/// Fetches batches, processes them and acks or rolls them back, one batch
/// at a time.
///
/// Errors from the source and decode errors are not handled here; they end
/// the loop and are dealt with by the supervisor.
pub struct ConsumptionLoop<'a, C: ChangeSource, S: BrokerSink> {
    source: &'a mut C,
    processor: &'a BatchProcessor<S>,
    ctx: &'a StreamContext,
    max_batch_size: i32,
}

impl<'a, C: ChangeSource, S: BrokerSink> ConsumptionLoop<'a, C, S> {
    pub fn new(
        source: &'a mut C,
        processor: &'a BatchProcessor<S>,
        ctx: &'a StreamContext,
        max_batch_size: i32,
    ) -> Self {
        Self {
            source,
            processor,
            ctx,
            max_batch_size,
        }
    }

    /// Run until the source or the transformer fails.
    pub async fn run(&mut self) -> Result<Infallible> {
        info!(
            destination = %self.ctx.destination,
            max_batch_size = self.max_batch_size,
            "Consumption loop started"
        );

        loop {
            self.step().await?;
        }
    }

    /// Fetch one batch and settle it.
    pub async fn step(&mut self) -> Result<StepOutcome> {
        let batch = self.source.get_without_ack(self.max_batch_size).await?;
        if batch.is_noop() {
            return Ok(StepOutcome::Idle);
        }

        let outcome = self.processor.process_batch(&batch.entries).await?;

        if outcome.succeeded() {
            self.source.ack(batch.id).await?;
            self.ctx.record_ack();
            debug!(
                destination = %self.ctx.destination,
                batch_id = batch.id,
                records = outcome.records,
                "Batch acknowledged"
            );
            Ok(StepOutcome::Acked(batch.id))
        } else {
            self.source.rollback(batch.id).await?;
            self.ctx.record_rollback();
            warn!(
                destination = %self.ctx.destination,
                batch_id = batch.id,
                records = outcome.records,
                failed = outcome.failed,
                "Batch rolled back after publish failures"
            );
            Ok(StepOutcome::RolledBack(batch.id))
        }
    }
}
