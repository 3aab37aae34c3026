use std::sync::atomic::{AtomicU64, Ordering};

use crate::metrics::StreamMetrics;
use crate::transform::KeyEncoding;

/// Per-stream state shared by the supervisor, loop and processor of one
/// stream. Nothing in here is shared across streams.
pub struct StreamContext {
    pub destination: String,
    pub key_encoding: KeyEncoding,
    pub metrics: StreamMetrics,
    /// Batches acknowledged since the stream started
    acked_batches: AtomicU64,
}

impl StreamContext {
    pub fn new(destination: impl Into<String>, key_encoding: KeyEncoding) -> Self {
        let destination = destination.into();
        Self {
            metrics: StreamMetrics::new(&destination),
            destination,
            key_encoding,
            acked_batches: AtomicU64::new(0),
        }
    }

    pub fn record_ack(&self) {
        self.acked_batches.fetch_add(1, Ordering::SeqCst);
        self.metrics.batches_acked.inc();
    }

    pub fn record_rollback(&self) {
        self.metrics.batches_rolled_back.inc();
    }

    pub fn acked_batches(&self) -> u64 {
        self.acked_batches.load(Ordering::SeqCst)
    }
}
