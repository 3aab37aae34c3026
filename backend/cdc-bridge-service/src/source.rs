//! Change-capture source seam.
//!
//! The consumption loop only ever talks to these traits; the Canal client in
//! [`crate::canal`] is the production implementation.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::Batch;

/// An open session with the change-capture source.
#[async_trait]
pub trait ChangeSource: Send {
    /// Subscribe to the stream; `None` keeps the server-side filter.
    async fn subscribe(&mut self, filter: Option<&str>) -> Result<()>;

    /// Fetch the next batch without acknowledging it.
    async fn get_without_ack(&mut self, max_batch_size: i32) -> Result<Batch>;

    /// Durably remove a batch from the backlog.
    async fn ack(&mut self, batch_id: i64) -> Result<()>;

    /// Return a batch (and everything after it) to the backlog.
    async fn rollback(&mut self, batch_id: i64) -> Result<()>;

    /// Return every unacknowledged batch to the backlog.
    async fn rollback_all(&mut self) -> Result<()>;

    async fn disconnect(&mut self) -> Result<()>;
}

/// Opens fresh source sessions; one per supervisor cycle.
#[async_trait]
pub trait SourceConnector: Send + Sync {
    type Source: ChangeSource;

    async fn connect(&self) -> Result<Self::Source>;
}
