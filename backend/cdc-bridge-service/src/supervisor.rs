//! Stream supervisor.
//!
//! Owns one stream end to end: opens a source session and a broker client,
//! runs the consumption loop, and when the loop fails releases both and
//! starts over after a backoff delay. It never gives up.

use std::convert::Infallible;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::backoff::RetryPolicy;
use crate::config::StreamConfig;
use crate::consumer::ConsumptionLoop;
use crate::context::StreamContext;
use crate::error::Result;
use crate::processor::BatchProcessor;
use crate::publisher::{RecordPublisher, SinkFactory};
use crate::source::{ChangeSource, SourceConnector};

#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    pub filter: Option<String>,
    pub max_batch_size: i32,
    pub log_payloads: bool,
    pub policy: RetryPolicy,
}

impl From<&StreamConfig> for SupervisorSettings {
    fn from(config: &StreamConfig) -> Self {
        Self {
            filter: config.canal.filter.clone(),
            max_batch_size: config.canal.batch_size,
            log_payloads: config.log_payloads,
            policy: config.restart.clone(),
        }
    }
}

pub struct Supervisor<C: SourceConnector, F: SinkFactory> {
    connector: C,
    factory: F,
    ctx: Arc<StreamContext>,
    settings: SupervisorSettings,
}

impl<C: SourceConnector, F: SinkFactory> Supervisor<C, F> {
    pub fn new(connector: C, factory: F, ctx: Arc<StreamContext>, settings: SupervisorSettings) -> Self {
        Self {
            connector,
            factory,
            ctx,
            settings,
        }
    }

    /// Run the stream forever.
    ///
    /// The restart counter goes back to zero whenever a cycle acknowledged
    /// at least one batch before failing.
    pub async fn run(&self) -> Infallible {
        let mut attempt: u32 = 0;

        loop {
            let acked_before = self.ctx.acked_batches();

            let err = match self.run_once().await {
                Err(e) => e,
                Ok(never) => match never {},
            };

            if self.ctx.acked_batches() > acked_before {
                attempt = 0;
            }
            attempt = attempt.saturating_add(1);

            let delay = self.settings.policy.delay_for(attempt);
            self.ctx.metrics.record_restart(err.class());
            error!(
                destination = %self.ctx.destination,
                class = err.class(),
                attempt,
                retry_in_ms = delay.as_millis() as u64,
                "canal[{}]: stream failed, restarting: {}",
                self.ctx.destination,
                err
            );

            tokio::time::sleep(delay).await;
        }
    }

    /// One connect-consume cycle. Both the source session and the broker
    /// client are released before this returns.
    pub async fn run_once(&self) -> Result<Infallible> {
        let mut source = self.connector.connect().await?;
        info!(destination = %self.ctx.destination, "Connected to change-capture source");

        let result = self.consume(&mut source).await;

        if let Err(e) = source.disconnect().await {
            warn!(
                destination = %self.ctx.destination,
                error = %e,
                "Failed to disconnect from source"
            );
        }

        result
    }

    async fn consume(&self, source: &mut C::Source) -> Result<Infallible> {
        source.subscribe(self.settings.filter.as_deref()).await?;
        // Anything left unacknowledged by a previous cycle is redelivered.
        source.rollback_all().await?;

        let sink = self.factory.create()?;
        let processor = BatchProcessor::new(
            RecordPublisher::new(sink, self.settings.log_payloads),
            Arc::clone(&self.ctx),
        );

        let result = ConsumptionLoop::new(
            source,
            &processor,
            &self.ctx,
            self.settings.max_batch_size,
        )
        .run()
        .await;

        if let Err(e) = processor.publisher().close().await {
            warn!(
                destination = %self.ctx.destination,
                error = %e,
                "Failed to close broker client"
            );
        }

        result
    }
}
