//! Kafka broker sink backed by `rdkafka`'s `FutureProducer`.

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::KafkaConfig;
use crate::error::{BridgeError, PublishError, Result};
use crate::publisher::{BrokerSink, Confirmation, SinkFactory};

const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

pub struct KafkaSink {
    producer: FutureProducer,
    message_timeout: Duration,
}

impl KafkaSink {
    pub fn new(config: &KafkaConfig, client_id: &str) -> Result<Self> {
        info!(
            brokers = %config.brokers,
            client_id = %client_id,
            acks = %config.acks,
            "Creating Kafka producer"
        );

        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("client.id", client_id)
            .set("acks", &config.acks)
            .set("message.timeout.ms", config.message_timeout.as_millis().to_string())
            .set("enable.idempotence", config.idempotence.to_string())
            .create()
            .map_err(|e| {
                error!("Failed to create Kafka producer: {}", e);
                BridgeError::Broker(format!("Kafka producer creation failed: {}", e))
            })?;

        Ok(Self {
            producer,
            message_timeout: config.message_timeout,
        })
    }
}

#[async_trait]
impl BrokerSink for KafkaSink {
    async fn send(
        &self,
        destination: &str,
        key: &[u8],
        payload: &str,
    ) -> std::result::Result<Option<Confirmation>, PublishError> {
        let record = FutureRecord::to(destination).key(key).payload(payload);

        match self
            .producer
            .send(record, Timeout::After(self.message_timeout))
            .await
        {
            // librdkafka reports an invalid offset when the broker did not
            // return one (e.g. acks=0)
            Ok((_, offset)) if offset < 0 => Ok(None),
            Ok((partition, offset)) => Ok(Some(Confirmation { partition, offset })),
            Err((err, _)) => Err(PublishError::Rejected(format!(
                "Kafka publish to {} failed: {}",
                destination, err
            ))),
        }
    }

    async fn close(&self) -> Result<()> {
        // librdkafka's flush blocks the calling thread
        let producer = self.producer.clone();
        tokio::task::spawn_blocking(move || producer.flush(Timeout::After(CLOSE_FLUSH_TIMEOUT)))
            .await
            .map_err(|e| BridgeError::Broker(format!("flush task failed: {}", e)))?
            .map_err(|e| {
                warn!("Kafka producer flush on close failed: {}", e);
                BridgeError::Broker(format!("flush failed: {}", e))
            })
    }
}

/// Builds one producer per supervisor cycle with a stream-specific client id.
pub struct KafkaSinkFactory {
    config: KafkaConfig,
    client_id: String,
}

impl KafkaSinkFactory {
    pub fn new(config: KafkaConfig, client_id: String) -> Self {
        Self { config, client_id }
    }
}

impl SinkFactory for KafkaSinkFactory {
    type Sink = KafkaSink;

    fn create(&self) -> Result<KafkaSink> {
        KafkaSink::new(&self.config, &self.client_id)
    }
}
