//! Kafka notification transport.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use tracing::{debug, info, instrument, warn};

use crate::error::{NotifyError, NotifyResult};
use crate::publisher::Publisher;

const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Publishes each message as one record on a Kafka topic.
///
/// Records are enqueued without waiting for delivery reports. The queue is
/// flushed when the publisher is dropped.
pub struct KafkaPublisher {
    producer: FutureProducer,
    topic: String,
}

impl KafkaPublisher {
    /// Create a producer for `topic` on the given bootstrap servers.
    pub fn new(bootstrap_servers: &str, topic: impl Into<String>) -> NotifyResult<Self> {
        let topic = topic.into();

        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", bootstrap_servers)
            .set("client.id", "coldap-sync")
            .set("message.timeout.ms", "5000")
            .create()
            .map_err(|e| NotifyError::connection_failed(bootstrap_servers, e))?;

        info!(
            bootstrap_servers = %bootstrap_servers,
            topic = %topic,
            "Kafka notification producer created"
        );

        Ok(Self { producer, topic })
    }
}

#[async_trait]
impl Publisher for KafkaPublisher {
    #[instrument(skip(self), fields(topic = %self.topic))]
    async fn publish(&self, message: &str) -> NotifyResult<()> {
        let record: FutureRecord<'_, (), str> = FutureRecord::to(&self.topic).payload(message);

        // The delivery future is dropped: no acknowledgement is awaited.
        let _ = self.producer.send_result(record).map_err(|(err, _)| {
            NotifyError::SendFailed(format!("enqueue to {} failed: {err}", self.topic))
        })?;

        debug!("Notification enqueued");
        Ok(())
    }
}

impl Drop for KafkaPublisher {
    fn drop(&mut self) {
        if let Err(e) = self.producer.flush(FLUSH_TIMEOUT) {
            warn!(topic = %self.topic, error = %e, "Kafka queue not fully flushed");
        }
    }
}
