//! Shared Kafka producer behind the [`Publisher`] capability trait.
//!
//! One `KafkaPublisher` is created at service startup and reused for every
//! publish request; rdkafka's `FutureProducer` is safe for concurrent use.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::ClientConfig;

use crate::error::{Error, Result};

/// Queue timeout for a single send; delivery itself is governed by the
/// producer's `message.timeout.ms`.
const SEND_QUEUE_TIMEOUT: Duration = Duration::from_secs(5);

/// Broker-assigned placement of a published record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub timestamp: DateTime<Utc>,
}

/// Publish capability. The HTTP layer depends on this trait so handlers can
/// be exercised without a broker.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Send one record and wait for the broker acknowledgment.
    async fn publish(&self, topic: &str, key: Option<&str>, payload: &str) -> Result<Placement>;
}

/// rdkafka-backed [`Publisher`].
pub struct KafkaPublisher {
    producer: FutureProducer,
}

impl std::fmt::Debug for KafkaPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KafkaPublisher")
            .field("producer", &"FutureProducer")
            .finish()
    }
}

impl KafkaPublisher {
    /// Build a producer from opaque key-value properties. Does not dial the
    /// broker; librdkafka connects lazily on first send.
    pub fn new(properties: &HashMap<String, String>) -> Result<Self> {
        let mut config = ClientConfig::new();
        for (key, value) in properties {
            config.set(key, value);
        }
        let producer = config.create().map_err(Error::Create)?;
        Ok(Self { producer })
    }
}

#[async_trait]
impl Publisher for KafkaPublisher {
    async fn publish(&self, topic: &str, key: Option<&str>, payload: &str) -> Result<Placement> {
        // The record timestamp is assigned here (CreateTime semantics), so it
        // can be echoed back alongside the broker-assigned partition/offset.
        // Millisecond precision, matching what ends up on the record.
        let timestamp_ms = Utc::now().timestamp_millis();
        let mut record = FutureRecord::<str, str>::to(topic)
            .payload(payload)
            .timestamp(timestamp_ms);
        if let Some(key) = key {
            record = record.key(key);
        }

        let (partition, offset) = self
            .producer
            .send(record, SEND_QUEUE_TIMEOUT)
            .await
            .map_err(|(source, _)| Error::Publish {
                topic: topic.to_owned(),
                source,
            })?;

        tracing::debug!(%topic, partition, offset, "record acknowledged");
        Ok(Placement {
            topic: topic.to_owned(),
            partition,
            offset,
            timestamp: DateTime::from_timestamp_millis(timestamp_ms).unwrap_or_else(Utc::now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn properties() -> HashMap<String, String> {
        HashMap::from([
            ("bootstrap.servers".to_owned(), "localhost:9092".to_owned()),
            ("message.timeout.ms".to_owned(), "5000".to_owned()),
        ])
    }

    #[test]
    fn publisher_builds_without_a_reachable_broker() {
        // librdkafka validates configuration eagerly but connects lazily.
        KafkaPublisher::new(&properties()).expect("create publisher");
    }

    #[test]
    fn unknown_property_is_rejected_on_create() {
        let mut props = properties();
        props.insert("not.a.real.property".to_owned(), "x".to_owned());
        let err = KafkaPublisher::new(&props).expect_err("create should fail");
        assert!(matches!(err, Error::Create(_)));
    }
}
