//! Per-connection Kafka consumer behind the [`RecordSource`] seam.
//!
//! Every streaming client gets its own consumer, built from the base
//! [`ConsumerSettings`] overlaid with request-supplied properties. The
//! consumer is owned by exactly one stream session and released when that
//! session ends.

use std::collections::HashMap;

use async_trait::async_trait;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message as _;
use rdkafka::ClientConfig;

use crate::error::{Error, Result};

/// Query parameters are forwarded verbatim as consumer properties, except
/// this key: it names the subscription and must never reach librdkafka.
const RESERVED_TOPIC_KEY: &str = "topic";

/// One consumed record. Only the payload is exposed to streaming clients;
/// key, partition, and offset stay internal to the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub value: String,
}

/// Base consumer configuration with per-request overrides applied on top.
#[derive(Debug, Clone, Default)]
pub struct ConsumerSettings {
    properties: HashMap<String, String>,
}

impl ConsumerSettings {
    pub fn new(properties: HashMap<String, String>) -> Self {
        Self { properties }
    }

    /// Overlay request-supplied properties onto the base configuration.
    /// Later values win; the reserved `topic` key is stripped.
    pub fn apply_overrides<I>(&mut self, overrides: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in overrides {
            if key == RESERVED_TOPIC_KEY {
                continue;
            }
            self.properties.insert(key, value);
        }
    }

    pub fn properties(&self) -> &HashMap<String, String> {
        &self.properties
    }

    fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        for (key, value) in &self.properties {
            config.set(key, value);
        }
        config
    }
}

/// Pull side of the broker adapter. The session loop depends on this trait
/// so it can be driven by a scripted source in tests.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Wait for the next record. Cancel-safe; no record is lost when the
    /// returned future is dropped before completion.
    async fn next_record(&mut self) -> Result<Record>;

    /// Release the underlying consumer. Idempotent.
    fn close(&mut self);
}

#[async_trait]
impl<S: RecordSource + ?Sized> RecordSource for Box<S> {
    async fn next_record(&mut self) -> Result<Record> {
        (**self).next_record().await
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Creates subscribed sources. The HTTP layer holds this behind `Arc<dyn>`
/// so integration tests can substitute scripted sources.
pub trait SourceFactory: Send + Sync {
    fn create(
        &self,
        settings: &ConsumerSettings,
        topics: &[String],
    ) -> Result<Box<dyn RecordSource>>;
}

/// rdkafka-backed [`RecordSource`] owning one `StreamConsumer`.
pub struct KafkaSource {
    consumer: Option<StreamConsumer>,
    topics: Vec<String>,
}

impl std::fmt::Debug for KafkaSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KafkaSource")
            .field("consumer", &self.consumer.as_ref().map(|_| "StreamConsumer"))
            .field("topics", &self.topics)
            .finish()
    }
}

impl KafkaSource {
    /// Build a consumer from the merged settings and subscribe it to the
    /// requested topics. Construction does not dial the broker, but an
    /// invalid property or a rejected subscription fails here, before the
    /// session ever starts.
    pub fn connect(settings: &ConsumerSettings, topics: &[String]) -> Result<Self> {
        if topics.is_empty() {
            return Err(Error::Config("at least one topic is required".to_owned()));
        }

        let consumer: StreamConsumer = settings.client_config().create().map_err(Error::Create)?;
        let topic_refs: Vec<&str> = topics.iter().map(String::as_str).collect();
        consumer
            .subscribe(&topic_refs)
            .map_err(|source| Error::Subscribe {
                topics: topics.to_vec(),
                source,
            })?;

        tracing::debug!(?topics, "consumer subscribed");
        Ok(Self {
            consumer: Some(consumer),
            topics: topics.to_vec(),
        })
    }
}

#[async_trait]
impl RecordSource for KafkaSource {
    async fn next_record(&mut self) -> Result<Record> {
        let consumer = self.consumer.as_ref().ok_or(Error::StreamClosed)?;
        let message = consumer.recv().await.map_err(Error::Poll)?;
        let value = match message.payload_view::<str>() {
            Some(Ok(payload)) => payload.to_owned(),
            Some(Err(err)) => return Err(Error::Payload(err)),
            None => String::new(),
        };
        Ok(Record { value })
    }

    fn close(&mut self) {
        if let Some(consumer) = self.consumer.take() {
            consumer.unsubscribe();
            tracing::debug!(topics = ?self.topics, "consumer released");
        }
    }
}

/// Default factory used by the service.
#[derive(Debug)]
pub struct KafkaSourceFactory;

impl SourceFactory for KafkaSourceFactory {
    fn create(
        &self,
        settings: &ConsumerSettings,
        topics: &[String],
    ) -> Result<Box<dyn RecordSource>> {
        Ok(Box::new(KafkaSource::connect(settings, topics)?))
    }
}
