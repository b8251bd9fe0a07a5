//! Error types for the Kafka adapter and stream sessions.

use rdkafka::error::KafkaError;

/// Errors produced by the publish path, the consume path, and the
/// per-connection session loop.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The underlying Kafka client could not be constructed.
    #[error("failed to create kafka client: {0}")]
    Create(#[source] KafkaError),

    /// The broker rejected the subscribe call.
    #[error("failed to subscribe to topics {topics:?}: {source}")]
    Subscribe {
        topics: Vec<String>,
        #[source]
        source: KafkaError,
    },

    /// A send was not acknowledged by the broker.
    #[error("failed to publish to topic {topic:?}: {source}")]
    Publish {
        topic: String,
        #[source]
        source: KafkaError,
    },

    /// Polling the broker for records failed.
    #[error("kafka poll failed: {0}")]
    Poll(#[source] KafkaError),

    /// A consumed record carried a payload that is not valid UTF-8.
    #[error("record payload is not valid UTF-8: {0}")]
    Payload(#[source] std::str::Utf8Error),

    /// Invalid adapter configuration (for example, an empty topic list).
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The connected client went away. Cleanup signal, not a failure.
    #[error("client stream closed")]
    StreamClosed,
}

pub type Result<T> = std::result::Result<T, Error>;
