//! Kafka adapter for kafka-bridge.
//!
//! This crate wraps rdkafka behind two capability seams:
//!
//! - [`Publisher`]: a shared producer for the synchronous publish endpoint.
//! - [`RecordSource`] / [`SourceFactory`]: per-connection consumers driven by
//!   a [`StreamSession`] that forwards records to an open client stream.
//!
//! The HTTP layer never touches rdkafka types directly; everything it needs
//! is re-exported here.

pub mod consumer;
pub mod error;
pub mod producer;
pub mod session;

pub use consumer::{
    ConsumerSettings, KafkaSource, KafkaSourceFactory, Record, RecordSource, SourceFactory,
};
pub use error::{Error, Result};
pub use producer::{KafkaPublisher, Placement, Publisher};
pub use session::{StreamEvent, StreamSession};
