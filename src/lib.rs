//! HTTP bridge exposing Kafka topics over two endpoints:
//!
//! - `POST /api/kafka/publish/{topic}` — synchronous publish returning the
//!   broker-assigned partition, offset, and timestamp.
//! - `GET /api/kafka/consume?topic=<t>...` — long-lived SSE stream relaying
//!   every consumed record value, with one keep-alive per poll cycle.

pub mod api;
pub mod app;
pub mod config;
