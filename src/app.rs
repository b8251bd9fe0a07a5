//! Router wiring and shared application state.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use kafka_bridge_client::{ConsumerSettings, Publisher, SourceFactory};

use crate::api;

#[derive(Clone)]
pub struct AppState {
    /// Shared producer, created at startup and reused for every publish.
    pub publisher: Arc<dyn Publisher>,
    /// Builds one subscribed consumer per streaming request.
    pub sources: Arc<dyn SourceFactory>,
    /// Base consumer configuration; per-request parameters overlay it.
    pub consumer_settings: ConsumerSettings,
    pub poll_interval: Duration,
    /// Bounds concurrent streaming sessions.
    pub sessions: Arc<tokio::sync::Semaphore>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/api/kafka/publish/:topic", post(api::publish::publish))
        .route("/api/kafka/consume", get(api::consume::consume))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
