//! kafka-bridge service entry point.
//!
//! # Usage
//! ```bash
//! kafka-bridge --brokers localhost:9092 --group-id kafka-bridge
//!
//! # Publish one record
//! curl -X POST 'http://localhost:8080/api/kafka/publish/orders?message=%7Bid%3A1%7D'
//!
//! # Stream records from one or more topics
//! curl -N 'http://localhost:8080/api/kafka/consume?topic=orders&auto.offset.reset=earliest'
//! ```

use std::future::Future;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use kafka_bridge::app::{build_router, AppState};
use kafka_bridge::config::BridgeConfig;
use kafka_bridge_client::{KafkaPublisher, KafkaSourceFactory};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = BridgeConfig::parse();
    run_with_shutdown(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

async fn run_with_shutdown<F>(config: BridgeConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let state = build_state(&config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.listen).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        brokers = %config.brokers.join(","),
        "kafka-bridge listening"
    );

    tokio::pin!(shutdown);
    tokio::select! {
        result = axum::serve(listener, app.into_make_service()) => {
            result?;
        }
        _ = &mut shutdown => {
            tracing::info!("shutting down");
        }
    }
    Ok(())
}

fn build_state(config: &BridgeConfig) -> anyhow::Result<AppState> {
    let publisher = KafkaPublisher::new(&config.producer_properties())?;
    Ok(AppState {
        publisher: Arc::new(publisher),
        sources: Arc::new(KafkaSourceFactory),
        consumer_settings: config.consumer_settings(),
        poll_interval: config.poll_interval(),
        sessions: Arc::new(tokio::sync::Semaphore::new(config.max_sessions)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> BridgeConfig {
        BridgeConfig::try_parse_from([
            "kafka-bridge",
            "--listen",
            "127.0.0.1:0",
            "--brokers",
            "localhost:9092",
        ])
        .expect("config")
    }

    #[tokio::test]
    async fn build_state_creates_producer_without_broker() {
        let state = build_state(&test_config()).expect("state");
        assert_eq!(state.sessions.available_permits(), 256);
    }

    #[tokio::test]
    async fn run_with_shutdown_starts_and_stops() {
        run_with_shutdown(test_config(), async {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        })
        .await
        .expect("run should stop cleanly");
    }
}
