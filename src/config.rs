//! Service configuration from CLI flags and environment variables.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use kafka_bridge_client::ConsumerSettings;

/// Configuration for the Kafka HTTP bridge.
#[derive(Debug, Clone, Parser)]
#[command(name = "kafka-bridge")]
#[command(about = "HTTP bridge exposing Kafka publish and SSE consume endpoints")]
pub struct BridgeConfig {
    /// Address to bind the HTTP listener on
    #[clap(long, env = "BRIDGE_LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Kafka brokers (comma-separated or multiple --brokers)
    #[clap(long, env = "KAFKA_BROKERS", value_delimiter = ',', required = true)]
    pub brokers: Vec<String>,

    /// Default consumer group ID for streaming sessions
    #[clap(long, env = "KAFKA_GROUP_ID", default_value = "kafka-bridge")]
    pub group_id: String,

    /// Consumer session timeout in milliseconds
    #[clap(long, default_value = "30000")]
    pub session_timeout_ms: String,

    /// Bounded wait per poll cycle, in seconds. One keep-alive event is
    /// emitted to each streaming client per cycle.
    #[clap(long, default_value_t = 5)]
    pub poll_interval_secs: u64,

    /// Maximum number of concurrent streaming sessions; requests beyond the
    /// bound are rejected with 503
    #[clap(long, default_value_t = 256)]
    pub max_sessions: usize,

    /// Extra producer property (repeatable)
    #[clap(long = "producer-prop", value_name = "KEY=VALUE", value_parser = parse_property)]
    pub producer_props: Vec<(String, String)>,

    /// Extra consumer property (repeatable)
    #[clap(long = "consumer-prop", value_name = "KEY=VALUE", value_parser = parse_property)]
    pub consumer_props: Vec<(String, String)>,
}

fn parse_property(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_owned(), value.to_owned())),
        _ => Err(format!("expected KEY=VALUE, got {raw:?}")),
    }
}

impl BridgeConfig {
    /// Base producer properties plus `--producer-prop` overrides.
    pub fn producer_properties(&self) -> HashMap<String, String> {
        let mut properties = HashMap::from([
            ("bootstrap.servers".to_owned(), self.brokers.join(",")),
            ("message.timeout.ms".to_owned(), "5000".to_owned()),
        ]);
        properties.extend(self.producer_props.iter().cloned());
        properties
    }

    /// Base consumer settings plus `--consumer-prop` overrides. Per-request
    /// query parameters are overlaid on top of these later.
    pub fn consumer_settings(&self) -> ConsumerSettings {
        let mut settings = ConsumerSettings::new(HashMap::from([
            ("bootstrap.servers".to_owned(), self.brokers.join(",")),
            ("group.id".to_owned(), self.group_id.clone()),
            ("session.timeout.ms".to_owned(), self.session_timeout_ms.clone()),
            ("auto.offset.reset".to_owned(), "latest".to_owned()),
            ("enable.auto.commit".to_owned(), "true".to_owned()),
        ]));
        settings.apply_overrides(self.consumer_props.iter().cloned());
        settings
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}
