// Talks to a real broker. Run with:
//   APP_AMQP_URI=guest:guest@localhost:5672/%2f cargo test --test connection -- --ignored

use hodei_cli::config::BrokerConfig;
use hodei_cli::rabbitmq::{ChannelManager, OutboundMessage, Publisher, RabbitMQError, RpcClient};
use std::time::Duration;

fn live_config() -> BrokerConfig {
    let mut config = BrokerConfig::default();
    hodei_cli::env::apply_process_env(&mut config).expect("invalid broker environment");
    config
}

#[tokio::test]
#[ignore] // Ignore by default as it requires a running RabbitMQ instance
async fn publish_to_builtin_exchange() {
    let channels = ChannelManager::connect(&live_config()).unwrap();

    Publisher::new(channels)
        .publish(&OutboundMessage::new("amq.topic", "hodei.test", "{}"))
        .await
        .unwrap();
}

#[tokio::test]
#[ignore] // Ignore by default as it requires a running RabbitMQ instance
async fn unanswered_call_times_out() {
    let channels = ChannelManager::connect(&live_config()).unwrap();
    let client = RpcClient::new(channels, Duration::from_millis(500));

    let result = client
        .call(&OutboundMessage::new("amq.topic", "hodei.nobody.listens", "{}"))
        .await;

    assert!(matches!(result, Err(RabbitMQError::Timeout(_))));
}

#[tokio::test]
async fn unreachable_broker_is_a_connection_error() {
    let config = BrokerConfig {
        broker_address: Some("guest:guest@127.0.0.1:1/%2f".to_string()),
        connect_timeout_ms: 2000,
        ..BrokerConfig::default()
    };
    let channels = ChannelManager::connect(&config).unwrap();

    let result = Publisher::new(channels)
        .publish(&OutboundMessage::new("cnp.referential", "country.pull", ""))
        .await;

    assert!(matches!(result, Err(RabbitMQError::ConnectionError(_))));
}
