//! # Kafka event source (optional, requires `--features kafka`)
//!
//! Consumes query lifecycle events from a Kafka topic and feeds them to
//! the aggregator. Malformed payloads are logged and skipped; a broken
//! connection is retried with a fixed backoff.

use crate::aggregator::QueryAggregator;
use crate::KafkaConfig;
use qs_core::QueryEvent;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use std::sync::Arc;
use std::time::Duration;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

pub async fn run(config: KafkaConfig, aggregator: Arc<QueryAggregator>) {
    loop {
        let consumer: StreamConsumer = match ClientConfig::new()
            .set("group.id", &config.group_id)
            .set("bootstrap.servers", &config.brokers)
            .set("enable.partition.eof", "false")
            .set("auto.offset.reset", "latest")
            .create()
        {
            Ok(consumer) => consumer,
            Err(e) => {
                tracing::error!("failed to create kafka consumer: {}", e);
                tokio::time::sleep(RECONNECT_DELAY).await;
                continue;
            }
        };

        if let Err(e) = consumer.subscribe(&[config.topic.as_str()]) {
            tracing::error!("failed to subscribe to topic '{}': {}", config.topic, e);
            tokio::time::sleep(RECONNECT_DELAY).await;
            continue;
        }

        tracing::info!(
            "kafka source consuming topic '{}' from {}",
            config.topic,
            config.brokers
        );

        loop {
            match consumer.recv().await {
                Ok(message) => {
                    let Some(payload) = message.payload() else {
                        continue;
                    };
                    match serde_json::from_slice::<QueryEvent>(payload) {
                        Ok(event) => aggregator.process_event(event).await,
                        Err(e) => {
                            tracing::warn!("skipping malformed event payload: {}", e);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("kafka receive error, reconnecting: {}", e);
                    break;
                }
            }
        }

        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}
