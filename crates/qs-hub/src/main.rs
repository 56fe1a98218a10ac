use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use qs_core::QueryRecord;

mod aggregator;
mod api;
mod notify;
mod sink;
mod store;
mod synth;

#[cfg(feature = "kafka")]
mod kafka;

// =============================================================================
// CLI
// =============================================================================

#[derive(Parser)]
#[command(
    name = "qs-hub",
    version = "0.3.0",
    about = "QUERYSCOPE Query Flow Control Center"
)]
struct Args {
    /// Server bind address
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: String,

    /// Path to config file
    #[arg(long, default_value = "qs-hub.toml")]
    config: PathBuf,
}

// =============================================================================
// Config
// =============================================================================

#[derive(Deserialize, Default, Clone)]
struct Config {
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    sink: SinkConfig,
    #[serde(default)]
    kafka: KafkaConfig,
}

#[derive(Deserialize, Clone)]
struct ServerConfig {
    #[serde(default = "default_update_capacity")]
    update_channel_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            update_channel_capacity: 4096,
        }
    }
}

#[derive(Deserialize, Clone)]
struct SinkConfig {
    /// "jsonl" or "none"
    #[serde(default = "default_sink_kind")]
    kind: String,
    #[serde(default = "default_sink_path")]
    path: PathBuf,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: default_sink_kind(),
            path: default_sink_path(),
        }
    }
}

#[derive(Deserialize, Clone)]
#[cfg_attr(not(feature = "kafka"), allow(dead_code))]
pub(crate) struct KafkaConfig {
    #[serde(default)]
    enabled: bool,
    #[serde(default = "default_brokers")]
    pub(crate) brokers: String,
    #[serde(default = "default_topic")]
    pub(crate) topic: String,
    #[serde(default = "default_group_id")]
    pub(crate) group_id: String,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            brokers: default_brokers(),
            topic: default_topic(),
            group_id: default_group_id(),
        }
    }
}

fn default_update_capacity() -> usize {
    4096
}
fn default_sink_kind() -> String {
    "none".into()
}
fn default_sink_path() -> PathBuf {
    PathBuf::from("query-events.jsonl")
}
fn default_brokers() -> String {
    "localhost:9092".into()
}
fn default_topic() -> String {
    "query-events".into()
}
fn default_group_id() -> String {
    "qs-hub".into()
}

// =============================================================================
// Application State
// =============================================================================

pub(crate) struct AppState {
    pub(crate) aggregator: Arc<aggregator::QueryAggregator>,
    pub(crate) start_time: Instant,
}

#[derive(Serialize)]
struct UpdateMessage {
    r#type: &'static str,
    data: QueryRecord,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "qs_hub=info,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config: Config = if args.config.exists() {
        let content = std::fs::read_to_string(&args.config).unwrap_or_default();
        toml::from_str(&content).unwrap_or_default()
    } else {
        Config::default()
    };

    let event_sink: Arc<dyn sink::EventSink> = match config.sink.kind.as_str() {
        "jsonl" => Arc::new(sink::JsonlSink::new(config.sink.path.clone())),
        _ => Arc::new(sink::NullSink),
    };

    let store = Arc::new(store::QueryStore::new());
    let notifier = notify::ChangeNotifier::new(config.server.update_channel_capacity);
    let aggregator = Arc::new(aggregator::QueryAggregator::new(store, event_sink, notifier));

    if config.kafka.enabled {
        #[cfg(feature = "kafka")]
        {
            let kafka_config = config.kafka.clone();
            let kafka_aggregator = aggregator.clone();
            tokio::spawn(async move { kafka::run(kafka_config, kafka_aggregator).await });
        }
        #[cfg(not(feature = "kafka"))]
        tracing::warn!("kafka source enabled in config but not compiled. Rebuild with --features kafka");
    }

    let state = Arc::new(AppState {
        aggregator,
        start_time: Instant::now(),
    });

    let app = Router::new()
        .route("/api/status", get(api::status))
        .route("/api/queries", get(api::list_queries))
        .route("/api/queries/ids", get(api::list_query_ids))
        .route("/api/queries/:query_id", get(api::get_query))
        .route("/api/queries/by-catalog/:catalog", get(api::queries_by_catalog))
        .route("/api/queries/by-schema/:schema", get(api::queries_by_schema))
        .route("/api/queries/by-table/:table", get(api::queries_by_table))
        .route("/api/summary", get(api::database_summary))
        .route("/api/events", post(api::ingest_event))
        .route("/api/simulate", post(api::simulate))
        .route("/api/plans/text", post(api::parse_text_plan))
        .route("/api/plans/json", post(api::parse_json_plan))
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr: SocketAddr = args.bind.parse().expect("Invalid bind address");
    tracing::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    tracing::info!("  🔭 QUERYSCOPE v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("  API:        http://{}/api/status", addr);
    tracing::info!("  Queries:    http://{}/api/queries", addr);
    tracing::info!("  WebSocket:  ws://{}/ws", addr);
    tracing::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

// =============================================================================
// WebSocket Handler
// =============================================================================

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Forward every published record snapshot to the client. A subscriber
/// that cannot keep up is skipped ahead rather than allowed to stall
/// the aggregator.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let mut updates = state.aggregator.notifier().subscribe();
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(record) => {
                    let message = UpdateMessage {
                        r#type: "query_update",
                        data: record,
                    };
                    let json = serde_json::to_string(&message).unwrap_or_default();
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("update subscriber lagged by {} records", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            inbound = receiver.next() => match inbound {
                Some(Ok(_)) => {} // clients only listen; ignore anything they send
                _ => break,
            },
        }
    }
}
