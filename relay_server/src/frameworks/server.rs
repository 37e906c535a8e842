// Framework bootstrap for the relay runtime.

use crate::frameworks::config;
use crate::interface_adapters::net::{health_handler, spawn_table_serializer, ws_handler};
use crate::interface_adapters::state::{AppState, TableBytes};
use crate::use_cases::{RelayEvent, RelayStats, TableUpdate, relay_task};

use axum::{Router, routing::get};
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};
use tokio::sync::{broadcast, mpsc, watch};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

/// Serves the relay on an already bound listener until the server stops.
pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state();

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .with_state(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from((config::relay_host(), config::relay_port()));

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

fn build_state() -> Arc<AppState> {
    // event_tx/rx: every connection feeds the single relay task.
    let (event_tx, event_rx) = mpsc::channel::<RelayEvent>(config::EVENT_CHANNEL_CAPACITY);

    // table_tx/rx: table snapshots fan out to the serializer.
    let (table_tx, _table_rx) =
        broadcast::channel::<TableUpdate>(config::TABLE_BROADCAST_CAPACITY);

    // table_bytes_tx/rx: serialized tables shared across all connections.
    let (table_bytes_tx, _table_bytes_rx) =
        broadcast::channel::<TableBytes>(config::TABLE_BROADCAST_CAPACITY);
    // seq 0 with no bytes: nothing has been published yet.
    let (table_latest_tx, _table_latest_rx) = watch::channel(TableBytes::default());

    let (stats_tx, _stats_rx) = watch::channel::<RelayStats>(RelayStats::default());

    let state = AppState {
        event_tx,
        table_tx,
        table_bytes_tx,
        table_latest_tx,
        stats_tx,
    };

    // Subscribe the serializer before the relay task can publish anything.
    spawn_table_serializer(&state);
    tokio::spawn(relay_task(
        event_rx,
        state.table_tx.clone(),
        state.stats_tx.clone(),
    ));

    Arc::new(state)
}
