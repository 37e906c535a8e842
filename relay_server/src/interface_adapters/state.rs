use crate::use_cases::{RelayEvent, RelayStats, TableUpdate};
use axum::extract::ws::Utf8Bytes;
use tokio::sync::{broadcast, mpsc, watch};

#[derive(Clone)]
pub struct AppState {
    // Connection lifecycle and decoded samples flowing into the relay task.
    pub event_tx: mpsc::Sender<RelayEvent>,
    // Table snapshots produced by the relay task (domain structs).
    pub table_tx: broadcast::Sender<TableUpdate>,
    // Serialized tables, shared across all connections.
    pub table_bytes_tx: broadcast::Sender<TableBytes>,
    // Latest serialized table for join and lag recovery.
    pub table_latest_tx: watch::Sender<TableBytes>,
    // Participant/connection counts for the health route.
    pub stats_tx: watch::Sender<RelayStats>,
}

/// One serialized table, tagged with the relay's update sequence.
#[derive(Debug, Clone)]
pub struct TableBytes {
    pub seq: u64,
    pub bytes: Utf8Bytes,
}

impl Default for TableBytes {
    fn default() -> Self {
        Self {
            seq: 0,
            bytes: Utf8Bytes::from(""),
        }
    }
}
