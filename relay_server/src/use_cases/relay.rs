use super::types::{RelayEvent, RelayStats, TableUpdate};
use crate::domain::{RelayTable, UpsertOutcome};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

/// Single writer for the participant table.
///
/// Every event is applied in one step and, when the table changed, followed by a full
/// snapshot on `table_tx`. Fan-out to sockets happens downstream so one slow or broken
/// connection never holds up the others.
pub async fn relay_task(
    mut event_rx: mpsc::Receiver<RelayEvent>,
    table_tx: broadcast::Sender<TableUpdate>,
    stats_tx: watch::Sender<RelayStats>,
) {
    let mut relay = RelayTable::new();
    let mut seq: u64 = 0;

    while let Some(event) = event_rx.recv().await {
        let changed = match event {
            RelayEvent::Connect { conn_id } => {
                relay.on_connect(conn_id);
                debug!(conn_id, "connection registered");
                false
            }
            RelayEvent::Sample {
                conn_id,
                participant_id,
                sample,
            } => match relay.upsert(conn_id, participant_id.clone(), sample) {
                UpsertOutcome::UnknownConnection => {
                    warn!(conn_id, %participant_id, "sample from unregistered connection");
                    false
                }
                UpsertOutcome::Activated => {
                    info!(conn_id, %participant_id, "participant active");
                    true
                }
                UpsertOutcome::Updated => true,
                UpsertOutcome::Rekeyed { previous } => {
                    info!(
                        conn_id,
                        %participant_id,
                        %previous,
                        "connection switched participant id"
                    );
                    true
                }
            },
            RelayEvent::Disconnect { conn_id } => match relay.on_disconnect(conn_id) {
                Some(participant_id) => {
                    info!(conn_id, %participant_id, "participant removed");
                    // Broadcast the shrunken table so clients can retire the entity.
                    true
                }
                None => false,
            },
        };

        stats_tx.send_if_modified(|stats| {
            let next = RelayStats {
                participants: relay.participant_count(),
                connections: relay.connection_count(),
            };
            let modified = *stats != next;
            *stats = next;
            modified
        });

        if changed {
            seq += 1;
            // No receivers just means nobody is connected right now.
            let _ = table_tx.send(TableUpdate {
                seq,
                table: Arc::new(relay.table().clone()),
            });
        }
    }

    info!("relay event channel closed; relay task exiting");
}
