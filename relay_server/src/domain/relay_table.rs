// Authoritative participant table plus the connection -> participant association.

use std::collections::HashMap;
use sync_protocol::{ParticipantId, PositionSample, StateTable};

/// Server-local identifier for one accepted socket.
pub type ConnId = u64;

/// Result of applying one accepted sample.
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertOutcome {
    /// Connection was not registered; nothing changed.
    UnknownConnection,
    /// First sample for this connection (CONNECTED -> ACTIVE).
    Activated,
    /// Existing entry overwritten.
    Updated,
    /// Connection switched ids; the previous id's entry was dropped.
    Rekeyed { previous: ParticipantId },
}

/// Latest sample per participant, keyed by the id carried in each payload.
///
/// Exactly one task owns this value; every mutation is a single critical section.
#[derive(Debug, Default)]
pub struct RelayTable {
    table: StateTable,
    // None until the first sample arrives for the connection.
    connections: HashMap<ConnId, Option<ParticipantId>>,
    // Which connection last wrote each id; only the owner may evict it.
    owners: HashMap<ParticipantId, ConnId>,
}

impl RelayTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly accepted connection. No table entry exists yet.
    pub fn on_connect(&mut self, conn_id: ConnId) {
        self.connections.entry(conn_id).or_insert(None);
    }

    /// Applies an accepted sample: last write wins per id.
    pub fn upsert(
        &mut self,
        conn_id: ConnId,
        participant_id: ParticipantId,
        sample: PositionSample,
    ) -> UpsertOutcome {
        let Some(slot) = self.connections.get_mut(&conn_id) else {
            return UpsertOutcome::UnknownConnection;
        };

        let outcome = match slot.replace(participant_id.clone()) {
            None => UpsertOutcome::Activated,
            Some(previous) if previous == participant_id => UpsertOutcome::Updated,
            Some(previous) => {
                if self.owners.get(&previous) == Some(&conn_id) {
                    self.owners.remove(&previous);
                    self.table.remove(&previous);
                }
                UpsertOutcome::Rekeyed { previous }
            }
        };

        // A second connection claiming the same id takes ownership of the entry.
        if let Some(old_owner) = self.owners.insert(participant_id.clone(), conn_id) {
            if old_owner != conn_id {
                if let Some(old_slot) = self.connections.get_mut(&old_owner) {
                    *old_slot = None;
                }
            }
        }
        self.table.insert(participant_id, sample);
        outcome
    }

    /// Forgets the connection and evicts the entry it owns, if any.
    pub fn on_disconnect(&mut self, conn_id: ConnId) -> Option<ParticipantId> {
        let participant_id = self.connections.remove(&conn_id).flatten()?;
        if self.owners.get(&participant_id) != Some(&conn_id) {
            return None;
        }
        self.owners.remove(&participant_id);
        self.table.remove(&participant_id);
        Some(participant_id)
    }

    pub fn table(&self) -> &StateTable {
        &self.table
    }

    pub fn participant_count(&self) -> usize {
        self.table.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}
