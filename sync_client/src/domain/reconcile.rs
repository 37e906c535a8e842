// Diffing a received table against the entities already on screen.

use super::registry::RemoteEntityRegistry;
use sync_protocol::{ParticipantId, PositionSample, StateTable};

#[derive(Debug, Clone, PartialEq)]
pub enum ReconciliationAction {
    // First sighting of a participant.
    Create(ParticipantId, PositionSample),
    // Known participant whose visual went invalid: destroy it, then create a fresh one.
    Replace(ParticipantId, PositionSample),
    // Known participant with a live visual.
    Update(ParticipantId, PositionSample),
    // Known participant missing from the table; the relay only drops ids on disconnect.
    Remove(ParticipantId),
}

impl ReconciliationAction {
    pub fn id(&self) -> &ParticipantId {
        match self {
            ReconciliationAction::Create(id, _)
            | ReconciliationAction::Replace(id, _)
            | ReconciliationAction::Update(id, _)
            | ReconciliationAction::Remove(id) => id,
        }
    }
}

/// Produces the actions that bring `registry` in line with `table`.
///
/// The local participant is skipped wherever it appears. Pure: the registry is only read.
pub fn reconcile<H>(
    local_id: &ParticipantId,
    table: &StateTable,
    registry: &RemoteEntityRegistry<H>,
    is_handle_valid: impl Fn(&H) -> bool,
) -> Vec<ReconciliationAction> {
    let mut actions: Vec<ReconciliationAction> = table
        .iter()
        .filter(|(id, _)| *id != local_id)
        .map(|(id, sample)| match registry.get(id) {
            None => ReconciliationAction::Create(id.clone(), *sample),
            Some(handle) if !is_handle_valid(handle) => {
                ReconciliationAction::Replace(id.clone(), *sample)
            }
            Some(_) => ReconciliationAction::Update(id.clone(), *sample),
        })
        .collect();

    actions.extend(
        registry
            .ids()
            .filter(|id| *id != local_id && !table.contains_key(*id))
            .map(|id| ReconciliationAction::Remove(id.clone())),
    );

    actions
}
