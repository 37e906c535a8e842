use crate::domain::ParticipantId;
use uuid::Uuid;

/// Generates a fresh participant id for a client session.
///
/// Random v4 UUIDs keep collisions negligible across concurrently running clients, so the
/// relay never has to arbitrate ids.
pub fn generate() -> ParticipantId {
    ParticipantId::new(Uuid::new_v4().to_string())
}
