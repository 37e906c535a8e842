// Use-case level inputs/outputs for the relay task.

use crate::domain::ConnId;
use std::sync::Arc;
use sync_protocol::{ParticipantId, PositionSample, StateTable};

#[derive(Debug, Clone)]
pub enum RelayEvent {
    Connect {
        conn_id: ConnId,
    },
    // Already decoded; malformed payloads never reach the relay task.
    Sample {
        conn_id: ConnId,
        participant_id: ParticipantId,
        sample: PositionSample,
    },
    Disconnect {
        conn_id: ConnId,
    },
}

/// Full table snapshot produced after every accepted change.
#[derive(Debug, Clone)]
pub struct TableUpdate {
    pub seq: u64,
    pub table: Arc<StateTable>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub participants: usize,
    pub connections: usize,
}
