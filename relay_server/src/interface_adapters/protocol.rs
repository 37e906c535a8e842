// HTTP DTOs for the relay's auxiliary routes. The WebSocket payloads live in `sync_protocol`.

use crate::use_cases::RelayStats;
use serde::Serialize;

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub participants: usize,
    pub connections: usize,
}

impl From<RelayStats> for HealthResponse {
    fn from(stats: RelayStats) -> Self {
        Self {
            participants: stats.participants,
            connections: stats.connections,
        }
    }
}
