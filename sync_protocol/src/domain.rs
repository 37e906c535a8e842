// Participant identity and position snapshot types shared by both ends of the wire.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;

/// Opaque per-session participant token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ParticipantId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for ParticipantId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Position and animation pose of one participant at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSample {
    pub x: f32,
    pub y: f32,
    // Discrete animation pose index, not a time index.
    pub frame: u32,
}

impl PositionSample {
    pub fn new(x: f32, y: f32, frame: u32) -> Self {
        Self { x, y, frame }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Latest known sample per participant.
pub type StateTable = HashMap<ParticipantId, PositionSample>;
