// JSON codec for client samples and relay state tables.
//
// Client -> relay: {"id": "...", "x": 1.0, "y": 2.0, "frame": 3}
// Relay -> client: {"<id>": {"x": 1.0, "y": 2.0, "frame": 3}, ...}

use crate::domain::{ParticipantId, PositionSample, StateTable};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum CodecError {
    // Payload is not a well-formed sample or table; callers drop it and move on.
    MalformedMessage(String),
    // Coordinates that JSON cannot carry (NaN/inf).
    NonFinite,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::MalformedMessage(reason) => write!(f, "malformed message: {reason}"),
            CodecError::NonFinite => write!(f, "sample coordinates must be finite"),
        }
    }
}

impl std::error::Error for CodecError {}

impl From<serde_json::Error> for CodecError {
    fn from(e: serde_json::Error) -> Self {
        CodecError::MalformedMessage(e.to_string())
    }
}

#[derive(Debug, Serialize)]
struct SampleRecordOut<'a> {
    id: &'a str,
    x: f32,
    y: f32,
    frame: u32,
}

#[derive(Debug, Deserialize)]
struct SampleRecordIn {
    id: String,
    x: f32,
    y: f32,
    #[serde(deserialize_with = "frame_number_or_string")]
    frame: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct TableEntryDto {
    x: f32,
    y: f32,
    #[serde(deserialize_with = "frame_number_or_string")]
    frame: u32,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FrameRepr {
    Number(u32),
    Text(String),
}

// Some clients send the pose index as a string; accept both.
fn frame_number_or_string<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    match FrameRepr::deserialize(deserializer)? {
        FrameRepr::Number(frame) => Ok(frame),
        FrameRepr::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn validated(
    id: String,
    sample: PositionSample,
) -> Result<(ParticipantId, PositionSample), CodecError> {
    if id.trim().is_empty() {
        return Err(CodecError::MalformedMessage("participant id is empty".to_string()));
    }
    // Out-of-range numbers collapse to inf when narrowed to f32.
    if !sample.is_finite() {
        return Err(CodecError::MalformedMessage(format!(
            "non-finite coordinates for {id}"
        )));
    }
    Ok((ParticipantId::new(id), sample))
}

/// Encodes the local participant's sample for the relay.
pub fn encode_sample(id: &ParticipantId, sample: &PositionSample) -> Result<String, CodecError> {
    if !sample.is_finite() {
        return Err(CodecError::NonFinite);
    }
    let record = SampleRecordOut {
        id: id.as_str(),
        x: sample.x,
        y: sample.y,
        frame: sample.frame,
    };
    Ok(serde_json::to_string(&record)?)
}

/// Decodes a single client sample record.
pub fn decode_sample(payload: &str) -> Result<(ParticipantId, PositionSample), CodecError> {
    let record: SampleRecordIn = serde_json::from_str(payload)?;
    validated(record.id, PositionSample::new(record.x, record.y, record.frame))
}

/// Encodes the full relay table, one entry per participant.
pub fn encode_table(table: &StateTable) -> Result<String, CodecError> {
    let mut entries: HashMap<&str, TableEntryDto> = HashMap::with_capacity(table.len());
    for (id, sample) in table {
        if !sample.is_finite() {
            return Err(CodecError::NonFinite);
        }
        entries.insert(
            id.as_str(),
            TableEntryDto {
                x: sample.x,
                y: sample.y,
                frame: sample.frame,
            },
        );
    }
    Ok(serde_json::to_string(&entries)?)
}

/// Decodes a relay table broadcast.
pub fn decode_table(payload: &str) -> Result<StateTable, CodecError> {
    let entries: HashMap<String, TableEntryDto> = serde_json::from_str(payload)?;
    entries
        .into_iter()
        .map(|(id, entry)| validated(id, PositionSample::new(entry.x, entry.y, entry.frame)))
        .collect()
}
