// Shared wire model for the relay server and sync clients.

pub mod codec;
pub mod domain;
pub mod identity;

pub use codec::{CodecError, decode_sample, decode_table, encode_sample, encode_table};
pub use domain::{ParticipantId, PositionSample, StateTable};
