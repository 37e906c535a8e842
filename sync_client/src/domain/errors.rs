use std::fmt;
use sync_protocol::CodecError;

// Client-side sync failures surfaced to the tick loop.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncError {
    // The relay connection is gone; no reconnection is attempted.
    TransportClosed,
    // The local sample could not be put on the wire.
    Encode(CodecError),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::TransportClosed => write!(f, "relay transport closed"),
            SyncError::Encode(err) => write!(f, "failed to encode sample: {err}"),
        }
    }
}

impl std::error::Error for SyncError {}

impl From<CodecError> for SyncError {
    fn from(err: CodecError) -> Self {
        SyncError::Encode(err)
    }
}
