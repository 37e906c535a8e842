// Use cases layer: the per-session sync agent driven by the presentation tick.

pub mod agent;
pub mod types;

pub use agent::ClientSyncAgent;
pub use types::{InboundEvent, SyncLink, TickReport};
