// Use cases layer: the relay workflow that owns the participant table.

pub mod relay;
pub mod types;

pub use relay::relay_task;
pub use types::{RelayEvent, RelayStats, TableUpdate};
