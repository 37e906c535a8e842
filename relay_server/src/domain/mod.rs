// Domain layer: authoritative participant table and connection bookkeeping.

pub mod relay_table;

pub use relay_table::{ConnId, RelayTable, UpsertOutcome};
