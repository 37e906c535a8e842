pub mod domain;
pub mod frameworks;
pub mod interface_adapters;
pub mod use_cases;

pub use domain::{Presentation, ReconciliationAction, RemoteEntityRegistry, SyncError};
pub use frameworks::runner::run_with_config;
pub use use_cases::{ClientSyncAgent, InboundEvent, SyncLink, TickReport};
