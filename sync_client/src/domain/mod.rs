// Domain layer: remote entity bookkeeping and the reconciliation rules.

pub mod errors;
pub mod ports;
pub mod reconcile;
pub mod registry;

pub use errors::SyncError;
pub use ports::Presentation;
pub use reconcile::{ReconciliationAction, reconcile};
pub use registry::RemoteEntityRegistry;
