// Interface adapters: the WebSocket transport that feeds a `SyncLink`.

pub mod net;

pub use net::{ConnectError, LinkSettings, connect};
