// Interface adapters: WebSocket handling and HTTP DTOs.

pub mod net;
pub mod protocol;
pub mod state;
pub mod utils;
