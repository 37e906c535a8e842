// Network adapter modules split by participant sockets vs auxiliary HTTP routes.

pub mod client;
pub mod health;

pub use client::{spawn_table_serializer, ws_handler};
pub use health::health_handler;
