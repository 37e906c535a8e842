use std::{env, time::Duration};

// Runtime constants for the sync client.

pub fn server_url() -> String {
    env::var("SYNC_SERVER_URL").unwrap_or_else(|_| "ws://127.0.0.1:3001/ws".to_string())
}

pub fn tick_interval() -> Duration {
    let ms = env::var("SYNC_TICK_MS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .unwrap_or(16);
    Duration::from_millis(ms)
}

pub const OUTBOUND_CHANNEL_CAPACITY: usize = 64;
pub const INBOUND_CHANNEL_CAPACITY: usize = 256;
