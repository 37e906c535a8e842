use std::{env, net::IpAddr};

// Runtime/server constants for the relay.

pub fn relay_host() -> IpAddr {
    env::var("RELAY_HOST")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(IpAddr::from([127, 0, 0, 1]))
}

pub fn relay_port() -> u16 {
    env::var("RELAY_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3001)
}

pub const EVENT_CHANNEL_CAPACITY: usize = 1024;
pub const TABLE_BROADCAST_CAPACITY: usize = 128;
