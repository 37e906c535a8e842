// Use-case level inputs/outputs for the sync agent.

use tokio::sync::mpsc;

/// What the transport hands to the agent.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    // Raw table payload as received; decoding happens inside the tick.
    Table(String),
    Closed,
}

/// Channel pair connecting an agent to its transport tasks.
pub struct SyncLink {
    // Encoded samples waiting for the writer task.
    pub outbound_tx: mpsc::Sender<String>,
    // Tables and closure notices delivered by the reader task.
    pub inbound_rx: mpsc::Receiver<InboundEvent>,
}

/// Summary of one agent tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub sent: bool,
    pub tables_applied: usize,
    pub actions_applied: usize,
    pub connected: bool,
}
