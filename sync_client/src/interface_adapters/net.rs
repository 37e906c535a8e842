// WebSocket transport between a sync agent and the relay.

use crate::use_cases::{InboundEvent, SyncLink};

use futures_util::{SinkExt, StreamExt};
use std::fmt;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct LinkSettings {
    pub outbound_capacity: usize,
    pub inbound_capacity: usize,
}

#[derive(Debug)]
pub enum ConnectError {
    Ws(tokio_tungstenite::tungstenite::Error),
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectError::Ws(err) => write!(f, "relay connection failed: {err}"),
        }
    }
}

impl std::error::Error for ConnectError {}

impl From<tokio_tungstenite::tungstenite::Error> for ConnectError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ConnectError::Ws(err)
    }
}

/// Opens the relay socket and spawns its writer and reader tasks.
///
/// The returned link is the only way the agent touches the network. Dropping its
/// `outbound_tx` closes the socket; the reader reports `InboundEvent::Closed` exactly once
/// when the relay side ends.
pub async fn connect(url: &str, settings: LinkSettings) -> Result<SyncLink, ConnectError> {
    let (ws, _response) = connect_async(url).await?;
    info!(%url, "connected to relay");

    let (mut sink, mut stream) = ws.split();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(settings.outbound_capacity);
    let (inbound_tx, inbound_rx) = mpsc::channel::<InboundEvent>(settings.inbound_capacity);

    // Writer: encoded samples -> socket.
    tokio::spawn(async move {
        while let Some(payload) = outbound_rx.recv().await {
            if let Err(e) = sink.send(Message::text(payload)).await {
                warn!(error = %e, "relay write failed");
                break;
            }
        }
        let _ = sink.close().await;
        debug!("relay writer stopped");
    });

    // Reader: socket -> raw table payloads.
    tokio::spawn(async move {
        while let Some(msg) = stream.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    let event = InboundEvent::Table(text.as_str().to_owned());
                    if inbound_tx.send(event).await.is_err() {
                        // Agent dropped; nobody is listening anymore.
                        return;
                    }
                }
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "relay closed the connection");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "relay read failed");
                    break;
                }
            }
        }
        let _ = inbound_tx.send(InboundEvent::Closed).await;
    });

    Ok(SyncLink {
        outbound_tx,
        inbound_rx,
    })
}
