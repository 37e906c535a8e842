use crate::domain::ConnId;
use crate::interface_adapters::state::{AppState, TableBytes};
use crate::interface_adapters::utils::rng::next_conn_id;
use crate::use_cases::{RelayEvent, TableUpdate};

use axum::{
    Error,
    extract::{
        State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use sync_protocol::{ParticipantId, PositionSample, decode_sample, encode_table};
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{Instrument, Span, debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    EventsClosed,
    TableUpdatesClosed,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

pub async fn table_update_serializer(
    mut table_rx: broadcast::Receiver<TableUpdate>,
    table_bytes_tx: broadcast::Sender<TableBytes>,
    table_latest_tx: watch::Sender<TableBytes>,
) {
    // Serialize each table snapshot once and broadcast the shared bytes.
    loop {
        match table_rx.recv().await {
            Ok(update) => {
                let txt = match encode_table(&update.table) {
                    Ok(txt) => txt,
                    Err(e) => {
                        error!(seq = update.seq, error = %e, "failed to serialize table");
                        continue;
                    }
                };

                let table = TableBytes {
                    seq: update.seq,
                    bytes: Utf8Bytes::from(txt),
                };
                // Latest first: anything a receiver can see on the broadcast is never newer
                // than what the watch already holds.
                table_latest_tx.send_replace(table.clone());
                let _ = table_bytes_tx.send(table);
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(missed = n, "table serializer lagged; skipping to latest update");
            }
            Err(broadcast::error::RecvError::Closed) => {
                warn!("table updates channel closed; serializer exiting");
                break;
            }
        }
    }
}

pub fn spawn_table_serializer(state: &AppState) {
    tokio::spawn(table_update_serializer(
        state.table_tx.subscribe(),
        state.table_bytes_tx.clone(),
        state.table_latest_tx.clone(),
    ));
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        let conn_id = next_conn_id();
        // participant_id is filled in once the first valid sample names it.
        let span = info_span!("conn", conn_id, participant_id = tracing::field::Empty);
        handle_socket(socket, state, conn_id).instrument(span)
    })
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>, conn_id: ConnId) {
    let mut ctx = match bootstrap_connection(&mut socket, &state, conn_id).await {
        Ok(ctx) => ctx,
        Err(e) => {
            error!(error = ?e, "failed to bootstrap connection");
            let _ = send_close_with_reason(&mut socket, close_code::ERROR, "relay unavailable")
                .await;
            return;
        }
    };

    info!("client connected");

    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }
}

struct ConnCtx {
    pub conn_id: ConnId,
    // Id named by the most recent valid sample on this socket.
    pub participant_id: Option<ParticipantId>,
    pub event_tx: mpsc::Sender<RelayEvent>,
    pub table_bytes_rx: broadcast::Receiver<TableBytes>,
    pub table_latest_rx: watch::Receiver<TableBytes>,
    // Sequence of the newest table written to this socket; older ones are skipped.
    pub last_seq_sent: u64,
    // Count lag recovery snapshots sent to this client.
    pub lag_recovery_count: u64,

    pub msgs_in: u64,
    pub msgs_out: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,

    pub malformed: u32,
    // Samples that had to wait for room in the relay event queue.
    pub samples_backpressured: u32,

    pub last_events_full_log: Instant,
    pub last_table_lag_log: Instant,
    pub last_malformed_log: Instant,
}

impl ConnCtx {
    fn new(
        conn_id: ConnId,
        event_tx: mpsc::Sender<RelayEvent>,
        table_bytes_rx: broadcast::Receiver<TableBytes>,
        table_latest_rx: watch::Receiver<TableBytes>,
    ) -> Self {
        let now = Instant::now()
            .checked_sub(LOG_THROTTLE)
            .unwrap_or_else(Instant::now);
        Self {
            conn_id,
            participant_id: None,
            event_tx,
            table_bytes_rx,
            table_latest_rx,
            last_seq_sent: 0,
            lag_recovery_count: 0,

            msgs_in: 0,
            msgs_out: 0,
            bytes_in: 0,
            bytes_out: 0,

            malformed: 0,
            samples_backpressured: 0,

            last_events_full_log: now,
            last_table_lag_log: now,
            last_malformed_log: now,
        }
    }

    /// Claims `table` for this socket unless something at least as new was already sent.
    fn take_newer(&mut self, table: TableBytes) -> Option<Utf8Bytes> {
        if table.bytes.is_empty() || table.seq <= self.last_seq_sent {
            return None;
        }
        self.last_seq_sent = table.seq;
        Some(table.bytes)
    }
}

async fn bootstrap_connection(
    socket: &mut WebSocket,
    state: &AppState,
    conn_id: ConnId,
) -> Result<ConnCtx, NetError> {
    // Subscribe to updates *before* doing anything else (awaits) to not miss packets.
    let table_bytes_rx = state.table_bytes_tx.subscribe();
    let table_latest_rx = state.table_latest_tx.subscribe();

    state
        .event_tx
        .send(RelayEvent::Connect { conn_id })
        .await
        .map_err(|_| NetError::EventsClosed)?;

    let mut ctx = ConnCtx::new(
        conn_id,
        state.event_tx.clone(),
        table_bytes_rx,
        table_latest_rx,
    );

    // Hand joiners the current table so stationary participants show up immediately.
    // Tables already queued on the broadcast are older and get skipped by sequence.
    let latest = ctx.table_latest_rx.borrow().clone();
    if let Some(bytes) = ctx.take_newer(latest) {
        let len = bytes.len() as u64;
        if let Err(e) = socket.send(Message::Text(bytes)).await {
            // Undo the registration; the relay must not keep a dead connection.
            state
                .event_tx
                .send(RelayEvent::Disconnect { conn_id })
                .await
                .map_err(|_| NetError::EventsClosed)?; // EventsClosed takes precedence
            return Err(NetError::Ws(e));
        }
        ctx.msgs_out += 1;
        ctx.bytes_out += len;
    }

    Ok(ctx)
}

enum LoopControl {
    Continue,
    Disconnect,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);

async fn send_close_with_reason(
    socket: &mut WebSocket,
    code: u16,
    reason: &'static str,
) -> Result<(), NetError> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await
        .map_err(NetError::Ws)?;
    socket.close().await.map_err(NetError::Ws)
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let mut fatal: Option<NetError> = None;

    loop {
        // disconnect becomes true on error
        let disconnect: bool = tokio::select! {
            // Incoming sample from the participant
            incoming = socket.recv() => {
                match handle_incoming_ws(incoming, ctx).await {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            // Outgoing table broadcast
            table_msg = ctx.table_bytes_rx.recv() => {
                match table_msg {
                    Ok(table) => match ctx.take_newer(table) {
                        Some(bytes) => matches!(
                            forward_table_bytes(bytes, socket, ctx).await,
                            LoopControl::Disconnect
                        ),
                        None => false,
                    },
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        if should_log(&mut ctx.last_table_lag_log) {
                            warn!(missed = n, "table updates lagged; sending latest table");
                        }

                        // Resync strategy: the newest table supersedes everything missed, and
                        // the older tables still buffered are skipped by sequence.
                        let latest = ctx.table_latest_rx.borrow().clone();
                        match ctx.take_newer(latest) {
                            Some(bytes) => {
                                ctx.lag_recovery_count += 1;
                                matches!(
                                    forward_table_bytes(bytes, socket, ctx).await,
                                    LoopControl::Disconnect
                                )
                            }
                            None => false,
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::TableUpdatesClosed);
                        true
                    }
                }
            }
        };

        if disconnect {
            if fatal.is_some() {
                let _ = socket
                    .send(Message::Close(Some(CloseFrame {
                        code: close_code::ERROR,
                        reason: "relay unavailable".into(),
                    })))
                    .await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    if let Err(e) = disconnect_cleanup(ctx).await {
        warn!(error = ?e, "error during disconnect cleanup");
        if fatal.is_none() {
            fatal = Some(e);
        }
    }

    match fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

async fn handle_incoming_ws(
    incoming: Option<Result<Message, Error>>,
    ctx: &mut ConnCtx,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                ctx.msgs_in += 1;
                ctx.bytes_in += text.len() as u64;

                match decode_sample(&text) {
                    Ok((participant_id, sample)) => {
                        if ctx.participant_id.as_ref() != Some(&participant_id) {
                            Span::current().record("participant_id", participant_id.as_str());
                            ctx.participant_id = Some(participant_id.clone());
                        }
                        forward_sample(ctx, participant_id, sample).await
                    }
                    Err(e) => {
                        // Drop and keep the socket open; one bad payload is not a reason to
                        // disconnect the participant.
                        ctx.malformed += 1;
                        if should_log(&mut ctx.last_malformed_log) {
                            warn!(
                                bytes = text.len(),
                                malformed = ctx.malformed,
                                error = %e,
                                "dropping malformed sample"
                            );
                        }
                        Ok(LoopControl::Continue)
                    }
                }
            }
            Message::Binary(bytes) => {
                ctx.msgs_in += 1;
                ctx.bytes_in += bytes.len() as u64;
                ctx.malformed += 1;
                if should_log(&mut ctx.last_malformed_log) {
                    warn!(bytes = bytes.len(), "binary frames not supported; dropping");
                }
                Ok(LoopControl::Continue)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!("websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn forward_sample(
    ctx: &mut ConnCtx,
    participant_id: ParticipantId,
    sample: PositionSample,
) -> Result<LoopControl, NetError> {
    let event = RelayEvent::Sample {
        conn_id: ctx.conn_id,
        participant_id,
        sample,
    };
    // A stationary participant sends nothing more, so a lost sample would leave its entry
    // stale for good. When the queue is full, this socket waits instead of dropping.
    let event = match ctx.event_tx.try_send(event) {
        Ok(()) => return Ok(LoopControl::Continue),
        Err(mpsc::error::TrySendError::Full(event)) => event,
        Err(mpsc::error::TrySendError::Closed(_evt)) => return Err(NetError::EventsClosed),
    };

    ctx.samples_backpressured += 1;
    if should_log(&mut ctx.last_events_full_log) {
        warn!(
            backpressured = ctx.samples_backpressured,
            "relay event channel full; holding socket until it drains"
        );
    }
    ctx.event_tx
        .send(event)
        .await
        .map_err(|_| NetError::EventsClosed)?;
    Ok(LoopControl::Continue)
}

async fn forward_table_bytes(
    table_msg: Utf8Bytes,
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
) -> LoopControl {
    let bytes_len = table_msg.len();
    match socket.send(Message::Text(table_msg)).await {
        Ok(()) => {
            ctx.msgs_out += 1;
            ctx.bytes_out += bytes_len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            // Only this socket is affected; every other connection has its own receiver.
            warn!(error = %err, "failed to send table update");
            LoopControl::Disconnect
        }
    }
}

async fn disconnect_cleanup(ctx: &ConnCtx) -> Result<(), NetError> {
    // Awaited like samples: a lost disconnect would leave a ghost entry.
    ctx.event_tx
        .send(RelayEvent::Disconnect {
            conn_id: ctx.conn_id,
        })
        .await
        .map_err(|_| NetError::EventsClosed)?;

    debug!(
        msgs_in = ctx.msgs_in,
        msgs_out = ctx.msgs_out,
        bytes_in = ctx.bytes_in,
        bytes_out = ctx.bytes_out,
        malformed = ctx.malformed,
        samples_backpressured = ctx.samples_backpressured,
        lag_recovery_count = ctx.lag_recovery_count,
        "connection stats"
    );
    info!("client disconnected");
    Ok(())
}
