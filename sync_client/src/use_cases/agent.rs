use super::types::{InboundEvent, SyncLink, TickReport};
use crate::domain::{
    Presentation, ReconciliationAction, RemoteEntityRegistry, SyncError, reconcile,
};
use std::time::{Duration, Instant};
use sync_protocol::{ParticipantId, PositionSample, decode_table, encode_sample};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const LOG_THROTTLE: Duration = Duration::from_secs(2);

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

/// Session context for one local participant.
///
/// Owns the participant id, the outgoing side of the relay link and the registry of remote
/// entities. Everything runs on the caller's tick; nothing here awaits network I/O.
pub struct ClientSyncAgent<H> {
    local_id: ParticipantId,
    registry: RemoteEntityRegistry<H>,
    outbound_tx: mpsc::Sender<String>,
    inbound_rx: mpsc::Receiver<InboundEvent>,
    connected: bool,
    // Newest encoded sample that did not fit in the outbound queue; retried every tick.
    pending: Option<String>,

    samples_superseded: u64,
    malformed: u64,
    last_send_full_log: Instant,
    last_malformed_log: Instant,
}

impl<H> ClientSyncAgent<H> {
    pub fn new(local_id: ParticipantId, link: SyncLink) -> Self {
        let now = Instant::now()
            .checked_sub(LOG_THROTTLE)
            .unwrap_or_else(Instant::now);
        Self {
            local_id,
            registry: RemoteEntityRegistry::new(),
            outbound_tx: link.outbound_tx,
            inbound_rx: link.inbound_rx,
            connected: true,
            pending: None,
            samples_superseded: 0,
            malformed: 0,
            last_send_full_log: now,
            last_malformed_log: now,
        }
    }

    pub fn local_id(&self) -> &ParticipantId {
        &self.local_id
    }

    pub fn registry(&self) -> &RemoteEntityRegistry<H> {
        &self.registry
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Returns the local sample only when a movement command is active.
    ///
    /// Stationary participants do not transmit.
    pub fn sample_if_moved<P>(&self, presentation: &P) -> Option<PositionSample>
    where
        P: Presentation<Handle = H>,
    {
        let (vx, vy) = presentation.local_velocity();
        if vx == 0.0 && vy == 0.0 {
            return None;
        }
        Some(presentation.local_sample())
    }

    /// Queues the local sample for the relay without waiting for delivery.
    ///
    /// Latest value wins: when the queue is full the sample is held back and retried on the
    /// next tick, replacing any sample still held from before.
    pub fn on_send(&mut self, sample: PositionSample) -> Result<(), SyncError> {
        if !self.connected {
            return Err(SyncError::TransportClosed);
        }

        let payload = encode_sample(&self.local_id, &sample)?;
        if self.pending.take().is_some() {
            self.samples_superseded += 1;
        }
        self.try_queue(payload)
    }

    /// Retries the held-back sample, if any. Runs even when the participant stands still so
    /// the relay ends up with the final position.
    pub fn flush_pending(&mut self) -> Result<(), SyncError> {
        match self.pending.take() {
            Some(payload) => self.try_queue(payload),
            None => Ok(()),
        }
    }

    fn try_queue(&mut self, payload: String) -> Result<(), SyncError> {
        match self.outbound_tx.try_send(payload) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(payload)) => {
                self.pending = Some(payload);
                if should_log(&mut self.last_send_full_log) {
                    warn!(
                        superseded = self.samples_superseded,
                        "outbound queue full; holding latest sample"
                    );
                }
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_payload)) => Err(SyncError::TransportClosed),
        }
    }

    /// Decodes a relay table and diffs it against the registry.
    ///
    /// A malformed payload yields no actions and leaves the registry untouched.
    pub fn on_receive<P>(&mut self, payload: &str, presentation: &P) -> Vec<ReconciliationAction>
    where
        P: Presentation<Handle = H>,
    {
        match decode_table(payload) {
            Ok(table) => reconcile(&self.local_id, &table, &self.registry, |handle| {
                presentation.is_handle_valid(handle)
            }),
            Err(e) => {
                self.malformed += 1;
                if should_log(&mut self.last_malformed_log) {
                    warn!(
                        bytes = payload.len(),
                        malformed = self.malformed,
                        error = %e,
                        "dropping malformed table"
                    );
                }
                Vec::new()
            }
        }
    }

    /// Applies reconciliation actions to the presentation layer and the registry together.
    pub fn apply<P>(&mut self, actions: Vec<ReconciliationAction>, presentation: &mut P) -> usize
    where
        P: Presentation<Handle = H>,
    {
        let applied = actions.len();
        for action in actions {
            match action {
                ReconciliationAction::Create(id, sample) => {
                    let handle = presentation.create_remote_entity(&id, &sample);
                    debug!(participant_id = %id, "remote entity created");
                    if let Some(stale) = self.registry.insert(id, handle) {
                        presentation.destroy_remote_entity(stale);
                    }
                }
                ReconciliationAction::Replace(id, sample) => {
                    if let Some(stale) = self.registry.remove(&id) {
                        presentation.destroy_remote_entity(stale);
                    }
                    let handle = presentation.create_remote_entity(&id, &sample);
                    debug!(participant_id = %id, "remote entity recreated");
                    self.registry.insert(id, handle);
                }
                ReconciliationAction::Update(id, sample) => match self.registry.get_mut(&id) {
                    Some(handle) => presentation.update_remote_entity(handle, &sample),
                    None => {
                        let handle = presentation.create_remote_entity(&id, &sample);
                        self.registry.insert(id, handle);
                    }
                },
                ReconciliationAction::Remove(id) => {
                    if let Some(handle) = self.registry.remove(&id) {
                        presentation.destroy_remote_entity(handle);
                        debug!(participant_id = %id, "remote entity removed");
                    }
                }
            }
        }
        applied
    }

    /// One cooperative step: send if moved, then apply every table already delivered.
    pub fn tick<P>(&mut self, presentation: &mut P) -> TickReport
    where
        P: Presentation<Handle = H>,
    {
        let mut report = TickReport::default();

        if self.connected {
            let sent = match self.sample_if_moved(presentation) {
                Some(sample) => self.on_send(sample).map(|()| true),
                None => self.flush_pending().map(|()| false),
            };
            match sent {
                Ok(sent) => report.sent = sent,
                Err(SyncError::TransportClosed) => self.mark_disconnected(presentation),
                Err(e) => warn!(error = %e, "local sample not sent"),
            }
        }

        loop {
            match self.inbound_rx.try_recv() {
                Ok(InboundEvent::Table(payload)) => {
                    let actions = self.on_receive(&payload, presentation);
                    report.actions_applied += self.apply(actions, presentation);
                    report.tables_applied += 1;
                }
                Ok(InboundEvent::Closed) => self.mark_disconnected(presentation),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    self.mark_disconnected(presentation);
                    break;
                }
            }
        }

        report.connected = self.connected;
        report
    }

    fn mark_disconnected<P>(&mut self, presentation: &mut P)
    where
        P: Presentation<Handle = H>,
    {
        if !self.connected {
            return;
        }
        self.connected = false;
        info!(
            participant_id = %self.local_id,
            samples_superseded = self.samples_superseded,
            malformed = self.malformed,
            "relay connection lost"
        );
        presentation.on_disconnected();
    }
}
