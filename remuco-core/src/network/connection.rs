//! Connection handle and the driver task behind it.
//!
//! # Lifecycle
//!
//! ```text
//! Client                                   Server
//!   │ ── open transport ─────────────────────► │   Connecting
//!   │ ◄──────────────── hello FF FF FF 0A ──── │   Handshaking
//!   │ ◄──────────────── [CONN_PINFO] ───────── │
//!   │ ── [CONN_CINFO] ───────────────────────► │   Established ─► Connected event
//!   │ ◄──────────────── [SYNC_*] ───────────── │   Message events
//!   │ ── [CTRL_* / ACT_*] ───────────────────► │
//!   │ ── [REQ_*] ────────────────────────────► │
//!   │ ◄──────────────── [REQ_*] reply ──────── │   delivered to the requester
//!   │ ◄──────────────── [CONN_BYE] ─────────── │   Disconnecting ─► Disconnected event
//! ```
//!
//! One driver task owns the transport. It reads and dispatches one frame
//! at a time and writes queued commands in the order they were enqueued,
//! so callers never interleave partial writes.

use std::mem;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, trace, warn};

use crate::codec::RemucoCodec;
use crate::error::RemucoError;
use crate::message::{ConnId, CtrlId, IGNORE, Message, MessageId, ReqId};
use crate::network::config::{ConnectionConfig, MIN_SWEEP_INTERVAL};
use crate::network::transport::{Connector, StreamConnector};
use crate::packet::Frame;
use crate::protocol::{
    Activation, Control, Item, ItemList, Payload, PlayerInfo, Request,
};
use crate::state::{ConnectionPhase, DisconnectReason, ReplySender, RequestTracker};

/// Upper bound for flushing and shutting down the transport on teardown.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

// ── Events ───────────────────────────────────────────────────────

/// Everything a connection reports, in the order it happened.
#[derive(Debug)]
pub enum ConnectionEvent {
    /// Handshake completed. Emitted at most once.
    Connected(PlayerInfo),
    /// A pushed message (`SYNC_*`, or a repeated `CONN_PINFO`).
    Message { id: MessageId, payload: Payload },
    /// The connection ended. Emitted exactly once, always last.
    Disconnected(DisconnectReason),
}

pub type EventReceiver = mpsc::UnboundedReceiver<ConnectionEvent>;

#[derive(Debug)]
enum Command {
    Send(Message),
    Request {
        class: ReqId,
        message: Message,
        reply: ReplySender,
    },
    ShutdownPlayer,
}

// ── Connection ───────────────────────────────────────────────────

/// Handle to one connection. Clones share the same driver.
///
/// The driver stops on [`Connection::disconnect`], on server close or
/// error, or once every handle has been dropped.
#[derive(Debug, Clone)]
pub struct Connection {
    commands: mpsc::Sender<Command>,
    phase: watch::Receiver<ConnectionPhase>,
    player: watch::Receiver<Option<PlayerInfo>>,
    cancel: CancellationToken,
}

impl Connection {
    /// Spawns the driver and starts connecting. Must be called inside a
    /// tokio runtime.
    pub fn connect<C: Connector>(connector: C, config: ConnectionConfig) -> (Self, EventReceiver) {
        let (command_tx, command_rx) = mpsc::channel(config.command_capacity.max(1));
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (phase_tx, phase_rx) = watch::channel(ConnectionPhase::Connecting);
        let (player_tx, player_rx) = watch::channel(None);
        let cancel = CancellationToken::new();

        let driver = Driver {
            tracker: RequestTracker::with_default_timeout(config.request_timeout),
            config,
            commands: command_rx,
            backlog: Vec::new(),
            events: event_tx,
            phase: phase_tx,
            player: player_tx,
            cancel: cancel.clone(),
        };
        let span = info_span!("connection", peer = %connector.peer());
        tokio::spawn(driver.run(connector).instrument(span));

        let conn = Self {
            commands: command_tx,
            phase: phase_rx,
            player: player_rx,
            cancel,
        };
        (conn, event_rx)
    }

    /// Runs a connection over a stream the caller already opened.
    pub fn with_stream<S>(stream: S, config: ConnectionConfig) -> (Self, EventReceiver)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        Self::connect(StreamConnector::new(stream), config)
    }

    pub fn phase(&self) -> ConnectionPhase {
        *self.phase.borrow()
    }

    /// Player info from the handshake, `None` before it and after teardown.
    pub fn player_info(&self) -> Option<PlayerInfo> {
        self.player.borrow().clone()
    }

    /// Waits until the connection reached `Disconnected`.
    pub async fn closed(&self) {
        let mut phase = self.phase.clone();
        // A dropped sender means the driver is gone, which is closed as well.
        let _ = phase.wait_for(ConnectionPhase::is_disconnected).await;
    }

    // ── Outbound ─────────────────────────────────────────────────

    /// Queues a raw message. Requests must go through [`Connection::request`]
    /// so their replies can be correlated.
    pub async fn send(&self, message: Message) -> Result<(), RemucoError> {
        let id = message.id();
        if id.is_request() {
            return Err(RemucoError::InvalidMessage(format!(
                "{id} is a request, use request()"
            )));
        }
        if !id.sent_by_client() {
            return Err(RemucoError::InvalidMessage(format!(
                "{id} is not sent by clients"
            )));
        }
        if id == MessageId::Ctrl(CtrlId::Shutdown) {
            return self.shutdown_player().await;
        }
        self.enqueue(Command::Send(message)).await
    }

    pub async fn control(&self, control: Control) -> Result<(), RemucoError> {
        self.send(control.to_message()?).await
    }

    pub async fn activate(&self, activation: Activation) -> Result<(), RemucoError> {
        self.send(activation.to_message()).await
    }

    /// Sends a request and waits for its reply.
    ///
    /// Fails with `RequestInFlight` if a request of the same class is
    /// still outstanding, with `Timeout` if the reply does not arrive in
    /// time and with `ConnectionClosed` if the connection goes down first.
    pub async fn request(&self, request: Request) -> Result<Payload, RemucoError> {
        let message = request.to_message()?;
        let (reply, rx) = oneshot::channel();
        self.enqueue(Command::Request {
            class: request.class(),
            message,
            reply,
        })
        .await?;
        rx.await?
    }

    pub async fn request_item(&self, id: impl Into<String>) -> Result<Item, RemucoError> {
        match self.request(Request::Item(id.into())).await? {
            Payload::Item(item) => Ok(item),
            other => Err(unexpected_reply(ReqId::Item, &other)),
        }
    }

    pub async fn request_playlist(&self) -> Result<ItemList, RemucoError> {
        self.request_list(Request::Playlist).await
    }

    pub async fn request_queue(&self) -> Result<ItemList, RemucoError> {
        self.request_list(Request::Queue).await
    }

    /// Lists a level of the media library; the empty path is the root.
    pub async fn request_library(&self, path: Vec<String>) -> Result<ItemList, RemucoError> {
        self.request_list(Request::MediaLib(path)).await
    }

    pub async fn request_files(&self, path: Vec<String>) -> Result<ItemList, RemucoError> {
        self.request_list(Request::Files(path)).await
    }

    async fn request_list(&self, request: Request) -> Result<ItemList, RemucoError> {
        let class = request.class();
        match self.request(request).await? {
            Payload::ItemList(list) => Ok(list),
            other => Err(unexpected_reply(class, &other)),
        }
    }

    /// Asks the server to shut the player down, then closes the connection.
    ///
    /// `send`ing `CTRL_SHUTDOWN` or `control(Control::Shutdown)` ends up here.
    pub async fn shutdown_player(&self) -> Result<(), RemucoError> {
        self.enqueue(Command::ShutdownPlayer).await
    }

    /// Closes the connection. Calling it again is a no-op.
    pub fn disconnect(&self) {
        self.cancel.cancel();
    }

    async fn enqueue(&self, command: Command) -> Result<(), RemucoError> {
        self.commands.send(command).await?;
        Ok(())
    }
}

fn unexpected_reply(class: ReqId, payload: &Payload) -> RemucoError {
    RemucoError::decoding(format!("{class} answered with a {} payload", payload.kind()))
}

// ── Driver ───────────────────────────────────────────────────────

struct Driver {
    config: ConnectionConfig,
    tracker: RequestTracker,
    commands: mpsc::Receiver<Command>,
    /// Commands that arrived before the handshake finished.
    backlog: Vec<Command>,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    phase: watch::Sender<ConnectionPhase>,
    player: watch::Sender<Option<PlayerInfo>>,
    cancel: CancellationToken,
}

impl Driver {
    async fn run<C: Connector>(mut self, connector: C) {
        let stream = match self.open(connector).await {
            Ok(stream) => stream,
            Err(reason) => {
                self.teardown::<C::Stream>(None, reason).await;
                return;
            }
        };

        self.transition(ConnectionPhase::begin_handshake);
        let mut framed = Framed::new(stream, RemucoCodec::new());

        let reason = match self.handshake(&mut framed).await {
            Ok(info) => {
                self.transition(ConnectionPhase::complete_handshake);
                info!(player = %info.name, features = ?info.features, "connected");
                self.player.send_replace(Some(info.clone()));
                let _ = self.events.send(ConnectionEvent::Connected(info));
                self.serve(&mut framed).await
            }
            Err(reason) => reason,
        };

        self.teardown(Some(&mut framed), reason).await;
    }

    fn transition(&self, step: fn(&mut ConnectionPhase) -> Result<(), RemucoError>) {
        self.phase.send_modify(|phase| {
            if let Err(e) = step(phase) {
                warn!(error = %e, "unexpected phase transition");
            }
        });
        let phase = *self.phase.borrow();
        debug!(%phase, "phase changed");
    }

    async fn open<C: Connector>(&mut self, connector: C) -> Result<C::Stream, DisconnectReason> {
        let timeout = self.config.connect_timeout;
        debug!(?timeout, "opening transport");
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(DisconnectReason::Closed),
            opened = tokio::time::timeout(timeout, connector.connect()) => match opened {
                Ok(Ok(stream)) => Ok(stream),
                Ok(Err(e)) => {
                    warn!(error = %e, "failed to open transport");
                    Err(RemucoError::Transport(e).into())
                }
                Err(_) => {
                    warn!(?timeout, "timed out opening transport");
                    Err(RemucoError::Timeout(timeout).into())
                }
            },
        }
    }

    // ── Handshake ────────────────────────────────────────────────

    async fn handshake<S>(
        &mut self,
        framed: &mut Framed<S, RemucoCodec>,
    ) -> Result<PlayerInfo, DisconnectReason>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let limit = self.config.handshake_timeout;
        let deadline = tokio::time::sleep(limit);
        tokio::pin!(deadline);

        let info = loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(DisconnectReason::Closed),
                _ = &mut deadline => {
                    return Err(handshake_error(format!("no player info within {limit:?}")));
                }
                next = framed.next() => next,
                command = self.commands.recv() => match command {
                    Some(command) => {
                        self.backlog.push(command);
                        continue;
                    }
                    None => {
                        debug!("all connection handles dropped during handshake");
                        return Err(DisconnectReason::Closed);
                    }
                },
            };

            let frame = match next {
                None => return Err(handshake_error("server closed the stream")),
                Some(Err(e @ RemucoError::Transport(_))) => return Err(e.into()),
                Some(Err(e @ (RemucoError::Handshake(_) | RemucoError::UnsupportedVersion(_)))) => {
                    return Err(e.into());
                }
                Some(Err(e)) => return Err(handshake_error(e.to_string())),
                Some(Ok(frame)) => frame,
            };

            match frame.id() {
                IGNORE => continue,
                id if id == ConnId::PlayerInfo.as_raw() => {
                    match crate::protocol::decode(ConnId::PlayerInfo.into(), frame.data()) {
                        Ok(Payload::PlayerInfo(info)) => break info,
                        Ok(other) => {
                            return Err(handshake_error(format!("unexpected {} payload", other.kind())));
                        }
                        Err(e) => return Err(handshake_error(format!("malformed player info: {e}"))),
                    }
                }
                id if id == ConnId::Bye.as_raw() => return Err(DisconnectReason::ServerClosed),
                id => warn!(id, "ignoring message received before player info"),
            }
        };

        let cinfo = Message::encode(
            ConnId::ClientInfo,
            &Payload::ClientInfo(self.config.client_info.clone()),
        )?;
        framed.send(Frame::from(cinfo)).await?;
        Ok(info)
    }

    // ── Established ──────────────────────────────────────────────

    async fn serve<S>(&mut self, framed: &mut Framed<S, RemucoCodec>) -> DisconnectReason
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let period = self.config.request_sweep_interval.max(MIN_SWEEP_INTERVAL);
        let mut sweep = tokio::time::interval(period);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        for command in mem::take(&mut self.backlog) {
            if let Some(reason) = self.execute(framed, command).await {
                return reason;
            }
        }

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return DisconnectReason::Closed,

                inbound = framed.next() => match inbound {
                    None => {
                        info!("server closed the stream");
                        return DisconnectReason::ServerClosed;
                    }
                    Some(Err(e)) => return DisconnectReason::Error(e),
                    Some(Ok(frame)) => {
                        if let Some(reason) = self.dispatch(frame) {
                            return reason;
                        }
                    }
                },

                command = self.commands.recv() => match command {
                    None => {
                        debug!("all connection handles dropped");
                        return DisconnectReason::Closed;
                    }
                    Some(command) => {
                        if let Some(reason) = self.execute(framed, command).await {
                            return reason;
                        }
                    }
                },

                _ = sweep.tick() => self.expire_requests(),
            }
        }
    }

    /// Routes one inbound frame. Returns a reason if the connection must end.
    fn dispatch(&mut self, frame: Frame) -> Option<DisconnectReason> {
        let raw = frame.id();
        let len = frame.data().len();
        let message = match Message::try_from(frame) {
            Ok(message) => message,
            Err(_) => {
                return absorb(RemucoError::ProtocolAnomaly(format!(
                    "unknown id {raw} ({len} bytes)"
                )));
            }
        };
        message.dump();

        match message.id() {
            MessageId::Ignore => None,
            MessageId::Conn(ConnId::Bye) => {
                info!("server said goodbye");
                Some(DisconnectReason::ServerClosed)
            }
            MessageId::Req(class) => self.deliver_reply(class, &message),
            id if !id.sent_by_server() => absorb(RemucoError::ProtocolAnomaly(format!(
                "{id} is never sent by servers ({len} bytes)"
            ))),
            id => match message.decode() {
                Ok(payload) => {
                    if let Payload::PlayerInfo(info) = &payload {
                        self.player.send_replace(Some(info.clone()));
                    }
                    let _ = self.events.send(ConnectionEvent::Message { id, payload });
                    None
                }
                Err(e) => {
                    warn!(%id, len, "undecodable message");
                    absorb(e)
                }
            },
        }
    }

    fn deliver_reply(&mut self, class: ReqId, message: &Message) -> Option<DisconnectReason> {
        let Some(pending) = self.tracker.resolve(class) else {
            return absorb(RemucoError::ProtocolAnomaly(format!(
                "{class} reply without outstanding request"
            )));
        };
        match message.decode() {
            Ok(payload) => {
                debug!(%class, elapsed = ?pending.elapsed(), "request answered");
                pending.complete(Ok(payload));
                None
            }
            Err(e) => {
                warn!(%class, error = %e, "undecodable reply");
                let detail = match &e {
                    RemucoError::Decoding(d) => d.clone(),
                    other => other.to_string(),
                };
                pending.complete(Err(RemucoError::decoding(detail)));
                absorb(e)
            }
        }
    }

    async fn execute<S>(
        &mut self,
        framed: &mut Framed<S, RemucoCodec>,
        command: Command,
    ) -> Option<DisconnectReason>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let message = match command {
            Command::Send(message) => message,
            Command::Request {
                class,
                message,
                reply,
            } => {
                if let Err(e) = self.tracker.track(class, reply) {
                    debug!(%class, error = %e, "request rejected");
                    return None;
                }
                debug!(%class, pending = self.tracker.pending_count(), "request sent");
                message
            }
            Command::ShutdownPlayer => {
                info!("asking the player to shut down");
                let message = Message::empty(CtrlId::Shutdown);
                if let Err(e) = write(framed, message).await {
                    return Some(e.into());
                }
                return Some(DisconnectReason::Closed);
            }
        };

        match write(framed, message).await {
            Ok(()) => None,
            Err(e) => Some(e.into()),
        }
    }

    fn expire_requests(&mut self) {
        for (class, pending) in self.tracker.drain_expired() {
            let limit = pending.deadline.unwrap_or_else(|| pending.elapsed());
            warn!(%class, ?limit, "request timed out");
            pending.complete(Err(RemucoError::Timeout(limit)));
        }
    }

    // ── Teardown ─────────────────────────────────────────────────

    async fn teardown<S>(&mut self, framed: Option<&mut Framed<S, RemucoCodec>>, reason: DisconnectReason)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let uptime = self.phase.borrow().established_for();
        if uptime.is_some() {
            self.transition(ConnectionPhase::begin_disconnect);
        }

        let failed = self.tracker.fail_all();
        self.commands.close();
        let mut dropped = 0usize;
        let mut queued = mem::take(&mut self.backlog);
        while let Ok(command) = self.commands.try_recv() {
            queued.push(command);
        }
        for command in queued {
            if let Command::Request { reply, .. } = command {
                let _ = reply.send(Err(RemucoError::ConnectionClosed));
            }
            dropped += 1;
        }
        if failed > 0 || dropped > 0 {
            debug!(failed, dropped, "cleared pending work");
        }

        if let Some(framed) = framed {
            match tokio::time::timeout(CLOSE_TIMEOUT, framed.close()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => trace!(error = %e, "error closing transport"),
                Err(_) => trace!("timed out closing transport"),
            }
        }

        self.phase.send_modify(|phase| {
            if phase.finish_disconnect().is_err() {
                phase.force_disconnect();
            }
        });
        self.player.send_replace(None);

        if reason.is_error() {
            warn!(%reason, ?uptime, "disconnected");
        } else {
            info!(%reason, ?uptime, "disconnected");
        }
        let _ = self.events.send(ConnectionEvent::Disconnected(reason));
    }
}

async fn write<S>(framed: &mut Framed<S, RemucoCodec>, message: Message) -> Result<(), RemucoError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    trace!(%message, "sending");
    framed.send(Frame::from(message)).await
}

/// Logs a non-fatal error and keeps the connection; fatal ones end it.
fn absorb(error: RemucoError) -> Option<DisconnectReason> {
    if error.is_fatal() {
        return Some(DisconnectReason::Error(error));
    }
    warn!(%error, "discarding message");
    None
}

fn handshake_error(detail: impl Into<String>) -> DisconnectReason {
    DisconnectReason::Error(RemucoError::Handshake(detail.into()))
}
