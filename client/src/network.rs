//! Client network layer: the connection to the server and the per-tick
//! session pump.
//!
//! One reader task turns the server's byte stream back into frames and
//! forwards them over a channel; one writer task drains the outbound
//! queue. Everything else happens inside [`Client::tick`], called from
//! the game's main loop: received messages are dispatched into the
//! session/replication state, the seed request is retried while
//! unseeded, remote entities are smoothed, and the local player's
//! snapshot goes out on its own timer.

use crate::game::{GameCallbacks, HitEffect, LocalPlayer, SessionEnd};
use crate::replication::ReplicationManager;
use crate::session::{Role, SessionState};
use log::{debug, error, info, warn};
use shared::dispatch::DispatchTable;
use shared::{
    ClientId, Frame, Message, PacketType, PositionSnapshot, StreamReassembler, MAX_FRAME_SIZE,
    NO_VICTIM, SNAPSHOT_RATE,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Events reported by the reader task.
#[derive(Debug)]
enum NetEvent {
    Frame(Frame),
    /// The server closed the connection, the transport failed, or the
    /// stream was corrupt. All three end the session.
    Closed,
}

/// Replication events produced by packet handlers, drained once per tick
/// into the game's [`GameCallbacks`].
#[derive(Debug)]
enum GameEvent {
    WorldReady(i64),
    PlayerJoined(ClientId),
    PlayerLeft(ClientId),
    Hit(HitEffect),
    DamageTaken(ClientId),
    HostLeft,
}

/// The mutable state packet handlers operate on. Split out of [`Client`]
/// so the dispatch table can borrow it as a whole.
pub struct ClientCore {
    pub session: SessionState,
    pub replication: ReplicationManager,
    events: Vec<GameEvent>,
}

/// Whether the session is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    Ended(SessionEnd),
}

/// A live connection to a session server.
pub struct Client {
    core: ClientCore,
    table: DispatchTable<ClientCore>,
    net_rx: UnboundedReceiver<NetEvent>,
    out_tx: UnboundedSender<Vec<u8>>,
    snapshot_timer: f64,
    status: SessionStatus,
}

impl Client {
    /// Opens the connection and spawns its reader and writer tasks.
    /// Bootstrap (ID, roster, seed) arrives asynchronously; drive it by
    /// calling [`tick`].
    ///
    /// [`tick`]: Client::tick
    pub async fn connect(addr: &str, role: Role) -> std::io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!("set_nodelay failed: {}", e);
        }
        info!("Connected to server at {}", addr);

        let (read_half, write_half) = stream.into_split();
        let (net_tx, net_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();

        tokio::spawn(run_reader(read_half, net_tx));
        tokio::spawn(run_writer(write_half, out_rx));

        Ok(Client {
            core: ClientCore {
                session: SessionState::new(role),
                replication: ReplicationManager::new(),
                events: Vec::new(),
            },
            table: build_dispatch_table(),
            net_rx,
            out_tx,
            snapshot_timer: 0.0,
            status: SessionStatus::Active,
        })
    }

    /// Advances the session by one tick: pumps received packets, retries
    /// the seed request while unseeded, smooths remote entities, and
    /// publishes the local player's snapshot at the fixed rate.
    pub fn tick(
        &mut self,
        delta: f64,
        local: &LocalPlayer,
        callbacks: &mut dyn GameCallbacks,
    ) -> SessionStatus {
        if self.status != SessionStatus::Active {
            return self.status;
        }

        let closed = self.pump_network();
        self.deliver_events(callbacks);
        // A HostLeft frame and the closure often arrive together; the
        // frame names the real reason, so it gets delivered first and a
        // bare closure only counts as lost when nothing else ended the
        // session.
        if closed {
            self.end_session(SessionEnd::ConnectionLost, callbacks);
        }
        if self.status != SessionStatus::Active {
            return self.status;
        }

        if self.core.session.tick_seed_retry(delta) {
            debug!("Requesting world seed");
            self.send_message(&Message::RequestWorldSeed, false);
        }

        self.core.replication.tick(delta);

        // The snapshot timer runs independently of the tick rate; no ID
        // yet means nothing to publish under.
        if let Some(id) = self.core.session.self_id() {
            self.snapshot_timer -= delta;
            if self.snapshot_timer <= 0.0 {
                self.snapshot_timer = 1.0 / SNAPSHOT_RATE;
                self.send_message(
                    &Message::PositionSnapshot(PositionSnapshot {
                        pos: local.pos,
                        height: local.height,
                        facing: local.facing,
                        id,
                        color: local.color,
                    }),
                    true,
                );
            }
        }

        self.status
    }

    /// Announces a shot this process decided landed (or missed). The
    /// shooter is authoritative: receivers reproduce the effect and the
    /// named victim applies the damage, no acknowledgment involved.
    pub fn send_hit(&mut self, victim: Option<ClientId>, hit_pos: shared::Vec2, hit_height: f64) {
        let Some(attacker_id) = self.core.session.self_id() else {
            warn!("Dropping hit event: no client ID assigned yet");
            return;
        };

        self.send_message(
            &Message::HitEvent {
                attacker_id,
                victim_id: victim.unwrap_or(NO_VICTIM),
                hit_pos,
                hit_height,
            },
            true,
        );
    }

    /// Announces a graceful departure. Peers drop our entity on receipt;
    /// the server also notices the socket closing, so a lost leave packet
    /// only delays the cleanup.
    pub fn send_leave(&mut self) {
        if let Some(id) = self.core.session.self_id() {
            self.send_message(&Message::PlayerLeft { id }, true);
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.core.session
    }

    pub fn replication(&self) -> &ReplicationManager {
        &self.core.replication
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Drains the reader task's channel. Returns true if the connection
    /// was reported closed.
    fn pump_network(&mut self) -> bool {
        while let Ok(event) = self.net_rx.try_recv() {
            match event {
                NetEvent::Frame(frame) => self.handle_frame(frame),
                NetEvent::Closed => return true,
            }
        }
        false
    }

    fn handle_frame(&mut self, frame: Frame) {
        let message = match Message::decode(&frame) {
            Ok(message) => message,
            Err(e) => {
                // Semantic garbage is dropped, not fatal; only framing
                // corruption (handled in the reader) kills the stream.
                warn!("Undecodable packet from server: {}", e);
                return;
            }
        };

        match self.table.dispatch(&mut self.core, (), &message) {
            Ok(true) => {}
            Ok(false) => warn!("No handler for {:?}", message.packet_type()),
            Err(e) => error!("Handler for {:?} failed: {}", message.packet_type(), e),
        }
    }

    fn deliver_events(&mut self, callbacks: &mut dyn GameCallbacks) {
        for event in self.core.events.drain(..) {
            match event {
                GameEvent::WorldReady(seed) => {
                    info!("World seed received: {}", seed);
                    callbacks.world_ready(seed);
                }
                GameEvent::PlayerJoined(id) => {
                    info!("Player {} joined", id);
                    callbacks.player_joined(id);
                }
                GameEvent::PlayerLeft(id) => {
                    info!("Player {} left", id);
                    callbacks.player_left(id);
                }
                GameEvent::Hit(effect) => callbacks.hit_effect(&effect),
                GameEvent::DamageTaken(attacker_id) => callbacks.damage_taken(attacker_id),
                GameEvent::HostLeft => {
                    info!("Host left, ending session");
                    self.status = SessionStatus::Ended(SessionEnd::HostLeft);
                    callbacks.session_ended(SessionEnd::HostLeft);
                    return;
                }
            }
        }
    }

    fn end_session(&mut self, reason: SessionEnd, callbacks: &mut dyn GameCallbacks) {
        if self.status == SessionStatus::Active {
            warn!("Session ended: {:?}", reason);
            self.status = SessionStatus::Ended(reason);
            callbacks.session_ended(reason);
        }
    }

    /// Queues a message for the writer task. Send failures mean the
    /// writer is gone; the reader will report the closure, so the
    /// failure is logged rather than surfaced here.
    fn send_message(&self, message: &Message, is_broadcast: bool) {
        match message.to_frame(is_broadcast) {
            Ok(bytes) => {
                if self.out_tx.send(bytes).is_err() {
                    debug!("Dropping outbound {:?}: writer task gone", message.packet_type());
                }
            }
            Err(e) => error!("Failed to encode {:?}: {}", message.packet_type(), e),
        }
    }
}

/// Builds the client-side handler table, constructed once per connection.
/// Handlers mutate [`ClientCore`] and queue events; they never talk to
/// the socket.
fn build_dispatch_table() -> DispatchTable<ClientCore> {
    let mut table = DispatchTable::new();

    table.register(PacketType::AssignClientId, |core: &mut ClientCore, (), message| {
        if let Message::AssignClientId { id } = message {
            info!("Assigned client ID {}", id);
            core.session.assign_id(*id);
        }
        Ok(())
    });

    table.register(PacketType::PlayerJoined, |core: &mut ClientCore, (), message| {
        if let Message::PlayerJoined { id } = message {
            if core.session.self_id() == Some(*id) {
                return Ok(());
            }
            core.replication.spawn(*id);
            core.events.push(GameEvent::PlayerJoined(*id));
        }
        Ok(())
    });

    table.register(PacketType::PlayerLeft, |core: &mut ClientCore, (), message| {
        if let Message::PlayerLeft { id } = message {
            if core.session.self_id() == Some(*id) {
                return Ok(());
            }
            // Removing an unknown ID is a no-op, not an error.
            if core.replication.remove(*id) {
                core.events.push(GameEvent::PlayerLeft(*id));
            }
        }
        Ok(())
    });

    table.register(PacketType::WorldSeed, |core: &mut ClientCore, (), message| {
        if let Message::WorldSeed { seed } = message {
            // First seed wins; a retry reply arriving late is ignored.
            if core.session.set_seed(*seed) {
                core.events.push(GameEvent::WorldReady(*seed));
            }
        }
        Ok(())
    });

    table.register(PacketType::PositionSnapshot, |core: &mut ClientCore, (), message| {
        if let Message::PositionSnapshot(snapshot) = message {
            // Our own snapshots come back off the broadcast fan-out.
            if core.session.self_id() == Some(snapshot.id) {
                return Ok(());
            }
            core.replication.apply_snapshot(snapshot);
        }
        Ok(())
    });

    table.register(PacketType::HitEvent, |core: &mut ClientCore, (), message| {
        if let Message::HitEvent {
            attacker_id,
            victim_id,
            hit_pos,
            hit_height,
        } = message
        {
            // The shooter already played its own effect locally.
            if core.session.self_id() == Some(*attacker_id) {
                return Ok(());
            }

            let shooter = core.replication.spawn(*attacker_id);
            core.events.push(GameEvent::Hit(HitEffect {
                attacker_id: *attacker_id,
                origin_pos: shooter.displayed_pos,
                origin_height: shooter.displayed_height,
                hit_pos: *hit_pos,
                hit_height: *hit_height,
            }));

            if core.session.self_id() == Some(*victim_id) {
                core.events.push(GameEvent::DamageTaken(*attacker_id));
            }
        }
        Ok(())
    });

    table.register(PacketType::HostLeft, |core: &mut ClientCore, (), _message| {
        core.events.push(GameEvent::HostLeft);
        Ok(())
    });

    table
}

/// Receive loop: reassemble the server's stream and forward frames.
/// Exits on closure, transport error, or corruption, reporting `Closed`
/// in every case.
async fn run_reader(mut read_half: OwnedReadHalf, net_tx: UnboundedSender<NetEvent>) {
    let mut reassembler = StreamReassembler::new();
    let mut buf = [0u8; MAX_FRAME_SIZE];

    'recv: loop {
        match read_half.read(&mut buf).await {
            Ok(0) => {
                debug!("Server closed the connection");
                break;
            }
            Ok(n) => {
                reassembler.extend(&buf[..n]);
                loop {
                    match reassembler.next_frame() {
                        Ok(Some(frame)) => {
                            if net_tx.send(NetEvent::Frame(frame)).is_err() {
                                break 'recv; // client dropped
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            error!("Corrupt stream from server: {}", e);
                            break 'recv;
                        }
                    }
                }
            }
            Err(e) => {
                warn!("Receive error: {}", e);
                break;
            }
        }
    }

    let _ = net_tx.send(NetEvent::Closed);
}

async fn run_writer(mut write_half: OwnedWriteHalf, mut out_rx: UnboundedReceiver<Vec<u8>>) {
    while let Some(bytes) = out_rx.recv().await {
        if let Err(e) = write_half.write_all(&bytes).await {
            warn!("Send to server failed: {}", e);
            break;
        }
    }
}
