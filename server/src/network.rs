//! Server network layer: TCP accept loop, per-connection tasks, and the
//! single-writer main loop.
//!
//! Every accepted connection gets two tasks: a reader that reassembles
//! frames from the byte stream and forwards them over a channel, and a
//! writer that drains the connection's outbound queue. All mutable state
//! (registry, seed) lives in [`ServerState`], owned by the main loop and
//! mutated nowhere else, so joins, leaves, and packet handling can never
//! race.
//!
//! A worker blocked in `read` has no cancellation signal; it terminates
//! when its peer closes or the process exits. Acceptable for a
//! session-scoped game server, but a known limitation.

use crate::registry::ClientRegistry;
use crate::session::{build_dispatch_table, ServerState};
use log::{debug, error, info, warn};
use shared::dispatch::DispatchTable;
use shared::{encode_frame, ClientId, Frame, Message, StreamReassembler, MAX_FRAME_SIZE};
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Events reported to the main loop by per-connection reader tasks.
#[derive(Debug)]
enum ServerEvent {
    Frame { client_id: ClientId, frame: Frame },
    Disconnected { client_id: ClientId },
}

/// Handle for requesting a clean server shutdown from another task.
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: UnboundedSender<()>,
}

impl ShutdownHandle {
    /// Asks the server to broadcast `HostLeft` and stop. Idempotent.
    pub fn shutdown(&self) {
        let _ = self.tx.send(());
    }
}

/// The session server: listener plus all session state.
pub struct Server {
    listener: TcpListener,
    state: ServerState,
    table: DispatchTable<ServerState, ClientId>,
    event_tx: UnboundedSender<ServerEvent>,
    event_rx: UnboundedReceiver<ServerEvent>,
    shutdown_tx: UnboundedSender<()>,
    shutdown_rx: UnboundedReceiver<()>,
}

impl Server {
    /// Binds the listener. The server does not accept connections until
    /// [`run`] is called.
    ///
    /// [`run`]: Server::run
    pub async fn bind(addr: &str) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener,
            state: ServerState::new(),
            table: build_dispatch_table(),
            event_tx,
            event_rx,
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// The actual bound address; useful when binding to port 0 in tests.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
        }
    }

    /// Main loop: accepts connections and processes reader events until
    /// shutdown is requested. All registry mutation happens here.
    pub async fn run(mut self) -> Result<(), Box<dyn std::error::Error>> {
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => self.handle_accept(stream, addr),
                        Err(e) => warn!("Failed to accept connection: {}", e),
                    }
                },

                event = self.event_rx.recv() => {
                    match event {
                        Some(ServerEvent::Frame { client_id, frame }) => {
                            self.handle_frame(client_id, frame);
                        }
                        Some(ServerEvent::Disconnected { client_id }) => {
                            if let Err(e) = self.state.handle_disconnect(client_id) {
                                error!("Failed to announce departure of {}: {}", client_id, e);
                            }
                        }
                        // All senders live in self, so this is unreachable,
                        // but a clean stop beats a panic.
                        None => break,
                    }
                },

                _ = self.shutdown_rx.recv() => {
                    info!("Shutting down, notifying {} client(s)", self.state.registry.len());
                    match Message::HostLeft.to_frame(true) {
                        Ok(bytes) => self.state.registry.broadcast(&bytes),
                        Err(e) => error!("Failed to encode host-left notice: {}", e),
                    }
                    break;
                },
            }
        }

        Ok(())
    }

    fn handle_accept(&mut self, stream: TcpStream, addr: SocketAddr) {
        if let Err(e) = stream.set_nodelay(true) {
            debug!("set_nodelay failed for {}: {}", addr, e);
        }

        let (read_half, write_half) = stream.into_split();
        let (out_tx, out_rx) = mpsc::unbounded_channel();

        let client_id = match self.state.handle_connect(addr, out_tx) {
            Ok(id) => id,
            Err(e) => {
                error!("Bootstrap failed for {}: {}", addr, e);
                return;
            }
        };

        tokio::spawn(run_writer(write_half, out_rx, client_id));
        tokio::spawn(run_reader(read_half, self.event_tx.clone(), client_id));
    }

    fn handle_frame(&mut self, client_id: ClientId, frame: Frame) {
        let message = match Message::decode(&frame) {
            Ok(message) => message,
            Err(e) => {
                warn!("Undecodable packet from client {}: {}", client_id, e);
                return;
            }
        };

        match self.table.dispatch(&mut self.state, client_id, &message) {
            Ok(true) => {}
            Ok(false) => debug!(
                "No server handler for {:?} from client {}",
                message.packet_type(),
                client_id
            ),
            Err(e) => {
                error!(
                    "Handler for {:?} from client {} failed: {}",
                    message.packet_type(),
                    client_id,
                    e
                );
                return;
            }
        }

        // Fan broadcast-flagged frames out to every client, the sender
        // included; clients filter their own ID. This is what makes a
        // snapshot or hit event reach the whole session.
        if frame.is_broadcast {
            match encode_frame(frame.kind, true, &frame.payload) {
                Ok(bytes) => self.state.registry.broadcast(&bytes),
                Err(e) => error!("Failed to re-encode broadcast frame: {}", e),
            }
        }
    }

    /// Immutable view of the registry, for tests and diagnostics.
    pub fn registry(&self) -> &ClientRegistry {
        &self.state.registry
    }
}

/// Receive loop for one connection: reassemble, then hand complete frames
/// to the main loop. Exits on peer closure, transport error, or a corrupt
/// stream — the last because the framing has no resynchronization marker,
/// so continuing would mean reading garbage forever.
async fn run_reader(
    mut read_half: OwnedReadHalf,
    event_tx: UnboundedSender<ServerEvent>,
    client_id: ClientId,
) {
    let mut reassembler = StreamReassembler::new();
    let mut buf = [0u8; MAX_FRAME_SIZE];

    'recv: loop {
        match read_half.read(&mut buf).await {
            Ok(0) => {
                debug!("Client {} closed its connection", client_id);
                break;
            }
            Ok(n) => {
                reassembler.extend(&buf[..n]);
                loop {
                    match reassembler.next_frame() {
                        Ok(Some(frame)) => {
                            if event_tx
                                .send(ServerEvent::Frame { client_id, frame })
                                .is_err()
                            {
                                break 'recv; // server is gone
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            error!("Corrupt stream from client {}: {}", client_id, e);
                            break 'recv;
                        }
                    }
                }
            }
            Err(e) => {
                warn!("Receive error from client {}: {}", client_id, e);
                break;
            }
        }
    }

    let _ = event_tx.send(ServerEvent::Disconnected { client_id });
}

/// Write loop for one connection: drains the outbound queue. A write
/// failure ends the task; the reader side notices the closure and reports
/// the disconnect.
async fn run_writer(
    mut write_half: OwnedWriteHalf,
    mut out_rx: UnboundedReceiver<Vec<u8>>,
    client_id: ClientId,
) {
    while let Some(bytes) = out_rx.recv().await {
        if let Err(e) = write_half.write_all(&bytes).await {
            warn!("Send to client {} failed: {}", client_id, e);
            break;
        }
    }
}
