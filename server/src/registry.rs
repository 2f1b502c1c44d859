//! Client connection registry for the session server.
//!
//! The registry is the single source of truth for which connections are
//! live and which session ID each one was assigned. It is owned by the
//! server's main loop and only ever mutated there; reader tasks report
//! events over a channel instead of touching it. Each entry carries the
//! sending half of that connection's outbound byte channel, so delivery
//! to one slow or dead peer can never block delivery to the others.

use log::{info, warn};
use shared::ClientId;
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::sync::mpsc::UnboundedSender;

/// One accepted connection: its assigned ID, peer address, and the
/// channel feeding its writer task.
#[derive(Debug)]
pub struct RegisteredClient {
    pub id: ClientId,
    pub addr: SocketAddr,
    sender: UnboundedSender<Vec<u8>>,
}

/// Maps live connections to their session-unique client IDs.
///
/// IDs are assigned monotonically starting at 1 and are never reused
/// while the session lives, so a departed player's ID can never be
/// confused with a newcomer's. The registry's size always equals the
/// number of live connections.
pub struct ClientRegistry {
    clients: HashMap<ClientId, RegisteredClient>,
    /// Live IDs in join order, for roster replay to late joiners.
    join_order: Vec<ClientId>,
    next_client_id: ClientId,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
            join_order: Vec::new(),
            next_client_id: 1,
        }
    }

    /// Registers a newly accepted connection and assigns it the next
    /// unused client ID.
    pub fn register(&mut self, addr: SocketAddr, sender: UnboundedSender<Vec<u8>>) -> ClientId {
        let id = self.next_client_id;
        self.next_client_id += 1;

        self.clients.insert(id, RegisteredClient { id, addr, sender });
        self.join_order.push(id);
        info!("Client {} connected from {}", id, addr);
        id
    }

    /// Removes a departed connection. Returns false if it was already
    /// gone, which happens when an explicit leave raced a socket closure.
    pub fn remove(&mut self, id: ClientId) -> bool {
        if let Some(client) = self.clients.remove(&id) {
            self.join_order.retain(|&other| other != id);
            info!("Client {} disconnected ({})", client.id, client.addr);
            true
        } else {
            false
        }
    }

    /// Queues bytes for one client. Returns false if the client is gone
    /// or its writer task has shut down.
    pub fn send_to(&self, id: ClientId, bytes: Vec<u8>) -> bool {
        match self.clients.get(&id) {
            Some(client) => {
                if client.sender.send(bytes).is_err() {
                    warn!("Dropping packet for client {}: writer task gone", id);
                    false
                } else {
                    true
                }
            }
            None => false,
        }
    }

    /// Queues bytes for every live client. A failed send to one peer
    /// never prevents delivery to the others.
    pub fn broadcast(&self, bytes: &[u8]) {
        for client in self.clients.values() {
            if client.sender.send(bytes.to_vec()).is_err() {
                warn!("Broadcast skipped client {}: writer task gone", client.id);
            }
        }
    }

    /// Like [`broadcast`], but skips one client (typically the sender of
    /// the message being fanned out).
    ///
    /// [`broadcast`]: ClientRegistry::broadcast
    pub fn broadcast_except(&self, exclude: ClientId, bytes: &[u8]) {
        for client in self.clients.values() {
            if client.id == exclude {
                continue;
            }
            if client.sender.send(bytes.to_vec()).is_err() {
                warn!("Broadcast skipped client {}: writer task gone", client.id);
            }
        }
    }

    /// Live client IDs in join order.
    pub fn roster(&self) -> &[ClientId] {
        &self.join_order
    }

    pub fn contains(&self, id: ClientId) -> bool {
        self.clients.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}
