//! Session bootstrap: ID assignment and world-seed distribution.
//!
//! Per accepted connection the server walks the client through
//! `UNREGISTERED -> ID_ASSIGNED -> SEEDED` with three direct sends and one
//! broadcast, in this order:
//!
//! 1. `AssignClientId` with the next unused ID, directly to the newcomer.
//! 2. `PlayerJoined` replayed directly for every client that joined
//!    earlier, so the newcomer can instantiate their remote entities.
//! 3. `PlayerJoined` for the newcomer, broadcast to everyone else.
//! 4. `WorldSeed`, directly to the newcomer.
//!
//! The seed is one 64-bit value per session: generated lazily on first
//! need and immutable afterwards. Clients that miss it can re-request it
//! with `RequestWorldSeed` at any time.

use crate::registry::ClientRegistry;
use log::{debug, info, warn};
use shared::dispatch::DispatchTable;
use shared::{ClientId, Message, PacketType};
use std::net::SocketAddr;
use tokio::sync::mpsc::UnboundedSender;

/// All mutable server state. Owned by the main loop; packet handlers and
/// connection events borrow it exclusively, so no locking is needed.
pub struct ServerState {
    pub registry: ClientRegistry,
    world_seed: Option<i64>,
}

impl ServerState {
    pub fn new() -> Self {
        Self {
            registry: ClientRegistry::new(),
            world_seed: None,
        }
    }

    /// The session's world seed, generating it on first use. Immutable
    /// once generated; every client of the session receives this value.
    pub fn world_seed(&mut self) -> i64 {
        *self.world_seed.get_or_insert_with(|| {
            let seed: i64 = rand::random();
            info!("Generated world seed {}", seed);
            seed
        })
    }

    /// Runs the bootstrap sequence for a newly accepted connection.
    pub fn handle_connect(
        &mut self,
        addr: SocketAddr,
        sender: UnboundedSender<Vec<u8>>,
    ) -> Result<ClientId, shared::ProtocolError> {
        let earlier: Vec<ClientId> = self.registry.roster().to_vec();
        let id = self.registry.register(addr, sender);

        self.registry
            .send_to(id, Message::AssignClientId { id }.to_frame(false)?);

        for other in earlier {
            self.registry
                .send_to(id, Message::PlayerJoined { id: other }.to_frame(false)?);
        }

        self.registry
            .broadcast_except(id, &Message::PlayerJoined { id }.to_frame(true)?);

        let seed = self.world_seed();
        self.registry
            .send_to(id, Message::WorldSeed { seed }.to_frame(false)?);
        debug!("Sent seed to client {}", id);

        Ok(id)
    }

    /// Cleans up after a departed connection, whether it sent a graceful
    /// leave or simply vanished. When the departure was only detected
    /// from a socket closure, the remaining clients still need to hear
    /// about it, so a `PlayerLeft` is broadcast on the peer's behalf.
    pub fn handle_disconnect(&mut self, id: ClientId) -> Result<(), shared::ProtocolError> {
        if self.registry.remove(id) {
            self.registry
                .broadcast(&Message::PlayerLeft { id }.to_frame(true)?);
        }
        Ok(())
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the server-side packet handler table. Constructed once at
/// startup; packets received from any client are routed through it with
/// the sender's ID as metadata.
///
/// Only the types the server reacts to are registered. Snapshot and hit
/// packets carry the broadcast flag and are fanned out by the network
/// loop without a handler.
pub fn build_dispatch_table() -> DispatchTable<ServerState, ClientId> {
    let mut table = DispatchTable::new();

    table.register(
        PacketType::RequestWorldSeed,
        |state: &mut ServerState, from: ClientId, _message| {
            let seed = state.world_seed();
            let reply = Message::WorldSeed { seed }.to_frame(false)?;
            if !state.registry.send_to(from, reply) {
                warn!("Seed requested by unknown client {}", from);
            }
            Ok(())
        },
    );

    table.register(
        PacketType::PlayerLeft,
        |state: &mut ServerState, from: ClientId, message| {
            if let Message::PlayerLeft { id } = message {
                // Clients announce their own departure; drop the registry
                // entry now so the post-dispatch fan-out skips the leaver
                // and the socket closure later is a no-op.
                if *id != from {
                    warn!("Client {} sent a leave for {}", from, id);
                }
                state.registry.remove(*id);
            }
            Ok(())
        },
    );

    table
}
