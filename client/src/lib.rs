//! # Session Client Library
//!
//! Client-side half of the multiplayer session layer: connecting to a
//! session server, completing the join bootstrap, and replicating the
//! other players in the session.
//!
//! ## Architecture Overview
//!
//! The client owns no game logic. Each tick the game hands it a
//! [`game::LocalPlayer`] view and a [`game::GameCallbacks`] sink; the
//! client pumps the connection, applies whatever arrived to its session
//! and replication state, and reports the resulting events back through
//! the callbacks. Rendering, world generation, and damage rules stay on
//! the game's side of that seam.
//!
//! ### Bootstrap
//! A fresh connection walks `Unregistered -> IdAssigned -> Seeded`
//! ([`session::BootstrapPhase`]). The ID arrives unprompted; the world
//! seed is requested and re-requested on a timer until it lands, after
//! which every process in the session can generate the same world.
//!
//! ### Replication
//! Remote players are tracked in a [`replication::ReplicationManager`].
//! Snapshots arrive at a fixed rate well below the render rate, so the
//! renderer reads smoothed display positions that glide toward the last
//! report instead of the raw reported coordinates.
//!
//! ## Module Organization
//!
//! - [`session`]: bootstrap phases, assigned ID, world seed, seed retry
//! - [`replication`]: remote entities and display smoothing
//! - [`network`]: the connection, packet dispatch, and the per-tick pump
//! - [`game`]: the callback seam toward the rest of the game

pub mod game;
pub mod network;
pub mod replication;
pub mod session;

pub use game::{GameCallbacks, HitEffect, LocalPlayer, NullCallbacks, SessionEnd};
pub use network::{Client, SessionStatus};
pub use replication::{RemoteEntity, ReplicationManager};
pub use session::{BootstrapPhase, Role, SessionState};
