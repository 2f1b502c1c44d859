//! # Session Server Library
//!
//! Dedicated server for a dungeonlink multiplayer session. The server is
//! deliberately thin: it assigns client IDs, hands out the session's
//! world-generation seed, and relays broadcast traffic (position
//! snapshots, hit events, leave notices) between clients. It runs no
//! game simulation — each client's own process is authoritative for what
//! it reports, which is the session's documented trust model.
//!
//! ## Architecture
//!
//! One main-loop task owns every piece of mutable state. Each accepted
//! connection contributes a reader task (stream reassembly, frame
//! decoding) and a writer task (outbound queue draining); both talk to
//! the main loop exclusively through channels. Per-connection packet
//! order is preserved end to end, and there is no ordering guarantee
//! across connections.
//!
//! ## Module Organization
//!
//! - [`registry`] — live connections and their session-unique IDs.
//! - [`session`] — bootstrap sequencing and the packet handler table.
//! - [`network`] — listener, connection tasks, main loop, shutdown.

pub mod network;
pub mod registry;
pub mod session;

pub use network::{Server, ShutdownHandle};
