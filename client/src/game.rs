//! Seams between the session layer and the rest of the game.
//!
//! Rendering, dungeon generation, abilities, and sound live outside this
//! crate. They feed the session layer a [`LocalPlayer`] view each tick
//! and receive replication events through [`GameCallbacks`]; nothing in
//! here knows how an effect is drawn or what damage does.

use shared::{ClientId, Color, Vec2};

/// The local player's replicated state, as sampled by the game each tick.
/// Published to the session at the snapshot rate.
#[derive(Debug, Clone, Copy)]
pub struct LocalPlayer {
    pub pos: Vec2,
    pub height: f64,
    pub facing: Vec2,
    pub color: Color,
}

/// Everything a receiver needs to reproduce a hit visually: where the
/// tracer starts (the shooter's displayed position) and where it lands.
#[derive(Debug, Clone, Copy)]
pub struct HitEffect {
    pub attacker_id: ClientId,
    pub origin_pos: Vec2,
    pub origin_height: f64,
    pub hit_pos: Vec2,
    pub hit_height: f64,
}

/// Why the multiplayer session ended. The process drops back to a
/// non-networked state in every case; there is no reconnect logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The server announced its own shutdown.
    HostLeft,
    /// The connection to the server was lost or its stream corrupted.
    ConnectionLost,
}

/// Gameplay-side consumer of replication events. All methods default to
/// no-ops so a consumer only implements what it cares about.
pub trait GameCallbacks {
    /// The world seed arrived; deterministic generation may start.
    /// Fires exactly once per session.
    fn world_ready(&mut self, _seed: i64) {}

    fn player_joined(&mut self, _id: ClientId) {}

    fn player_left(&mut self, _id: ClientId) {}

    /// Another player's shot should be reproduced visually.
    fn hit_effect(&mut self, _effect: &HitEffect) {}

    /// The local player was the named victim of a hit. The shooter's
    /// process already decided the hit landed; apply the damage locally.
    fn damage_taken(&mut self, _attacker_id: ClientId) {}

    fn session_ended(&mut self, _reason: SessionEnd) {}
}

/// Callback sink that ignores every event. Useful in tests.
pub struct NullCallbacks;

impl GameCallbacks for NullCallbacks {}
