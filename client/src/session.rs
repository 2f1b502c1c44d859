//! Client-side session bootstrap state.
//!
//! A fresh connection walks `Unregistered -> IdAssigned -> Seeded` and
//! stays in `Seeded` for the rest of the session; there is no
//! renegotiation. Until the seed arrives the shared world cannot be
//! constructed, so world-dependent logic stays suppressed and the client
//! periodically re-requests the seed instead of waiting forever.

use shared::{ClientId, SEED_RETRY_INTERVAL};

/// How this process participates in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Connected to a server elsewhere.
    Client,
    /// Running the server in-process and connected to it over loopback.
    HostClient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapPhase {
    Unregistered,
    IdAssigned,
    Seeded,
}

/// Process-wide session state: our assigned ID, the agreed world seed,
/// and the bookkeeping for the seed-request retry.
#[derive(Debug)]
pub struct SessionState {
    role: Role,
    self_id: Option<ClientId>,
    world_seed: Option<i64>,
    seed_retry_timer: f64,
}

impl SessionState {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            self_id: None,
            world_seed: None,
            // Fires on the first tick so the initial request needs no
            // special case.
            seed_retry_timer: 0.0,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn phase(&self) -> BootstrapPhase {
        if self.world_seed.is_some() {
            BootstrapPhase::Seeded
        } else if self.self_id.is_some() {
            BootstrapPhase::IdAssigned
        } else {
            BootstrapPhase::Unregistered
        }
    }

    pub fn self_id(&self) -> Option<ClientId> {
        self.self_id
    }

    pub fn world_seed(&self) -> Option<i64> {
        self.world_seed
    }

    pub fn is_seeded(&self) -> bool {
        self.world_seed.is_some()
    }

    pub fn assign_id(&mut self, id: ClientId) {
        self.self_id = Some(id);
    }

    /// Records the session seed. The first seed wins; a duplicate
    /// delivery (e.g. a retry crossing the original reply) is ignored.
    /// Returns true if this call seeded the session.
    pub fn set_seed(&mut self, seed: i64) -> bool {
        if self.world_seed.is_some() {
            return false;
        }
        self.world_seed = Some(seed);
        true
    }

    /// Advances the retry timer. Returns true when a `RequestWorldSeed`
    /// should be sent now. Always false once seeded.
    pub fn tick_seed_retry(&mut self, delta: f64) -> bool {
        if self.is_seeded() {
            return false;
        }

        self.seed_retry_timer -= delta;
        if self.seed_retry_timer <= 0.0 {
            self.seed_retry_timer = SEED_RETRY_INTERVAL;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_transitions() {
        let mut session = SessionState::new(Role::Client);
        assert_eq!(session.phase(), BootstrapPhase::Unregistered);

        session.assign_id(3);
        assert_eq!(session.phase(), BootstrapPhase::IdAssigned);
        assert_eq!(session.self_id(), Some(3));

        assert!(session.set_seed(42));
        assert_eq!(session.phase(), BootstrapPhase::Seeded);
        assert_eq!(session.world_seed(), Some(42));
    }

    #[test]
    fn test_first_seed_wins() {
        let mut session = SessionState::new(Role::Client);
        assert!(session.set_seed(42));
        assert!(!session.set_seed(99));
        assert_eq!(session.world_seed(), Some(42));
    }

    #[test]
    fn test_seed_retry_fires_immediately_then_periodically() {
        let mut session = SessionState::new(Role::Client);

        assert!(session.tick_seed_retry(0.016));
        assert!(!session.tick_seed_retry(0.016));

        // Not yet: just under the retry interval elapsed.
        assert!(!session.tick_seed_retry(SEED_RETRY_INTERVAL - 0.1));
        assert!(session.tick_seed_retry(0.1));
    }

    #[test]
    fn test_seed_retry_stops_once_seeded() {
        let mut session = SessionState::new(Role::Client);
        assert!(session.tick_seed_retry(0.016));

        session.set_seed(7);
        assert!(!session.tick_seed_retry(SEED_RETRY_INTERVAL * 4.0));
    }
}
