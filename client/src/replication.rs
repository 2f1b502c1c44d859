//! Remote-entity replication and display smoothing.
//!
//! Position snapshots arrive at a bounded rate (20 Hz) while the local
//! simulation ticks much faster, so rendering the reported positions
//! directly would stutter. Each remote entity therefore keeps two pairs
//! of coordinates: the authoritative `last_*` values written only by
//! snapshots, and the `displayed_*` values the renderer reads, which are
//! exponentially smoothed toward the report every tick and never snapped.

use log::debug;
use shared::{ClientId, Color, PositionSnapshot, Vec2, REPLICATION_BLEND};
use std::collections::HashMap;

/// One replicated remote player.
#[derive(Debug, Clone)]
pub struct RemoteEntity {
    pub id: ClientId,
    /// Authoritative state from the most recent snapshot.
    pub last_pos: Vec2,
    pub last_height: f64,
    /// Smoothed state for rendering; converges toward `last_*`.
    pub displayed_pos: Vec2,
    pub displayed_height: f64,
    pub facing: Vec2,
    /// Cosmetic, effectively set once at spawn.
    pub color: Color,
}

impl RemoteEntity {
    fn new(id: ClientId) -> Self {
        Self {
            id,
            last_pos: Vec2::default(),
            last_height: 0.0,
            displayed_pos: Vec2::default(),
            displayed_height: 0.0,
            facing: Vec2::default(),
            color: Color::WHITE,
        }
    }

    /// Applies an authoritative snapshot. Only the reported fields move;
    /// the displayed position glides there over the following ticks.
    fn apply_snapshot(&mut self, snapshot: &PositionSnapshot) {
        self.last_pos = snapshot.pos;
        self.last_height = snapshot.height;
        self.facing = snapshot.facing;
        self.color = snapshot.color;
    }

    fn tick(&mut self, delta: f64) {
        let t = blend_factor(delta);
        self.displayed_pos = self.displayed_pos.lerp(self.last_pos, t);
        self.displayed_height = shared::math::lerp(self.displayed_height, self.last_height, t);
    }
}

/// Per-tick smoothing weight. The constant is tuned against a 144 Hz
/// tick; capping at 1 keeps long ticks from overshooting the target.
fn blend_factor(delta: f64) -> f64 {
    (REPLICATION_BLEND * delta * 144.0).min(1.0)
}

/// The set of remote players this client knows about.
pub struct ReplicationManager {
    entities: HashMap<ClientId, RemoteEntity>,
}

impl ReplicationManager {
    pub fn new() -> Self {
        Self {
            entities: HashMap::new(),
        }
    }

    /// Ensures an entity exists for `id`, creating it if this is the
    /// first we hear of that player. Join-order races make unseen IDs
    /// normal, not an error.
    pub fn spawn(&mut self, id: ClientId) -> &mut RemoteEntity {
        self.entities.entry(id).or_insert_with(|| {
            debug!("Spawning remote entity {}", id);
            RemoteEntity::new(id)
        })
    }

    /// Applies a position snapshot, lazily spawning the entity.
    pub fn apply_snapshot(&mut self, snapshot: &PositionSnapshot) {
        self.spawn(snapshot.id).apply_snapshot(snapshot);
    }

    /// Advances display smoothing for every remote entity.
    pub fn tick(&mut self, delta: f64) {
        for entity in self.entities.values_mut() {
            entity.tick(delta);
        }
    }

    /// Removes a departed player. Removing an ID with no entity is a
    /// no-op; returns whether an entity existed.
    pub fn remove(&mut self, id: ClientId) -> bool {
        self.entities.remove(&id).is_some()
    }

    pub fn get(&self, id: ClientId) -> Option<&RemoteEntity> {
        self.entities.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RemoteEntity> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl Default for ReplicationManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn snapshot(id: ClientId, x: f64, y: f64, height: f64) -> PositionSnapshot {
        PositionSnapshot {
            pos: Vec2::new(x, y),
            height,
            facing: Vec2::new(1.0, 0.0),
            id,
            color: Color {
                r: 10,
                g: 20,
                b: 30,
                a: 255,
            },
        }
    }

    #[test]
    fn test_snapshot_spawns_unseen_entity() {
        let mut manager = ReplicationManager::new();
        manager.apply_snapshot(&snapshot(5, 100.0, 200.0, 50.0));

        let entity = manager.get(5).unwrap();
        assert_approx_eq!(entity.last_pos.x, 100.0);
        assert_approx_eq!(entity.last_height, 50.0);
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_snapshot_never_touches_displayed_fields() {
        let mut manager = ReplicationManager::new();
        manager.apply_snapshot(&snapshot(5, 100.0, 200.0, 50.0));
        manager.apply_snapshot(&snapshot(5, 300.0, 400.0, 80.0));

        let entity = manager.get(5).unwrap();
        assert_approx_eq!(entity.displayed_pos.x, 0.0);
        assert_approx_eq!(entity.displayed_pos.y, 0.0);
        assert_approx_eq!(entity.displayed_height, 0.0);
        assert_approx_eq!(entity.last_pos.x, 300.0);
    }

    #[test]
    fn test_interpolation_converges_monotonically() {
        let mut manager = ReplicationManager::new();
        manager.apply_snapshot(&snapshot(1, 500.0, -250.0, 120.0));

        let target = Vec2::new(500.0, -250.0);
        let mut previous = manager.get(1).unwrap().displayed_pos.distance_to(target);

        for _ in 0..200 {
            manager.tick(1.0 / 144.0);
            let entity = manager.get(1).unwrap();
            let distance = entity.displayed_pos.distance_to(target);

            assert!(distance <= previous, "distance increased: {} > {}", distance, previous);
            // Never overshoots: the displayed point stays between start
            // and target on each axis.
            assert!(entity.displayed_pos.x <= 500.0);
            assert!(entity.displayed_pos.y >= -250.0);
            assert!(entity.displayed_height <= 120.0);
            previous = distance;
        }

        assert!(previous < 1.0, "did not converge, still {} away", previous);
    }

    #[test]
    fn test_long_tick_clamps_at_target() {
        let mut manager = ReplicationManager::new();
        manager.apply_snapshot(&snapshot(1, 64.0, 0.0, 10.0));

        // A delta this large would overshoot without the cap.
        manager.tick(1.0);

        let entity = manager.get(1).unwrap();
        assert_approx_eq!(entity.displayed_pos.x, 64.0);
        assert_approx_eq!(entity.displayed_height, 10.0);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut manager = ReplicationManager::new();
        manager.spawn(9);

        assert!(manager.remove(9));
        assert!(!manager.remove(9));
        assert!(!manager.remove(1234));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_spawn_is_idempotent() {
        let mut manager = ReplicationManager::new();
        manager.apply_snapshot(&snapshot(2, 40.0, 40.0, 0.0));
        manager.spawn(2);

        assert_eq!(manager.len(), 1);
        assert_approx_eq!(manager.get(2).unwrap().last_pos.x, 40.0);
    }
}
