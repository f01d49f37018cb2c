use parking_lot::RwLock;
use std::sync::Arc;
use std::time::SystemTime;

use super::state::{BlockInfo, EntityInfo, EnvironmentState, PlayerState, StateSource, Vec3, WorldSnapshot};

/// In-memory [`StateSource`] for demos and tests. Every mutation publishes a
/// fresh snapshot; snapshots already handed out are never touched.
#[derive(Debug)]
pub struct MockStateSource {
    current: RwLock<Arc<WorldSnapshot>>,
}

impl Default for MockStateSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStateSource {
    pub fn new() -> Self {
        Self::with_snapshot(Self::default_snapshot())
    }

    pub fn with_snapshot(snapshot: WorldSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// Player at (0, 64, 0), full health and hunger, daytime plains.
    pub fn default_snapshot() -> WorldSnapshot {
        let environment = EnvironmentState {
            world_time: 1000,
            ..EnvironmentState::default()
        };
        WorldSnapshot::new(PlayerState::at(0.0, 64.0, 0.0)).with_environment(environment)
    }

    fn update<F>(&self, mutate: F)
    where
        F: FnOnce(&mut WorldSnapshot),
    {
        let mut slot = self.current.write();
        let mut next = (**slot).clone();
        mutate(&mut next);
        next.captured_at = SystemTime::now();
        *slot = Arc::new(next);
    }

    pub fn set_state(&self, snapshot: WorldSnapshot) {
        *self.current.write() = Arc::new(snapshot);
    }

    pub fn update_player_position(&self, x: f64, y: f64, z: f64) {
        self.update(|s| s.player.position = Vec3::new(x, y, z));
    }

    pub fn update_player_rotation(&self, yaw: f64, pitch: f64) {
        self.update(|s| {
            s.player.yaw = yaw;
            s.player.pitch = pitch;
        });
    }

    pub fn update_player_velocity(&self, velocity: Vec3) {
        self.update(|s| s.player.velocity = velocity);
    }

    pub fn update_player_health(&self, health: f64) {
        self.update(|s| s.player.health = health);
    }

    pub fn update_player_hunger(&self, hunger: f64) {
        self.update(|s| s.player.hunger = hunger);
    }

    pub fn set_on_ground(&self, on_ground: bool) {
        self.update(|s| s.player.on_ground = on_ground);
    }

    pub fn add_nearby_entity(&self, entity: EntityInfo) {
        self.update(|s| s.entities.push(entity));
    }

    pub fn add_nearby_block(&self, block: BlockInfo) {
        self.update(|s| s.blocks.push(block));
    }

    pub fn clear_surroundings(&self) {
        self.update(|s| {
            s.entities.clear();
            s.blocks.clear();
        });
    }

    pub fn snapshot(&self) -> Arc<WorldSnapshot> {
        self.current.read().clone()
    }
}

impl StateSource for MockStateSource {
    fn current_state(&self) -> Option<Arc<WorldSnapshot>> {
        Some(self.snapshot())
    }
}
