use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::SystemTime;

use super::params::Params;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance_to(&self, other: Vec3) -> f64 {
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn horizontal_distance_to(&self, x: f64, z: f64) -> f64 {
        let (dx, dz) = (self.x - x, self.z - z);
        (dx * dx + dz * dz).sqrt()
    }

    /// Manhattan distance, used as the cheap "did we move" measure.
    pub fn manhattan_to(&self, other: Vec3) -> f64 {
        (self.x - other.x).abs() + (self.y - other.y).abs() + (self.z - other.z).abs()
    }
}

/// Physical state of the controlled avatar. Angles are in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub position: Vec3,
    pub velocity: Vec3,
    pub yaw: f64,
    pub pitch: f64,
    pub health: f64,
    pub max_health: f64,
    pub hunger: f64,
    pub max_hunger: f64,
    pub on_ground: bool,
    pub in_water: bool,
    pub sprinting: bool,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            position: Vec3::default(),
            velocity: Vec3::default(),
            yaw: 0.0,
            pitch: 0.0,
            health: 20.0,
            max_health: 20.0,
            hunger: 20.0,
            max_hunger: 20.0,
            on_ground: true,
            in_water: false,
            sprinting: false,
        }
    }
}

impl PlayerState {
    pub fn at(x: f64, y: f64, z: f64) -> Self {
        Self {
            position: Vec3::new(x, y, z),
            ..Self::default()
        }
    }

    pub fn with_health(mut self, health: f64) -> Self {
        self.health = health;
        self
    }

    pub fn with_hunger(mut self, hunger: f64) -> Self {
        self.hunger = hunger;
        self
    }

    pub fn with_rotation(mut self, yaw: f64, pitch: f64) -> Self {
        self.yaw = yaw;
        self.pitch = pitch;
        self
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_on_ground(mut self, on_ground: bool) -> Self {
        self.on_ground = on_ground;
        self
    }

    pub fn health_ratio(&self) -> f64 {
        if self.max_health > 0.0 {
            self.health / self.max_health
        } else {
            0.0
        }
    }

    pub fn hunger_ratio(&self) -> f64 {
        if self.max_hunger > 0.0 {
            self.hunger / self.max_hunger
        } else {
            0.0
        }
    }

    /// Horizontal speed.
    pub fn speed(&self) -> f64 {
        (self.velocity.x * self.velocity.x + self.velocity.z * self.velocity.z).sqrt()
    }

    pub fn distance_to(&self, point: Vec3) -> f64 {
        self.position.distance_to(point)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentState {
    pub world_time: u64,
    pub dimension: String,
    pub biome: String,
    pub light_level: f64,
    pub raining: bool,
    pub thundering: bool,
    pub properties: Params,
}

impl Default for EnvironmentState {
    fn default() -> Self {
        Self {
            world_time: 0,
            dimension: "overworld".to_string(),
            biome: "plains".to_string(),
            light_level: 15.0,
            raining: false,
            thundering: false,
            properties: Params::new(),
        }
    }
}

impl EnvironmentState {
    pub fn is_daytime(&self) -> bool {
        self.world_time % 24_000 < 13_000
    }
}

const HOSTILE_MARKERS: [&str; 5] = ["zombie", "skeleton", "creeper", "spider", "enderman"];
const DANGEROUS_MARKERS: [&str; 5] = ["lava", "magma", "fire", "cactus", "sweet_berry"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityInfo {
    pub id: String,
    pub kind: String,
    pub position: Vec3,
    pub yaw: f64,
    pub pitch: f64,
    pub health: Option<f64>,
}

impl EntityInfo {
    pub fn new(id: impl Into<String>, kind: impl Into<String>, position: Vec3) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            position,
            yaw: 0.0,
            pitch: 0.0,
            health: None,
        }
    }

    pub fn is_hostile(&self) -> bool {
        HOSTILE_MARKERS.iter().any(|m| self.kind.contains(m))
    }

    pub fn distance_to(&self, point: Vec3) -> f64 {
        self.position.distance_to(point)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub kind: String,
    pub solid: bool,
    pub passable: bool,
    pub hardness: f64,
}

impl BlockInfo {
    pub fn new(x: i32, y: i32, z: i32, kind: impl Into<String>) -> Self {
        Self {
            x,
            y,
            z,
            kind: kind.into(),
            solid: true,
            passable: false,
            hardness: 1.0,
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x as f64, self.y as f64, self.z as f64)
    }

    pub fn distance_to(&self, point: Vec3) -> f64 {
        self.position().distance_to(point)
    }

    pub fn is_dangerous(&self) -> bool {
        DANGEROUS_MARKERS.iter().any(|m| self.kind.contains(m))
    }

    pub fn is_breakable(&self) -> bool {
        self.hardness >= 0.0 && self.kind != "air" && self.kind != "bedrock"
    }
}

/// One immutable observation of the world, valid for a single tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub player: PlayerState,
    pub environment: EnvironmentState,
    pub entities: Vec<EntityInfo>,
    pub blocks: Vec<BlockInfo>,
    pub captured_at: SystemTime,
}

impl WorldSnapshot {
    pub fn new(player: PlayerState) -> Self {
        Self {
            player,
            environment: EnvironmentState::default(),
            entities: Vec::new(),
            blocks: Vec::new(),
            captured_at: SystemTime::now(),
        }
    }

    pub fn with_environment(mut self, environment: EnvironmentState) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_entity(mut self, entity: EntityInfo) -> Self {
        self.entities.push(entity);
        self
    }

    pub fn with_block(mut self, block: BlockInfo) -> Self {
        self.blocks.push(block);
        self
    }

    pub fn entities_in_range(&self, range: f64) -> impl Iterator<Item = &EntityInfo> {
        let origin = self.player.position;
        self.entities.iter().filter(move |e| e.distance_to(origin) <= range)
    }

    pub fn entities_of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a EntityInfo> {
        self.entities.iter().filter(move |e| e.kind == kind)
    }
}

/// Pull-based accessor for the latest world observation. Must be cheap
/// enough to call once per tick.
pub trait StateSource: Send + Sync {
    fn current_state(&self) -> Option<Arc<WorldSnapshot>>;

    fn player_state(&self) -> Option<PlayerState> {
        self.current_state().map(|s| s.player.clone())
    }

    fn environment_state(&self) -> Option<EnvironmentState> {
        self.current_state().map(|s| s.environment.clone())
    }
}
