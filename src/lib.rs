pub mod agent;
pub mod cerebellum;
pub mod conscious;
pub mod kernel;
pub mod model;
pub mod safety;
pub mod subconscious;

// Re-export the caller surface
pub use agent::Agent;
pub use kernel::config::ControlConfig;
pub use kernel::error::{CschError, Result};
pub use kernel::orchestrator::{ControlSystem, Layers};
