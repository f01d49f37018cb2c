//! Immutable value types shared by every layer.

pub mod action;
pub mod intent;
pub mod mock;
pub mod params;
pub mod safety;
pub mod skill;
pub mod state;

pub use action::{ControlMetrics, MotorAction, SafeMotorAction};
pub use intent::{EdgeType, Intent, IntentEdge, IntentGraph, IntentNode, IntentType, NodeStatus, Priority};
pub use mock::MockStateSource;
pub use params::{ParamValue, Params};
pub use safety::{SafetyViolation, Severity};
pub use skill::{names, SkillCall, SkillPriority, SkillResult, SkillResultStatus};
pub use state::{BlockInfo, EntityInfo, EnvironmentState, PlayerState, StateSource, Vec3, WorldSnapshot};
