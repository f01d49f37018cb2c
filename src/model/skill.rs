use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

use super::params::{ParamValue, Params};

/// Well-known skill names.
pub mod names {
    pub const NAVIGATE_TO: &str = "NavigateTo";
    pub const ALIGN_CROSSHAIR: &str = "AlignCrosshair";
    pub const MINE: &str = "Mine";
    pub const COMBAT_KITE: &str = "CombatKite";
    pub const ESCAPE: &str = "Escape";
    pub const HEAL: &str = "Heal";
    pub const CRAFT: &str = "Craft";
    pub const BUILD: &str = "Build";
    pub const PLACE_TORCH: &str = "PlaceTorch";
    pub const DIG_TUNNEL: &str = "DigTunnel";
    pub const GENERIC_ACTION: &str = "GenericAction";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum SkillPriority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
    Interrupt,
}

impl SkillPriority {
    pub fn is_interrupt(&self) -> bool {
        *self == SkillPriority::Interrupt
    }
}

/// One attempt at running a skill. A retry is a new call with a new id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillCall {
    pub id: Uuid,
    pub skill_name: String,
    pub priority: SkillPriority,
    pub params: Params,
    pub intent_id: Option<Uuid>,
    pub created_at: SystemTime,
}

impl SkillCall {
    pub fn new(skill_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            skill_name: skill_name.into(),
            priority: SkillPriority::Normal,
            params: Params::new(),
            intent_id: None,
            created_at: SystemTime::now(),
        }
    }

    pub fn with_priority(mut self, priority: SkillPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key, value);
        self
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn for_intent(mut self, intent_id: Uuid) -> Self {
        self.intent_id = Some(intent_id);
        self
    }

    /// Same skill, same parameters, fresh attempt id.
    pub fn retry(&self) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: SystemTime::now(),
            ..self.clone()
        }
    }

    pub fn is(&self, skill_name: &str) -> bool {
        self.skill_name == skill_name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkillResultStatus {
    Success,
    Failed,
    Interrupted,
    Timeout,
    Blocked,
    Skipped,
}

impl SkillResultStatus {
    /// Every result status is final for its attempt.
    pub fn is_terminal(&self) -> bool {
        true
    }

    pub fn is_success(&self) -> bool {
        *self == SkillResultStatus::Success
    }

    pub fn is_failure(&self) -> bool {
        !matches!(self, SkillResultStatus::Success | SkillResultStatus::Skipped)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillResult {
    pub skill_call_id: Uuid,
    pub skill_name: String,
    pub status: SkillResultStatus,
    pub message: String,
    pub execution_time: Duration,
    pub completed_at: SystemTime,
    pub outputs: Params,
    pub metrics: BTreeMap<String, f64>,
}

impl SkillResult {
    pub fn new(call: &SkillCall, status: SkillResultStatus, message: impl Into<String>) -> Self {
        Self {
            skill_call_id: call.id,
            skill_name: call.skill_name.clone(),
            status,
            message: message.into(),
            execution_time: Duration::ZERO,
            completed_at: SystemTime::now(),
            outputs: Params::new(),
            metrics: BTreeMap::new(),
        }
    }

    pub fn success(call: &SkillCall) -> Self {
        Self::new(call, SkillResultStatus::Success, "ok")
    }

    pub fn failure(call: &SkillCall, message: impl Into<String>) -> Self {
        Self::new(call, SkillResultStatus::Failed, message)
    }

    pub fn with_execution_time(mut self, elapsed: Duration) -> Self {
        self.execution_time = elapsed;
        self
    }

    pub fn with_output(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.outputs.insert(key, value);
        self
    }

    pub fn with_metric(mut self, key: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(key.into(), value);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}
