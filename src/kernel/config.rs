use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::{CschError, Result};

const COMPONENT: &str = "ControlConfig";

/// Tunables for the control loop and its layers. Values only; loading from
/// disk is the embedding application's business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlConfig {
    #[serde(default = "default_control_frequency_hz")]
    pub control_frequency_hz: u32,

    #[serde(default = "default_intent_update_interval_ms")]
    pub intent_update_interval_ms: u64,

    #[serde(default = "default_skill_update_interval_ms")]
    pub skill_update_interval_ms: u64,

    /// Carried for embedders; the motor step runs on every tick.
    #[serde(default = "default_motor_update_interval_ms")]
    pub motor_update_interval_ms: u64,

    /// Carried for embedders; not read by the built-in layers.
    #[serde(default = "default_action_smoothness_threshold")]
    pub action_smoothness_threshold: f64,

    /// Path deviation (blocks) that the cerebellum treats as a collision.
    #[serde(default = "default_collision_threshold")]
    pub collision_threshold: f64,

    /// Alignment tolerance, as a fraction of 180 degrees, for calls
    /// without a `tolerance` param.
    #[serde(default = "default_aim_error_threshold")]
    pub aim_error_threshold: f64,

    #[serde(default = "default_true")]
    pub safety_shield_enabled: bool,

    /// Carried for embedders; every enabled rule applies regardless.
    #[serde(default = "default_safety_shield_threshold")]
    pub safety_shield_threshold: f64,

    /// Carried for embedders; no action history is kept.
    #[serde(default = "default_max_action_history_size")]
    pub max_action_history_size: usize,

    /// Window of the subconscious execution history.
    #[serde(default = "default_max_skill_history_size")]
    pub max_skill_history_size: usize,

    /// Carried for embedders; no intent history is kept.
    #[serde(default = "default_max_intent_history_size")]
    pub max_intent_history_size: usize,

    /// Capacity of the outbound motor-action channel.
    #[serde(default = "default_action_queue_capacity")]
    pub action_queue_capacity: usize,

    /// Stuck detection: minimum movement that counts as progress.
    #[serde(default = "default_position_variance_threshold")]
    pub position_variance_threshold: f64,

    #[serde(default = "default_stuck_time_threshold_ms")]
    pub stuck_time_threshold_ms: u64,
}

fn default_control_frequency_hz() -> u32 {
    60
}

fn default_intent_update_interval_ms() -> u64 {
    1000
}

fn default_skill_update_interval_ms() -> u64 {
    100
}

fn default_motor_update_interval_ms() -> u64 {
    16
}

fn default_action_smoothness_threshold() -> f64 {
    0.1
}

fn default_collision_threshold() -> f64 {
    0.5
}

fn default_aim_error_threshold() -> f64 {
    0.05
}

fn default_true() -> bool {
    true
}

fn default_safety_shield_threshold() -> f64 {
    0.8
}

fn default_max_action_history_size() -> usize {
    1000
}

fn default_max_skill_history_size() -> usize {
    100
}

fn default_max_intent_history_size() -> usize {
    50
}

fn default_action_queue_capacity() -> usize {
    1024
}

fn default_position_variance_threshold() -> f64 {
    0.1
}

fn default_stuck_time_threshold_ms() -> u64 {
    5000
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            control_frequency_hz: default_control_frequency_hz(),
            intent_update_interval_ms: default_intent_update_interval_ms(),
            skill_update_interval_ms: default_skill_update_interval_ms(),
            motor_update_interval_ms: default_motor_update_interval_ms(),
            action_smoothness_threshold: default_action_smoothness_threshold(),
            collision_threshold: default_collision_threshold(),
            aim_error_threshold: default_aim_error_threshold(),
            safety_shield_enabled: default_true(),
            safety_shield_threshold: default_safety_shield_threshold(),
            max_action_history_size: default_max_action_history_size(),
            max_skill_history_size: default_max_skill_history_size(),
            max_intent_history_size: default_max_intent_history_size(),
            action_queue_capacity: default_action_queue_capacity(),
            position_variance_threshold: default_position_variance_threshold(),
            stuck_time_threshold_ms: default_stuck_time_threshold_ms(),
        }
    }
}

impl ControlConfig {
    /// Parse a JSON document; missing fields fall back to their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CschError::configuration(COMPONENT, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_control_frequency(mut self, hz: u32) -> Self {
        self.control_frequency_hz = hz;
        self
    }

    pub fn with_safety_shield(mut self, enabled: bool) -> Self {
        self.safety_shield_enabled = enabled;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.control_frequency_hz == 0 || self.control_frequency_hz > 1000 {
            return Err(CschError::configuration(
                COMPONENT,
                format!("control frequency must be in 1..=1000 Hz, got {}", self.control_frequency_hz),
            ));
        }
        if self.max_skill_history_size == 0 || self.action_queue_capacity == 0 {
            return Err(CschError::configuration(
                COMPONENT,
                "history and queue sizes must be non-zero",
            ));
        }
        let ratios = [
            ("actionSmoothnessThreshold", self.action_smoothness_threshold),
            ("collisionThreshold", self.collision_threshold),
            ("aimErrorThreshold", self.aim_error_threshold),
            ("safetyShieldThreshold", self.safety_shield_threshold),
        ];
        for (name, value) in ratios {
            if !(0.0..=1.0).contains(&value) {
                return Err(CschError::configuration(
                    COMPONENT,
                    format!("{name} must be within [0, 1], got {value}"),
                ));
            }
        }
        if self.position_variance_threshold < 0.0 {
            return Err(CschError::configuration(
                COMPONENT,
                "positionVarianceThreshold must not be negative",
            ));
        }
        Ok(())
    }

    /// Period of the fixed-rate loop: `1000 / hz` milliseconds.
    pub fn tick_period(&self) -> Duration {
        let hz = self.control_frequency_hz.max(1) as u64;
        Duration::from_millis((1000 / hz).max(1))
    }

    pub fn stuck_time_threshold(&self) -> Duration {
        Duration::from_millis(self.stuck_time_threshold_ms)
    }
}
