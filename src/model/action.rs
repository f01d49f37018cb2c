use serde::Serialize;
use std::time::Duration;

use super::safety::SafetyViolation;

/// Low-level motor command for one tick.
///
/// `move_forward` and `strafe` are clamped to [-1, 1] on every write.
/// `yaw_rate` and `pitch_rate` (rad/tick) are left alone until an action
/// space is applied.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MotorAction {
    move_forward: f64,
    strafe: f64,
    yaw_rate: f64,
    pitch_rate: f64,
    pub jump: bool,
    pub sneak: bool,
    pub sprint: bool,
    pub attack: bool,
    pub use_item: bool,
}

fn unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(-1.0, 1.0)
    }
}

impl MotorAction {
    pub fn new(move_forward: f64, strafe: f64, yaw_rate: f64, pitch_rate: f64) -> Self {
        Self {
            move_forward: unit(move_forward),
            strafe: unit(strafe),
            yaw_rate,
            pitch_rate,
            ..Self::default()
        }
    }

    pub fn idle() -> Self {
        Self::default()
    }

    pub fn move_forward(&self) -> f64 {
        self.move_forward
    }

    pub fn strafe(&self) -> f64 {
        self.strafe
    }

    pub fn yaw_rate(&self) -> f64 {
        self.yaw_rate
    }

    pub fn pitch_rate(&self) -> f64 {
        self.pitch_rate
    }

    pub fn with_move_forward(mut self, v: f64) -> Self {
        self.move_forward = unit(v);
        self
    }

    pub fn with_strafe(mut self, v: f64) -> Self {
        self.strafe = unit(v);
        self
    }

    pub fn with_yaw_rate(mut self, v: f64) -> Self {
        self.yaw_rate = v;
        self
    }

    pub fn with_pitch_rate(mut self, v: f64) -> Self {
        self.pitch_rate = v;
        self
    }

    pub fn with_jump(mut self, on: bool) -> Self {
        self.jump = on;
        self
    }

    pub fn with_sneak(mut self, on: bool) -> Self {
        self.sneak = on;
        self
    }

    pub fn with_sprint(mut self, on: bool) -> Self {
        self.sprint = on;
        self
    }

    pub fn with_attack(mut self, on: bool) -> Self {
        self.attack = on;
        self
    }

    pub fn with_use_item(mut self, on: bool) -> Self {
        self.use_item = on;
        self
    }

    pub fn is_moving(&self) -> bool {
        self.move_forward.abs() > 0.01 || self.strafe.abs() > 0.01
    }

    pub fn is_looking(&self) -> bool {
        self.yaw_rate.abs() > 0.001 || self.pitch_rate.abs() > 0.001
    }

    pub fn is_idle(&self) -> bool {
        *self == Self::idle()
    }
}

/// Output of the safety shield.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SafeMotorAction {
    pub original: MotorAction,
    pub safe: MotorAction,
    pub modified: bool,
    pub reason: Option<String>,
    pub violations: Vec<SafetyViolation>,
}

impl SafeMotorAction {
    pub fn unchanged(action: MotorAction) -> Self {
        Self {
            original: action,
            safe: action,
            modified: false,
            reason: None,
            violations: Vec::new(),
        }
    }

    pub fn corrected(
        original: MotorAction,
        safe: MotorAction,
        reason: impl Into<String>,
        violations: Vec<SafetyViolation>,
    ) -> Self {
        Self {
            original,
            safe,
            modified: true,
            reason: Some(reason.into()),
            violations,
        }
    }
}

/// Quality measurements of the motor controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ControlMetrics {
    pub aim_error: f64,
    pub path_deviation: f64,
    pub jerk: f64,
    pub collision_count: u32,
    pub stuck_time: Duration,
    pub time_to_converge: Duration,
    pub smoothness: f64,
    pub stability: f64,
    /// Latest control-quality reward. Monitoring only; not part of
    /// [`Self::overall_quality`].
    pub reward: f64,
}

impl Default for ControlMetrics {
    fn default() -> Self {
        Self {
            aim_error: 0.0,
            path_deviation: 0.0,
            jerk: 0.0,
            collision_count: 0,
            stuck_time: Duration::ZERO,
            time_to_converge: Duration::ZERO,
            smoothness: 1.0,
            stability: 1.0,
            reward: 0.0,
        }
    }
}

impl ControlMetrics {
    /// Mean of six sub-scores, each in [0, 1].
    pub fn overall_quality(&self) -> f64 {
        let scores = [
            1.0 - self.aim_error.min(1.0),
            1.0 - self.path_deviation.min(1.0),
            1.0 - (self.jerk / 10.0).min(1.0),
            (1.0 - self.collision_count as f64 * 0.1).max(0.0),
            self.smoothness,
            self.stability,
        ];
        (scores.iter().sum::<f64>() / scores.len() as f64).clamp(0.0, 1.0)
    }
}
