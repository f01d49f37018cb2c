use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, FRAC_PI_8};

use crate::model::MotorAction;

/// Bounds and allowed flags for motor output. Attack and use-item are never
/// restricted here; that is the safety shield's job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionSpace {
    pub move_forward: (f64, f64),
    pub strafe: (f64, f64),
    pub yaw_rate: (f64, f64),
    pub pitch_rate: (f64, f64),
    pub jump_allowed: bool,
    pub sneak_allowed: bool,
    pub sprint_allowed: bool,
}

impl Default for ActionSpace {
    fn default() -> Self {
        Self {
            move_forward: (0.0, 1.0),
            strafe: (-1.0, 1.0),
            yaw_rate: (-FRAC_PI_2, FRAC_PI_2),
            pitch_rate: (-FRAC_PI_4, FRAC_PI_4),
            jump_allowed: true,
            sneak_allowed: true,
            sprint_allowed: true,
        }
    }
}

fn clamp(value: f64, (min, max): (f64, f64)) -> f64 {
    value.max(min).min(max)
}

impl ActionSpace {
    pub fn restricted() -> Self {
        Self {
            move_forward: (0.0, 0.8),
            strafe: (-0.5, 0.5),
            yaw_rate: (-FRAC_PI_4, FRAC_PI_4),
            pitch_rate: (-FRAC_PI_8, FRAC_PI_8),
            jump_allowed: false,
            sneak_allowed: true,
            sprint_allowed: false,
        }
    }

    pub fn yaw_rate_max(&self) -> f64 {
        self.yaw_rate.1
    }

    pub fn clamp(&self, action: &MotorAction) -> MotorAction {
        MotorAction::new(
            clamp(action.move_forward(), self.move_forward),
            clamp(action.strafe(), self.strafe),
            clamp(action.yaw_rate(), self.yaw_rate),
            clamp(action.pitch_rate(), self.pitch_rate),
        )
        .with_jump(self.jump_allowed && action.jump)
        .with_sneak(self.sneak_allowed && action.sneak)
        .with_sprint(self.sprint_allowed && action.sprint)
        .with_attack(action.attack)
        .with_use_item(action.use_item)
    }

    pub fn contains(&self, action: &MotorAction) -> bool {
        let within = |v: f64, (min, max): (f64, f64)| v >= min && v <= max;
        within(action.move_forward(), self.move_forward)
            && within(action.strafe(), self.strafe)
            && within(action.yaw_rate(), self.yaw_rate)
            && within(action.pitch_rate(), self.pitch_rate)
            && (self.jump_allowed || !action.jump)
            && (self.sneak_allowed || !action.sneak)
            && (self.sprint_allowed || !action.sprint)
    }

    pub fn continuous_dimension(&self) -> usize {
        4
    }

    pub fn discrete_dimension(&self) -> usize {
        [self.jump_allowed, self.sneak_allowed, self.sprint_allowed]
            .iter()
            .filter(|allowed| **allowed)
            .count()
    }
}
