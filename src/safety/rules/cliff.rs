use crate::model::{MotorAction, SafetyViolation, Severity, WorldSnapshot};

use super::{RuleHeader, SafetyRule};

/// No forward motion while airborne.
#[derive(Debug)]
pub struct CliffAvoidanceRule {
    header: RuleHeader,
}

impl Default for CliffAvoidanceRule {
    fn default() -> Self {
        Self::new()
    }
}

impl CliffAvoidanceRule {
    pub fn new() -> Self {
        Self {
            header: RuleHeader::new(),
        }
    }
}

impl SafetyRule for CliffAvoidanceRule {
    rule_identity!("CliffAvoidance", Severity::Critical);

    fn check(&self, action: &MotorAction, snapshot: &WorldSnapshot) -> Option<SafetyViolation> {
        if action.move_forward() > 0.0 && !snapshot.player.on_ground {
            Some(SafetyViolation::new(
                self.id(),
                self.name(),
                self.severity(),
                "moving forward while airborne",
                "stop and sneak",
            ))
        } else {
            None
        }
    }

    fn correct(&self, action: &MotorAction, _snapshot: &WorldSnapshot) -> MotorAction {
        action
            .with_move_forward(0.0)
            .with_sneak(true)
            .with_jump(false)
            .with_sprint(false)
    }
}
