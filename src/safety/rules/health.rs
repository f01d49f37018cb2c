use crate::model::{MotorAction, SafetyViolation, Severity, WorldSnapshot};

use super::{RuleHeader, SafetyRule};

pub const CRITICAL_HEALTH: f64 = 0.2;
pub const LOW_HEALTH: f64 = 0.4;

/// Low health: no sprinting; critical health: no sprinting or attacking.
#[derive(Debug)]
pub struct HealthProtectionRule {
    header: RuleHeader,
}

impl Default for HealthProtectionRule {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthProtectionRule {
    pub fn new() -> Self {
        Self {
            header: RuleHeader::new(),
        }
    }
}

impl SafetyRule for HealthProtectionRule {
    rule_identity!("HealthProtection", Severity::Critical);

    fn check(&self, action: &MotorAction, snapshot: &WorldSnapshot) -> Option<SafetyViolation> {
        let health = snapshot.player.health_ratio();
        let description = if health < CRITICAL_HEALTH && (action.sprint || action.attack) {
            format!("sprinting or attacking at critical health ({:.0}%)", health * 100.0)
        } else if health < LOW_HEALTH && action.sprint {
            format!("sprinting at low health ({:.0}%)", health * 100.0)
        } else {
            return None;
        };

        Some(SafetyViolation::new(
            self.id(),
            self.name(),
            self.severity(),
            description,
            "slow down and recover",
        ))
    }

    fn correct(&self, action: &MotorAction, _snapshot: &WorldSnapshot) -> MotorAction {
        action
            .with_move_forward(action.move_forward() * 0.5)
            .with_sneak(true)
            .with_jump(false)
            .with_sprint(false)
            .with_attack(false)
    }
}
