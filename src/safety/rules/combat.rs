use crate::model::{MotorAction, SafetyViolation, Severity, WorldSnapshot};

use super::{RuleHeader, SafetyRule};

pub const MIN_COMBAT_HEALTH: f64 = 0.5;
pub const CROWD_RADIUS: f64 = 20.0;
pub const MAX_HOSTILES: usize = 3;

/// Refuses fights the player is unlikely to win.
#[derive(Debug)]
pub struct CombatSafetyRule {
    header: RuleHeader,
}

impl Default for CombatSafetyRule {
    fn default() -> Self {
        Self::new()
    }
}

fn hostiles_nearby(snapshot: &WorldSnapshot) -> usize {
    snapshot
        .entities_in_range(CROWD_RADIUS)
        .filter(|e| e.is_hostile())
        .count()
}

impl CombatSafetyRule {
    pub fn new() -> Self {
        Self {
            header: RuleHeader::new(),
        }
    }
}

impl SafetyRule for CombatSafetyRule {
    rule_identity!("CombatSafety", Severity::Error);

    fn check(&self, action: &MotorAction, snapshot: &WorldSnapshot) -> Option<SafetyViolation> {
        if !action.attack {
            return None;
        }
        let health = snapshot.player.health_ratio();
        let (description, suggestion) = if health < MIN_COMBAT_HEALTH {
            (
                format!("attacking at {:.0}% health", health * 100.0),
                "retreat",
            )
        } else {
            let hostiles = hostiles_nearby(snapshot);
            if hostiles <= MAX_HOSTILES {
                return None;
            }
            (
                format!("attacking with {} hostiles within {:.0} blocks", hostiles, CROWD_RADIUS),
                "disengage",
            )
        };

        Some(SafetyViolation::new(
            self.id(),
            self.name(),
            self.severity(),
            description,
            suggestion,
        ))
    }

    fn correct(&self, action: &MotorAction, snapshot: &WorldSnapshot) -> MotorAction {
        if snapshot.player.health_ratio() < MIN_COMBAT_HEALTH {
            // Back off, keep facing the threat.
            MotorAction::new(-0.5, 0.0, action.yaw_rate(), 0.0)
                .with_sneak(action.sneak)
                .with_sprint(false)
                .with_attack(false)
        } else {
            action.with_attack(false)
        }
    }
}
