use std::f64::consts::FRAC_PI_4;

use crate::model::{BlockInfo, MotorAction, SafetyViolation, Severity, WorldSnapshot};

use super::{RuleHeader, SafetyRule};

pub const DEFAULT_HAZARD_RADIUS: f64 = 3.0;

/// Keeps the player from moving while next to lava, fire and the like.
#[derive(Debug)]
pub struct HazardAvoidanceRule {
    header: RuleHeader,
    radius: f64,
}

impl Default for HazardAvoidanceRule {
    fn default() -> Self {
        Self::new()
    }
}

impl HazardAvoidanceRule {
    pub fn new() -> Self {
        Self::with_radius(DEFAULT_HAZARD_RADIUS)
    }

    pub fn with_radius(radius: f64) -> Self {
        Self {
            header: RuleHeader::new(),
            radius,
        }
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    fn hazards_near<'a>(&self, snapshot: &'a WorldSnapshot) -> impl Iterator<Item = &'a BlockInfo> {
        let origin = snapshot.player.position;
        let radius = self.radius;
        snapshot
            .blocks
            .iter()
            .filter(move |b| b.is_dangerous() && b.distance_to(origin) <= radius)
    }
}

impl SafetyRule for HazardAvoidanceRule {
    rule_identity!("HazardAvoidance", Severity::Emergency);

    fn check(&self, action: &MotorAction, snapshot: &WorldSnapshot) -> Option<SafetyViolation> {
        if !action.is_moving() {
            return None;
        }
        let hazard = self.hazards_near(snapshot).next()?;
        Some(SafetyViolation::new(
            self.id(),
            self.name(),
            self.severity(),
            format!(
                "moving within {:.1} blocks of {} at ({}, {}, {})",
                self.radius, hazard.kind, hazard.x, hazard.y, hazard.z
            ),
            "move away from the hazard",
        ))
    }

    fn correct(&self, action: &MotorAction, snapshot: &WorldSnapshot) -> MotorAction {
        let origin = snapshot.player.position;
        let (mut ex, mut ez) = (0.0, 0.0);
        for block in self.hazards_near(snapshot) {
            let p = block.position();
            let (dx, dz) = (origin.x - p.x, origin.z - p.z);
            let len = dx.hypot(dz);
            if len > f64::EPSILON {
                ex += dx / len;
                ez += dz / len;
            }
        }

        let len = ex.hypot(ez);
        if len > f64::EPSILON {
            ex /= len;
            ez /= len;
        }

        action
            .with_move_forward(1.0)
            .with_strafe(ez)
            .with_yaw_rate(ex * FRAC_PI_4)
            .with_sprint(true)
    }
}
