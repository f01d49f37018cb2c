//! Baseline safety rules.
//!
//! A rule is a predicate plus a correction. `check` must not mutate rule
//! state; only `observe` may, and the shield calls it exactly once per
//! filtered action with the action that was actually emitted.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::model::{MotorAction, SafetyViolation, Severity, WorldSnapshot};

pub trait SafetyRule: Send + Sync + fmt::Debug {
    fn id(&self) -> Uuid;
    fn name(&self) -> &str;
    fn severity(&self) -> Severity;
    fn is_enabled(&self) -> bool;
    fn set_enabled(&self, enabled: bool);

    fn check(&self, action: &MotorAction, snapshot: &WorldSnapshot) -> Option<SafetyViolation>;

    fn correct(&self, action: &MotorAction, snapshot: &WorldSnapshot) -> MotorAction;

    fn observe(&self, _emitted: &MotorAction) {}
}

/// Identity and enable flag every rule carries.
#[derive(Debug)]
pub(crate) struct RuleHeader {
    id: Uuid,
    enabled: AtomicBool,
}

impl RuleHeader {
    pub(crate) fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            enabled: AtomicBool::new(true),
        }
    }

    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }
}

/// Forwards the identity half of [`SafetyRule`] to a `header` field.
macro_rules! rule_identity {
    ($name:expr, $severity:expr) => {
        fn id(&self) -> uuid::Uuid {
            self.header.id()
        }

        fn name(&self) -> &str {
            $name
        }

        fn severity(&self) -> crate::model::Severity {
            $severity
        }

        fn is_enabled(&self) -> bool {
            self.header.is_enabled()
        }

        fn set_enabled(&self, enabled: bool) {
            self.header.set_enabled(enabled)
        }
    };
}

mod cliff;
mod combat;
mod hazard;
mod health;
mod rate_limit;

pub use cliff::CliffAvoidanceRule;
pub use combat::CombatSafetyRule;
pub use hazard::HazardAvoidanceRule;
pub use health::HealthProtectionRule;
pub use rate_limit::{ActionRateLimitRule, RateLimits};

/// The five baseline rules in registration order.
pub fn default_rules() -> Vec<Arc<dyn SafetyRule>> {
    vec![
        Arc::new(CliffAvoidanceRule::new()),
        Arc::new(HazardAvoidanceRule::new()),
        Arc::new(HealthProtectionRule::new()),
        Arc::new(ActionRateLimitRule::new()),
        Arc::new(CombatSafetyRule::new()),
    ]
}
