//! Safety shield: the last filter between the cerebellum and the actuators.
//!
//! # SAFETY INVARIANT
//! Every rule predicate is evaluated against the *original* action. The
//! corrections of the violated rules are then chained, highest severity
//! first (ties in registration order), each one fed the previous output.
//! Violations are counted and corrected; they are never raised as errors.

pub mod rules;

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::kernel::error::Result;
use crate::kernel::lifecycle::{LayerKind, Lifecycle, LifecycleState};
use crate::model::{MotorAction, SafeMotorAction, SafetyViolation, WorldSnapshot};

pub use self::rules::{default_rules, SafetyRule};

pub trait SafetyShield: Lifecycle + Send + Sync {
    fn filter(&self, action: &MotorAction, snapshot: &WorldSnapshot) -> SafeMotorAction;

    fn is_safe(&self, action: &MotorAction, snapshot: &WorldSnapshot) -> bool {
        self.check_violations(action, snapshot).is_empty()
    }

    fn check_violations(&self, action: &MotorAction, snapshot: &WorldSnapshot) -> Vec<SafetyViolation>;

    fn add_rule(&self, rule: Arc<dyn SafetyRule>);

    /// Returns whether a rule with that id was registered.
    fn remove_rule(&self, id: Uuid) -> bool;

    fn rules(&self) -> Vec<Arc<dyn SafetyRule>>;

    fn violation_count(&self) -> u64;

    fn reset_violation_count(&self);
}

const NAME: &str = "RuleShield";

/// Table-driven shield over a registration-ordered list of rules.
#[derive(Debug)]
pub struct RuleShield {
    lifecycle: LifecycleState,
    rules: RwLock<Vec<Arc<dyn SafetyRule>>>,
    violations: AtomicU64,
}

impl Default for RuleShield {
    fn default() -> Self {
        Self::with_rules(default_rules())
    }
}

impl RuleShield {
    pub fn new() -> Self {
        Self::default()
    }

    /// A shield with no rules; every action passes.
    pub fn empty() -> Self {
        Self::with_rules(Vec::new())
    }

    pub fn with_rules(rules: Vec<Arc<dyn SafetyRule>>) -> Self {
        Self {
            lifecycle: LifecycleState::new(),
            rules: RwLock::new(rules),
            violations: AtomicU64::new(0),
        }
    }

    pub fn rule(&self, id: Uuid) -> Option<Arc<dyn SafetyRule>> {
        self.rules.read().iter().find(|r| r.id() == id).cloned()
    }

    pub fn rule_named(&self, name: &str) -> Option<Arc<dyn SafetyRule>> {
        self.rules.read().iter().find(|r| r.name() == name).cloned()
    }

    fn enabled_rules(&self) -> Vec<Arc<dyn SafetyRule>> {
        self.rules
            .read()
            .iter()
            .filter(|r| r.is_enabled())
            .cloned()
            .collect()
    }
}

impl Lifecycle for RuleShield {
    fn name(&self) -> &str {
        NAME
    }

    fn layer(&self) -> LayerKind {
        LayerKind::Safety
    }

    fn initialize(&mut self) -> Result<()> {
        let rule_count = self.rules.read().len();
        self.lifecycle.initialize(NAME, || {
            info!("{} armed with {} rules", NAME, rule_count);
            Ok(())
        })
    }

    fn shutdown(&mut self) -> Result<()> {
        self.lifecycle.shutdown(NAME, || Ok(()))
    }

    fn is_initialized(&self) -> bool {
        self.lifecycle.is_initialized()
    }

    fn is_healthy(&self) -> bool {
        self.lifecycle.is_healthy()
    }
}

impl SafetyShield for RuleShield {
    fn filter(&self, action: &MotorAction, snapshot: &WorldSnapshot) -> SafeMotorAction {
        let rules = self.enabled_rules();

        // 1. Detect against the original action
        let mut violated: Vec<(&Arc<dyn SafetyRule>, SafetyViolation)> = rules
            .iter()
            .filter_map(|rule| rule.check(action, snapshot).map(|v| (rule, v)))
            .collect();

        let outcome = if violated.is_empty() {
            SafeMotorAction::unchanged(*action)
        } else {
            self.violations.fetch_add(1, Ordering::Relaxed);

            // 2. Correct, most severe first (stable sort keeps registration order)
            violated.sort_by(|a, b| b.1.severity.cmp(&a.1.severity));
            let safe = violated
                .iter()
                .fold(*action, |current, (rule, _)| rule.correct(&current, snapshot));

            let reason = violated[0].1.description.clone();
            let violations: Vec<SafetyViolation> = violated.into_iter().map(|(_, v)| v).collect();
            for v in &violations {
                warn!("Safety violation [{}:{:?}]: {}", v.rule_name, v.severity, v.description);
            }
            SafeMotorAction::corrected(*action, safe, reason, violations)
        };

        // 3. Let stateful rules see what actually went out
        for rule in &rules {
            rule.observe(&outcome.safe);
        }

        outcome
    }

    fn check_violations(&self, action: &MotorAction, snapshot: &WorldSnapshot) -> Vec<SafetyViolation> {
        self.enabled_rules()
            .iter()
            .filter_map(|rule| rule.check(action, snapshot))
            .collect()
    }

    fn add_rule(&self, rule: Arc<dyn SafetyRule>) {
        info!("Safety rule added: {}", rule.name());
        self.rules.write().push(rule);
    }

    fn remove_rule(&self, id: Uuid) -> bool {
        let mut rules = self.rules.write();
        let before = rules.len();
        rules.retain(|r| r.id() != id);
        rules.len() != before
    }

    fn rules(&self) -> Vec<Arc<dyn SafetyRule>> {
        self.rules.read().clone()
    }

    fn violation_count(&self) -> u64 {
        self.violations.load(Ordering::Relaxed)
    }

    fn reset_violation_count(&self) {
        self.violations.store(0, Ordering::Relaxed);
    }
}
