//! Subconscious layer: intent -> skill call, selection, history, recovery.

pub mod history;
pub mod recovery;
pub mod registry;
pub mod selector;
pub mod translator;

use std::sync::Arc;
use tracing::{debug, warn};

use crate::kernel::config::ControlConfig;
use crate::kernel::error::Result;
use crate::kernel::lifecycle::{LayerKind, Lifecycle, LifecycleState};
use crate::model::{Intent, SkillCall, SkillResult, WorldSnapshot};

use self::history::SkillExecutionHistory;
use self::recovery::FailureRecoveryHandler;
use self::registry::SkillRegistry;

pub trait SubconsciousLayer: Lifecycle + Send {
    fn translate(&self, intent: &Intent, snapshot: Option<&WorldSnapshot>) -> Vec<SkillCall>;

    fn select_next(&self, snapshot: Option<&WorldSnapshot>, pending: &[SkillCall]) -> Option<SkillCall>;

    /// Recovery call for a failed attempt, if any. Counts one intervention.
    fn handle_failure(
        &mut self,
        call: &SkillCall,
        result: &SkillResult,
        snapshot: Option<&WorldSnapshot>,
    ) -> Option<SkillCall>;

    fn record(&mut self, call: &SkillCall, result: &SkillResult, snapshot: Option<Arc<WorldSnapshot>>);

    /// Records the execution with both snapshots; success also clears the
    /// skill's failure streak.
    fn learn(
        &mut self,
        call: &SkillCall,
        result: &SkillResult,
        before: Option<Arc<WorldSnapshot>>,
        after: Option<Arc<WorldSnapshot>>,
    );

    fn intervention_count(&self) -> u64;

    fn reset_intervention_count(&mut self);
}

const NAME: &str = "SimpleSubconsciousLayer";

#[derive(Debug)]
pub struct SimpleSubconsciousLayer {
    lifecycle: LifecycleState,
    registry: SkillRegistry,
    history: SkillExecutionHistory,
    recovery: FailureRecoveryHandler,
    interventions: u64,
}

impl Default for SimpleSubconsciousLayer {
    fn default() -> Self {
        Self::new(&ControlConfig::default())
    }
}

impl SimpleSubconsciousLayer {
    pub fn new(config: &ControlConfig) -> Self {
        Self::with_registry(config, SkillRegistry::with_defaults())
    }

    pub fn with_registry(config: &ControlConfig, registry: SkillRegistry) -> Self {
        Self {
            lifecycle: LifecycleState::new(),
            registry,
            history: SkillExecutionHistory::new(config.max_skill_history_size),
            recovery: FailureRecoveryHandler::new(),
            interventions: 0,
        }
    }

    pub fn registry(&self) -> &SkillRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut SkillRegistry {
        &mut self.registry
    }

    pub fn history(&self) -> &SkillExecutionHistory {
        &self.history
    }

    pub fn recovery(&self) -> &FailureRecoveryHandler {
        &self.recovery
    }
}

impl Lifecycle for SimpleSubconsciousLayer {
    fn name(&self) -> &str {
        NAME
    }

    fn layer(&self) -> LayerKind {
        LayerKind::Subconscious
    }

    fn initialize(&mut self) -> Result<()> {
        let skills = self.registry.len();
        self.lifecycle.initialize(NAME, || {
            if skills == 0 {
                anyhow::bail!("skill registry is empty");
            }
            debug!("{} skills registered", skills);
            Ok(())
        })
    }

    fn shutdown(&mut self) -> Result<()> {
        self.lifecycle.shutdown(NAME, || {
            self.history.clear();
            self.recovery.reset_all();
            Ok(())
        })
    }

    fn is_initialized(&self) -> bool {
        self.lifecycle.is_initialized()
    }

    fn is_healthy(&self) -> bool {
        self.lifecycle.is_healthy()
    }
}

impl SubconsciousLayer for SimpleSubconsciousLayer {
    fn translate(&self, intent: &Intent, snapshot: Option<&WorldSnapshot>) -> Vec<SkillCall> {
        let calls = translator::translate(intent, snapshot);
        for call in calls.iter().filter(|c| self.registry.contains(&c.skill_name)) {
            if let Err(e) = self.registry.validate(call) {
                warn!("Translated call does not match its definition: {}", e);
            }
        }
        debug!("Translated '{}' into {} skill call(s)", intent.description, calls.len());
        calls
    }

    fn select_next(&self, snapshot: Option<&WorldSnapshot>, pending: &[SkillCall]) -> Option<SkillCall> {
        let selected = selector::select_next(snapshot, pending, &self.history);
        if let Some(call) = &selected {
            debug!("Selected skill {} ({:?})", call.skill_name, call.priority);
        }
        selected
    }

    fn handle_failure(
        &mut self,
        call: &SkillCall,
        result: &SkillResult,
        snapshot: Option<&WorldSnapshot>,
    ) -> Option<SkillCall> {
        warn!("Skill {} ended with {:?}: {}", call.skill_name, result.status, result.message);
        self.interventions += 1;
        self.recovery.handle_failure(call, result, snapshot)
    }

    fn record(&mut self, call: &SkillCall, result: &SkillResult, snapshot: Option<Arc<WorldSnapshot>>) {
        self.history.record(call, result, None, snapshot);
    }

    fn learn(
        &mut self,
        call: &SkillCall,
        result: &SkillResult,
        before: Option<Arc<WorldSnapshot>>,
        after: Option<Arc<WorldSnapshot>>,
    ) {
        self.history.record(call, result, before, after);
        if result.is_success() {
            self.recovery.reset(&call.skill_name);
        }
        debug!(
            "{} success rate now {}%",
            call.skill_name,
            self.history.success_rate(&call.skill_name)
        );
    }

    fn intervention_count(&self) -> u64 {
        self.interventions
    }

    fn reset_intervention_count(&mut self) {
        self.interventions = 0;
    }
}
