//! Caller-facing wrapper around [`ControlSystem`] for the common
//! goal -> actions -> results cycle.

use std::sync::Arc;
use std::time::Duration;

use crate::kernel::config::ControlConfig;
use crate::kernel::error::{CschError, Result};
use crate::kernel::orchestrator::ControlSystem;
use crate::model::{
    ControlMetrics, IntentGraph, MotorAction, PlayerState, SkillCall, SkillResult, SkillResultStatus, StateSource,
};

const NAME: &str = "Agent";

#[derive(Clone)]
pub struct Agent {
    system: Arc<ControlSystem>,
    state_source: Arc<dyn StateSource>,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent").field("system", &self.system).finish()
    }
}

impl Agent {
    /// Builds and initializes a control system over `state_source`.
    pub fn new(config: ControlConfig, state_source: Arc<dyn StateSource>) -> Result<Self> {
        let system = Arc::new(ControlSystem::new(config, state_source.clone())?);
        system.initialize()?;
        Ok(Self { system, state_source })
    }

    pub fn from_system(system: Arc<ControlSystem>, state_source: Arc<dyn StateSource>) -> Self {
        Self { system, state_source }
    }

    pub fn system(&self) -> &Arc<ControlSystem> {
        &self.system
    }

    /// Plans `goal` and makes sure the loop is running.
    pub fn execute_goal(&self, goal: &str) -> Result<Arc<IntentGraph>> {
        let graph = self.system.set_goal(goal)?;
        self.system.start()?;
        Ok(graph)
    }

    pub fn action(&self) -> Option<MotorAction> {
        self.system.poll_action()
    }

    pub fn action_timeout(&self, timeout: Duration) -> Option<MotorAction> {
        self.system.next_action_timeout(timeout)
    }

    /// Reports the current skill as successful.
    pub fn report_success(&self, message: impl Into<String>) -> Result<()> {
        let call = self.current_call()?;
        self.system
            .report_skill_result(SkillResult::new(&call, SkillResultStatus::Success, message))
    }

    /// Reports the current skill as failed with `status`.
    pub fn report_failure(&self, status: SkillResultStatus, message: impl Into<String>) -> Result<()> {
        if status.is_success() {
            return Err(CschError::invalid_input(NAME, "failure status must not be Success"));
        }
        let call = self.current_call()?;
        self.system.report_skill_result(SkillResult::new(&call, status, message))
    }

    fn current_call(&self) -> Result<SkillCall> {
        self.system
            .skill()
            .ok_or_else(|| CschError::invalid_state(NAME, "no active skill"))
    }

    pub fn current_skill(&self) -> Option<SkillCall> {
        self.system.skill()
    }

    pub fn current_goal(&self) -> Option<Arc<String>> {
        self.system.goal()
    }

    pub fn intent_graph(&self) -> Option<Arc<IntentGraph>> {
        self.system.graph()
    }

    pub fn player_state(&self) -> Option<PlayerState> {
        self.state_source.player_state()
    }

    pub fn metrics(&self) -> ControlMetrics {
        self.system.metrics()
    }

    pub fn reflection(&self) -> String {
        self.system.reflection()
    }

    pub fn is_running(&self) -> bool {
        self.system.is_running()
    }

    pub fn stop(&self) {
        self.system.stop();
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.system.shutdown().await
    }
}
