//! Fixed-rate control loop tying the four layers together.
//!
//! # KERNEL LAW
//! One tick = observe -> plan -> select -> act -> filter -> emit, run to
//! completion without awaiting. The async driver only decides *when* a tick
//! runs; stopping cancels between ticks, never inside one.
//!
//! # SKILL CELL INVARIANT
//! The tick loop only ever fills an empty skill cell. Result reporting only
//! ever replaces or clears the cell while it still holds the reported call.

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::cells::SharedCell;
use super::config::ControlConfig;
use super::error::{CschError, Result};
use super::event::{ControlEvent, EventBus, EventKind, EventSink};
use super::lifecycle::LifecycleState;
use super::time::Tick;
use crate::cerebellum::{CerebellumLayer, SimpleCerebellumLayer};
use crate::conscious::{ConsciousLayer, SimpleConsciousLayer};
use crate::model::{
    ControlMetrics, IntentGraph, MotorAction, NodeStatus, SkillCall, SkillResult, StateSource, WorldSnapshot,
};
use crate::safety::{RuleShield, SafetyShield};
use crate::subconscious::{SimpleSubconsciousLayer, SubconsciousLayer};

const NAME: &str = "ControlSystem";

/// The four layers the loop drives.
pub struct Layers {
    pub conscious: Box<dyn ConsciousLayer>,
    pub subconscious: Box<dyn SubconsciousLayer>,
    pub cerebellum: Box<dyn CerebellumLayer>,
    pub shield: Box<dyn SafetyShield>,
}

impl Layers {
    /// The built-in rule-based implementations.
    pub fn simple(config: &ControlConfig) -> Self {
        Self {
            conscious: Box::new(SimpleConsciousLayer::new(config)),
            subconscious: Box::new(SimpleSubconsciousLayer::new(config)),
            cerebellum: Box::new(SimpleCerebellumLayer::from_config(config)),
            shield: Box::new(RuleShield::default()),
        }
    }
}

/// The skill currently being executed and where it came from.
#[derive(Debug, Clone)]
pub struct ActiveSkill {
    pub call: SkillCall,
    pub graph_id: Uuid,
    pub node_id: String,
    pub started: Arc<WorldSnapshot>,
}

#[derive(Debug, Default)]
struct TickState {
    tick: Tick,
    last_intent_update: Option<Instant>,
    last_skill_update: Option<Instant>,
    previous: Option<(Arc<WorldSnapshot>, MotorAction)>,
}

#[derive(Debug, Default)]
struct Driver {
    cancel: Option<CancellationToken>,
    handle: Option<JoinHandle<()>>,
}

pub struct ControlSystem {
    config: ControlConfig,
    state_source: Arc<dyn StateSource>,
    events: Arc<dyn EventSink>,

    conscious: Mutex<Box<dyn ConsciousLayer>>,
    subconscious: Mutex<Box<dyn SubconsciousLayer>>,
    cerebellum: Mutex<Box<dyn CerebellumLayer>>,
    shield: Mutex<Box<dyn SafetyShield>>,

    goal: SharedCell<String>,
    graph: SharedCell<IntentGraph>,
    skill: SharedCell<ActiveSkill>,
    metrics: SharedCell<ControlMetrics>,

    action_tx: Sender<MotorAction>,
    action_rx: Receiver<MotorAction>,

    lifecycle: LifecycleState,
    running: AtomicBool,
    tick_state: Mutex<TickState>,
    driver: Mutex<Driver>,

    interventions: AtomicU64,
    violations: AtomicU64,
    dropped_actions: AtomicU64,
}

impl ControlSystem {
    /// Built-in layers, publishing into a fresh [`EventBus`].
    pub fn new(config: ControlConfig, state_source: Arc<dyn StateSource>) -> Result<Self> {
        let layers = Layers::simple(&config);
        Self::with_components(config, state_source, Arc::new(EventBus::new()), layers)
    }

    pub fn with_components(
        config: ControlConfig,
        state_source: Arc<dyn StateSource>,
        events: Arc<dyn EventSink>,
        layers: Layers,
    ) -> Result<Self> {
        config.validate()?;
        let (action_tx, action_rx) = channel::bounded(config.action_queue_capacity);

        Ok(Self {
            state_source,
            events,
            conscious: Mutex::new(layers.conscious),
            subconscious: Mutex::new(layers.subconscious),
            cerebellum: Mutex::new(layers.cerebellum),
            shield: Mutex::new(layers.shield),
            goal: SharedCell::empty(),
            graph: SharedCell::empty(),
            skill: SharedCell::empty(),
            metrics: SharedCell::empty(),
            action_tx,
            action_rx,
            lifecycle: LifecycleState::new(),
            running: AtomicBool::new(false),
            tick_state: Mutex::new(TickState::default()),
            driver: Mutex::new(Driver::default()),
            interventions: AtomicU64::new(0),
            violations: AtomicU64::new(0),
            dropped_actions: AtomicU64::new(0),
            config,
        })
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    pub fn events(&self) -> Arc<dyn EventSink> {
        self.events.clone()
    }

    fn publish(&self, event: ControlEvent) {
        self.events.publish(event);
    }

    fn publish_error(&self, err: &CschError) {
        self.publish(
            ControlEvent::new(EventKind::SystemError, err.component(), err.to_string())
                .with_data("kind", format!("{:?}", err.kind())),
        );
    }

    // ---------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------

    /// Brings every layer up, top to bottom. Idempotent.
    pub fn initialize(&self) -> Result<()> {
        if self.lifecycle.is_initialized() {
            return Ok(());
        }

        let outcome = self.initialize_layers();
        if let Err(e) = &outcome {
            self.publish_error(e);
            return outcome;
        }

        self.lifecycle.initialize(NAME, || Ok(()))?;
        self.publish(ControlEvent::new(
            EventKind::SystemInitialized,
            NAME,
            format!("control loop ready at {} Hz", self.config.control_frequency_hz),
        ));
        Ok(())
    }

    fn initialize_layers(&self) -> Result<()> {
        self.conscious.lock().initialize()?;
        self.subconscious.lock().initialize()?;
        self.cerebellum.lock().initialize()?;
        self.shield.lock().initialize()?;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.lifecycle.is_initialized()
    }

    /// Healthy when the system and all four layers are.
    pub fn is_healthy(&self) -> bool {
        self.lifecycle.is_healthy()
            && self.conscious.lock().is_healthy()
            && self.subconscious.lock().is_healthy()
            && self.cerebellum.lock().is_healthy()
            && self.shield.lock().is_healthy()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Spawns the tick loop. Idempotent while running.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        self.lifecycle.ensure_initialized(NAME)?;

        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }

        let token = CancellationToken::new();
        let system = Arc::clone(self);
        let child = token.clone();
        let handle = tokio::spawn(async move { system.run(child).await });

        let mut driver = self.driver.lock();
        driver.cancel = Some(token);
        driver.handle = Some(handle);
        Ok(())
    }

    /// Requests the loop to stop after the current tick. Idempotent.
    pub fn stop(&self) {
        if self
            .running
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        if let Some(token) = self.driver.lock().cancel.take() {
            token.cancel();
        }
        info!("Control loop stop requested");
    }

    /// Stops the loop, waits for it to exit, then shuts the layers down
    /// bottom to top.
    pub async fn shutdown(&self) -> Result<()> {
        self.stop();
        let handle = self.driver.lock().handle.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("Control loop task ended abnormally: {}", e);
            }
        }

        if !self.lifecycle.is_initialized() {
            return Ok(());
        }

        let layers = [
            self.shield.lock().shutdown(),
            self.cerebellum.lock().shutdown(),
            self.subconscious.lock().shutdown(),
            self.conscious.lock().shutdown(),
        ];
        let outcome = self.lifecycle.shutdown(NAME, || Ok(()));

        self.publish(ControlEvent::new(EventKind::SystemShutdown, NAME, "control loop shut down"));

        for result in layers {
            if let Err(e) = &result {
                self.publish_error(e);
            }
            result?;
        }
        outcome
    }

    // ---------------------------------------------------------------
    // Caller surface
    // ---------------------------------------------------------------

    /// Plans a new goal and makes it current. Any active skill is dropped.
    pub fn set_goal(&self, goal: &str) -> Result<Arc<IntentGraph>> {
        self.lifecycle.ensure_initialized(NAME)?;

        let snapshot = self.state_source.current_state();
        let graph = {
            let mut conscious = self.conscious.lock();
            let graph = Arc::new(conscious.generate(goal, snapshot.as_deref())?);
            self.goal.set(goal.trim().to_string());
            self.graph.set_arc(graph.clone());
            self.skill.clear();
            graph
        };
        {
            let mut ticks = self.tick_state.lock();
            ticks.last_intent_update = None;
            ticks.last_skill_update = None;
        }

        info!("Goal set: '{}' ({} intent nodes)", goal.trim(), graph.len());
        self.publish(ControlEvent::new(EventKind::GoalSet, NAME, goal.trim()));
        self.publish(
            ControlEvent::new(EventKind::IntentGenerated, NAME, graph.root_intent.description.clone())
                .with_data("graphId", graph.id.to_string())
                .with_data("nodes", graph.len() as u64),
        );
        Ok(graph)
    }

    /// Non-blocking receive of the next safe action.
    pub fn poll_action(&self) -> Option<MotorAction> {
        self.action_rx.try_recv().ok()
    }

    /// Blocking receive, giving up after `timeout`.
    pub fn next_action_timeout(&self, timeout: Duration) -> Option<MotorAction> {
        self.action_rx.recv_timeout(timeout).ok()
    }

    pub fn pending_actions(&self) -> usize {
        self.action_rx.len()
    }

    /// Routes the outcome of the active skill. Results for any call other
    /// than the active one are logged and ignored.
    pub fn report_skill_result(&self, result: SkillResult) -> Result<()> {
        self.lifecycle.ensure_initialized(NAME)?;

        let Some(active) = self.skill.get() else {
            debug!("No active skill; ignoring result for {}", result.skill_name);
            return Ok(());
        };
        if active.call.id != result.skill_call_id {
            warn!(
                "Ignoring stale result for {} ({}); active call is {}",
                result.skill_name, result.skill_call_id, active.call.id
            );
            return Ok(());
        }

        let snapshot = self.state_source.current_state();
        let is_active = |current: &ActiveSkill| current.call.id == result.skill_call_id;

        if result.is_success() {
            self.subconscious
                .lock()
                .learn(&active.call, &result, Some(active.started.clone()), snapshot.clone());

            if self.skill.replace_if(is_active, None) {
                self.mark_node(&active, NodeStatus::Completed)?;
                info!("Skill completed: {} in {:?}", result.skill_name, result.execution_time);
                self.publish(
                    ControlEvent::new(EventKind::SkillCompleted, NAME, result.skill_name.clone())
                        .with_data("callId", result.skill_call_id.to_string())
                        .with_data("executionMs", result.execution_time.as_millis() as u64),
                );
            }
            return Ok(());
        }

        let recovery = {
            let mut subconscious = self.subconscious.lock();
            subconscious.record(&active.call, &result, snapshot.clone());
            subconscious.handle_failure(&active.call, &result, snapshot.as_deref())
        };
        let recovery_name = recovery.as_ref().map(|c| c.skill_name.clone());
        let next = recovery.map(|call| ActiveSkill {
            call,
            graph_id: active.graph_id,
            node_id: active.node_id.clone(),
            started: snapshot.clone().unwrap_or_else(|| active.started.clone()),
        });

        if self.skill.replace_if(is_active, next) {
            if recovery_name.is_none() {
                self.mark_node(&active, NodeStatus::Failed)?;
            }
            warn!(
                "Skill failed: {} ({:?}: {}), recovery: {}",
                result.skill_name,
                result.status,
                result.message,
                recovery_name.as_deref().unwrap_or("none")
            );
            let mut event = ControlEvent::new(EventKind::SkillFailed, NAME, result.message.clone())
                .with_data("skill", result.skill_name.clone())
                .with_data("status", format!("{:?}", result.status));
            if let Some(name) = recovery_name {
                event = event.with_data("recovery", name);
            }
            self.publish(event);
        }
        Ok(())
    }

    fn mark_node(&self, active: &ActiveSkill, status: NodeStatus) -> Result<()> {
        let _conscious = self.conscious.lock();
        let Some(graph) = self.graph.get() else {
            return Ok(());
        };
        if graph.id != active.graph_id || graph.node(&active.node_id).is_none() {
            debug!("Graph changed since {} started; not marking", active.call.skill_name);
            return Ok(());
        }
        self.graph.set(graph.with_node_status(&active.node_id, status)?);
        Ok(())
    }

    pub fn goal(&self) -> Option<Arc<String>> {
        self.goal.get()
    }

    pub fn graph(&self) -> Option<Arc<IntentGraph>> {
        self.graph.get()
    }

    pub fn skill(&self) -> Option<SkillCall> {
        self.skill.get().map(|a| a.call.clone())
    }

    pub fn active_skill(&self) -> Option<Arc<ActiveSkill>> {
        self.skill.get()
    }

    pub fn metrics(&self) -> ControlMetrics {
        self.metrics.get().map(|m| *m).unwrap_or_default()
    }

    pub fn reflection(&self) -> String {
        let snapshot = self.state_source.current_state();
        let graph = self.graph.get();
        self.conscious.lock().reflect(snapshot.as_deref(), graph.as_deref())
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_state.lock().tick.frame
    }

    pub fn intervention_count(&self) -> u64 {
        self.interventions.load(Ordering::Relaxed)
    }

    /// Recovery interventions made by the subconscious layer.
    pub fn recovery_count(&self) -> u64 {
        self.subconscious.lock().intervention_count()
    }

    pub fn violation_count(&self) -> u64 {
        self.violations.load(Ordering::Relaxed)
    }

    pub fn dropped_action_count(&self) -> u64 {
        self.dropped_actions.load(Ordering::Relaxed)
    }

    // ---------------------------------------------------------------
    // Tick
    // ---------------------------------------------------------------

    /// One synchronous control step. MUST NOT await.
    pub fn tick_step(&self) -> Result<()> {
        let mut ticks = self.tick_state.lock();
        ticks.tick = ticks.tick.next();
        let now = Instant::now();

        // === 1. OBSERVE ===
        let snapshot = self
            .state_source
            .current_state()
            .ok_or_else(|| CschError::resource_unavailable(NAME, "no world snapshot available"))?;

        // === 2. PLAN (Conscious) ===
        if due(ticks.last_intent_update, now, self.config.intent_update_interval_ms) {
            ticks.last_intent_update = Some(now);
            self.update_intent(&snapshot)?;
        }

        // === 3. SELECT (Subconscious) ===
        if self.skill.is_empty() && due(ticks.last_skill_update, now, self.config.skill_update_interval_ms) {
            ticks.last_skill_update = Some(now);
            self.dispatch_next_skill(&snapshot)?;
        }

        // === 4. ACT (Cerebellum) + 5. FILTER (Shield) + 6. EMIT ===
        let Some(active) = self.skill.get() else {
            ticks.previous = None;
            return Ok(());
        };
        let action = self.compute_action(&active.call, &snapshot, ticks.previous.take());
        let safe = self.filter_action(action, &snapshot);
        self.emit(safe);

        ticks.previous = Some((snapshot, safe));
        Ok(())
    }

    fn update_intent(&self, snapshot: &WorldSnapshot) -> Result<()> {
        let mut conscious = self.conscious.lock();
        let Some(graph) = self.graph.get() else {
            return Ok(());
        };
        if !conscious.should_intervene(Some(snapshot), Some(&*graph)) {
            return Ok(());
        }

        let count = self.interventions.fetch_add(1, Ordering::Relaxed) + 1;
        info!("Conscious intervention #{} on '{}'", count, graph.root_intent.description);
        self.publish(
            ControlEvent::new(EventKind::Intervention, NAME, "conscious layer intervened")
                .with_data("count", count),
        );

        let updated = conscious.update(&graph, Some(snapshot))?;
        if updated.id != graph.id {
            self.graph.set(updated);
            self.skill.clear();
            self.publish(ControlEvent::new(
                EventKind::IntentUpdated,
                NAME,
                graph.root_intent.description.clone(),
            ));
        }
        Ok(())
    }

    fn dispatch_next_skill(&self, snapshot: &Arc<WorldSnapshot>) -> Result<()> {
        let _conscious = self.conscious.lock();
        let Some(graph) = self.graph.get() else {
            return Ok(());
        };

        // Close out the root once every child is terminal.
        if let Some(root) = graph.root_node() {
            let children = graph.children(&root.id);
            if !root.status.is_terminal()
                && !children.is_empty()
                && children.iter().all(|c| c.status.is_terminal())
            {
                let status = if graph.all_children_complete(&root.id) {
                    NodeStatus::Completed
                } else {
                    NodeStatus::Failed
                };
                info!("Goal '{}' finished: {:?}", graph.root_intent.description, status);
                self.graph.set(graph.with_node_status(&root.id, status)?);
                self.publish(
                    ControlEvent::new(EventKind::IntentUpdated, NAME, graph.root_intent.description.clone())
                        .with_data("status", format!("{status:?}")),
                );
                return Ok(());
            }
        }

        let Some(node) = graph.next_actionable_node() else {
            return Ok(());
        };

        let call = {
            let subconscious = self.subconscious.lock();
            let calls = subconscious.translate(&node.intent, Some(&**snapshot));
            subconscious.select_next(Some(&**snapshot), &calls)
        };
        let Some(call) = call else {
            debug!("No skill for intent '{}'", node.intent.description);
            return Ok(());
        };

        let active = ActiveSkill {
            call: call.clone(),
            graph_id: graph.id,
            node_id: node.id.clone(),
            started: snapshot.clone(),
        };
        if !self.skill.set_if_empty(active) {
            return Ok(());
        }

        if node.status != NodeStatus::Running {
            self.graph.set(graph.with_node_status(&node.id, NodeStatus::Running)?);
        }
        info!("Skill called: {} for '{}'", call.skill_name, node.intent.description);
        self.publish(
            ControlEvent::new(EventKind::SkillCalled, NAME, call.skill_name.clone())
                .with_data("callId", call.id.to_string())
                .with_data("node", node.id.clone())
                .with_data("priority", format!("{:?}", call.priority)),
        );
        Ok(())
    }

    fn compute_action(
        &self,
        call: &SkillCall,
        snapshot: &Arc<WorldSnapshot>,
        previous: Option<(Arc<WorldSnapshot>, MotorAction)>,
    ) -> MotorAction {
        let mut cerebellum = self.cerebellum.lock();
        if let Some((before, emitted)) = previous {
            let reward = cerebellum.metrics().overall_quality();
            cerebellum.update_from_feedback(Some(&*before), &emitted, Some(&**snapshot), reward);
        }

        let action = cerebellum.compute_action(call, Some(&**snapshot));
        self.metrics.set(cerebellum.metrics());
        action
    }

    fn filter_action(&self, action: MotorAction, snapshot: &WorldSnapshot) -> MotorAction {
        self.publish(
            ControlEvent::new(EventKind::ActionComputed, NAME, "motor action computed")
                .with_data("moveForward", action.move_forward())
                .with_data("yawRate", action.yaw_rate()),
        );
        if !self.config.safety_shield_enabled {
            return action;
        }

        let filtered = self.shield.lock().filter(&action, snapshot);
        if !filtered.modified {
            return filtered.safe;
        }

        self.violations
            .fetch_add(filtered.violations.len() as u64, Ordering::Relaxed);
        for v in &filtered.violations {
            self.publish(
                ControlEvent::new(EventKind::SafetyViolation, v.rule_name.clone(), v.description.clone())
                    .with_data("severity", format!("{:?}", v.severity)),
            );
        }
        self.publish(ControlEvent::new(
            EventKind::ActionFiltered,
            NAME,
            filtered.reason.clone().unwrap_or_default(),
        ));
        filtered.safe
    }

    fn emit(&self, action: MotorAction) {
        match self.action_tx.try_send(action) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped_actions.fetch_add(1, Ordering::Relaxed) + 1;
                if dropped == 1 || dropped % 1000 == 0 {
                    warn!("Action queue full; {} actions dropped so far", dropped);
                }
            }
            Err(TrySendError::Disconnected(_)) => {
                error!("Action queue disconnected");
            }
        }
    }

    /// Async driver loop.
    async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let period = self.config.tick_period();
        info!("Control Loop Started. Tick: {}ms", period.as_millis());

        let mut cadence = interval(period);
        cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = cadence.tick() => {
                    if let Err(e) = self.tick_step() {
                        error!("Tick failed: {}", e);
                        self.publish_error(&e);
                    }
                }
            }
        }

        info!("Control Loop Stopped after {} ticks", self.tick_count());
    }
}

fn due(last: Option<Instant>, now: Instant, interval_ms: u64) -> bool {
    match last {
        Some(at) => now.saturating_duration_since(at) >= Duration::from_millis(interval_ms),
        None => true,
    }
}

impl std::fmt::Debug for ControlSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlSystem")
            .field("initialized", &self.is_initialized())
            .field("running", &self.is_running())
            .field("goal", &self.goal.get())
            .field("interventions", &self.intervention_count())
            .field("violations", &self.violation_count())
            .finish()
    }
}
