//! Conscious layer: goal -> intent graph, re-planning, intervention, reflection.
//!
//! # PLANNING INVARIANT
//! Re-planning never patches a graph. Any Failed node regenerates the whole
//! graph from the root description against the latest snapshot.

pub mod decomposer;
pub mod graph_builder;
pub mod intervention;
pub mod parser;
pub mod reflection;

use tracing::debug;

use crate::kernel::config::ControlConfig;
use crate::kernel::error::{CschError, Result};
use crate::kernel::lifecycle::{LayerKind, Lifecycle, LifecycleState};
use crate::model::{IntentGraph, WorldSnapshot};

use self::graph_builder::IntentGraphBuilder;
use self::intervention::InterventionDecider;

pub use self::reflection::{reflection_metrics, ReflectionMetrics};

pub trait ConsciousLayer: Lifecycle + Send {
    fn generate(&mut self, goal: &str, snapshot: Option<&WorldSnapshot>) -> Result<IntentGraph>;

    /// Returns the same graph when nothing needs re-planning.
    fn update(&mut self, graph: &IntentGraph, snapshot: Option<&WorldSnapshot>) -> Result<IntentGraph>;

    fn should_intervene(&mut self, snapshot: Option<&WorldSnapshot>, graph: Option<&IntentGraph>) -> bool;

    fn reflect(&self, snapshot: Option<&WorldSnapshot>, graph: Option<&IntentGraph>) -> String;
}

const NAME: &str = "SimpleConsciousLayer";

/// Rule-table planner.
#[derive(Debug)]
pub struct SimpleConsciousLayer {
    lifecycle: LifecycleState,
    decider: InterventionDecider,
    current: Option<IntentGraph>,
}

impl Default for SimpleConsciousLayer {
    fn default() -> Self {
        Self::new(&ControlConfig::default())
    }
}

impl SimpleConsciousLayer {
    pub fn new(config: &ControlConfig) -> Self {
        Self {
            lifecycle: LifecycleState::new(),
            decider: InterventionDecider::new(config),
            current: None,
        }
    }

    /// Last graph produced by [`ConsciousLayer::generate`].
    pub fn current_graph(&self) -> Option<&IntentGraph> {
        self.current.as_ref()
    }

    pub fn decider_mut(&mut self) -> &mut InterventionDecider {
        &mut self.decider
    }
}

impl Lifecycle for SimpleConsciousLayer {
    fn name(&self) -> &str {
        NAME
    }

    fn layer(&self) -> LayerKind {
        LayerKind::Conscious
    }

    fn initialize(&mut self) -> Result<()> {
        self.lifecycle.initialize(NAME, || {
            self.decider.reset();
            Ok(())
        })
    }

    fn shutdown(&mut self) -> Result<()> {
        self.lifecycle.shutdown(NAME, || {
            self.current = None;
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

impl ConsciousLayer for SimpleConsciousLayer {
    fn generate(&mut self, goal: &str, snapshot: Option<&WorldSnapshot>) -> Result<IntentGraph> {
        self.lifecycle.ensure_initialized(NAME)?;

        let goal = goal.trim();
        if goal.is_empty() {
            return Err(CschError::invalid_input(NAME, "goal must not be empty"));
        }

        // 1. Parse
        let root = parser::parse_goal(goal, snapshot);

        // 2. Decompose
        let steps = decomposer::decompose(&root, snapshot);

        // 3. Build: one root node, sub-intents as its direct children
        let mut builder = IntentGraphBuilder::new();
        let root_id = builder.add_intent(root.clone(), None);
        builder.add_children(steps, &root_id);
        let graph = builder.build(root)?;

        debug!(
            "Generated intent graph for '{}': {:?}, {} nodes",
            goal,
            graph.root_intent.kind,
            graph.len()
        );
        self.current = Some(graph.clone());
        Ok(graph)
    }

    fn update(&mut self, graph: &IntentGraph, snapshot: Option<&WorldSnapshot>) -> Result<IntentGraph> {
        if !graph.has_failed_nodes() {
            return Ok(graph.clone());
        }
        debug!("Intent graph has failed nodes, regenerating");
        let goal = graph.root_intent.description.clone();
        self.generate(&goal, snapshot)
    }

    fn should_intervene(&mut self, snapshot: Option<&WorldSnapshot>, graph: Option<&IntentGraph>) -> bool {
        self.decider.should_intervene(snapshot, graph)
    }

    fn reflect(&self, snapshot: Option<&WorldSnapshot>, graph: Option<&IntentGraph>) -> String {
        reflection::reflect(snapshot, graph)
    }
}
