//! Intents and the intent graph.
//!
//! # IMMUTABILITY INVARIANT
//! An `IntentGraph` is never patched in place. Status changes go through
//! [`IntentGraph::with_node_status`], which returns a new graph; re-planning
//! replaces the graph wholesale.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::SystemTime;
use uuid::Uuid;

use super::params::{ParamValue, Params};
use crate::kernel::error::{CschError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntentType {
    Navigate,
    Mine,
    Craft,
    Combat,
    Gather,
    Build,
    Explore,
    Survive,
    Social,
    Generic,
}

impl IntentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentType::Navigate => "navigate",
            IntentType::Mine => "mine",
            IntentType::Craft => "craft",
            IntentType::Combat => "combat",
            IntentType::Gather => "gather",
            IntentType::Build => "build",
            IntentType::Explore => "explore",
            IntentType::Survive => "survive",
            IntentType::Social => "social",
            IntentType::Generic => "generic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
    Emergency,
}

impl Priority {
    pub fn value(&self) -> u8 {
        match self {
            Priority::Low => 0,
            Priority::Normal => 1,
            Priority::High => 2,
            Priority::Critical => 3,
            Priority::Emergency => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub id: Uuid,
    pub description: String,
    pub kind: IntentType,
    pub priority: Priority,
    pub params: Params,
    pub parent_id: Option<Uuid>,
    pub created_at: SystemTime,
}

impl Intent {
    pub fn new(description: impl Into<String>, kind: IntentType) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            kind,
            priority: Priority::Normal,
            params: Params::new(),
            parent_id: None,
            created_at: SystemTime::now(),
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key, value);
        self
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn with_parent(mut self, parent: Uuid) -> Self {
        self.parent_id = Some(parent);
        self
    }

    pub fn param(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NodeStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
    Blocked,
}

impl NodeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeStatus::Completed | NodeStatus::Failed | NodeStatus::Skipped)
    }

    /// Completed or skipped: nothing left to do and nothing went wrong.
    pub fn is_done(&self) -> bool {
        matches!(self, NodeStatus::Completed | NodeStatus::Skipped)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentNode {
    pub id: String,
    pub intent: Intent,
    pub status: NodeStatus,
    pub created_at: SystemTime,
    pub started_at: Option<SystemTime>,
    pub completed_at: Option<SystemTime>,
}

impl IntentNode {
    pub fn new(id: impl Into<String>, intent: Intent) -> Self {
        Self {
            id: id.into(),
            intent,
            status: NodeStatus::Pending,
            created_at: SystemTime::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Copy with a new status. Entering Running stamps `started_at`; entering a
    /// terminal status stamps `completed_at`.
    pub fn with_status(&self, status: NodeStatus) -> Self {
        let now = SystemTime::now();
        let mut next = self.clone();
        next.status = status;
        if status == NodeStatus::Running && next.started_at.is_none() {
            next.started_at = Some(now);
        }
        if status.is_terminal() {
            next.completed_at = Some(now);
        }
        next
    }

    pub fn is_completed(&self) -> bool {
        self.status.is_done()
    }

    pub fn is_failed(&self) -> bool {
        self.status == NodeStatus::Failed
    }

    pub fn is_active(&self) -> bool {
        self.status == NodeStatus::Running
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeType {
    Sequence,
    Parallel,
    Conditional,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentEdge {
    pub from: String,
    pub to: String,
    pub kind: EdgeType,
    pub conditions: Params,
}

impl IntentEdge {
    pub fn new(from: impl Into<String>, to: impl Into<String>, kind: EdgeType) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            kind,
            conditions: Params::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentGraph {
    pub id: Uuid,
    pub root_intent: Intent,
    nodes: Vec<IntentNode>,
    edges: Vec<IntentEdge>,
    pub created_at: SystemTime,
}

impl IntentGraph {
    /// Fails if any edge names a node that is not in `nodes`.
    pub fn new(root_intent: Intent, nodes: Vec<IntentNode>, edges: Vec<IntentEdge>) -> Result<Self> {
        let ids: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        if ids.len() != nodes.len() {
            return Err(CschError::invalid_input("IntentGraph", "duplicate node id"));
        }
        if let Some(edge) = edges
            .iter()
            .find(|e| !ids.contains(e.from.as_str()) || !ids.contains(e.to.as_str()))
        {
            return Err(CschError::invalid_input(
                "IntentGraph",
                format!("edge {} -> {} references an unknown node", edge.from, edge.to),
            ));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            root_intent,
            nodes,
            edges,
            created_at: SystemTime::now(),
        })
    }

    pub fn nodes(&self) -> &[IntentNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[IntentEdge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&IntentNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Targets of edges leaving `id`, in edge insertion order.
    pub fn children(&self, id: &str) -> Vec<&IntentNode> {
        self.edges
            .iter()
            .filter(|e| e.from == id)
            .filter_map(|e| self.node(&e.to))
            .collect()
    }

    /// Nodes with no incoming edge.
    pub fn root_nodes(&self) -> Vec<&IntentNode> {
        let targets: HashSet<&str> = self.edges.iter().map(|e| e.to.as_str()).collect();
        self.nodes
            .iter()
            .filter(|n| !targets.contains(n.id.as_str()))
            .collect()
    }

    pub fn root_node(&self) -> Option<&IntentNode> {
        self.root_nodes().into_iter().next()
    }

    /// Highest intent priority among non-terminal nodes; earliest wins ties.
    pub fn highest_priority_node(&self) -> Option<&IntentNode> {
        self.nodes
            .iter()
            .filter(|n| !n.status.is_terminal())
            .fold(None, |best: Option<&IntentNode>, n| match best {
                Some(b) if b.intent.priority >= n.intent.priority => Some(b),
                _ => Some(n),
            })
    }

    /// The node to work on next: the first non-terminal child of the root,
    /// else the root itself while it is still open.
    pub fn next_actionable_node(&self) -> Option<&IntentNode> {
        let root = self.root_node()?;
        let children = self.children(&root.id);
        if let Some(child) = children.iter().find(|c| !c.status.is_terminal()) {
            return Some(*child);
        }
        if children.is_empty() && !root.status.is_terminal() {
            return Some(root);
        }
        None
    }

    /// True when the root has children and every one of them is done.
    pub fn all_children_complete(&self, id: &str) -> bool {
        let children = self.children(id);
        !children.is_empty() && children.iter().all(|c| c.is_completed())
    }

    pub fn has_failed_nodes(&self) -> bool {
        self.nodes.iter().any(IntentNode::is_failed)
    }

    pub fn count_status(&self, status: NodeStatus) -> usize {
        self.nodes.iter().filter(|n| n.status == status).count()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// New graph, same id, with one node's status replaced.
    pub fn with_node_status(&self, id: &str, status: NodeStatus) -> Result<Self> {
        let index = self
            .nodes
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(|| CschError::invalid_input("IntentGraph", format!("unknown node {id}")))?;

        let mut next = self.clone();
        next.nodes[index] = self.nodes[index].with_status(status);
        Ok(next)
    }
}
