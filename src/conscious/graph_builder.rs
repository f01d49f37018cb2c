use crate::kernel::error::Result;
use crate::model::{EdgeType, Intent, IntentEdge, IntentGraph, IntentNode};

/// Accumulates nodes and edges; node ids are `node_1`, `node_2`, ... in
/// insertion order.
#[derive(Debug, Default)]
pub struct IntentGraphBuilder {
    nodes: Vec<IntentNode>,
    edges: Vec<IntentEdge>,
    counter: usize,
}

impl IntentGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node and, when `parent` is given, a Sequence edge from it.
    /// Returns the new node id.
    pub fn add_intent(&mut self, intent: Intent, parent: Option<&str>) -> String {
        self.add_with_edge(intent, parent, EdgeType::Sequence)
    }

    pub fn add_children(&mut self, intents: Vec<Intent>, parent: &str) -> Vec<String> {
        intents
            .into_iter()
            .map(|i| self.add_with_edge(i, Some(parent), EdgeType::Sequence))
            .collect()
    }

    pub fn add_parallel(&mut self, intents: Vec<Intent>, parent: &str) -> Vec<String> {
        intents
            .into_iter()
            .map(|i| self.add_with_edge(i, Some(parent), EdgeType::Parallel))
            .collect()
    }

    fn add_with_edge(&mut self, intent: Intent, parent: Option<&str>, kind: EdgeType) -> String {
        self.counter += 1;
        let id = format!("node_{}", self.counter);
        self.nodes.push(IntentNode::new(id.clone(), intent));
        if let Some(parent) = parent {
            self.edges.push(IntentEdge::new(parent, id.clone(), kind));
        }
        id
    }

    pub fn build(self, root_intent: Intent) -> Result<IntentGraph> {
        IntentGraph::new(root_intent, self.nodes, self.edges)
    }
}
