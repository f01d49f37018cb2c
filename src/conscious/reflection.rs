use serde::Serialize;

use crate::model::{IntentGraph, NodeStatus, WorldSnapshot};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReflectionMetrics {
    pub total_intents: usize,
    pub completed_intents: usize,
    pub failed_intents: usize,
    /// completed / total, 0 when the graph is empty or absent.
    pub success_rate: f64,
    pub health_ratio: Option<f64>,
    pub hunger_ratio: Option<f64>,
    pub speed: Option<f64>,
}

pub fn reflection_metrics(graph: Option<&IntentGraph>, snapshot: Option<&WorldSnapshot>) -> ReflectionMetrics {
    let mut metrics = ReflectionMetrics::default();

    if let Some(graph) = graph {
        metrics.total_intents = graph.len();
        metrics.completed_intents = graph.count_status(NodeStatus::Completed);
        metrics.failed_intents = graph.count_status(NodeStatus::Failed);
        if metrics.total_intents > 0 {
            metrics.success_rate = metrics.completed_intents as f64 / metrics.total_intents as f64;
        }
    }

    if let Some(snapshot) = snapshot {
        let player = &snapshot.player;
        metrics.health_ratio = Some(player.health_ratio());
        metrics.hunger_ratio = Some(player.hunger_ratio());
        metrics.speed = Some(player.speed());
    }

    metrics
}

/// Deterministic plain-text report over a graph and the current snapshot.
pub fn reflect(snapshot: Option<&WorldSnapshot>, graph: Option<&IntentGraph>) -> String {
    let mut lines = vec!["=== Execution Reflection ===".to_string(), String::new()];

    // Summary
    match graph {
        Some(graph) => {
            let total = graph.len();
            let completed = graph.count_status(NodeStatus::Completed);
            let rate = if total > 0 {
                completed as f64 * 100.0 / total as f64
            } else {
                0.0
            };
            lines.push("Execution summary:".to_string());
            lines.push(format!("  - total: {total}"));
            lines.push(format!("  - completed: {completed}"));
            lines.push(format!("  - failed: {}", graph.count_status(NodeStatus::Failed)));
            lines.push(format!("  - pending: {}", graph.count_status(NodeStatus::Pending)));
            lines.push(format!("  - success rate: {rate:.1}%"));
        }
        None => lines.push("No execution record".to_string()),
    }
    lines.push(String::new());

    // State
    match snapshot {
        Some(snapshot) => {
            let p = &snapshot.player;
            lines.push("State analysis:".to_string());
            lines.push(format!(
                "  - health: {:.1}/{:.1} ({:.1}%)",
                p.health,
                p.max_health,
                p.health_ratio() * 100.0
            ));
            lines.push(format!(
                "  - hunger: {:.1}/{:.1} ({:.1}%)",
                p.hunger,
                p.max_hunger,
                p.hunger_ratio() * 100.0
            ));
            lines.push(format!(
                "  - position: ({:.1}, {:.1}, {:.1})",
                p.position.x, p.position.y, p.position.z
            ));
            lines.push(format!("  - speed: {:.2}", p.speed()));
            lines.push(format!("  - on ground: {}", if p.on_ground { "yes" } else { "no" }));
        }
        None => lines.push("No state information".to_string()),
    }
    lines.push(String::new());

    // Failures
    let failed: Vec<_> = graph
        .map(|g| g.nodes().iter().filter(|n| n.is_failed()).collect())
        .unwrap_or_default();
    if !failed.is_empty() {
        lines.push("Failure analysis:".to_string());
        for node in &failed {
            lines.push(format!("  - task '{}' failed", node.intent.description));
        }
        lines.push(String::new());
    }

    // Recommendations
    lines.push("Recommendations:".to_string());
    if let Some(p) = snapshot.map(|s| &s.player) {
        if p.health_ratio() < 0.5 {
            lines.push("  - restore health first".to_string());
        }
        if p.hunger_ratio() < 0.3 {
            lines.push("  - find food to restore hunger".to_string());
        }
    }
    if !failed.is_empty() {
        lines.push("  - inspect the failure cause and adjust strategy".to_string());
    }
    lines.push(String::new());

    lines.join("\n")
}
