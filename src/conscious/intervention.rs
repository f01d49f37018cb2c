use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

use crate::kernel::config::ControlConfig;
use crate::model::{IntentGraph, Vec3, WorldSnapshot};

/// Stateful "should the planner step in" check.
///
/// Three triggers: low health, no progress for too long, and a streak of
/// failed nodes. The stuck and failure triggers fire once and then re-arm.
#[derive(Debug)]
pub struct InterventionDecider {
    health_threshold: f64,
    stuck_time_threshold: Duration,
    position_variance_threshold: f64,
    failure_threshold: u32,

    consecutive_failures: u32,
    seen_graph: Option<Uuid>,
    seen_failed: HashSet<String>,
    last_progress_at: Instant,
    last_position: Option<Vec3>,
}

impl Default for InterventionDecider {
    fn default() -> Self {
        Self::new(&ControlConfig::default())
    }
}

impl InterventionDecider {
    pub fn new(config: &ControlConfig) -> Self {
        Self {
            health_threshold: 0.3,
            stuck_time_threshold: config.stuck_time_threshold(),
            position_variance_threshold: config.position_variance_threshold,
            failure_threshold: 3,
            consecutive_failures: 0,
            seen_graph: None,
            seen_failed: HashSet::new(),
            last_progress_at: Instant::now(),
            last_position: None,
        }
    }

    pub fn set_health_threshold(&mut self, threshold: f64) {
        self.health_threshold = threshold;
    }

    pub fn set_stuck_time_threshold(&mut self, threshold: Duration) {
        self.stuck_time_threshold = threshold;
    }

    pub fn set_failure_threshold(&mut self, threshold: u32) {
        self.failure_threshold = threshold.max(1);
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn should_intervene(&mut self, snapshot: Option<&WorldSnapshot>, graph: Option<&IntentGraph>) -> bool {
        self.should_intervene_at(snapshot, graph, Instant::now())
    }

    /// Same as [`Self::should_intervene`] against an explicit clock.
    pub fn should_intervene_at(
        &mut self,
        snapshot: Option<&WorldSnapshot>,
        graph: Option<&IntentGraph>,
        now: Instant,
    ) -> bool {
        let Some(snapshot) = snapshot else {
            return false;
        };
        let player = &snapshot.player;

        // 1. Health emergency
        if player.health_ratio() < self.health_threshold {
            debug!("Intervention: health ratio {:.2}", player.health_ratio());
            return true;
        }

        // 2. Stuck
        if self.check_stuck(player.position, now) {
            debug!("Intervention: no progress for {:?}", self.stuck_time_threshold);
            self.last_progress_at = now;
            return true;
        }

        // 3. Failure streak
        if let Some(graph) = graph {
            if self.check_failures(graph) {
                debug!("Intervention: {} consecutive failed nodes", self.consecutive_failures);
                self.consecutive_failures = 0;
                return true;
            }
        }

        false
    }

    fn check_stuck(&mut self, position: Vec3, now: Instant) -> bool {
        let Some(last) = self.last_position else {
            self.last_position = Some(position);
            self.last_progress_at = now;
            return false;
        };

        if position.manhattan_to(last) > self.position_variance_threshold {
            self.last_position = Some(position);
            self.last_progress_at = now;
            return false;
        }

        now.saturating_duration_since(self.last_progress_at) > self.stuck_time_threshold
    }

    /// A node counts once per graph. A Running node breaks the streak.
    fn check_failures(&mut self, graph: &IntentGraph) -> bool {
        if self.seen_graph != Some(graph.id) {
            self.seen_graph = Some(graph.id);
            self.seen_failed.clear();
        }

        for node in graph.nodes() {
            if node.is_failed() {
                if self.seen_failed.insert(node.id.clone()) {
                    self.consecutive_failures += 1;
                    if self.consecutive_failures >= self.failure_threshold {
                        return true;
                    }
                }
            } else if node.is_active() {
                self.consecutive_failures = 0;
            }
        }
        false
    }

    pub fn reset(&mut self) {
        self.consecutive_failures = 0;
        self.seen_graph = None;
        self.seen_failed.clear();
        self.last_progress_at = Instant::now();
        self.last_position = None;
    }
}
