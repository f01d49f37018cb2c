use std::time::{Duration, Instant};

use crate::model::WorldSnapshot;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardWeights {
    pub aim_error: f64,
    pub path_deviation: f64,
    pub jerk: f64,
    pub collision: f64,
    pub stuck_time: f64,
}

impl Default for RewardWeights {
    fn default() -> Self {
        Self {
            aim_error: 1.0,
            path_deviation: 0.5,
            jerk: 0.3,
            collision: 2.0,
            stuck_time: 1.0,
        }
    }
}

/// Monitoring-only shaping signal. Never feeds back into the controller
/// gains.
#[derive(Debug, Clone, Default)]
pub struct ControlQualityReward {
    weights: RewardWeights,
    stuck_since: Option<Instant>,
    last_path_deviation: f64,
}

/// Horizontal distance between where the previous velocity said we would be
/// and where we are.
pub fn path_deviation(previous: &WorldSnapshot, current: &WorldSnapshot) -> f64 {
    let prev = &previous.player;
    let predicted_x = prev.position.x + prev.velocity.x;
    let predicted_z = prev.position.z + prev.velocity.z;
    current.player.position.horizontal_distance_to(predicted_x, predicted_z)
}

/// Change of view direction, normalised so a half turn is 1.0.
pub fn view_jerk(previous: &WorldSnapshot, current: &WorldSnapshot) -> f64 {
    let yaw = (current.player.yaw - previous.player.yaw).abs() % 360.0;
    let yaw = yaw.min(360.0 - yaw);
    let pitch = (current.player.pitch - previous.player.pitch).abs();
    (yaw + pitch) / 180.0
}

impl ControlQualityReward {
    pub fn new(weights: RewardWeights) -> Self {
        Self {
            weights,
            ..Self::default()
        }
    }

    pub fn weights(&self) -> RewardWeights {
        self.weights
    }

    pub fn set_weights(&mut self, weights: RewardWeights) {
        self.weights = weights;
    }

    pub fn compute(
        &mut self,
        previous: Option<&WorldSnapshot>,
        current: Option<&WorldSnapshot>,
        aim_error: f64,
        collision: bool,
        stuck: bool,
    ) -> f64 {
        self.compute_at(previous, current, aim_error, collision, stuck, Instant::now())
    }

    pub fn compute_at(
        &mut self,
        previous: Option<&WorldSnapshot>,
        current: Option<&WorldSnapshot>,
        aim_error: f64,
        collision: bool,
        stuck: bool,
        now: Instant,
    ) -> f64 {
        let w = self.weights;
        let mut reward = -w.aim_error * aim_error;

        if let (Some(prev), Some(curr)) = (previous, current) {
            self.last_path_deviation = path_deviation(prev, curr);
            reward -= w.path_deviation * self.last_path_deviation;
            reward -= w.jerk * view_jerk(prev, curr);
        }

        if collision {
            reward -= w.collision;
        }

        if stuck {
            let since = *self.stuck_since.get_or_insert(now);
            reward -= w.stuck_time * now.saturating_duration_since(since).as_secs_f64();
        } else {
            self.stuck_since = None;
        }

        reward
    }

    pub fn stuck_duration(&self) -> Duration {
        self.stuck_since.map(|s| s.elapsed()).unwrap_or(Duration::ZERO)
    }

    pub fn last_path_deviation(&self) -> f64 {
        self.last_path_deviation
    }

    pub fn reset(&mut self) {
        self.stuck_since = None;
        self.last_path_deviation = 0.0;
    }
}
