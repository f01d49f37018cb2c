//! Cerebellum layer: skill call + snapshot -> motor action.
//!
//! # OUTPUT INVARIANT
//! Every action leaving [`CerebellumLayer::compute_action`] has been clamped
//! to the layer's [`ActionSpace`] before smoothing. Smoothing is a convex
//! blend of clamped values, so it never leaves the space either.

pub mod action_space;
pub mod context;
pub mod pid;
pub mod reward;
pub mod smoother;

use std::time::Instant;
use tracing::debug;
use uuid::Uuid;

use crate::kernel::config::ControlConfig;
use crate::kernel::error::Result;
use crate::kernel::lifecycle::{LayerKind, Lifecycle, LifecycleState};
use crate::model::{ControlMetrics, MotorAction, SkillCall, WorldSnapshot};

use self::action_space::ActionSpace;
use self::context::{ControlMode, SkillContext};
use self::pid::PidController;
use self::reward::{path_deviation, ControlQualityReward};
use self::smoother::ActionSmoother;

pub trait CerebellumLayer: Lifecycle + Send {
    /// Idle when there is no snapshot.
    fn compute_action(&mut self, call: &SkillCall, snapshot: Option<&WorldSnapshot>) -> MotorAction;

    fn compute_sequence(
        &mut self,
        call: &SkillCall,
        snapshot: Option<&WorldSnapshot>,
        horizon: usize,
    ) -> Vec<MotorAction> {
        (0..horizon).map(|_| self.compute_action(call, snapshot)).collect()
    }

    fn update_from_feedback(
        &mut self,
        before: Option<&WorldSnapshot>,
        action: &MotorAction,
        after: Option<&WorldSnapshot>,
        reward: f64,
    );

    fn metrics(&self) -> ControlMetrics;

    fn reset(&mut self);

    fn is_converged(&self) -> bool;
}

const NAME: &str = "SimpleCerebellumLayer";
const FEEDBACK_LOG_INTERVAL: u64 = 100;

/// PID + EMA motor controller.
#[derive(Debug)]
pub struct SimpleCerebellumLayer {
    lifecycle: LifecycleState,
    action_space: ActionSpace,
    pid: PidController,
    smoother: ActionSmoother,
    reward: ControlQualityReward,
    metrics: ControlMetrics,
    /// Path deviation above this, while moving, counts as a collision.
    collision_threshold: f64,
    /// Alignment tolerance for calls that carry no `tolerance` param.
    aim_tolerance: f64,
    converged: bool,
    active_call: Option<Uuid>,
    call_started_at: Option<Instant>,
    cumulative_reward: f64,
    steps: u64,
    feedback_steps: u64,
}

impl Default for SimpleCerebellumLayer {
    fn default() -> Self {
        Self::new(ActionSpace::default())
    }
}

fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

impl SimpleCerebellumLayer {
    pub fn new(action_space: ActionSpace) -> Self {
        Self::build(action_space, &ControlConfig::default())
    }

    /// Default action space, thresholds from `config`.
    pub fn from_config(config: &ControlConfig) -> Self {
        Self::build(ActionSpace::default(), config)
    }

    fn build(action_space: ActionSpace, config: &ControlConfig) -> Self {
        Self {
            lifecycle: LifecycleState::new(),
            action_space,
            pid: PidController::default(),
            smoother: ActionSmoother::default(),
            reward: ControlQualityReward::default(),
            metrics: ControlMetrics::default(),
            collision_threshold: config.collision_threshold,
            aim_tolerance: config.aim_error_threshold,
            converged: false,
            active_call: None,
            call_started_at: None,
            cumulative_reward: 0.0,
            steps: 0,
            feedback_steps: 0,
        }
    }

    pub fn action_space(&self) -> &ActionSpace {
        &self.action_space
    }

    pub fn cumulative_reward(&self) -> f64 {
        self.cumulative_reward
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Control-quality reward from the latest feedback step.
    pub fn last_reward(&self) -> f64 {
        self.metrics.reward
    }

    pub fn reward_mut(&mut self) -> &mut ControlQualityReward {
        &mut self.reward
    }

    fn raw_action(&mut self, ctx: &SkillContext, snapshot: &WorldSnapshot) -> MotorAction {
        let player = &snapshot.player;
        match ctx.mode {
            ControlMode::Navigation => {
                let yaw_rate = self.pid.yaw_rate(ctx.yaw_error(player));
                let distance = ctx.distance_to_target(player).unwrap_or(0.0);
                let mut forward = if distance > 1.0 {
                    ctx.speed
                } else {
                    distance * ctx.speed
                };
                if ctx.cautious {
                    forward *= 0.5;
                }
                MotorAction::new(forward, 0.0, yaw_rate, 0.0).with_sprint(forward > 0.8 && !ctx.cautious)
            }
            ControlMode::Alignment => self.align(ctx, snapshot),
            ControlMode::Mining => self.align(ctx, snapshot).with_attack(true),
            ControlMode::Combat => {
                let aligned = self.align(ctx, snapshot);
                let strafe = match ctx.distance_to_target(player) {
                    Some(d) if d < ctx.stand_off - 0.5 => -0.5,
                    Some(d) if d > ctx.stand_off + 0.5 => 0.5,
                    _ => 0.0,
                };
                aligned.with_strafe(strafe).with_attack(true)
            }
            ControlMode::Escape => {
                let yaw_rate = -sign(player.yaw) * self.action_space.yaw_rate_max() * 0.5;
                MotorAction::new(ctx.speed, 0.0, yaw_rate, 0.0).with_sprint(true)
            }
            ControlMode::Idle => MotorAction::idle(),
        }
    }

    fn align(&mut self, ctx: &SkillContext, snapshot: &WorldSnapshot) -> MotorAction {
        let yaw_error = ctx.yaw_error(&snapshot.player);
        let pitch_error = ctx.pitch_error(&snapshot.player);
        let yaw_rate = self.pid.yaw_rate(yaw_error);
        let pitch_rate = self.pid.pitch_rate(pitch_error);

        let limit = ctx.tolerance * 180.0;
        let converged = yaw_error.abs() < limit && pitch_error.abs() < limit;
        if converged && !self.converged {
            if let Some(started) = self.call_started_at {
                self.metrics.time_to_converge = started.elapsed();
            }
        }
        self.converged = converged;

        MotorAction::new(0.0, 0.0, yaw_rate, pitch_rate)
    }

    fn update_metrics(&mut self, ctx: &SkillContext, snapshot: &WorldSnapshot) {
        let aim_error = match ctx.mode {
            ControlMode::Escape | ControlMode::Idle => 0.0,
            ControlMode::Navigation => ctx.yaw_error(&snapshot.player).abs() / 180.0,
            _ => ctx
                .yaw_error(&snapshot.player)
                .hypot(ctx.pitch_error(&snapshot.player))
                / 180.0,
        };

        self.metrics.aim_error = aim_error;
        self.metrics.stability = (1.0 - aim_error).max(0.0);
        self.metrics.jerk = self.smoother.jerk();
        self.metrics.smoothness = self.smoother.smoothness();
    }

    fn track_call(&mut self, call: &SkillCall) {
        if self.active_call != Some(call.id) {
            self.active_call = Some(call.id);
            self.call_started_at = Some(Instant::now());
            self.converged = false;
        }
    }
}

impl Lifecycle for SimpleCerebellumLayer {
    fn name(&self) -> &str {
        NAME
    }

    fn layer(&self) -> LayerKind {
        LayerKind::Cerebellum
    }

    fn initialize(&mut self) -> Result<()> {
        self.lifecycle.initialize(NAME, || {
            self.pid.reset();
            self.smoother.reset();
            self.cumulative_reward = 0.0;
            self.steps = 0;
            Ok(())
        })
    }

    fn shutdown(&mut self) -> Result<()> {
        let outcome = self.lifecycle.shutdown(NAME, || Ok(()));
        self.reset();
        outcome
    }

    fn is_initialized(&self) -> bool {
        self.lifecycle.is_initialized()
    }

    fn is_healthy(&self) -> bool {
        self.lifecycle.is_healthy()
    }
}

impl CerebellumLayer for SimpleCerebellumLayer {
    fn compute_action(&mut self, call: &SkillCall, snapshot: Option<&WorldSnapshot>) -> MotorAction {
        let Some(snapshot) = snapshot else {
            return MotorAction::idle();
        };
        self.track_call(call);

        // 1. Context
        let mut ctx = SkillContext::from_call(call, snapshot);
        if !call.params.contains("tolerance") {
            ctx.tolerance = self.aim_tolerance;
        }

        // 2. Raw control law
        let raw = self.raw_action(&ctx, snapshot);

        // 3. Constrain, then smooth
        let constrained = self.action_space.clamp(&raw);
        let smoothed = self.smoother.smooth(constrained);

        // 4. Metrics
        self.update_metrics(&ctx, snapshot);
        self.steps += 1;

        smoothed
    }

    fn update_from_feedback(
        &mut self,
        before: Option<&WorldSnapshot>,
        action: &MotorAction,
        after: Option<&WorldSnapshot>,
        reward: f64,
    ) {
        self.cumulative_reward += reward;
        self.feedback_steps += 1;

        let (stuck, collision) = match (before, after) {
            (Some(b), Some(a)) if action.is_moving() => (
                b.player.position.manhattan_to(a.player.position) < 0.01,
                b.player.speed() > 0.01 && path_deviation(b, a) > self.collision_threshold,
            ),
            _ => (false, false),
        };
        if collision {
            self.metrics.collision_count += 1;
            debug!("Collision suspected: path deviation above {:.2}", self.collision_threshold);
        }
        self.metrics.reward = self
            .reward
            .compute(before, after, self.metrics.aim_error, collision, stuck);
        self.metrics.path_deviation = self.reward.last_path_deviation();
        self.metrics.stuck_time = self.reward.stuck_duration();

        if self.feedback_steps % FEEDBACK_LOG_INTERVAL == 0 {
            debug!(
                "Cumulative reward after {} feedback steps: {:.3}",
                self.feedback_steps, self.cumulative_reward
            );
        }
    }

    fn metrics(&self) -> ControlMetrics {
        self.metrics
    }

    fn reset(&mut self) {
        self.pid.reset();
        self.smoother.reset();
        self.reward.reset();
        self.metrics = ControlMetrics::default();
        self.converged = false;
        self.active_call = None;
        self.call_started_at = None;
        self.cumulative_reward = 0.0;
        self.steps = 0;
        self.feedback_steps = 0;
    }

    fn is_converged(&self) -> bool {
        self.converged
    }
}
