use std::collections::VecDeque;

use crate::model::MotorAction;

pub const DEFAULT_WINDOW: usize = 5;
pub const DEFAULT_FACTOR: f64 = 0.3;

/// Exponential smoothing of the continuous axes over a short window of raw
/// actions. Flags are passed through untouched.
#[derive(Debug, Clone)]
pub struct ActionSmoother {
    window: usize,
    factor: f64,
    history: VecDeque<MotorAction>,
    last: Option<MotorAction>,
}

impl Default for ActionSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, DEFAULT_FACTOR)
    }
}

fn ema(previous: f64, current: f64, factor: f64) -> f64 {
    previous + factor * (current - previous)
}

fn speed(a: &MotorAction) -> f64 {
    (a.move_forward() * a.move_forward() + a.strafe() * a.strafe()).sqrt()
}

impl ActionSmoother {
    pub fn new(window: usize, factor: f64) -> Self {
        let window = window.max(1);
        Self {
            window,
            factor: factor.clamp(0.0, 1.0),
            history: VecDeque::with_capacity(window + 1),
            last: None,
        }
    }

    pub fn smooth(&mut self, raw: MotorAction) -> MotorAction {
        self.history.push_back(raw);
        if self.history.len() > self.window {
            self.history.pop_front();
        }

        let smoothed = match self.last {
            Some(prev) if self.history.len() >= 2 => MotorAction::new(
                ema(prev.move_forward(), raw.move_forward(), self.factor),
                ema(prev.strafe(), raw.strafe(), self.factor),
                ema(prev.yaw_rate(), raw.yaw_rate(), self.factor),
                ema(prev.pitch_rate(), raw.pitch_rate(), self.factor),
            )
            .with_jump(raw.jump)
            .with_sneak(raw.sneak)
            .with_sprint(raw.sprint)
            .with_attack(raw.attack)
            .with_use_item(raw.use_item),
            _ => raw,
        };

        self.last = Some(smoothed);
        smoothed
    }

    /// Mean |second difference| of the planar speed over the window.
    pub fn jerk(&self) -> f64 {
        if self.history.len() < 3 {
            return 0.0;
        }
        let speeds: Vec<f64> = self.history.iter().map(speed).collect();
        let total: f64 = speeds
            .windows(3)
            .map(|w| ((w[2] - w[1]) - (w[1] - w[0])).abs())
            .sum();
        total / (speeds.len() - 2) as f64
    }

    pub fn smoothness(&self) -> f64 {
        (1.0 - self.jerk()).max(0.0)
    }

    pub fn history(&self) -> impl Iterator<Item = &MotorAction> {
        self.history.iter()
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.last = None;
    }
}
