use parking_lot::Mutex;
use std::f64::consts::{FRAC_PI_2, PI};
use std::time::{Duration, Instant};

use crate::model::{MotorAction, SafetyViolation, Severity, WorldSnapshot};

use super::{RuleHeader, SafetyRule};

const MIN_DT: Duration = Duration::from_millis(1);

/// Maximum change per second of each continuous axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimits {
    pub yaw_rate: f64,
    pub pitch_rate: f64,
    pub move_forward: f64,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            yaw_rate: PI,
            pitch_rate: FRAC_PI_2,
            move_forward: 0.5,
        }
    }
}

/// Bounds how fast the emitted action may change. Deltas are measured
/// against the last action the shield actually emitted, which the shield
/// feeds back through [`SafetyRule::observe`].
#[derive(Debug)]
pub struct ActionRateLimitRule {
    header: RuleHeader,
    limits: RateLimits,
    last: Mutex<Option<(MotorAction, Instant)>>,
}

impl Default for ActionRateLimitRule {
    fn default() -> Self {
        Self::new()
    }
}

fn clamp_delta(previous: f64, next: f64, max_delta: f64) -> f64 {
    previous + (next - previous).clamp(-max_delta, max_delta)
}

impl ActionRateLimitRule {
    pub fn new() -> Self {
        Self::with_limits(RateLimits::default())
    }

    pub fn with_limits(limits: RateLimits) -> Self {
        Self {
            header: RuleHeader::new(),
            limits,
            last: Mutex::new(None),
        }
    }

    pub fn limits(&self) -> RateLimits {
        self.limits
    }

    /// Previous emitted action and the seconds since it, if a rate can be
    /// measured at `now`.
    fn baseline(&self, now: Instant) -> Option<(MotorAction, f64)> {
        let (previous, at) = (*self.last.lock())?;
        let dt = now.saturating_duration_since(at);
        if dt < MIN_DT {
            return None;
        }
        Some((previous, dt.as_secs_f64()))
    }

    pub fn check_at(&self, action: &MotorAction, now: Instant) -> Option<SafetyViolation> {
        let (previous, dt) = self.baseline(now)?;
        let l = self.limits;

        let yaw = (action.yaw_rate() - previous.yaw_rate()).abs() / dt;
        let pitch = (action.pitch_rate() - previous.pitch_rate()).abs() / dt;
        let forward = (action.move_forward() - previous.move_forward()).abs() / dt;

        let description = if yaw > l.yaw_rate {
            format!("yaw rate changing at {:.2}/s (max {:.2})", yaw, l.yaw_rate)
        } else if pitch > l.pitch_rate {
            format!("pitch rate changing at {:.2}/s (max {:.2})", pitch, l.pitch_rate)
        } else if forward > l.move_forward {
            format!("forward speed changing at {:.2}/s (max {:.2})", forward, l.move_forward)
        } else {
            return None;
        };

        Some(SafetyViolation::new(
            self.id(),
            self.name(),
            self.severity(),
            description,
            "limit the rate of change",
        ))
    }

    pub fn correct_at(&self, action: &MotorAction, now: Instant) -> MotorAction {
        let Some((previous, dt)) = self.baseline(now) else {
            return *action;
        };
        let l = self.limits;
        action
            .with_yaw_rate(clamp_delta(previous.yaw_rate(), action.yaw_rate(), l.yaw_rate * dt))
            .with_pitch_rate(clamp_delta(previous.pitch_rate(), action.pitch_rate(), l.pitch_rate * dt))
            .with_move_forward(clamp_delta(
                previous.move_forward(),
                action.move_forward(),
                l.move_forward * dt,
            ))
    }

    pub fn observe_at(&self, emitted: &MotorAction, now: Instant) {
        *self.last.lock() = Some((*emitted, now));
    }

    pub fn clear(&self) {
        *self.last.lock() = None;
    }
}

impl SafetyRule for ActionRateLimitRule {
    rule_identity!("ActionRateLimit", Severity::Warning);

    fn check(&self, action: &MotorAction, _snapshot: &WorldSnapshot) -> Option<SafetyViolation> {
        self.check_at(action, Instant::now())
    }

    fn correct(&self, action: &MotorAction, _snapshot: &WorldSnapshot) -> MotorAction {
        self.correct_at(action, Instant::now())
    }

    fn observe(&self, emitted: &MotorAction) {
        self.observe_at(emitted, Instant::now())
    }
}
