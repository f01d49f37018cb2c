use std::collections::HashMap;
use tracing::debug;

use crate::model::{names, ParamValue, SkillCall, SkillResult, SkillResultStatus, WorldSnapshot};

pub const MAX_RETRIES: u32 = 3;

/// Per-skill consecutive failure counts and the recovery policy built on them.
#[derive(Debug, Default)]
pub struct FailureRecoveryHandler {
    failure_counts: HashMap<String, u32>,
}

impl FailureRecoveryHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter first, then policy:
    /// 1. at [`MAX_RETRIES`] failures, substitute an alternative skill (or give up)
    /// 2. Timeout: retry with slower speed and a wider distance
    /// 3. Blocked: escape or detour
    /// 4. anything else: retry the same call as a new attempt
    pub fn handle_failure(
        &mut self,
        call: &SkillCall,
        result: &SkillResult,
        snapshot: Option<&WorldSnapshot>,
    ) -> Option<SkillCall> {
        let failures = {
            let count = self.failure_counts.entry(call.skill_name.clone()).or_insert(0);
            *count += 1;
            *count
        };

        if failures >= MAX_RETRIES {
            debug!("{} failed {} times, looking for an alternative", call.skill_name, failures);
            return alternative(call);
        }

        match result.status {
            SkillResultStatus::Timeout => Some(adjusted_retry(call)),
            SkillResultStatus::Blocked => Some(fallback(call, snapshot)),
            _ => Some(call.retry()),
        }
    }

    pub fn reset(&mut self, skill_name: &str) {
        self.failure_counts.remove(skill_name);
    }

    pub fn reset_all(&mut self) {
        self.failure_counts.clear();
    }

    pub fn failure_count(&self, skill_name: &str) -> u32 {
        self.failure_counts.get(skill_name).copied().unwrap_or(0)
    }
}

/// New call that keeps the failed call's priority and originating intent.
fn derived(call: &SkillCall, skill: &str) -> SkillCall {
    let next = SkillCall::new(skill).with_priority(call.priority);
    match call.intent_id {
        Some(id) => next.for_intent(id),
        None => next,
    }
}

fn alternative(call: &SkillCall) -> Option<SkillCall> {
    match call.skill_name.as_str() {
        names::NAVIGATE_TO => {
            let mut next = derived(call, names::NAVIGATE_TO)
                .with_param("speed", 0.5)
                .with_param("cautious", true);
            if let Some(target) = call.params.get("target") {
                next = next.with_param("target", target.clone());
            }
            Some(next)
        }
        names::MINE => Some(derived(call, names::NAVIGATE_TO).with_param("target", "alternative_location")),
        names::COMBAT_KITE => Some(
            derived(call, names::ESCAPE)
                .with_param("threat", "enemy")
                .with_param("minDistance", 15.0),
        ),
        _ => None,
    }
}

fn adjusted_retry(call: &SkillCall) -> SkillCall {
    let mut params = call.params.clone();
    if let Some(speed) = params.get("speed").and_then(ParamValue::as_f64) {
        params.insert("speed", speed * 0.8);
    }
    if let Some(distance) = params.get("distance").and_then(ParamValue::as_f64) {
        params.insert("distance", distance * 1.2);
    }
    params.insert("retry", true);
    call.retry().with_params(params)
}

fn fallback(call: &SkillCall, snapshot: Option<&WorldSnapshot>) -> SkillCall {
    match snapshot {
        Some(s) if s.player.health_ratio() < 0.5 => derived(call, names::ESCAPE).with_param("threat", "blocked"),
        _ => derived(call, names::NAVIGATE_TO)
            .with_param("target", "safe_location")
            .with_param("cautious", true),
    }
}
