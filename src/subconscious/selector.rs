use std::cmp::Reverse;

use crate::model::{names, SkillCall, WorldSnapshot};

use super::history::SkillExecutionHistory;

const SURVIVAL_SKILLS: [&str; 3] = [names::ESCAPE, names::HEAL, names::NAVIGATE_TO];

/// Interrupt always runs. Below 20% health only survival skills do.
pub fn can_execute(call: &SkillCall, snapshot: Option<&WorldSnapshot>) -> bool {
    if call.priority.is_interrupt() {
        return true;
    }
    match snapshot {
        Some(s) if s.player.health_ratio() < 0.2 => SURVIVAL_SKILLS.contains(&call.skill_name.as_str()),
        _ => true,
    }
}

/// Priority first, then historical success rate; ties keep input order.
/// Falls back to the top candidate when nothing qualifies, so the result is
/// `None` only for empty input.
pub fn select_next(
    snapshot: Option<&WorldSnapshot>,
    pending: &[SkillCall],
    history: &SkillExecutionHistory,
) -> Option<SkillCall> {
    let mut ranked: Vec<&SkillCall> = pending.iter().collect();
    ranked.sort_by_key(|c| (Reverse(c.priority), Reverse(history.success_rate(&c.skill_name))));

    ranked
        .iter()
        .find(|c| can_execute(c, snapshot))
        .or_else(|| ranked.first())
        .map(|c| (*c).clone())
}
