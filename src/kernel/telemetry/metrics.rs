use std::collections::VecDeque;
use crate::kernel::event::{ControlEvent, EventKind};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventStats {
    pub goal_stats: GoalStats,
    pub skill_stats: SkillEventStats,
    pub action_stats: ActionStats,
    pub safety_stats: SafetyStats,
    pub system_stats: SystemStats,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GoalStats {
    pub goals_set: u64,
    pub plans_generated: u64,
    pub plans_updated: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkillEventStats {
    pub called: u64,
    pub completed: u64,
    pub failed: u64,
    pub completion_ratio: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionStats {
    pub computed: u64,
    pub filtered: u64,
    /// filtered / computed
    pub filtered_ratio: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SafetyStats {
    pub violations: u64,
    pub interventions: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemStats {
    pub initialized: u64,
    pub shutdowns: u64,
    pub errors: u64,
}

/// Pure fold over the recorded window.
pub fn compute_snapshot(events: &VecDeque<ControlEvent>) -> EventStats {
    let mut snap = EventStats::default();

    for event in events {
        match event.kind {
            EventKind::GoalSet => snap.goal_stats.goals_set += 1,
            EventKind::IntentGenerated => snap.goal_stats.plans_generated += 1,
            EventKind::IntentUpdated => snap.goal_stats.plans_updated += 1,
            EventKind::SkillCalled => snap.skill_stats.called += 1,
            EventKind::SkillCompleted => snap.skill_stats.completed += 1,
            EventKind::SkillFailed => snap.skill_stats.failed += 1,
            EventKind::ActionComputed => snap.action_stats.computed += 1,
            EventKind::ActionFiltered => snap.action_stats.filtered += 1,
            EventKind::SafetyViolation => snap.safety_stats.violations += 1,
            EventKind::Intervention => snap.safety_stats.interventions += 1,
            EventKind::SystemInitialized => snap.system_stats.initialized += 1,
            EventKind::SystemShutdown => snap.system_stats.shutdowns += 1,
            EventKind::SystemError => snap.system_stats.errors += 1,
        }
    }

    let finished = snap.skill_stats.completed + snap.skill_stats.failed;
    if finished > 0 {
        snap.skill_stats.completion_ratio = snap.skill_stats.completed as f64 / finished as f64;
    }

    if snap.action_stats.computed > 0 {
        snap.action_stats.filtered_ratio =
            snap.action_stats.filtered as f64 / snap.action_stats.computed as f64;
    }

    snap
}
