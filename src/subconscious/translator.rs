//! Intent -> skill call. Exactly one call per intent.

use crate::model::{names, Intent, IntentType, ParamValue, SkillCall, SkillPriority, WorldSnapshot};

fn param_or(intent: &Intent, key: &str, default: impl Into<ParamValue>) -> ParamValue {
    intent.param(key).cloned().unwrap_or_else(|| default.into())
}

fn call(intent: &Intent, skill: &str) -> SkillCall {
    SkillCall::new(skill).for_intent(intent.id)
}

pub fn translate(intent: &Intent, snapshot: Option<&WorldSnapshot>) -> Vec<SkillCall> {
    let action = intent.params.text("action");

    let skill = match intent.kind {
        IntentType::Navigate => {
            let base = call(intent, names::NAVIGATE_TO).with_param("target", param_or(intent, "target", "destination"));
            if action == Some("pathfind") {
                base.with_param("speed", 1.0).with_param("cautious", false)
            } else {
                base.with_param("speed", param_or(intent, "speed", 1.0))
                    .with_param("cautious", param_or(intent, "cautious", false))
            }
        }

        IntentType::Mine => call(intent, names::MINE)
            .with_param("resource", param_or(intent, "resource", "stone"))
            .with_param("amount", param_or(intent, "amount", 1)),

        IntentType::Combat if action == Some("engage") => call(intent, names::COMBAT_KITE)
            .with_param("target", param_or(intent, "target", "enemy"))
            .with_param("distance", param_or(intent, "distance", 3.5))
            .with_priority(SkillPriority::High),

        IntentType::Combat => call(intent, names::ALIGN_CROSSHAIR)
            .with_param("target", param_or(intent, "target", "enemy"))
            .with_param("tolerance", param_or(intent, "tolerance", 0.05))
            .with_priority(SkillPriority::High),

        IntentType::Craft => call(intent, names::CRAFT).with_param("item", param_or(intent, "item", "unknown")),

        IntentType::Build if action == Some("construct") => {
            call(intent, names::PLACE_TORCH).with_param("interval", 7)
        }

        IntentType::Build => call(intent, names::BUILD).with_param("structure", param_or(intent, "structure", "basic")),

        IntentType::Survive => survive(intent, action, snapshot),

        IntentType::Explore => call(intent, names::NAVIGATE_TO)
            .with_param("target", param_or(intent, "target", "unexplored"))
            .with_param("speed", 0.8)
            .with_param("cautious", true)
            .with_priority(SkillPriority::Low),

        IntentType::Gather => {
            let resource = intent
                .param("target")
                .or_else(|| intent.param("resource"))
                .cloned()
                .unwrap_or_else(|| "food".into());
            call(intent, names::MINE)
                .with_param("resource", resource)
                .with_param("amount", param_or(intent, "amount", 1))
        }

        IntentType::Social | IntentType::Generic => acknowledge(intent),
    };

    vec![skill]
}

fn survive(intent: &Intent, action: Option<&str>, snapshot: Option<&WorldSnapshot>) -> SkillCall {
    match action {
        Some("heal") => call(intent, names::HEAL)
            .with_param("method", "food")
            .with_priority(SkillPriority::Critical),
        Some("escape") => call(intent, names::ESCAPE)
            .with_param("threat", param_or(intent, "threat", "danger"))
            .with_param("minDistance", 10.0)
            .with_priority(SkillPriority::Interrupt),
        _ => match snapshot {
            Some(s) if s.player.health_ratio() < 0.3 => call(intent, names::ESCAPE)
                .with_param("threat", "low_health")
                .with_priority(SkillPriority::Interrupt),
            _ => acknowledge(intent),
        },
    }
}

fn acknowledge(intent: &Intent) -> SkillCall {
    call(intent, names::GENERIC_ACTION)
        .with_param("action", "acknowledge")
        .with_param("description", intent.description.clone())
}
