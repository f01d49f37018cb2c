use crate::model::{Intent, IntentType, Priority, WorldSnapshot};

/// Fixed expansion of a high-level intent into its ordered sub-intents.
/// Every sub-intent carries the parent's id. Types without a recipe expand
/// to the intent itself.
pub fn decompose(intent: &Intent, snapshot: Option<&WorldSnapshot>) -> Vec<Intent> {
    let steps = match intent.kind {
        IntentType::Navigate => navigate(intent),
        IntentType::Mine => mine(intent),
        IntentType::Combat => combat(),
        IntentType::Craft => craft(intent),
        IntentType::Build => build(),
        IntentType::Survive => survive(snapshot),
        _ => Vec::new(),
    };

    if steps.is_empty() {
        return vec![intent.clone()];
    }
    steps.into_iter().map(|s| s.with_parent(intent.id)).collect()
}

fn navigate(intent: &Intent) -> Vec<Intent> {
    let mut plan = Intent::new("plan path", IntentType::Navigate).with_param("action", "pathfind");
    if let Some(target) = intent.param("target") {
        plan = plan.with_param("target", target.clone());
    }
    vec![
        plan,
        Intent::new("execute move", IntentType::Navigate).with_param("action", "move"),
    ]
}

fn mine(intent: &Intent) -> Vec<Intent> {
    let resource = intent.params.text("resource").map(str::to_string);
    let amount = intent.params.i64_or("amount", 1);
    let label = resource.as_deref().unwrap_or("resource");

    let mut locate = Intent::new(format!("locate {label}"), IntentType::Explore);
    let mut dig = Intent::new(format!("mine {amount} {label}"), IntentType::Mine).with_param("amount", amount);
    if let Some(resource) = resource {
        locate = locate.with_param("target", resource.clone());
        dig = dig.with_param("resource", resource);
    }

    vec![
        locate,
        Intent::new("approach target", IntentType::Navigate).with_param("action", "approach"),
        dig,
    ]
}

fn combat() -> Vec<Intent> {
    vec![
        Intent::new("assess threat", IntentType::Combat).with_param("action", "assess"),
        Intent::new("select target", IntentType::Combat).with_param("action", "target"),
        Intent::new("engage", IntentType::Combat).with_param("action", "engage"),
    ]
}

fn craft(intent: &Intent) -> Vec<Intent> {
    let item = intent.params.text("item").map(str::to_string);
    let label = item.as_deref().unwrap_or("item").to_string();

    let mut check = Intent::new("check materials", IntentType::Craft).with_param("action", "check_materials");
    let mut make = Intent::new(format!("craft {label}"), IntentType::Craft).with_param("action", "craft");
    if let Some(item) = item {
        check = check.with_param("item", item.clone());
        make = make.with_param("item", item);
    }

    vec![
        check,
        Intent::new("open crafting", IntentType::Craft).with_param("action", "open_crafting"),
        make,
    ]
}

fn build() -> Vec<Intent> {
    vec![
        Intent::new("select build location", IntentType::Build).with_param("action", "select_location"),
        Intent::new("prepare materials", IntentType::Gather).with_param("action", "prepare_materials"),
        Intent::new("construct", IntentType::Build).with_param("action", "construct"),
    ]
}

fn survive(snapshot: Option<&WorldSnapshot>) -> Vec<Intent> {
    let Some(player) = snapshot.map(|s| &s.player) else {
        return Vec::new();
    };

    let mut steps = Vec::new();
    if player.health_ratio() < 0.5 {
        steps.push(
            Intent::new("restore health", IntentType::Survive)
                .with_param("action", "heal")
                .with_priority(Priority::High),
        );
    }
    if player.hunger_ratio() < 0.3 {
        steps.push(
            Intent::new("find food", IntentType::Gather)
                .with_param("action", "find_food")
                .with_priority(Priority::High),
        );
    }
    steps
}
