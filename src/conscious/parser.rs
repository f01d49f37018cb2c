//! Goal text -> root [`Intent`].
//!
//! Fixed keyword tables, no learning. Chinese keywords match as substrings;
//! ASCII keywords match whole tokens so that "explore" never reads as "ore".

use crate::model::{Intent, IntentType, Params, Priority, WorldSnapshot};

/// Checked in this order; the first table with a hit wins.
const TYPE_KEYWORDS: &[(IntentType, &[&str])] = &[
    (
        IntentType::Navigate,
        &[
            "去", "移动", "导航", "go", "goto", "going", "move", "moving", "navigate", "navigating", "walk",
            "walking", "travel", "traveling", "travelling",
        ],
    ),
    (
        IntentType::Mine,
        &[
            "挖", "采集", "矿", "mine", "mining", "dig", "digging", "collect", "collecting", "harvest",
            "harvesting",
        ],
    ),
    (
        IntentType::Combat,
        &["战斗", "攻击", "杀", "fight", "fighting", "attack", "attacking", "kill", "killing", "combat"],
    ),
    (IntentType::Craft, &["合成", "制作", "craft", "crafting", "make", "making"]),
    (
        IntentType::Build,
        &["建造", "放置", "build", "building", "place", "placing", "construct", "constructing"],
    ),
    (
        IntentType::Survive,
        &["生存", "恢复", "补血", "survive", "surviving", "heal", "healing", "recover", "recovering"],
    ),
    (
        IntentType::Explore,
        &["探索", "寻找", "explore", "exploring", "find", "finding", "search", "searching"],
    ),
];

const URGENT_KEYWORDS: &[&str] = &["紧急", "立即", "urgent", "immediately", "asap"];
const IMPORTANT_KEYWORDS: &[&str] = &["重要", "important"];

const KNOWN_RESOURCES: &[&str] = &[
    "stone",
    "cobblestone",
    "coal",
    "iron",
    "gold",
    "diamond",
    "emerald",
    "redstone",
    "wood",
    "sand",
    "dirt",
    "food",
];

const CHINESE_RESOURCES: &[(&str, &str)] = &[
    ("钻石", "diamond_ore"),
    ("铁", "iron_ore"),
    ("煤", "coal_ore"),
    ("金", "gold_ore"),
    ("石头", "stone"),
    ("木头", "oak_log"),
];

/// Lowercased ASCII tokens. Anything that is not alphanumeric or `_`
/// separates tokens, so "挖掘12个iron_ore" yields `["12", "iron_ore"]`.
fn tokens(goal: &str) -> Vec<String> {
    goal.to_lowercase()
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn matches_any(lower: &str, tokens: &[String], keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| {
        if kw.is_ascii() {
            tokens.iter().any(|t| t == kw)
        } else {
            lower.contains(kw)
        }
    })
}

pub fn infer_type(goal: &str) -> IntentType {
    let lower = goal.to_lowercase();
    let tokens = tokens(goal);
    TYPE_KEYWORDS
        .iter()
        .find(|(_, keywords)| matches_any(&lower, &tokens, keywords))
        .map(|(kind, _)| *kind)
        .unwrap_or(IntentType::Generic)
}

pub fn infer_priority(goal: &str, snapshot: Option<&WorldSnapshot>) -> Priority {
    let lower = goal.to_lowercase();
    let tokens = tokens(goal);

    if matches_any(&lower, &tokens, URGENT_KEYWORDS) {
        return Priority::Critical;
    }
    if matches_any(&lower, &tokens, IMPORTANT_KEYWORDS) {
        return Priority::High;
    }
    match snapshot {
        Some(s) if s.player.health_ratio() < 0.3 => Priority::Critical,
        _ => Priority::Normal,
    }
}

fn is_resource(token: &str) -> bool {
    token.ends_with("_ore") || token.ends_with("_log") || KNOWN_RESOURCES.contains(&token)
}

/// `amount` from the first integer token, `resource` from the first
/// resource-looking token.
pub fn extract_params(goal: &str) -> Params {
    let mut params = Params::new();
    let tokens = tokens(goal);

    if let Some(amount) = tokens.iter().find_map(|t| t.parse::<i64>().ok()) {
        params.insert("amount", amount);
    }

    let resource = tokens
        .iter()
        .find(|t| is_resource(t))
        .cloned()
        .or_else(|| {
            CHINESE_RESOURCES
                .iter()
                .find(|(word, _)| goal.contains(word))
                .map(|(_, id)| id.to_string())
        });
    if let Some(resource) = resource {
        params.insert("resource", resource);
    }

    params
}

pub fn parse_goal(goal: &str, snapshot: Option<&WorldSnapshot>) -> Intent {
    Intent::new(goal, infer_type(goal))
        .with_priority(infer_priority(goal, snapshot))
        .with_params(extract_params(goal))
}
