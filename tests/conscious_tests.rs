use csch::conscious::decomposer::decompose;
use csch::conscious::intervention::InterventionDecider;
use csch::conscious::parser::{extract_params, infer_priority, infer_type, parse_goal};
use csch::conscious::reflection::reflect;
use csch::conscious::{reflection_metrics, ConsciousLayer, SimpleConsciousLayer};
use csch::kernel::error::ErrorKind;
use csch::kernel::lifecycle::Lifecycle;
use csch::model::{
    names, EdgeType, Intent, IntentEdge, IntentGraph, IntentNode, IntentType, NodeStatus, PlayerState, Priority,
    WorldSnapshot,
};
use csch::subconscious::translator::translate;
use csch::ControlConfig;
use std::time::{Duration, Instant};

fn nominal() -> WorldSnapshot {
    WorldSnapshot::new(PlayerState::at(0.0, 64.0, 0.0))
}

fn hurt(health: f64) -> WorldSnapshot {
    WorldSnapshot::new(PlayerState::at(0.0, 64.0, 0.0).with_health(health))
}

fn ready_layer() -> SimpleConsciousLayer {
    let mut layer = SimpleConsciousLayer::new(&ControlConfig::default());
    layer.initialize().unwrap();
    layer
}

fn flat_graph(children: usize) -> IntentGraph {
    let root = Intent::new("root", IntentType::Generic);
    let mut nodes = vec![IntentNode::new("root", root.clone())];
    let mut edges = Vec::new();
    for i in 0..children {
        let id = format!("c{i}");
        nodes.push(IntentNode::new(id.clone(), Intent::new(format!("child {i}"), IntentType::Generic)));
        edges.push(IntentEdge::new("root", id, EdgeType::Sequence));
    }
    IntentGraph::new(root, nodes, edges).unwrap()
}

#[test]
fn test_infer_type_keywords() {
    assert_eq!(infer_type("mine 12 iron_ore"), IntentType::Mine);
    assert_eq!(infer_type("挖掘12个iron_ore"), IntentType::Mine);
    assert_eq!(infer_type("go to the village"), IntentType::Navigate);
    assert_eq!(infer_type("attack the zombie"), IntentType::Combat);
    assert_eq!(infer_type("craft a pickaxe"), IntentType::Craft);
    assert_eq!(infer_type("build a house"), IntentType::Build);
    assert_eq!(infer_type("heal up"), IntentType::Survive);
    assert_eq!(infer_type("explore the cave"), IntentType::Explore, "'explore' must not read as 'ore'");
    assert_eq!(infer_type("hello there"), IntentType::Generic);
}

#[test]
fn test_infer_type_inflected_keywords() {
    assert_eq!(infer_type("mining 5 coal"), IntentType::Mine);
    assert_eq!(infer_type("crafting a table"), IntentType::Craft);
    assert_eq!(infer_type("exploring the ravine"), IntentType::Explore);
    assert_eq!(infer_type("fighting the skeleton"), IntentType::Combat);
    assert_eq!(infer_type("walking home"), IntentType::Navigate);
    assert_eq!(infer_type("goings on"), IntentType::Generic, "still whole tokens only");
}

#[test]
fn test_infer_priority() {
    assert_eq!(infer_priority("urgent: mine coal", None), Priority::Critical);
    assert_eq!(infer_priority("立即撤退", None), Priority::Critical);
    assert_eq!(infer_priority("important: build wall", None), Priority::High);
    assert_eq!(infer_priority("mine coal", Some(&nominal())), Priority::Normal);
    assert_eq!(
        infer_priority("mine coal", Some(&hurt(4.0))),
        Priority::Critical,
        "low health escalates priority"
    );
}

#[test]
fn test_extract_params() {
    let params = extract_params("mine 12 iron_ore");
    assert_eq!(params.i64_or("amount", 0), 12);
    assert_eq!(params.text("resource"), Some("iron_ore"));

    let zh = extract_params("挖掘5个钻石");
    assert_eq!(zh.i64_or("amount", 0), 5);
    assert_eq!(zh.text("resource"), Some("diamond_ore"));

    assert!(extract_params("wander around").is_empty());
}

#[test]
fn test_parse_goal_builds_root_intent() {
    let intent = parse_goal("mine 12 iron_ore", Some(&nominal()));
    assert_eq!(intent.description, "mine 12 iron_ore");
    assert_eq!(intent.kind, IntentType::Mine);
    assert_eq!(intent.priority, Priority::Normal);
    assert!(intent.parent_id.is_none());
}

#[test]
fn test_decompose_mine() {
    let root = parse_goal("mine 12 iron_ore", None);
    let steps = decompose(&root, None);

    assert_eq!(steps.len(), 3);
    assert_eq!(steps[0].kind, IntentType::Explore);
    assert_eq!(steps[0].params.text("target"), Some("iron_ore"));
    assert_eq!(steps[1].kind, IntentType::Navigate);
    assert_eq!(steps[2].kind, IntentType::Mine);
    assert_eq!(steps[2].params.i64_or("amount", 0), 12);
    assert!(steps.iter().all(|s| s.parent_id == Some(root.id)), "children point at root");
}

#[test]
fn test_decompose_survive_is_conditional() {
    let root = Intent::new("survive", IntentType::Survive);

    let healthy = decompose(&root, Some(&nominal()));
    assert_eq!(healthy.len(), 1, "nothing to do: falls back to the intent itself");
    assert_eq!(healthy[0].id, root.id);

    let starving = WorldSnapshot::new(PlayerState::default().with_health(8.0).with_hunger(4.0));
    let steps = decompose(&root, Some(&starving));
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0].params.text("action"), Some("heal"));
    assert_eq!(steps[1].params.text("action"), Some("find_food"));
}

#[test]
fn test_generate_mine_goal_translates_to_mine() {
    for goal in ["mine 12 iron_ore", "挖掘12个iron_ore"] {
        let mut layer = ready_layer();
        let graph = layer.generate(goal, Some(&nominal())).unwrap();

        let root = graph.root_node().expect("root node");
        assert_eq!(root.intent.kind, IntentType::Mine);
        let children = graph.children(&root.id);
        assert!(!children.is_empty(), "{goal}: root has children");

        let mine_child = children
            .iter()
            .find(|c| c.intent.kind == IntentType::Mine)
            .expect("a Mine child");
        let calls = translate(&mine_child.intent, Some(&nominal()));
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].skill_name, names::MINE);
        assert_eq!(calls[0].params.i64_or("amount", 0), 12, "{goal}: amount carried through");
    }
}

#[test]
fn test_generate_rejects_empty_goal_and_uninitialized() {
    let mut cold = SimpleConsciousLayer::new(&ControlConfig::default());
    let err = cold.generate("mine coal", None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let mut layer = ready_layer();
    let err = layer.generate("   ", None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[test]
fn test_update_regenerates_only_on_failure() {
    let mut layer = ready_layer();
    let graph = layer.generate("mine 3 coal_ore", None).unwrap();

    let same = layer.update(&graph, None).unwrap();
    assert_eq!(same.id, graph.id, "no failures: same graph");

    let failed = graph.with_node_status("node_2", NodeStatus::Failed).unwrap();
    let fresh = layer.update(&failed, None).unwrap();
    assert_ne!(fresh.id, graph.id, "failure triggers a full re-plan");
    assert_eq!(fresh.count_status(NodeStatus::Failed), 0);
    assert_eq!(fresh.root_intent.description, "mine 3 coal_ore");
}

#[test]
fn test_intervention_low_health() {
    let mut decider = InterventionDecider::default();
    assert!(decider.should_intervene(Some(&hurt(5.0)), None), "25% health intervenes");
}

#[test]
fn test_intervention_nominal_is_quiet() {
    let mut layer = ready_layer();
    let graph = layer.generate("mine 12 iron_ore", Some(&nominal())).unwrap();
    assert!(!layer.should_intervene(Some(&nominal()), Some(&graph)));
    assert!(!layer.should_intervene(None, None), "absent inputs never intervene");
}

#[test]
fn test_intervention_stuck_fires_once_then_rearms() {
    let mut decider = InterventionDecider::default();
    decider.set_stuck_time_threshold(Duration::from_millis(100));
    let snap = nominal();
    let t0 = Instant::now();

    assert!(!decider.should_intervene_at(Some(&snap), None, t0), "first sample only records");
    assert!(!decider.should_intervene_at(Some(&snap), None, t0 + Duration::from_millis(50)));
    assert!(
        decider.should_intervene_at(Some(&snap), None, t0 + Duration::from_millis(150)),
        "no progress past the threshold"
    );
    assert!(
        !decider.should_intervene_at(Some(&snap), None, t0 + Duration::from_millis(160)),
        "re-armed after firing"
    );

    let moved = WorldSnapshot::new(PlayerState::at(5.0, 64.0, 0.0));
    assert!(!decider.should_intervene_at(Some(&moved), None, t0 + Duration::from_millis(400)));
}

#[test]
fn test_intervention_three_failures_in_a_row() {
    let mut decider = InterventionDecider::default();
    let snap = nominal();
    let mut graph = flat_graph(3);

    graph = graph.with_node_status("c0", NodeStatus::Failed).unwrap();
    assert!(!decider.should_intervene(Some(&snap), Some(&graph)));
    graph = graph.with_node_status("c1", NodeStatus::Failed).unwrap();
    assert!(!decider.should_intervene(Some(&snap), Some(&graph)));
    graph = graph.with_node_status("c2", NodeStatus::Failed).unwrap();
    assert!(decider.should_intervene(Some(&snap), Some(&graph)), "third failure triggers");
    assert_eq!(decider.consecutive_failures(), 0, "streak resets after firing");
    assert!(!decider.should_intervene(Some(&snap), Some(&graph)), "same failures are not recounted");
}

#[test]
fn test_intervention_running_node_breaks_streak() {
    let mut decider = InterventionDecider::default();
    let snap = nominal();
    let graph = flat_graph(4)
        .with_node_status("c0", NodeStatus::Failed)
        .unwrap()
        .with_node_status("c1", NodeStatus::Failed)
        .unwrap()
        .with_node_status("c2", NodeStatus::Running)
        .unwrap();
    assert!(!decider.should_intervene(Some(&snap), Some(&graph)));
    assert_eq!(decider.consecutive_failures(), 0);

    let graph = graph.with_node_status("c3", NodeStatus::Failed).unwrap();
    assert!(!decider.should_intervene(Some(&snap), Some(&graph)), "only one failure since Running");
}

#[test]
fn test_reflection_report() {
    let mut layer = ready_layer();
    let graph = layer.generate("mine 12 iron_ore", None).unwrap();
    let graph = graph
        .with_node_status("node_2", NodeStatus::Completed)
        .unwrap()
        .with_node_status("node_3", NodeStatus::Failed)
        .unwrap();
    let snap = WorldSnapshot::new(PlayerState::default().with_health(6.0).with_hunger(2.0));

    let text = reflect(Some(&snap), Some(&graph));
    assert!(text.starts_with("=== Execution Reflection ==="));
    assert!(text.contains("Execution summary:"));
    assert!(text.contains("State analysis:"));
    assert!(text.contains("Failure analysis:"));
    assert!(text.contains("Recommendations:"));
    assert!(text.contains("restore health first"));
    assert!(text.contains("find food to restore hunger"));

    assert_eq!(text, layer.reflect(Some(&snap), Some(&graph)), "report is deterministic");
    assert!(reflect(None, None).contains("No execution record"));
}

#[test]
fn test_reflection_metrics() {
    let graph = flat_graph(3)
        .with_node_status("c0", NodeStatus::Completed)
        .unwrap()
        .with_node_status("c1", NodeStatus::Failed)
        .unwrap();
    let m = reflection_metrics(Some(&graph), Some(&hurt(10.0)));
    assert_eq!(m.total_intents, 4);
    assert_eq!(m.completed_intents, 1);
    assert_eq!(m.failed_intents, 1);
    assert!((m.success_rate - 0.25).abs() < 1e-9);
    assert_eq!(m.health_ratio, Some(0.5));

    let empty = reflection_metrics(None, None);
    assert_eq!(empty.success_rate, 0.0);
    assert!(empty.speed.is_none());
}
