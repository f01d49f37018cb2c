use csch::kernel::error::ErrorKind;
use csch::kernel::event::{EventBus, EventKind};
use csch::kernel::telemetry::EventRecorder;
use csch::model::{
    names, MockStateSource, NodeStatus, SkillResult, SkillResultStatus, StateSource, WorldSnapshot,
};
use csch::{Agent, ControlConfig, ControlSystem, Layers};
use std::sync::Arc;
use std::time::Duration;

/// A source that never has a snapshot.
struct Blind;

impl StateSource for Blind {
    fn current_state(&self) -> Option<Arc<WorldSnapshot>> {
        None
    }
}

/// Plans and selects on every tick.
fn eager_config() -> ControlConfig {
    ControlConfig {
        intent_update_interval_ms: 0,
        skill_update_interval_ms: 0,
        ..ControlConfig::default()
    }
}

fn system_with(config: ControlConfig) -> (Arc<ControlSystem>, Arc<MockStateSource>) {
    let world = Arc::new(MockStateSource::new());
    let system = Arc::new(ControlSystem::new(config, world.clone()).unwrap());
    system.initialize().unwrap();
    (system, world)
}

fn recorded_system(config: ControlConfig) -> (Arc<ControlSystem>, Arc<EventRecorder>) {
    let world = Arc::new(MockStateSource::new());
    let recorder = Arc::new(EventRecorder::new());
    let bus = EventBus::new();
    bus.subscribe(recorder.clone());
    let layers = Layers::simple(&config);
    let system = Arc::new(ControlSystem::with_components(config, world, Arc::new(bus), layers).unwrap());
    system.initialize().unwrap();
    (system, recorder)
}

fn node_status(system: &ControlSystem, id: &str) -> NodeStatus {
    system.graph().unwrap().node(id).unwrap().status
}

fn succeed(system: &ControlSystem) {
    let call = system.skill().expect("an active skill");
    system.report_skill_result(SkillResult::success(&call)).unwrap();
}

fn fail(system: &ControlSystem) {
    let call = system.skill().expect("an active skill");
    system
        .report_skill_result(SkillResult::failure(&call, "simulated failure"))
        .unwrap();
}

#[test]
fn test_invalid_config_is_rejected() {
    let world = Arc::new(MockStateSource::new());
    let err = ControlSystem::new(ControlConfig::default().with_control_frequency(0), world).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_set_goal_requires_initialize() {
    let world = Arc::new(MockStateSource::new());
    let system = ControlSystem::new(ControlConfig::default(), world).unwrap();
    let err = system.set_goal("mine 12 iron_ore").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    system.initialize().unwrap();
    system.initialize().unwrap();
    assert!(system.is_healthy());
    assert!(system.set_goal("mine 12 iron_ore").is_ok());
}

#[test]
fn test_tick_without_goal_emits_nothing() {
    let (system, _world) = system_with(eager_config());
    system.tick_step().unwrap();
    system.tick_step().unwrap();
    assert_eq!(system.tick_count(), 2);
    assert!(system.skill().is_none());
    assert!(system.poll_action().is_none());
}

#[test]
fn test_tick_without_snapshot_fails() {
    let system = ControlSystem::new(ControlConfig::default(), Arc::new(Blind)).unwrap();
    system.initialize().unwrap();
    let err = system.tick_step().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceUnavailable);
}

#[test]
fn test_goal_dispatches_first_skill_and_emits_action() {
    let (system, _world) = system_with(eager_config());
    let graph = system.set_goal("mine 12 iron_ore").unwrap();
    assert_eq!(graph.len(), 4, "root plus locate, approach, mine");
    assert_eq!(system.goal().as_deref().map(String::as_str), Some("mine 12 iron_ore"));

    system.tick_step().unwrap();

    let skill = system.skill().expect("skill dispatched on first tick");
    assert_eq!(skill.skill_name, names::NAVIGATE_TO, "locating is exploration");
    assert_eq!(node_status(&system, "node_2"), NodeStatus::Running);
    assert_eq!(system.active_skill().unwrap().node_id, "node_2");

    let action = system.poll_action().expect("one action per tick");
    assert!(action.move_forward() > 0.0);
    assert!(system.poll_action().is_none());
}

#[test]
fn test_goal_runs_to_completion() {
    let (system, _world) = system_with(eager_config());
    system.set_goal("mine 12 iron_ore").unwrap();

    // 1. Locate, approach, mine
    let mut skills = Vec::new();
    for _ in 0..3 {
        system.tick_step().unwrap();
        skills.push(system.skill().unwrap().skill_name);
        succeed(&system);
    }
    assert_eq!(skills, [names::NAVIGATE_TO, names::NAVIGATE_TO, names::MINE]);
    let graph = system.graph().unwrap();
    assert_eq!(graph.count_status(NodeStatus::Completed), 3);

    // 2. Next tick closes the root
    system.tick_step().unwrap();
    assert!(system.skill().is_none());
    assert_eq!(node_status(&system, "node_1"), NodeStatus::Completed);

    // 3. Nothing left to do
    while system.poll_action().is_some() {}
    system.tick_step().unwrap();
    assert!(system.skill().is_none());
    assert!(system.poll_action().is_none());
}

#[test]
fn test_failure_installs_recovery_and_keeps_node_running() {
    let (system, _world) = system_with(eager_config());
    system.set_goal("mine 12 iron_ore").unwrap();
    system.tick_step().unwrap();
    let first = system.skill().unwrap();

    fail(&system);

    let retry = system.skill().expect("recovery call installed");
    assert_ne!(retry.id, first.id);
    assert_eq!(retry.skill_name, first.skill_name);
    assert_eq!(node_status(&system, "node_2"), NodeStatus::Running);
    assert_eq!(system.recovery_count(), 1);
}

#[test]
fn test_stale_result_is_ignored() {
    let (system, _world) = system_with(eager_config());
    system.set_goal("mine 12 iron_ore").unwrap();
    system.tick_step().unwrap();
    let first = system.skill().unwrap();
    fail(&system);
    let retry = system.skill().unwrap();

    system.report_skill_result(SkillResult::success(&first)).unwrap();
    assert_eq!(system.skill().unwrap().id, retry.id, "result for an old attempt changes nothing");
    assert_eq!(node_status(&system, "node_2"), NodeStatus::Running);
}

#[test]
fn test_exhausted_retries_fail_node_and_goal() {
    let (system, _world) = system_with(eager_config());
    system.set_goal("hello there").unwrap();
    system.tick_step().unwrap();
    assert_eq!(system.skill().unwrap().skill_name, names::GENERIC_ACTION);

    fail(&system);
    fail(&system);
    fail(&system);
    assert!(system.skill().is_none(), "no alternative for a generic action");
    assert_eq!(node_status(&system, "node_2"), NodeStatus::Failed);

    system.tick_step().unwrap();
    assert_eq!(node_status(&system, "node_1"), NodeStatus::Failed);
}

#[test]
fn test_result_without_active_skill_is_ignored() {
    let (system, _world) = system_with(eager_config());
    let call = csch::model::SkillCall::new(names::MINE);
    system
        .report_skill_result(SkillResult::new(&call, SkillResultStatus::Failed, "nothing running"))
        .unwrap();
    assert_eq!(system.recovery_count(), 0);
}

#[test]
fn test_shield_corrects_airborne_motion() {
    let (system, world) = system_with(eager_config());
    world.set_on_ground(false);
    system.set_goal("mine 12 iron_ore").unwrap();
    system.tick_step().unwrap();

    let action = system.poll_action().unwrap();
    assert_eq!(action.move_forward(), 0.0, "cliff rule stops forward motion");
    assert!(action.sneak);
    assert_eq!(system.violation_count(), 1);
}

#[test]
fn test_disabled_shield_passes_actions_through() {
    let (system, world) = system_with(eager_config().with_safety_shield(false));
    world.set_on_ground(false);
    system.set_goal("mine 12 iron_ore").unwrap();
    system.tick_step().unwrap();

    let action = system.poll_action().unwrap();
    assert!(action.move_forward() > 0.0);
    assert_eq!(system.violation_count(), 0);
}

#[test]
fn test_low_health_triggers_intervention() {
    let (system, world) = system_with(eager_config());
    system.set_goal("mine 12 iron_ore").unwrap();
    world.update_player_health(3.0);
    system.tick_step().unwrap();
    system.tick_step().unwrap();
    assert_eq!(system.intervention_count(), 2, "one per intent update");
    assert!(system.metrics().overall_quality() <= 1.0);
}

#[test]
fn test_full_queue_drops_actions() {
    let config = ControlConfig {
        action_queue_capacity: 1,
        ..eager_config()
    };
    let (system, _world) = system_with(config);
    system.set_goal("mine 12 iron_ore").unwrap();
    system.tick_step().unwrap();
    system.tick_step().unwrap();
    system.tick_step().unwrap();

    assert_eq!(system.pending_actions(), 1);
    assert_eq!(system.dropped_action_count(), 2);
}

#[test]
fn test_events_are_published() {
    let (system, recorder) = recorded_system(eager_config());
    system.set_goal("mine 12 iron_ore").unwrap();
    system.tick_step().unwrap();
    succeed(&system);

    let stats = recorder.snapshot();
    assert_eq!(stats.system_stats.initialized, 1);
    assert_eq!(stats.goal_stats.goals_set, 1);
    assert_eq!(stats.goal_stats.plans_generated, 1);
    assert_eq!(stats.skill_stats.called, 1);
    assert_eq!(stats.skill_stats.completed, 1);
    assert_eq!(stats.action_stats.computed, 1);

    let called = recorder.events_of(EventKind::SkillCalled);
    assert_eq!(called[0].message, names::NAVIGATE_TO);
    assert_eq!(called[0].data["node"], "node_2");
}

#[test]
fn test_reflection_reports_progress() {
    let (system, _world) = system_with(eager_config());
    system.set_goal("mine 12 iron_ore").unwrap();
    system.tick_step().unwrap();
    succeed(&system);

    let text = system.reflection();
    assert!(text.contains("completed: 1"));
    assert!(text.contains("State analysis:"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_loop_start_stop_shutdown() {
    let (system, _world) = system_with(ControlConfig::default());

    // 1. Start is idempotent
    system.set_goal("mine 12 iron_ore").unwrap();
    system.start().unwrap();
    system.start().unwrap();
    assert!(system.is_running());

    // 2. Actions arrive at the tick rate
    let first = tokio::task::block_in_place(|| system.next_action_timeout(Duration::from_secs(2)));
    assert!(first.is_some(), "loop produced an action");
    assert!(system.tick_count() >= 1);

    // 3. Stop, then shut down
    system.stop();
    system.stop();
    assert!(!system.is_running());
    system.shutdown().await.unwrap();
    assert!(!system.is_initialized());
    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_start_requires_initialize() {
    let world = Arc::new(MockStateSource::new());
    let system = Arc::new(ControlSystem::new(ControlConfig::default(), world).unwrap());
    let err = system.start().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert!(!system.is_running());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_agent_round_trip() {
    let world = Arc::new(MockStateSource::new());
    let agent = Agent::new(ControlConfig::default(), world.clone()).unwrap();

    // 1. Reports need an active skill
    assert_eq!(agent.report_success("early").unwrap_err().kind(), ErrorKind::InvalidState);
    assert_eq!(
        agent
            .report_failure(SkillResultStatus::Success, "not a failure")
            .unwrap_err()
            .kind(),
        ErrorKind::InvalidInput
    );

    // 2. Goal in, actions out
    let graph = agent.execute_goal("mine 12 iron_ore").unwrap();
    assert_eq!(graph.len(), 4);
    let action = tokio::task::block_in_place(|| agent.action_timeout(Duration::from_secs(2)));
    assert!(action.is_some());
    assert!(agent.is_running());
    assert_eq!(agent.current_goal().as_deref().map(String::as_str), Some("mine 12 iron_ore"));
    assert_eq!(agent.player_state().unwrap().health, 20.0);

    // 3. Success moves the plan forward
    let skill = agent.current_skill().expect("skill dispatched");
    agent.report_success("found it").unwrap();
    assert_ne!(agent.current_skill().map(|s| s.id), Some(skill.id));
    assert_eq!(
        agent
            .intent_graph()
            .unwrap()
            .count_status(NodeStatus::Completed),
        1
    );

    agent.shutdown().await.unwrap();
    assert!(!agent.is_running());
}
