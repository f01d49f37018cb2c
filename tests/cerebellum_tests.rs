use csch::cerebellum::action_space::ActionSpace;
use csch::cerebellum::context::{heading_to, normalize_angle, ControlMode, SkillContext};
use csch::cerebellum::pid::{PidController, PidGains};
use csch::cerebellum::reward::ControlQualityReward;
use csch::cerebellum::smoother::ActionSmoother;
use csch::cerebellum::{CerebellumLayer, SimpleCerebellumLayer};
use csch::kernel::lifecycle::Lifecycle;
use csch::model::{names, EntityInfo, MotorAction, PlayerState, SkillCall, Vec3, WorldSnapshot};
use csch::ControlConfig;
use proptest::prelude::*;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};
use std::time::{Duration, Instant};

fn origin() -> WorldSnapshot {
    WorldSnapshot::new(PlayerState::at(0.0, 64.0, 0.0))
}

fn facing(yaw: f64) -> WorldSnapshot {
    WorldSnapshot::new(PlayerState::at(0.0, 64.0, 0.0).with_rotation(yaw, 0.0))
}

fn ready() -> SimpleCerebellumLayer {
    let mut layer = SimpleCerebellumLayer::default();
    layer.initialize().unwrap();
    layer
}

fn navigate_to(x: f64, z: f64) -> SkillCall {
    SkillCall::new(names::NAVIGATE_TO)
        .with_param("target", "waypoint")
        .with_param("x", x)
        .with_param("z", z)
}

#[test]
fn test_pid_saturates() {
    let mut pid = PidController::default();
    assert_eq!(pid.yaw_rate(1e6), FRAC_PI_2);
    assert_eq!(pid.pitch_rate(1e6), FRAC_PI_4, "pitch limit is half of yaw");
    assert_eq!(pid.yaw_rate(-1e6), -FRAC_PI_2);
    assert_eq!(pid.max_pitch_output(), pid.max_yaw_output() / 2.0);
}

#[test]
fn test_pid_proportional_response_and_reset() {
    let mut pid = PidController::new(PidGains {
        kp: 0.5,
        ki: 0.0,
        kd: 0.0,
    });
    assert!((pid.yaw_rate(2.0) - 1.0).abs() < 1e-9);
    assert_eq!(pid.yaw_rate(0.0), 0.0, "no error, no output");

    let mut integrating = PidController::default();
    let first = integrating.yaw_rate(1.0);
    let second = integrating.yaw_rate(1.0);
    assert!(second < first, "derivative kick fades on a constant error");
    integrating.reset();
    assert!((integrating.yaw_rate(1.0) - first).abs() < 1e-12, "reset clears integral and last error");
}

proptest! {
    #[test]
    fn prop_pid_output_is_bounded(errors in prop::collection::vec(-1e6f64..1e6, 1..50)) {
        let mut pid = PidController::default();
        for e in errors {
            let yaw = pid.yaw_rate(e);
            let pitch = pid.pitch_rate(e);
            prop_assert!(yaw.abs() <= pid.max_yaw_output());
            prop_assert!(pitch.abs() <= pid.max_pitch_output());
        }
    }

    #[test]
    fn prop_clamped_action_is_inside_space(
        forward in -5.0f64..5.0,
        strafe in -5.0f64..5.0,
        yaw in -10.0f64..10.0,
        pitch in -10.0f64..10.0,
        sprint in any::<bool>(),
        jump in any::<bool>(),
    ) {
        let raw = MotorAction::new(forward, strafe, yaw, pitch).with_sprint(sprint).with_jump(jump);
        for space in [ActionSpace::default(), ActionSpace::restricted()] {
            let clamped = space.clamp(&raw);
            prop_assert!(space.contains(&clamped));
        }
    }
}

#[test]
fn test_action_space_restricted_drops_flags() {
    let space = ActionSpace::restricted();
    let raw = MotorAction::new(1.0, 1.0, 3.0, -3.0)
        .with_sprint(true)
        .with_jump(true)
        .with_attack(true);
    let clamped = space.clamp(&raw);

    assert_eq!(clamped.move_forward(), 0.8);
    assert_eq!(clamped.strafe(), 0.5);
    assert_eq!(clamped.yaw_rate(), FRAC_PI_4);
    assert!(!clamped.sprint && !clamped.jump);
    assert!(clamped.attack, "attack is not the action space's concern");
    assert_eq!(space.discrete_dimension(), 1);
    assert_eq!(ActionSpace::default().discrete_dimension(), 3);
}

#[test]
fn test_action_space_rejects_backwards_motion() {
    let space = ActionSpace::default();
    let back = MotorAction::new(-0.5, 0.0, 0.0, 0.0);
    assert!(!space.contains(&back));
    assert_eq!(space.clamp(&back).move_forward(), 0.0);
}

#[test]
fn test_smoother_constant_stream_is_fixed_point() {
    let mut smoother = ActionSmoother::default();
    let action = MotorAction::new(0.6, -0.2, 0.3, 0.1).with_sneak(true);
    for _ in 0..10 {
        assert_eq!(smoother.smooth(action), action);
    }
    assert_eq!(smoother.jerk(), 0.0);
    assert_eq!(smoother.smoothness(), 1.0);
}

#[test]
fn test_smoother_blends_steps() {
    let mut smoother = ActionSmoother::new(5, 0.3);
    assert_eq!(smoother.smooth(MotorAction::idle()), MotorAction::idle(), "first action passes through");
    let second = smoother.smooth(MotorAction::new(1.0, 0.0, 0.0, 0.0).with_sprint(true));
    assert!((second.move_forward() - 0.3).abs() < 1e-9);
    assert!(second.sprint, "flags are not blended");
    assert_eq!(smoother.history().count(), 2);

    smoother.reset();
    let after_reset = smoother.smooth(MotorAction::new(1.0, 0.0, 0.0, 0.0));
    assert_eq!(after_reset.move_forward(), 1.0);
}

#[test]
fn test_context_geometry() {
    assert_eq!(normalize_angle(190.0), -170.0);
    assert_eq!(normalize_angle(-190.0), 170.0);
    assert!((heading_to(Vec3::new(0.0, 0.0, 0.0), Vec3::new(-10.0, 0.0, 0.0)) - 90.0).abs() < 1e-9);

    let snap = origin();
    let ctx = SkillContext::from_call(&SkillCall::new("Dance"), &snap);
    assert_eq!(ctx.mode, ControlMode::Idle);

    let escape = SkillContext::from_call(
        &SkillCall::new(names::ESCAPE)
            .with_param("threat", "creeper")
            .with_param("minDistance", 20.0),
        &snap,
    );
    assert_eq!(escape.mode, ControlMode::Escape);
    assert_eq!(escape.threat.as_deref(), Some("creeper"));
    assert_eq!(escape.min_distance, 20.0);
}

#[test]
fn test_compute_action_without_snapshot_is_idle() {
    let mut layer = ready();
    let action = layer.compute_action(&navigate_to(0.0, 20.0), None);
    assert!(action.is_idle());
    assert_eq!(layer.steps(), 0, "nothing computed");
}

#[test]
fn test_navigation_drives_forward() {
    let mut layer = ready();
    let action = layer.compute_action(&navigate_to(0.0, 20.0), Some(&origin()));
    assert_eq!(action.move_forward(), 1.0);
    assert!(action.sprint, "full speed sprints");
    assert!(action.yaw_rate().abs() < 1e-9, "already facing the target");

    let mut cautious = ready();
    let call = navigate_to(0.0, 20.0).with_param("cautious", true);
    let action = cautious.compute_action(&call, Some(&origin()));
    assert_eq!(action.move_forward(), 0.5);
    assert!(!action.sprint);
}

#[test]
fn test_navigation_slows_near_target() {
    let mut layer = ready();
    let action = layer.compute_action(&navigate_to(0.0, 0.5), Some(&origin()));
    assert!((action.move_forward() - 0.5).abs() < 1e-9, "distance scales speed inside one block");
    assert!(!action.sprint);
}

#[test]
fn test_alignment_turns_towards_target_and_converges() {
    let mut layer = ready();
    let call = SkillCall::new(names::ALIGN_CROSSHAIR)
        .with_param("target", "none")
        .with_param("targetYaw", 90.0);
    let action = layer.compute_action(&call, Some(&origin()));
    assert_eq!(action.yaw_rate(), FRAC_PI_2, "large error saturates");
    assert_eq!(action.move_forward(), 0.0);
    assert!(!layer.is_converged());
    assert!(layer.metrics().aim_error > 0.4);

    let mut on_target = ready();
    let action = on_target.compute_action(&call, Some(&facing(90.0)));
    assert!(action.yaw_rate().abs() < 1e-9);
    assert!(on_target.is_converged());
    assert_eq!(on_target.metrics().stability, 1.0);
}

#[test]
fn test_mining_attacks() {
    let mut layer = ready();
    let call = SkillCall::new(names::MINE).with_param("resource", "stone");
    let action = layer.compute_action(&call, Some(&origin()));
    assert!(action.attack);
    assert_eq!(action.move_forward(), 0.0);
}

#[test]
fn test_combat_keeps_stand_off_distance() {
    let call = SkillCall::new(names::COMBAT_KITE)
        .with_param("target", "zombie")
        .with_param("distance", 3.5);

    let close = origin().with_entity(EntityInfo::new("z1", "zombie", Vec3::new(0.0, 64.0, 2.0)));
    let mut layer = ready();
    let action = layer.compute_action(&call, Some(&close));
    assert_eq!(action.strafe(), -0.5);
    assert!(action.attack);

    let far = origin().with_entity(EntityInfo::new("z1", "zombie", Vec3::new(0.0, 64.0, 10.0)));
    let mut layer = ready();
    assert_eq!(layer.compute_action(&call, Some(&far)).strafe(), 0.5);

    let right = origin().with_entity(EntityInfo::new("z1", "zombie", Vec3::new(0.0, 64.0, 3.5)));
    let mut layer = ready();
    assert_eq!(layer.compute_action(&call, Some(&right)).strafe(), 0.0);
}

#[test]
fn test_escape_turns_away_and_sprints() {
    let call = SkillCall::new(names::ESCAPE).with_param("threat", "enemy");

    let mut layer = ready();
    let action = layer.compute_action(&call, Some(&facing(30.0)));
    assert_eq!(action.move_forward(), 1.0);
    assert!(action.sprint);
    assert!((action.yaw_rate() + FRAC_PI_4).abs() < 1e-9);

    let mut layer = ready();
    let action = layer.compute_action(&call, Some(&facing(-30.0)));
    assert!((action.yaw_rate() - FRAC_PI_4).abs() < 1e-9);

    let mut layer = ready();
    let action = layer.compute_action(&call, Some(&facing(0.0)));
    assert_eq!(action.yaw_rate(), 0.0, "heading 0 has no sign");
    assert_eq!(layer.metrics().aim_error, 0.0);
}

#[test]
fn test_unknown_skill_is_idle() {
    let mut layer = ready();
    let action = layer.compute_action(&SkillCall::new("Dance"), Some(&origin()));
    assert!(action.is_idle());
}

#[test]
fn test_compute_sequence_and_feedback() {
    let mut layer = ready();
    let snap = origin();
    let call = navigate_to(0.0, 20.0);

    let actions = layer.compute_sequence(&call, Some(&snap), 4);
    assert_eq!(actions.len(), 4);
    assert_eq!(layer.steps(), 4);

    layer.update_from_feedback(Some(&snap), &actions[0], Some(&snap), 0.75);
    layer.update_from_feedback(Some(&snap), &actions[1], Some(&snap), 0.25);
    assert!((layer.cumulative_reward() - 1.0).abs() < 1e-9);

    layer.reset();
    assert_eq!(layer.cumulative_reward(), 0.0);
    assert_eq!(layer.steps(), 0);
    assert!(!layer.is_converged());
}

#[test]
fn test_feedback_records_collision_and_reward() {
    let before = WorldSnapshot::new(PlayerState::at(0.0, 64.0, 0.0).with_velocity(Vec3::new(1.0, 0.0, 0.0)));
    let blocked = origin();
    let push = MotorAction::new(1.0, 0.0, 0.0, 0.0);

    // 1. Velocity said +1 on x, the player never moved
    let mut layer = ready();
    layer.update_from_feedback(Some(&before), &push, Some(&blocked), 0.0);
    let metrics = layer.metrics();
    assert_eq!(metrics.collision_count, 1);
    assert!((metrics.path_deviation - 1.0).abs() < 1e-9);
    assert!((layer.last_reward() + 2.5).abs() < 1e-6, "path 0.5 plus collision 2.0");
    assert_eq!(metrics.reward, layer.last_reward());

    // 2. A looser threshold tolerates the same deviation
    let config = ControlConfig {
        collision_threshold: 2.0,
        ..ControlConfig::default()
    };
    let mut tolerant = SimpleCerebellumLayer::from_config(&config);
    tolerant.initialize().unwrap();
    tolerant.update_from_feedback(Some(&before), &push, Some(&blocked), 0.0);
    assert_eq!(tolerant.metrics().collision_count, 0);
    assert!((tolerant.last_reward() + 0.5).abs() < 1e-6);

    // 3. Standing still never collides
    layer.update_from_feedback(Some(&before), &MotorAction::idle(), Some(&blocked), 0.0);
    assert_eq!(layer.metrics().collision_count, 1);

    layer.reset();
    assert_eq!(layer.last_reward(), 0.0);
}

#[test]
fn test_aim_tolerance_comes_from_config() {
    let snap = facing(30.0);
    let align = SkillCall::new(names::ALIGN_CROSSHAIR)
        .with_param("targetYaw", 0.0)
        .with_param("targetPitch", 0.0);

    let mut strict = ready();
    strict.compute_action(&align, Some(&snap));
    assert!(!strict.is_converged(), "30 degrees is outside 0.05 * 180");

    let config = ControlConfig {
        aim_error_threshold: 0.2,
        ..ControlConfig::default()
    };
    let mut loose = SimpleCerebellumLayer::from_config(&config);
    loose.initialize().unwrap();
    loose.compute_action(&align, Some(&snap));
    assert!(loose.is_converged(), "30 degrees is inside 0.2 * 180");

    let explicit = align.clone().with_param("tolerance", 0.05);
    loose.compute_action(&explicit, Some(&snap));
    assert!(!loose.is_converged(), "a tolerance param wins over the config");
}

#[test]
fn test_reward_penalties() {
    let mut reward = ControlQualityReward::default();
    let t0 = Instant::now();

    assert!((reward.compute_at(None, None, 0.5, false, false, t0) + 0.5).abs() < 1e-9);
    assert!((reward.compute_at(None, None, 0.0, true, false, t0) + 2.0).abs() < 1e-9);

    assert_eq!(reward.compute_at(None, None, 0.0, false, true, t0), 0.0);
    let stuck = reward.compute_at(None, None, 0.0, false, true, t0 + Duration::from_secs(2));
    assert!((stuck + 2.0).abs() < 1e-9, "stuck penalty grows with time");

    assert_eq!(reward.compute_at(None, None, 0.0, false, false, t0), 0.0);
    assert_eq!(reward.stuck_duration(), Duration::ZERO, "moving again clears the timer");
}

#[test]
fn test_reward_path_deviation() {
    let mut reward = ControlQualityReward::default();
    let before = WorldSnapshot::new(PlayerState::at(0.0, 64.0, 0.0).with_velocity(Vec3::new(1.0, 0.0, 0.0)));
    let after = WorldSnapshot::new(PlayerState::at(1.0, 64.0, 3.0));

    reward.compute_at(Some(&before), Some(&after), 0.0, false, false, Instant::now());
    assert!((reward.last_path_deviation() - 3.0).abs() < 1e-9);
}
