use csch::kernel::cells::SharedCell;
use csch::kernel::config::ControlConfig;
use csch::kernel::error::{CschError, ErrorKind, Result};
use csch::kernel::event::{ControlEvent, EventBus, EventKind, EventPriority, EventSink, EventSubscriber};
use csch::kernel::lifecycle::{LayerKind, Lifecycle, LifecycleState};
use csch::kernel::telemetry::EventRecorder;
use csch::kernel::time::Tick;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle probe whose setup can be told to fail.
struct Probe {
    state: LifecycleState,
    fail_setup: bool,
    setups: usize,
    teardowns: usize,
}

impl Probe {
    fn new(fail_setup: bool) -> Self {
        Self {
            state: LifecycleState::new(),
            fail_setup,
            setups: 0,
            teardowns: 0,
        }
    }
}

impl Lifecycle for Probe {
    fn name(&self) -> &str {
        "Probe"
    }

    fn layer(&self) -> LayerKind {
        LayerKind::System
    }

    fn initialize(&mut self) -> Result<()> {
        self.state.initialize("Probe", || {
            self.setups += 1;
            if self.fail_setup {
                anyhow::bail!("sensor offline");
            }
            Ok(())
        })
    }

    fn shutdown(&mut self) -> Result<()> {
        self.state.shutdown("Probe", || {
            self.teardowns += 1;
            Ok(())
        })
    }

    fn is_initialized(&self) -> bool {
        self.state.is_initialized()
    }

    fn is_healthy(&self) -> bool {
        self.state.is_healthy()
    }
}

/// Counts the events it sees.
struct Counter {
    name: String,
    seen: AtomicUsize,
    only: Option<EventKind>,
}

impl Counter {
    fn new(name: &str, only: Option<EventKind>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            seen: AtomicUsize::new(0),
            only,
        })
    }

    fn seen(&self) -> usize {
        self.seen.load(Ordering::SeqCst)
    }
}

impl EventSubscriber for Counter {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_interested_in(&self, kind: EventKind) -> bool {
        self.only.map_or(true, |only| only == kind)
    }

    fn on_event(&self, _event: &ControlEvent) -> Result<()> {
        self.seen.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct Panicker;

impl EventSubscriber for Panicker {
    fn name(&self) -> &str {
        "Panicker"
    }

    fn on_event(&self, _event: &ControlEvent) -> Result<()> {
        panic!("subscriber blew up");
    }
}

struct Rejecter;

impl EventSubscriber for Rejecter {
    fn name(&self) -> &str {
        "Rejecter"
    }

    fn on_event(&self, _event: &ControlEvent) -> Result<()> {
        Err(CschError::invalid_state("Rejecter", "not today"))
    }
}

#[test]
fn test_config_defaults_are_valid() {
    let config = ControlConfig::default();
    config.validate().unwrap();
    assert_eq!(config.control_frequency_hz, 60);
    assert_eq!(config.tick_period(), Duration::from_millis(16));
    assert_eq!(config.stuck_time_threshold(), Duration::from_secs(5));
    assert!(config.safety_shield_enabled);
}

#[test]
fn test_config_rejects_out_of_range_values() {
    for hz in [0, 1001] {
        let err = ControlConfig::default().with_control_frequency(hz).validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration, "{hz} Hz");
    }
    assert!(ControlConfig::default().with_control_frequency(1000).validate().is_ok());

    let mut bad_ratio = ControlConfig::default();
    bad_ratio.aim_error_threshold = 1.5;
    assert!(bad_ratio.validate().is_err());

    let mut no_queue = ControlConfig::default();
    no_queue.action_queue_capacity = 0;
    assert!(no_queue.validate().is_err());
}

#[test]
fn test_config_from_json_fills_defaults() {
    let config = ControlConfig::from_json(r#"{"controlFrequencyHz": 20, "safetyShieldEnabled": false}"#).unwrap();
    assert_eq!(config.control_frequency_hz, 20);
    assert!(!config.safety_shield_enabled);
    assert_eq!(config.tick_period(), Duration::from_millis(50));
    assert_eq!(config.skill_update_interval_ms, ControlConfig::default().skill_update_interval_ms);

    let err = ControlConfig::from_json(r#"{"controlFrequencyHz": 0}"#).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    let err = ControlConfig::from_json("not json").unwrap_err();
    assert_eq!(err.component(), "ControlConfig");
}

#[test]
fn test_config_json_round_trip_uses_camel_case() {
    let json = serde_json::to_value(ControlConfig::default()).unwrap();
    assert_eq!(json["controlFrequencyHz"], 60);
    assert_eq!(json["actionQueueCapacity"], 1024);
}

#[test]
fn test_lifecycle_is_idempotent() {
    let mut probe = Probe::new(false);
    assert!(!probe.is_initialized());
    assert!(!probe.is_healthy(), "not healthy before initialize");

    probe.initialize().unwrap();
    probe.initialize().unwrap();
    assert_eq!(probe.setups, 1, "second initialize is a no-op");
    assert!(probe.is_healthy());

    probe.shutdown().unwrap();
    probe.shutdown().unwrap();
    assert_eq!(probe.teardowns, 1);
    assert!(!probe.is_initialized());
}

#[test]
fn test_lifecycle_failed_initialize_marks_unhealthy() {
    let mut probe = Probe::new(true);
    let err = probe.initialize().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Initialization);
    assert_eq!(err.component(), "Probe");
    assert!(err.to_string().contains("sensor offline"));
    assert!(!probe.is_initialized());

    probe.fail_setup = false;
    probe.initialize().unwrap();
    assert!(probe.is_initialized());
    assert!(!probe.is_healthy(), "a failed transition is remembered");
}

#[test]
fn test_ensure_initialized() {
    let state = LifecycleState::new();
    let err = state.ensure_initialized("Layer").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    state.initialize("Layer", || Ok(())).unwrap();
    assert!(state.ensure_initialized("Layer").is_ok());
}

#[test]
fn test_event_bus_isolates_failing_subscribers() {
    let bus = EventBus::new();
    let before = Counter::new("before", None);
    let after = Counter::new("after", None);
    bus.subscribe(before.clone());
    bus.subscribe(Arc::new(Panicker));
    bus.subscribe(Arc::new(Rejecter));
    bus.subscribe(after.clone());

    bus.publish(ControlEvent::new(EventKind::GoalSet, "test", "mine coal"));
    assert_eq!(before.seen(), 1);
    assert_eq!(after.seen(), 1, "later subscribers still get the event");
}

#[test]
fn test_event_bus_filters_and_unsubscribes() {
    let bus = EventBus::new();
    let skills = Counter::new("skills", Some(EventKind::SkillCalled));
    bus.subscribe(skills.clone());
    bus.subscribe(skills.clone());
    assert_eq!(bus.subscriber_count(), 1, "same subscriber is added once");

    bus.publish(ControlEvent::new(EventKind::ActionComputed, "test", "tick"));
    bus.publish(ControlEvent::new(EventKind::SkillCalled, "test", "Mine"));
    assert_eq!(skills.seen(), 1);

    bus.unsubscribe("skills");
    bus.publish(ControlEvent::new(EventKind::SkillCalled, "test", "Mine"));
    assert_eq!(skills.seen(), 1);
    assert_eq!(bus.subscriber_count(), 0);
}

#[test]
fn test_event_defaults() {
    let event = ControlEvent::new(EventKind::SystemError, "loop", "boom").with_data("tick", 42);
    assert_eq!(event.priority, EventPriority::High);
    assert_eq!(event.data["tick"], 42);
    assert_eq!(EventKind::SkillFailed.as_str(), "skill.failed");
    assert_eq!(
        ControlEvent::new(EventKind::ActionComputed, "loop", "").priority,
        EventPriority::Low
    );
}

#[test]
fn test_event_recorder_stats() {
    let recorder = Arc::new(EventRecorder::with_capacity(8));
    let bus = EventBus::new();
    bus.subscribe(recorder.clone());

    // 1. Publish a small session
    let kinds = [
        EventKind::GoalSet,
        EventKind::IntentGenerated,
        EventKind::SkillCalled,
        EventKind::ActionComputed,
        EventKind::ActionComputed,
        EventKind::ActionFiltered,
        EventKind::SkillCompleted,
        EventKind::SkillFailed,
    ];
    for kind in kinds {
        bus.publish(ControlEvent::new(kind, "test", kind.as_str()));
    }

    // 2. Fold
    let stats = recorder.snapshot();
    assert_eq!(stats.goal_stats.goals_set, 1);
    assert_eq!(stats.skill_stats.called, 1);
    assert!((stats.skill_stats.completion_ratio - 0.5).abs() < 1e-9);
    assert!((stats.action_stats.filtered_ratio - 0.5).abs() < 1e-9);
    assert_eq!(recorder.events_of(EventKind::ActionComputed).len(), 2);

    // 3. Bounded window
    bus.publish(ControlEvent::new(EventKind::SystemError, "test", "late"));
    assert_eq!(recorder.len(), 8);
    assert_eq!(recorder.snapshot().goal_stats.goals_set, 0, "oldest event evicted");

    recorder.clear();
    assert!(recorder.is_empty());
}

#[test]
fn test_shared_cell_compare_and_set() {
    let cell: SharedCell<String> = SharedCell::empty();
    assert!(cell.is_empty());

    assert!(cell.set_if_empty("first".to_string()));
    assert!(!cell.set_if_empty("second".to_string()), "occupied cells are left alone");
    assert_eq!(cell.get().as_deref().map(String::as_str), Some("first"));

    let held = cell.get().unwrap();
    assert!(!cell.replace_if(|v| v == "other", Some("third".to_string())));
    assert!(cell.replace_if(|v| v == "first", Some("third".to_string())));
    assert_eq!(*held, "first", "readers keep the value they loaded");

    assert!(cell.replace_if(|_| true, None));
    assert!(cell.is_empty());
    assert!(!cell.replace_if(|_| true, None), "nothing to compare against");

    let previous = cell.set("fourth".to_string());
    assert!(previous.is_none());
    assert_eq!(cell.clear().as_deref().map(String::as_str), Some("fourth"));
}

#[test]
fn test_tick_counter() {
    let tick = Tick::new().next().next();
    assert_eq!(tick.frame, 2);
    let second = Tick { frame: 60 };
    assert_eq!(second.elapsed_at(60), Duration::from_secs(1));
    assert_eq!(Tick { frame: 3 }.elapsed_at(0), Duration::from_millis(3000), "0 Hz treated as 1");
}
