use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::warn;
use uuid::Uuid;

use super::error::Result;

/// Lifecycle and decision events emitted by the control core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    GoalSet,
    IntentGenerated,
    IntentUpdated,
    SkillCalled,
    SkillCompleted,
    SkillFailed,
    ActionComputed,
    ActionFiltered,
    SafetyViolation,
    Intervention,
    SystemInitialized,
    SystemShutdown,
    SystemError,
}

impl EventKind {
    /// Dotted wire name, e.g. `skill.failed`.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::GoalSet => "goal.set",
            EventKind::IntentGenerated => "intent.generated",
            EventKind::IntentUpdated => "intent.updated",
            EventKind::SkillCalled => "skill.called",
            EventKind::SkillCompleted => "skill.completed",
            EventKind::SkillFailed => "skill.failed",
            EventKind::ActionComputed => "action.computed",
            EventKind::ActionFiltered => "action.filtered",
            EventKind::SafetyViolation => "safety.violation",
            EventKind::Intervention => "safety.intervention",
            EventKind::SystemInitialized => "system.initialized",
            EventKind::SystemShutdown => "system.shutdown",
            EventKind::SystemError => "system.error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventPriority {
    Low,
    Normal,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlEvent {
    pub id: Uuid,
    pub kind: EventKind,
    pub source: String,
    pub timestamp: SystemTime,
    pub priority: EventPriority,
    pub message: String,
    pub data: BTreeMap<String, Value>,
}

impl ControlEvent {
    pub fn new(kind: EventKind, source: impl Into<String>, message: impl Into<String>) -> Self {
        let priority = match kind {
            EventKind::SystemError | EventKind::Intervention => EventPriority::High,
            EventKind::SafetyViolation => EventPriority::High,
            EventKind::ActionComputed => EventPriority::Low,
            _ => EventPriority::Normal,
        };
        Self {
            id: Uuid::new_v4(),
            kind,
            source: source.into(),
            timestamp: SystemTime::now(),
            priority,
            message: message.into(),
            data: BTreeMap::new(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn with_priority(mut self, priority: EventPriority) -> Self {
        self.priority = priority;
        self
    }
}

/// Where the core publishes its events. Delivery is best-effort.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: ControlEvent);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _event: ControlEvent) {}
}

pub trait EventSubscriber: Send + Sync {
    fn name(&self) -> &str;

    fn is_interested_in(&self, _kind: EventKind) -> bool {
        true
    }

    fn on_event(&self, event: &ControlEvent) -> Result<()>;
}

/// In-process fan-out. A subscriber that errors or panics is logged and
/// skipped; the remaining subscribers still receive the event.
#[derive(Default)]
pub struct EventBus {
    subscribers: RwLock<Vec<Arc<dyn EventSubscriber>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>) {
        let mut subs = self.subscribers.write();
        if !subs.iter().any(|s| Arc::ptr_eq(s, &subscriber)) {
            subs.push(subscriber);
        }
    }

    /// Removes every subscriber registered under `name`.
    pub fn unsubscribe(&self, name: &str) {
        self.subscribers.write().retain(|s| s.name() != name);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    pub fn clear(&self) {
        self.subscribers.write().clear();
    }
}

impl EventSink for EventBus {
    fn publish(&self, event: ControlEvent) {
        // Snapshot the list so subscribers may (un)subscribe from inside a callback.
        let subs: Vec<Arc<dyn EventSubscriber>> = self.subscribers.read().clone();

        for sub in subs {
            if !sub.is_interested_in(event.kind) {
                continue;
            }
            match catch_unwind(AssertUnwindSafe(|| sub.on_event(&event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Subscriber {} rejected {}: {}", sub.name(), event.kind.as_str(), e),
                Err(_) => warn!("Subscriber {} panicked on {}", sub.name(), event.kind.as_str()),
            }
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
