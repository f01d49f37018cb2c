use parking_lot::Mutex;
use std::collections::VecDeque;

use super::metrics::{compute_snapshot, EventStats};
use crate::kernel::error::Result;
use crate::kernel::event::{ControlEvent, EventKind, EventSubscriber};

const MAX_EVENTS: usize = 10_000;

/// Bounded in-memory window of the most recent control events.
#[derive(Debug)]
pub struct EventRecorder {
    capacity: usize,
    buffer: Mutex<VecDeque<ControlEvent>>,
}

impl Default for EventRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::with_capacity(MAX_EVENTS)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            buffer: Mutex::new(VecDeque::with_capacity(capacity.min(MAX_EVENTS))),
        }
    }

    pub fn record(&self, event: ControlEvent) {
        let mut buffer = self.buffer.lock();
        if buffer.len() >= self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(event);
    }

    pub fn snapshot(&self) -> EventStats {
        compute_snapshot(&self.buffer.lock())
    }

    pub fn events_of(&self, kind: EventKind) -> Vec<ControlEvent> {
        self.buffer
            .lock()
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }

    pub fn clear(&self) {
        self.buffer.lock().clear();
    }
}

impl EventSubscriber for EventRecorder {
    fn name(&self) -> &str {
        "EventRecorder"
    }

    fn on_event(&self, event: &ControlEvent) -> Result<()> {
        self.record(event.clone());
        Ok(())
    }
}
