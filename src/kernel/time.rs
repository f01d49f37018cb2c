use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Logical control-loop frame counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Tick {
    pub frame: u64,
}

pub const DEFAULT_CONTROL_HZ: u32 = 60;

impl Tick {
    pub fn new() -> Self {
        Tick { frame: 0 }
    }

    pub fn next(&self) -> Self {
        Tick { frame: self.frame + 1 }
    }

    /// Wall-clock time this many frames represent at `hz`.
    pub fn elapsed_at(&self, hz: u32) -> Duration {
        let hz = hz.max(1) as u64;
        Duration::from_millis(self.frame * 1000 / hz)
    }
}
