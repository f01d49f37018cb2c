use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::model::{SkillCall, SkillResult, WorldSnapshot};

pub const DEFAULT_HISTORY_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct ExecutionRecord {
    pub call: SkillCall,
    pub result: SkillResult,
    pub before: Option<Arc<WorldSnapshot>>,
    pub after: Option<Arc<WorldSnapshot>>,
    pub recorded_at: SystemTime,
}

impl ExecutionRecord {
    pub fn is_success(&self) -> bool {
        self.result.is_success()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutionStats {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub total_duration: Duration,
    pub last_execution: Option<SystemTime>,
}

impl ExecutionStats {
    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.successes as f64 / self.attempts as f64
        }
    }

    pub fn average_duration(&self) -> Duration {
        match u32::try_from(self.attempts) {
            Ok(n) if n > 0 => self.total_duration / n,
            _ => Duration::ZERO,
        }
    }
}

/// Bounded FIFO of execution records plus per-skill running totals. Stats
/// cover every execution ever recorded, not just the retained window.
#[derive(Debug)]
pub struct SkillExecutionHistory {
    max_size: usize,
    records: VecDeque<ExecutionRecord>,
    stats: HashMap<String, ExecutionStats>,
}

impl Default for SkillExecutionHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

impl SkillExecutionHistory {
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            max_size,
            records: VecDeque::with_capacity(max_size),
            stats: HashMap::new(),
        }
    }

    pub fn record(
        &mut self,
        call: &SkillCall,
        result: &SkillResult,
        before: Option<Arc<WorldSnapshot>>,
        after: Option<Arc<WorldSnapshot>>,
    ) {
        if self.records.len() >= self.max_size {
            self.records.pop_front();
        }
        let now = SystemTime::now();
        self.records.push_back(ExecutionRecord {
            call: call.clone(),
            result: result.clone(),
            before,
            after,
            recorded_at: now,
        });

        let stats = self.stats.entry(call.skill_name.clone()).or_default();
        stats.attempts += 1;
        if result.is_success() {
            stats.successes += 1;
        } else {
            stats.failures += 1;
        }
        stats.total_duration += result.execution_time;
        stats.last_execution = Some(now);
    }

    pub fn records(&self) -> impl Iterator<Item = &ExecutionRecord> {
        self.records.iter()
    }

    pub fn records_for<'a>(&'a self, skill_name: &'a str) -> impl Iterator<Item = &'a ExecutionRecord> {
        self.records.iter().filter(move |r| r.call.skill_name == skill_name)
    }

    pub fn stats(&self, skill_name: &str) -> Option<&ExecutionStats> {
        self.stats.get(skill_name)
    }

    pub fn all_stats(&self) -> &HashMap<String, ExecutionStats> {
        &self.stats
    }

    /// Integer percentage, 0 for skills never executed.
    pub fn success_rate(&self, skill_name: &str) -> u32 {
        self.stats(skill_name)
            .map(|s| (s.success_rate() * 100.0) as u32)
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.stats.clear();
    }
}
