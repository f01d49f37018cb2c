use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
    Emergency,
}

impl Severity {
    pub fn level(&self) -> u8 {
        *self as u8
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyViolation {
    pub rule_id: Uuid,
    pub rule_name: String,
    pub severity: Severity,
    pub description: String,
    pub suggested_action: String,
    pub detected_at: SystemTime,
}

impl SafetyViolation {
    pub fn new(
        rule_id: Uuid,
        rule_name: impl Into<String>,
        severity: Severity,
        description: impl Into<String>,
        suggested_action: impl Into<String>,
    ) -> Self {
        Self {
            rule_id,
            rule_name: rule_name.into(),
            severity,
            description: description.into(),
            suggested_action: suggested_action.into(),
            detected_at: SystemTime::now(),
        }
    }

    pub fn is_critical(&self) -> bool {
        self.severity >= Severity::Critical
    }
}
