//! SafetyEvent — an operational safety incident.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Sort priority used for the Action Engine's intra-tier safety
    /// ordering: lower value sorts first.
    pub fn rank(self) -> u8 {
        match self {
            Severity::Critical => 1,
            Severity::High => 2,
            Severity::Medium => 3,
            Severity::Low => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyEvent {
    pub id: String,
    pub asset_id: String,
    pub event_timestamp: DateTime<Utc>,
    pub reason_code: String,
    pub severity: Severity,
    pub description: String,
    pub is_resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl SafetyEvent {
    /// A safety event is active iff it has not been resolved.
    pub fn is_active(&self) -> bool {
        !self.is_resolved
    }
}
