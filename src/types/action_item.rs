//! ActionItem — one row of the daily action list.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityLevel {
    Critical,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCategory {
    Safety,
    Oee,
    Financial,
}

/// A non-owning pointer into the source row that justified an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRef {
    pub source_table: String,
    pub record_id: String,
    pub metric_name: String,
    pub metric_value: String,
    pub context: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    pub id: String,
    pub asset_id: String,
    pub asset_name: String,
    pub priority_level: PriorityLevel,
    pub category: ActionCategory,
    pub primary_metric_value: String,
    pub recommendation_text: String,
    pub evidence_summary: String,
    pub evidence_refs: Vec<EvidenceRef>,
    pub created_at: DateTime<Utc>,
}

impl ActionItem {
    /// `category=safety ⇒ priority_level=critical`.
    pub fn respects_safety_invariant(&self) -> bool {
        !matches!(self.category, ActionCategory::Safety) || matches!(self.priority_level, PriorityLevel::Critical)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountsByCategory {
    pub safety: usize,
    pub oee: usize,
    pub financial: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionListResponse {
    pub report_date: NaiveDate,
    pub actions: Vec<ActionItem>,
    pub total_count: usize,
    pub counts_by_category: CountsByCategory,
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(category: ActionCategory, priority: PriorityLevel) -> ActionItem {
        ActionItem {
            id: "a1".into(),
            asset_id: "asset-1".into(),
            asset_name: "Line 1".into(),
            priority_level: priority,
            category,
            primary_metric_value: "72%".into(),
            recommendation_text: "investigate".into(),
            evidence_summary: "oee below target".into(),
            evidence_refs: vec![],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn safety_with_critical_priority_is_valid() {
        assert!(item(ActionCategory::Safety, PriorityLevel::Critical).respects_safety_invariant());
    }

    #[test]
    fn safety_with_non_critical_priority_is_invalid() {
        assert!(!item(ActionCategory::Safety, PriorityLevel::High).respects_safety_invariant());
    }

    #[test]
    fn non_safety_category_is_unconstrained() {
        assert!(item(ActionCategory::Oee, PriorityLevel::Medium).respects_safety_invariant());
    }
}
