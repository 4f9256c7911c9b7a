//! FinancialRecord — a daily summary joined with its cost-center rates.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Row produced by joining a `DailySummary` against its asset's
/// `CostCenter`. `standard_hourly_rate`/`cost_per_unit` are `None` when the
/// asset has no cost center configured, in which case financial tools fall
/// back to a non-financial summary rather than fabricating a dollar figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialRecord {
    pub asset_id: String,
    pub asset_name: String,
    pub report_date: NaiveDate,
    pub downtime_minutes: f64,
    pub waste_count: u64,
    pub standard_hourly_rate: Option<f64>,
    pub cost_per_unit: Option<f64>,
    pub downtime_reasons: Option<BTreeMap<String, f64>>,
}

impl FinancialRecord {
    pub fn has_cost_data(&self) -> bool {
        self.standard_hourly_rate.is_some() && self.cost_per_unit.is_some()
    }

    /// `downtime_minutes × rate$/hr / 60`.
    pub fn downtime_cost(&self) -> Option<f64> {
        self.standard_hourly_rate.map(|rate| self.downtime_minutes * rate / 60.0)
    }

    /// `waste_count × $/unit`.
    pub fn waste_cost(&self) -> Option<f64> {
        self.cost_per_unit.map(|rate| self.waste_count as f64 * rate)
    }

    pub fn total_cost(&self) -> Option<f64> {
        match (self.downtime_cost(), self.waste_cost()) {
            (Some(d), Some(w)) => Some(d + w),
            _ => None,
        }
    }
}
