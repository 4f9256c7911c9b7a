//! DailySummary — per-asset per-date aggregated performance.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-asset per-date aggregated performance. One row per
/// `(asset_id, report_date)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub id: String,
    pub asset_id: String,
    pub report_date: NaiveDate,
    pub oee_percentage: Option<f64>,
    pub availability: Option<f64>,
    pub performance: Option<f64>,
    pub quality: Option<f64>,
    pub actual_output: u64,
    pub target_output: u64,
    pub downtime_minutes: f64,
    pub waste_count: u64,
    pub financial_loss_dollars: Option<f64>,
    pub downtime_reasons: Option<BTreeMap<String, f64>>,
}

impl DailySummary {
    /// `oee_percentage ≈ availability·performance·quality / 10000` within a
    /// rounding tolerance, when all three factors are present.
    pub fn oee_consistent(&self, tolerance: f64) -> bool {
        match (self.availability, self.performance, self.quality, self.oee_percentage) {
            (Some(a), Some(p), Some(q), Some(oee)) => {
                let computed = a * p * q / 10_000.0;
                (computed - oee).abs() <= tolerance
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(oee: Option<f64>, a: Option<f64>, p: Option<f64>, q: Option<f64>) -> DailySummary {
        DailySummary {
            id: "s1".into(),
            asset_id: "a1".into(),
            report_date: NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid date"),
            oee_percentage: oee,
            availability: a,
            performance: p,
            quality: q,
            actual_output: 100,
            target_output: 120,
            downtime_minutes: 30.0,
            waste_count: 2,
            financial_loss_dollars: None,
            downtime_reasons: None,
        }
    }

    #[test]
    fn consistent_oee_passes() {
        let s = summary(Some(72.0), Some(90.0), Some(90.0), Some(88.888_89));
        assert!(s.oee_consistent(0.01));
    }

    #[test]
    fn inconsistent_oee_fails() {
        let s = summary(Some(10.0), Some(90.0), Some(90.0), Some(90.0));
        assert!(!s.oee_consistent(0.01));
    }

    #[test]
    fn missing_factors_are_vacuously_consistent() {
        let s = summary(Some(72.0), None, None, None);
        assert!(s.oee_consistent(0.01));
    }
}
