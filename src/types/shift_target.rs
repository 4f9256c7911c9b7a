//! ShiftTarget — effective production target for an asset.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftTarget {
    pub asset_id: String,
    pub target_output: u64,
    pub shift: String,
    pub effective_date: NaiveDate,
}

/// Pick the applicable target: the latest with `effective_date <= today`.
///
/// Returns `None` if every candidate is effective only in the future.
pub fn applicable_target(candidates: &[ShiftTarget], today: NaiveDate) -> Option<&ShiftTarget> {
    candidates
        .iter()
        .filter(|t| t.effective_date <= today)
        .max_by_key(|t| t.effective_date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(date: &str, output: u64) -> ShiftTarget {
        ShiftTarget {
            asset_id: "a1".into(),
            target_output: output,
            shift: "day".into(),
            effective_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").expect("valid date"),
        }
    }

    #[test]
    fn picks_latest_effective_not_in_future() {
        let today = NaiveDate::parse_from_str("2026-01-10", "%Y-%m-%d").expect("valid date");
        let candidates = vec![target("2026-01-01", 100), target("2026-01-05", 120), target("2026-02-01", 999)];
        let chosen = applicable_target(&candidates, today).expect("one candidate applies");
        assert_eq!(chosen.target_output, 120);
    }

    #[test]
    fn none_when_all_future() {
        let today = NaiveDate::parse_from_str("2026-01-01", "%Y-%m-%d").expect("valid date");
        let candidates = vec![target("2026-02-01", 100)];
        assert!(applicable_target(&candidates, today).is_none());
    }
}
