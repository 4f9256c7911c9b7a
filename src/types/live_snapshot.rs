//! LiveSnapshot — most recent production snapshot per asset.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Freshness window past which a snapshot is considered stale.
pub const STALE_AFTER_MINUTES: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotStatus {
    Running,
    Ahead,
    Behind,
    OnTarget,
    Idle,
    Down,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveSnapshot {
    pub asset_id: String,
    pub snapshot_timestamp: DateTime<Utc>,
    pub current_output: u64,
    pub target_output: u64,
    pub output_variance: f64,
    pub status: SnapshotStatus,
}

impl LiveSnapshot {
    /// Whether this snapshot is stale relative to `now`.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        (now - self.snapshot_timestamp).num_minutes() > STALE_AFTER_MINUTES
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn snapshot(age_minutes: i64) -> LiveSnapshot {
        LiveSnapshot {
            asset_id: "a1".into(),
            snapshot_timestamp: Utc::now() - Duration::minutes(age_minutes),
            current_output: 10,
            target_output: 12,
            output_variance: -2.0,
            status: SnapshotStatus::Behind,
        }
    }

    #[test]
    fn fresh_snapshot_is_not_stale() {
        assert!(!snapshot(5).is_stale(Utc::now()));
    }

    #[test]
    fn old_snapshot_is_stale() {
        assert!(snapshot(31).is_stale(Utc::now()));
    }
}
