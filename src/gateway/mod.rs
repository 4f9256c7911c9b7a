//! Data Source Gateway — the only component that talks to the store.

mod error;
pub mod memory;

pub use error::GatewayError;

use crate::types::{Asset, DailySummary, DataResult, FinancialRecord, LiveSnapshot, SafetyEvent, Severity, TrendPoint};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Read-only typed queries over operational entities. All operations are
/// idempotent and safe to retry; empty result sets are returned as
/// `has_data=false`, never as an error.
#[async_trait]
pub trait DataSourceGateway: Send + Sync {
    async fn get_asset(&self, id: &str) -> Result<DataResult<Asset>, GatewayError>;

    /// Fuzzy, case-insensitive lookup: prefers an exact match, then the
    /// first substring match.
    async fn get_asset_by_name(&self, name: &str) -> Result<DataResult<Asset>, GatewayError>;

    /// Substring match ordered by closest match, capped at `limit`.
    async fn get_similar_assets(&self, name: &str, limit: usize) -> Result<DataResult<Vec<Asset>>, GatewayError>;

    async fn get_assets_by_area(&self, area: &str) -> Result<DataResult<Vec<Asset>>, GatewayError>;

    async fn get_all_assets(&self) -> Result<DataResult<Vec<Asset>>, GatewayError>;

    /// Ordered by `report_date` descending.
    async fn get_oee(
        &self,
        asset_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<DataResult<Vec<DailySummary>>, GatewayError>;

    async fn get_oee_by_area(
        &self,
        area: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<DataResult<Vec<DailySummary>>, GatewayError>;

    /// Daily summaries with `downtime_minutes > 0`.
    async fn get_downtime(
        &self,
        asset_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<DataResult<Vec<DailySummary>>, GatewayError>;

    /// Every asset's daily summary on exactly `report_date`, used by the
    /// Action Engine's OEE tier rather than being scoped to
    /// one asset or area.
    async fn get_daily_summaries_for_date(&self, report_date: NaiveDate) -> Result<DataResult<Vec<DailySummary>>, GatewayError>;

    async fn get_live_snapshot(&self, asset_id: &str) -> Result<DataResult<LiveSnapshot>, GatewayError>;

    async fn get_live_snapshots_by_area(&self, area: &str) -> Result<DataResult<Vec<LiveSnapshot>>, GatewayError>;

    /// Latest target with `effective_date <= today`.
    async fn get_shift_target(&self, asset_id: &str, today: NaiveDate) -> Result<DataResult<crate::types::ShiftTarget>, GatewayError>;

    #[allow(clippy::too_many_arguments)]
    async fn get_safety_events(
        &self,
        asset_id: Option<&str>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        include_resolved: bool,
        area: Option<&str>,
        severity: Option<Severity>,
    ) -> Result<DataResult<Vec<SafetyEvent>>, GatewayError>;

    /// Joins daily summaries with cost-center rates.
    async fn get_financial_metrics(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        asset_id: Option<&str>,
        area: Option<&str>,
    ) -> Result<DataResult<Vec<FinancialRecord>>, GatewayError>;

    /// Same join as `get_financial_metrics`, scoped for ranking.
    async fn get_cost_of_loss(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        area: Option<&str>,
    ) -> Result<DataResult<Vec<FinancialRecord>>, GatewayError>;

    async fn get_trend_data(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        metric: &str,
        asset_id: Option<&str>,
        area: Option<&str>,
    ) -> Result<DataResult<Vec<TrendPoint>>, GatewayError>;
}
