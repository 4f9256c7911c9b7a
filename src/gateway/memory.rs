//! InMemoryGateway — reference `DataSourceGateway` for tests, demos, and
//! minimal deployments. Thread-safe via `RwLock`; not durable: plain
//! `RwLock<Vec<_>>` stores behind a narrow trait, no external dependency.

use super::{DataSourceGateway, GatewayError};
use crate::types::{
    Asset, CostCenter, DailySummary, DataResult, FinancialRecord, LiveSnapshot, SafetyEvent, Severity, ShiftTarget,
    TrendPoint,
};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::sync::RwLock;

#[derive(Default)]
pub struct InMemoryGateway {
    assets: RwLock<Vec<Asset>>,
    daily_summaries: RwLock<Vec<DailySummary>>,
    live_snapshots: RwLock<Vec<LiveSnapshot>>,
    shift_targets: RwLock<Vec<ShiftTarget>>,
    safety_events: RwLock<Vec<SafetyEvent>>,
    cost_centers: RwLock<Vec<CostCenter>>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_assets(self, assets: Vec<Asset>) -> Self {
        *self.assets.write().expect("lock poisoned") = assets;
        self
    }

    pub fn with_daily_summaries(self, rows: Vec<DailySummary>) -> Self {
        *self.daily_summaries.write().expect("lock poisoned") = rows;
        self
    }

    pub fn with_live_snapshots(self, rows: Vec<LiveSnapshot>) -> Self {
        *self.live_snapshots.write().expect("lock poisoned") = rows;
        self
    }

    pub fn with_shift_targets(self, rows: Vec<ShiftTarget>) -> Self {
        *self.shift_targets.write().expect("lock poisoned") = rows;
        self
    }

    pub fn with_safety_events(self, rows: Vec<SafetyEvent>) -> Self {
        *self.safety_events.write().expect("lock poisoned") = rows;
        self
    }

    pub fn with_cost_centers(self, rows: Vec<CostCenter>) -> Self {
        *self.cost_centers.write().expect("lock poisoned") = rows;
        self
    }

    fn cost_center_for(&self, asset: &Asset) -> Option<CostCenter> {
        let centers = self.cost_centers.read().expect("lock poisoned");
        let id = asset.cost_center_id.as_ref()?;
        centers.iter().find(|c| &c.id == id).cloned()
    }

    fn asset_by_id(&self, id: &str) -> Option<Asset> {
        self.assets.read().expect("lock poisoned").iter().find(|a| a.id == id).cloned()
    }
}

#[async_trait]
impl DataSourceGateway for InMemoryGateway {
    async fn get_asset(&self, id: &str) -> Result<DataResult<Asset>, GatewayError> {
        let now = Utc::now();
        let found = self.asset_by_id(id);
        Ok(DataResult::single(found, "memory", "assets", format!("asset by id {id}"), now))
    }

    async fn get_asset_by_name(&self, name: &str) -> Result<DataResult<Asset>, GatewayError> {
        let now = Utc::now();
        let needle = name.to_lowercase();
        let assets = self.assets.read().expect("lock poisoned");

        let exact = assets.iter().find(|a| a.name.to_lowercase() == needle);
        let found = exact
            .or_else(|| assets.iter().find(|a| a.name.to_lowercase().contains(&needle)))
            .cloned();
        Ok(DataResult::single(found, "memory", "assets", format!("asset by name {name}"), now))
    }

    async fn get_similar_assets(&self, name: &str, limit: usize) -> Result<DataResult<Vec<Asset>>, GatewayError> {
        let now = Utc::now();
        let needle = name.to_lowercase();
        let assets = self.assets.read().expect("lock poisoned");

        let mut matches: Vec<Asset> = assets.iter().filter(|a| a.name.to_lowercase().contains(&needle)).cloned().collect();
        matches.sort_by_key(|a| (a.name.len() as i64 - needle.len() as i64).unsigned_abs());
        matches.truncate(limit);

        Ok(DataResult::list(matches, "memory", "assets", format!("similar assets to {name}"), now))
    }

    async fn get_assets_by_area(&self, area: &str) -> Result<DataResult<Vec<Asset>>, GatewayError> {
        let now = Utc::now();
        let matches: Vec<Asset> =
            self.assets.read().expect("lock poisoned").iter().filter(|a| a.area == area).cloned().collect();
        Ok(DataResult::list(matches, "memory", "assets", format!("assets in area {area}"), now))
    }

    async fn get_all_assets(&self) -> Result<DataResult<Vec<Asset>>, GatewayError> {
        let now = Utc::now();
        let all = self.assets.read().expect("lock poisoned").clone();
        Ok(DataResult::list(all, "memory", "assets", "all assets", now))
    }

    async fn get_oee(
        &self,
        asset_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<DataResult<Vec<DailySummary>>, GatewayError> {
        let now = Utc::now();
        let mut rows: Vec<DailySummary> = self
            .daily_summaries
            .read()
            .expect("lock poisoned")
            .iter()
            .filter(|s| s.asset_id == asset_id && s.report_date >= start_date && s.report_date <= end_date)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.report_date.cmp(&a.report_date));
        Ok(DataResult::list(rows, "memory", "daily_summaries", format!("oee for {asset_id}"), now))
    }

    async fn get_oee_by_area(
        &self,
        area: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<DataResult<Vec<DailySummary>>, GatewayError> {
        let now = Utc::now();
        let asset_ids: Vec<String> =
            self.assets.read().expect("lock poisoned").iter().filter(|a| a.area == area).map(|a| a.id.clone()).collect();
        let mut rows: Vec<DailySummary> = self
            .daily_summaries
            .read()
            .expect("lock poisoned")
            .iter()
            .filter(|s| asset_ids.contains(&s.asset_id) && s.report_date >= start_date && s.report_date <= end_date)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.report_date.cmp(&a.report_date));
        Ok(DataResult::list(rows, "memory", "daily_summaries", format!("oee for area {area}"), now))
    }

    async fn get_downtime(
        &self,
        asset_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<DataResult<Vec<DailySummary>>, GatewayError> {
        let now = Utc::now();
        let mut rows: Vec<DailySummary> = self
            .daily_summaries
            .read()
            .expect("lock poisoned")
            .iter()
            .filter(|s| {
                s.asset_id == asset_id
                    && s.report_date >= start_date
                    && s.report_date <= end_date
                    && s.downtime_minutes > 0.0
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.report_date.cmp(&a.report_date));
        Ok(DataResult::list(rows, "memory", "daily_summaries", format!("downtime for {asset_id}"), now))
    }

    async fn get_daily_summaries_for_date(&self, report_date: NaiveDate) -> Result<DataResult<Vec<DailySummary>>, GatewayError> {
        let now = Utc::now();
        let rows: Vec<DailySummary> = self
            .daily_summaries
            .read()
            .expect("lock poisoned")
            .iter()
            .filter(|s| s.report_date == report_date)
            .cloned()
            .collect();
        Ok(DataResult::list(rows, "memory", "daily_summaries", format!("daily summaries for {report_date}"), now))
    }

    async fn get_live_snapshot(&self, asset_id: &str) -> Result<DataResult<LiveSnapshot>, GatewayError> {
        let now = Utc::now();
        let found = self
            .live_snapshots
            .read()
            .expect("lock poisoned")
            .iter()
            .filter(|s| s.asset_id == asset_id)
            .max_by_key(|s| s.snapshot_timestamp)
            .cloned();
        Ok(DataResult::single(found, "memory", "live_snapshots", format!("live snapshot for {asset_id}"), now))
    }

    async fn get_live_snapshots_by_area(&self, area: &str) -> Result<DataResult<Vec<LiveSnapshot>>, GatewayError> {
        let now = Utc::now();
        let asset_ids: Vec<String> =
            self.assets.read().expect("lock poisoned").iter().filter(|a| a.area == area).map(|a| a.id.clone()).collect();

        let snapshots = self.live_snapshots.read().expect("lock poisoned");
        let mut latest: Vec<LiveSnapshot> = Vec::new();
        for asset_id in &asset_ids {
            if let Some(snap) = snapshots.iter().filter(|s| &s.asset_id == asset_id).max_by_key(|s| s.snapshot_timestamp) {
                latest.push(snap.clone());
            }
        }
        Ok(DataResult::list(latest, "memory", "live_snapshots", format!("live snapshots for area {area}"), now))
    }

    async fn get_shift_target(&self, asset_id: &str, today: NaiveDate) -> Result<DataResult<ShiftTarget>, GatewayError> {
        let now = Utc::now();
        let targets = self.shift_targets.read().expect("lock poisoned");
        let candidates: Vec<ShiftTarget> = targets.iter().filter(|t| t.asset_id == asset_id).cloned().collect();
        let found = crate::types::applicable_target(&candidates, today).cloned();
        Ok(DataResult::single(found, "memory", "shift_targets", format!("shift target for {asset_id}"), now))
    }

    async fn get_safety_events(
        &self,
        asset_id: Option<&str>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        include_resolved: bool,
        area: Option<&str>,
        severity: Option<Severity>,
    ) -> Result<DataResult<Vec<SafetyEvent>>, GatewayError> {
        let now = Utc::now();
        let area_asset_ids: Option<Vec<String>> = area.map(|area| {
            self.assets.read().expect("lock poisoned").iter().filter(|a| a.area == area).map(|a| a.id.clone()).collect()
        });

        let mut rows: Vec<SafetyEvent> = self
            .safety_events
            .read()
            .expect("lock poisoned")
            .iter()
            .filter(|e| {
                let in_window = e.event_timestamp.date_naive() >= start_date && e.event_timestamp.date_naive() <= end_date;
                let matches_asset = asset_id.map_or(true, |id| e.asset_id == id);
                let matches_area = area_asset_ids.as_ref().map_or(true, |ids| ids.contains(&e.asset_id));
                let matches_resolution = include_resolved || e.is_active();
                let matches_severity = severity.map_or(true, |s| e.severity == s);
                in_window && matches_asset && matches_area && matches_resolution && matches_severity
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.event_timestamp.cmp(&a.event_timestamp));
        Ok(DataResult::list(rows, "memory", "safety_events", "safety events".to_string(), now))
    }

    async fn get_financial_metrics(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        asset_id: Option<&str>,
        area: Option<&str>,
    ) -> Result<DataResult<Vec<FinancialRecord>>, GatewayError> {
        let now = Utc::now();
        let rows = self.join_financial_records(start_date, end_date, asset_id, area);
        Ok(DataResult::list(rows, "memory", "daily_summaries", "financial metrics".to_string(), now))
    }

    async fn get_cost_of_loss(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        area: Option<&str>,
    ) -> Result<DataResult<Vec<FinancialRecord>>, GatewayError> {
        let now = Utc::now();
        let rows = self.join_financial_records(start_date, end_date, None, area);
        Ok(DataResult::list(rows, "memory", "daily_summaries", "cost of loss".to_string(), now))
    }

    async fn get_trend_data(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        metric: &str,
        asset_id: Option<&str>,
        area: Option<&str>,
    ) -> Result<DataResult<Vec<TrendPoint>>, GatewayError> {
        let now = Utc::now();
        let area_asset_ids: Option<Vec<String>> = area.map(|area| {
            self.assets.read().expect("lock poisoned").iter().filter(|a| a.area == area).map(|a| a.id.clone()).collect()
        });

        let summaries = self.daily_summaries.read().expect("lock poisoned");
        let mut points: Vec<TrendPoint> = Vec::new();
        for summary in summaries.iter() {
            let in_window = summary.report_date >= start_date && summary.report_date <= end_date;
            let matches_asset = asset_id.map_or(true, |id| summary.asset_id == id);
            let matches_area = area_asset_ids.as_ref().map_or(true, |ids| ids.contains(&summary.asset_id));
            if !(in_window && matches_asset && matches_area) {
                continue;
            }
            let Some(value) = metric_value(summary, metric) else { continue };
            let asset_name = self.asset_by_id(&summary.asset_id).map(|a| a.name);
            points.push(TrendPoint {
                date: summary.report_date,
                value,
                downtime_reasons: summary.downtime_reasons.clone(),
                asset_name,
            });
        }
        points.sort_by_key(|p| p.date);
        Ok(DataResult::list(points, "memory", "daily_summaries", format!("trend for {metric}"), now))
    }
}

impl InMemoryGateway {
    fn join_financial_records(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        asset_id: Option<&str>,
        area: Option<&str>,
    ) -> Vec<FinancialRecord> {
        let area_asset_ids: Option<Vec<String>> = area.map(|area| {
            self.assets.read().expect("lock poisoned").iter().filter(|a| a.area == area).map(|a| a.id.clone()).collect()
        });

        let summaries = self.daily_summaries.read().expect("lock poisoned");
        let mut rows = Vec::new();
        for summary in summaries.iter() {
            let in_window = summary.report_date >= start_date && summary.report_date <= end_date;
            let matches_asset = asset_id.map_or(true, |id| summary.asset_id == id);
            let matches_area = area_asset_ids.as_ref().map_or(true, |ids| ids.contains(&summary.asset_id));
            if !(in_window && matches_asset && matches_area) {
                continue;
            }
            let Some(asset) = self.asset_by_id(&summary.asset_id) else { continue };
            let center = self.cost_center_for(&asset);
            rows.push(FinancialRecord {
                asset_id: asset.id.clone(),
                asset_name: asset.name.clone(),
                report_date: summary.report_date,
                downtime_minutes: summary.downtime_minutes,
                waste_count: summary.waste_count,
                standard_hourly_rate: center.as_ref().map(|c| c.standard_hourly_rate),
                cost_per_unit: center.as_ref().map(|c| c.cost_per_unit),
                downtime_reasons: summary.downtime_reasons.clone(),
            });
        }
        rows
    }
}

fn metric_value(summary: &DailySummary, metric: &str) -> Option<f64> {
    match metric {
        "oee_percentage" | "oee" => summary.oee_percentage,
        "availability" => summary.availability,
        "performance" => summary.performance,
        "quality" => summary.quality,
        "downtime_minutes" | "downtime" => Some(summary.downtime_minutes),
        "waste_count" | "waste" => Some(summary.waste_count as f64),
        "actual_output" | "output" => Some(summary.actual_output as f64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CostCenter, DailySummary};

    fn asset(id: &str, name: &str, area: &str) -> Asset {
        Asset { id: id.into(), name: name.into(), source_id: id.into(), area: area.into(), cost_center_id: Some("cc1".into()) }
    }

    fn summary(asset_id: &str, date: &str, oee: f64, downtime: f64) -> DailySummary {
        DailySummary {
            id: format!("{asset_id}-{date}"),
            asset_id: asset_id.into(),
            report_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").expect("valid date"),
            oee_percentage: Some(oee),
            availability: None,
            performance: None,
            quality: None,
            actual_output: 100,
            target_output: 120,
            downtime_minutes: downtime,
            waste_count: 2,
            financial_loss_dollars: None,
            downtime_reasons: None,
        }
    }

    fn gateway() -> InMemoryGateway {
        InMemoryGateway::new()
            .with_assets(vec![asset("a1", "Line 1", "Packaging"), asset("a2", "Line 2", "Packaging")])
            .with_cost_centers(vec![CostCenter { id: "cc1".into(), standard_hourly_rate: 100.0, cost_per_unit: 2.0 }])
            .with_daily_summaries(vec![
                summary("a1", "2026-01-01", 72.0, 30.0),
                summary("a1", "2026-01-02", 80.0, 0.0),
            ])
    }

    #[tokio::test]
    async fn exact_name_match_wins_over_substring() {
        let gw = gateway();
        let result = gw.get_asset_by_name("Line 1").await.expect("gateway ok");
        assert_eq!(result.data.expect("asset found").id, "a1");
    }

    #[tokio::test]
    async fn downtime_filters_zero_minute_days() {
        let gw = gateway();
        let start = NaiveDate::parse_from_str("2026-01-01", "%Y-%m-%d").expect("valid date");
        let end = NaiveDate::parse_from_str("2026-01-02", "%Y-%m-%d").expect("valid date");
        let result = gw.get_downtime("a1", start, end).await.expect("gateway ok");
        assert_eq!(result.row_count, 1);
    }

    #[tokio::test]
    async fn financial_metrics_join_cost_center_rates() {
        let gw = gateway();
        let start = NaiveDate::parse_from_str("2026-01-01", "%Y-%m-%d").expect("valid date");
        let end = NaiveDate::parse_from_str("2026-01-02", "%Y-%m-%d").expect("valid date");
        let result = gw.get_financial_metrics(start, end, Some("a1"), None).await.expect("gateway ok");
        let rows = result.rows();
        assert!(rows.iter().all(FinancialRecord::has_cost_data));
    }
}
