//! End-to-end briefing tests against a real `InMemoryGateway`, exercising
//! the deadline discipline and empty-assignment handling that a single
//! module's unit tests can't observe on their own.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use foreman_os::briefing::{BriefingOrchestrator, SectionStatus};
use foreman_os::cache::ToolCache;
use foreman_os::config::{ForemanConfig, OrchestratorConfig};
use foreman_os::gateway::memory::InMemoryGateway;
use foreman_os::gateway::{DataSourceGateway, GatewayError};
use foreman_os::tools::ToolContext;
use foreman_os::types::{Asset, DailySummary, DataResult, FinancialRecord, LiveSnapshot, SafetyEvent, Severity, SnapshotStatus, TrendPoint};
use std::sync::Arc;
use std::time::Duration as StdDuration;

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn seeded_gateway() -> InMemoryGateway {
    let assets = vec![
        Asset { id: "a1".into(), name: "Grinder 5".into(), source_id: "GR-005".into(), area: "Grinding".into(), cost_center_id: None },
        Asset { id: "a2".into(), name: "Welder 2".into(), source_id: "WL-002".into(), area: "Welding".into(), cost_center_id: None },
    ];
    let mut daily_summaries = Vec::new();
    for asset in &assets {
        daily_summaries.push(DailySummary {
            id: format!("ds-{}", asset.id),
            asset_id: asset.id.clone(),
            report_date: today(),
            oee_percentage: Some(82.0),
            availability: Some(0.9),
            performance: Some(0.91),
            quality: Some(1.0),
            actual_output: 900,
            target_output: 1000,
            downtime_minutes: 5.0,
            waste_count: 0,
            financial_loss_dollars: None,
            downtime_reasons: None,
        });
    }
    let live_snapshots = vec![
        LiveSnapshot { asset_id: "a1".into(), snapshot_timestamp: Utc::now(), current_output: 400, target_output: 500, output_variance: -20.0, status: SnapshotStatus::Behind },
        LiveSnapshot { asset_id: "a2".into(), snapshot_timestamp: Utc::now(), current_output: 500, target_output: 500, output_variance: 0.0, status: SnapshotStatus::OnTarget },
    ];
    InMemoryGateway::new().with_assets(assets).with_daily_summaries(daily_summaries).with_live_snapshots(live_snapshots)
}

fn ctx_with(gateway: Arc<dyn DataSourceGateway>, orchestrator: OrchestratorConfig) -> ToolContext {
    let mut config = ForemanConfig::default();
    config.orchestrator = orchestrator;
    ToolContext::new(gateway, Arc::new(ToolCache::new(config.cache)), config)
}

/// Wraps an `InMemoryGateway`, sleeping past `delay` on every call whose
/// area argument matches `slow_area` before delegating. Used to force one
/// area's fan-out calls to miss a per-tool deadline without the test
/// actually waiting out the real budget.
struct SlowAreaGateway {
    inner: InMemoryGateway,
    slow_area: String,
    delay: StdDuration,
}

#[async_trait]
impl DataSourceGateway for SlowAreaGateway {
    async fn get_asset(&self, id: &str) -> Result<DataResult<Asset>, GatewayError> {
        self.inner.get_asset(id).await
    }
    async fn get_asset_by_name(&self, name: &str) -> Result<DataResult<Asset>, GatewayError> {
        self.inner.get_asset_by_name(name).await
    }
    async fn get_similar_assets(&self, name: &str, limit: usize) -> Result<DataResult<Vec<Asset>>, GatewayError> {
        self.inner.get_similar_assets(name, limit).await
    }
    async fn get_assets_by_area(&self, area: &str) -> Result<DataResult<Vec<Asset>>, GatewayError> {
        if area == self.slow_area {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.get_assets_by_area(area).await
    }
    async fn get_all_assets(&self) -> Result<DataResult<Vec<Asset>>, GatewayError> {
        self.inner.get_all_assets().await
    }
    async fn get_oee(&self, asset_id: &str, start_date: NaiveDate, end_date: NaiveDate) -> Result<DataResult<Vec<DailySummary>>, GatewayError> {
        self.inner.get_oee(asset_id, start_date, end_date).await
    }
    async fn get_oee_by_area(&self, area: &str, start_date: NaiveDate, end_date: NaiveDate) -> Result<DataResult<Vec<DailySummary>>, GatewayError> {
        if area == self.slow_area {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.get_oee_by_area(area, start_date, end_date).await
    }
    async fn get_downtime(&self, asset_id: &str, start_date: NaiveDate, end_date: NaiveDate) -> Result<DataResult<Vec<DailySummary>>, GatewayError> {
        self.inner.get_downtime(asset_id, start_date, end_date).await
    }
    async fn get_daily_summaries_for_date(&self, report_date: NaiveDate) -> Result<DataResult<Vec<DailySummary>>, GatewayError> {
        self.inner.get_daily_summaries_for_date(report_date).await
    }
    async fn get_live_snapshot(&self, asset_id: &str) -> Result<DataResult<LiveSnapshot>, GatewayError> {
        self.inner.get_live_snapshot(asset_id).await
    }
    async fn get_live_snapshots_by_area(&self, area: &str) -> Result<DataResult<Vec<LiveSnapshot>>, GatewayError> {
        if area == self.slow_area {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.get_live_snapshots_by_area(area).await
    }
    async fn get_shift_target(&self, asset_id: &str, today: NaiveDate) -> Result<DataResult<foreman_os::types::ShiftTarget>, GatewayError> {
        self.inner.get_shift_target(asset_id, today).await
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
        if area == Some(self.slow_area.as_str()) {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.get_safety_events(asset_id, start_date, end_date, include_resolved, area, severity).await
    }
    async fn get_financial_metrics(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        asset_id: Option<&str>,
        area: Option<&str>,
    ) -> Result<DataResult<Vec<FinancialRecord>>, GatewayError> {
        self.inner.get_financial_metrics(start_date, end_date, asset_id, area).await
    }
    async fn get_cost_of_loss(&self, start_date: NaiveDate, end_date: NaiveDate, area: Option<&str>) -> Result<DataResult<Vec<FinancialRecord>>, GatewayError> {
        self.inner.get_cost_of_loss(start_date, end_date, area).await
    }
    async fn get_trend_data(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        metric: &str,
        asset_id: Option<&str>,
        area: Option<&str>,
    ) -> Result<DataResult<Vec<TrendPoint>>, GatewayError> {
        self.inner.get_trend_data(start_date, end_date, metric, asset_id, area).await
    }
}

#[tokio::test]
async fn plant_briefing_reports_one_area_timed_out_while_others_complete() {
    let gateway: Arc<dyn DataSourceGateway> =
        Arc::new(SlowAreaGateway { inner: seeded_gateway(), slow_area: "Grinding".to_string(), delay: StdDuration::from_secs(3) });
    let orchestrator_config = OrchestratorConfig { plant_total_timeout_seconds: 2, plant_area_timeout_seconds: 1, ..OrchestratorConfig::default() };
    let ctx = ctx_with(gateway, orchestrator_config);
    let orchestrator = BriefingOrchestrator::new(ctx);

    let area_order = vec!["Grinding".to_string(), "Welding".to_string()];
    let started = std::time::Instant::now();
    let response = orchestrator.generate_plant_briefing("user-1", Some(&area_order)).await;
    assert!(started.elapsed() <= StdDuration::from_secs(3), "total elapsed should stay within the shared deadline");

    let grinding = response.sections.iter().find(|s| s.title == "Grinding").expect("grinding section present");
    assert_eq!(grinding.status, SectionStatus::TimedOut);
    assert!(grinding.error_message.as_deref().unwrap_or_default().contains("timed out") || grinding.error_message.as_deref().unwrap_or_default().contains("timeout"));

    let welding = response.sections.iter().find(|s| s.title == "Welding").expect("welding section present");
    assert_eq!(welding.status, SectionStatus::Complete);
    assert!(!welding.content.is_empty());
}

#[tokio::test]
async fn supervisor_briefing_with_no_assigned_assets_returns_single_failed_section() {
    let ctx = ctx_with(Arc::new(seeded_gateway()), OrchestratorConfig::default());
    let orchestrator = BriefingOrchestrator::new(ctx);

    let response = orchestrator.generate_supervisor_briefing("user-1", &[], None).await;

    assert_eq!(response.sections.len(), 1);
    assert_eq!(response.sections[0].section_type, "error");
    assert_eq!(response.sections[0].status, SectionStatus::Failed);
    assert_eq!(response.completion_percentage, 0.0);
}

#[tokio::test]
async fn supervisor_briefing_scopes_to_assigned_assets_only() {
    let ctx = ctx_with(Arc::new(seeded_gateway()), OrchestratorConfig::default());
    let orchestrator = BriefingOrchestrator::new(ctx);

    let response = orchestrator.generate_supervisor_briefing("user-1", &["a1".to_string()], None).await;

    assert_eq!(response.sections.len(), 1, "only Grinding should appear, since only a1 is assigned");
    assert_eq!(response.sections[0].title, "Grinding");
    assert_eq!(response.sections[0].status, SectionStatus::Complete);
}

#[tokio::test]
async fn eod_summary_compares_against_the_morning_briefing_generated_the_same_day() {
    use chrono::Timelike;

    let ctx = ctx_with(Arc::new(seeded_gateway()), OrchestratorConfig::default());
    let orchestrator = BriefingOrchestrator::new(ctx);

    let _morning = orchestrator.generate_plant_briefing("user-1", None).await;
    let eod = orchestrator.generate_eod_summary("user-1", Some(today())).await;

    assert_eq!(eod.sections.len(), 5);
    let comparison = eod.sections.iter().find(|s| s.section_type == "morning_comparison").expect("comparison section present");
    if Utc::now().hour() < 12 {
        assert!(!comparison.content.contains("No morning briefing"), "a briefing generated before noon should be kept as this morning's record");
    } else {
        assert!(comparison.content.contains("No morning briefing"), "a briefing generated after noon is not this morning's record");
    }
}

#[tokio::test]
async fn eod_summary_without_a_prior_morning_briefing_notes_there_is_nothing_to_compare() {
    let ctx = ctx_with(Arc::new(seeded_gateway()), OrchestratorConfig::default());
    let orchestrator = BriefingOrchestrator::new(ctx);

    let eod = orchestrator.generate_eod_summary("user-never-briefed", Some(today())).await;

    let comparison = eod.sections.iter().find(|s| s.section_type == "morning_comparison").expect("comparison section present");
    assert!(comparison.content.contains("No morning briefing"));
}

#[tokio::test]
async fn shift_handoff_produces_four_sections_within_budget() {
    let ctx = ctx_with(Arc::new(seeded_gateway()), OrchestratorConfig::default());
    let orchestrator = BriefingOrchestrator::new(ctx);

    let started = std::time::Instant::now();
    let response = orchestrator.generate_shift_handoff("user-1").await;
    assert!(started.elapsed() <= StdDuration::from_secs(16));

    assert_eq!(response.sections.len(), 4);
    assert!(!response.background_continuation);
    for section in &response.sections {
        if section.status == SectionStatus::Complete {
            assert!(!section.content.is_empty(), "{} reported complete with empty content", section.title);
        }
    }
}

#[tokio::test]
async fn every_briefing_kind_floors_its_duration_estimate() {
    let ctx = ctx_with(Arc::new(seeded_gateway()), OrchestratorConfig::default());
    let orchestrator = BriefingOrchestrator::new(ctx);

    let plant = orchestrator.generate_plant_briefing("user-1", None).await;
    assert!(plant.total_duration_estimate >= 75.0);
}
