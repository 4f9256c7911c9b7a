//! Demo CLI for the manufacturing operations intelligence engine.
//!
//! Runs every capability entirely against an in-memory seed dataset — there
//! is no live plant connection here, only a way to exercise the tools,
//! briefings, and grounding validator from a terminal.
//!
//! # Usage
//!
//! ```bash
//! foreman-cli action-list
//! foreman-cli briefing plant
//! foreman-cli briefing supervisor --asset a1 --asset a2
//! foreman-cli briefing eod
//! foreman-cli briefing handoff
//! foreman-cli ground "Grinder 5 ran at 92% OEE yesterday."
//! ```

use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use foreman_os::briefing::BriefingOrchestrator;
use foreman_os::cache::ToolCache;
use foreman_os::config::ForemanConfig;
use foreman_os::gateway::memory::InMemoryGateway;
use foreman_os::grounding::{EvidenceRecord, GroundingValidator};
use foreman_os::llm::UnconfiguredLlmClient;
use foreman_os::tools::{ToolContext, ToolRegistry};
use foreman_os::types::{Asset, CostCenter, DailySummary, LiveSnapshot, SafetyEvent, Severity, SnapshotStatus};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "foreman-cli")]
#[command(about = "Manufacturing operations intelligence demo CLI")]
#[command(version)]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the prioritized daily action list.
    ActionList {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Generate a briefing.
    Briefing {
        #[command(subcommand)]
        kind: BriefingKind,
    },
    /// Run the seeded response text through the grounding validator.
    Ground {
        text: String,
    },
}

#[derive(Subcommand, Debug)]
enum BriefingKind {
    /// Plant-wide briefing across every seeded area.
    Plant,
    /// Briefing scoped to the given asset ids.
    Supervisor {
        #[arg(long = "asset")]
        assets: Vec<String>,
    },
    /// End-of-day summary for the seeded "today".
    Eod,
    /// Shift handoff synthesis.
    Handoff,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    foreman_os::telemetry::init_tracing();

    let args = CliArgs::parse();
    let config = ForemanConfig::load();
    let gateway = Arc::new(seed_gateway());
    let cache = Arc::new(ToolCache::new(config.cache));
    let ctx = ToolContext::new(gateway, cache, config);

    match args.command {
        Command::ActionList { category, limit } => {
            let registry = ToolRegistry::new(ctx);
            let input = serde_json::json!({"category": category, "limit": limit});
            let result = registry.run("action_list", "cli-user", input).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Briefing { kind } => {
            let orchestrator = BriefingOrchestrator::new(ctx);
            let response = match kind {
                BriefingKind::Plant => orchestrator.generate_plant_briefing("cli-user", None).await,
                BriefingKind::Supervisor { assets } => orchestrator.generate_supervisor_briefing("cli-user", &assets, None).await,
                BriefingKind::Eod => orchestrator.generate_eod_summary("cli-user", None).await,
                BriefingKind::Handoff => orchestrator.generate_shift_handoff("cli-user").await,
            };
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Ground { text } => {
            let llm = UnconfiguredLlmClient;
            let validator = GroundingValidator::new(&llm, ctx.config.grounding);
            let evidence = seed_evidence();
            let response = validator.validate_response(&text, &evidence, &[]).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}

/// Three assets across two areas, a week of daily summaries apiece, one
/// live snapshot per asset, and a single open safety event — enough to
/// exercise every section of every briefing kind.
fn seed_gateway() -> InMemoryGateway {
    let today = Utc::now().date_naive();

    let assets = vec![
        Asset { id: "a1".into(), name: "Grinder 5".into(), source_id: "GR-005".into(), area: "Grinding".into(), cost_center_id: Some("cc-grinding".into()) },
        Asset { id: "a2".into(), name: "Welder 2".into(), source_id: "WL-002".into(), area: "Welding".into(), cost_center_id: Some("cc-welding".into()) },
        Asset { id: "a3".into(), name: "Assembly Line 1".into(), source_id: "AL-001".into(), area: "Assembly".into(), cost_center_id: None },
    ];

    let mut daily_summaries = Vec::new();
    for asset in &assets {
        for offset in 0..7 {
            let report_date = today - Duration::days(offset);
            let oee = 78.0 + f64::from(u32::try_from(offset).unwrap_or(0));
            daily_summaries.push(DailySummary {
                id: format!("ds-{}-{offset}", asset.id),
                asset_id: asset.id.clone(),
                report_date,
                oee_percentage: Some(oee),
                availability: Some(0.9),
                performance: Some(0.88),
                quality: Some(0.97),
                actual_output: 900,
                target_output: 1000,
                downtime_minutes: if asset.id == "a2" { 40.0 } else { 5.0 },
                waste_count: 12,
                financial_loss_dollars: None,
                downtime_reasons: Some(if asset.id == "a2" { downtime_reasons(&[("changeover", 25.0), ("jam", 15.0)]) } else { downtime_reasons(&[("changeover", 5.0)]) }),
            });
        }
    }

    let live_snapshots = vec![
        LiveSnapshot { asset_id: "a1".into(), snapshot_timestamp: Utc::now(), current_output: 420, target_output: 500, output_variance: -16.0, status: SnapshotStatus::Behind },
        LiveSnapshot { asset_id: "a2".into(), snapshot_timestamp: Utc::now(), current_output: 510, target_output: 500, output_variance: 2.0, status: SnapshotStatus::Ahead },
        LiveSnapshot { asset_id: "a3".into(), snapshot_timestamp: Utc::now(), current_output: 495, target_output: 500, output_variance: -1.0, status: SnapshotStatus::OnTarget },
    ];

    let safety_events = vec![SafetyEvent {
        id: "se-1".into(),
        asset_id: "a2".into(),
        event_timestamp: Utc::now() - Duration::hours(2),
        reason_code: "near_miss".into(),
        severity: Severity::Medium,
        description: "Guard left open during changeover".into(),
        is_resolved: false,
        resolved_at: None,
    }];

    let cost_centers = vec![
        CostCenter { id: "cc-grinding".into(), standard_hourly_rate: 120.0, cost_per_unit: 2.5 },
        CostCenter { id: "cc-welding".into(), standard_hourly_rate: 150.0, cost_per_unit: 3.0 },
    ];

    InMemoryGateway::new()
        .with_assets(assets)
        .with_daily_summaries(daily_summaries)
        .with_live_snapshots(live_snapshots)
        .with_safety_events(safety_events)
        .with_cost_centers(cost_centers)
}

fn downtime_reasons(reasons: &[(&str, f64)]) -> BTreeMap<String, f64> {
    reasons.iter().map(|(reason, minutes)| ((*reason).to_string(), *minutes)).collect()
}

fn seed_evidence() -> Vec<EvidenceRecord> {
    let mut fields = BTreeMap::new();
    fields.insert("asset_name".to_string(), serde_json::json!("Grinder 5"));
    fields.insert("oee_percentage".to_string(), serde_json::json!(78.0));
    vec![EvidenceRecord {
        source_table: "daily_summaries".into(),
        record_id: Some("ds-a1-0".into()),
        asset_id: Some("a1".into()),
        asset_name: Some("Grinder 5".into()),
        timestamp: Some(Utc::now()),
        fields,
    }]
}
