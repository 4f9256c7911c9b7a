//! Supervisor briefing: the plant briefing scoped down to exactly the
//! assets a supervisor is assigned, with no plant-wide headline and no
//! result caching (an assignment change must show up immediately).

use super::topology::resolve_area_order;
use super::{classify_area_section, finalize, AreaOutcome, BriefingOrchestrator, BriefingResponse, BriefingSection};
use crate::time_range::TimeRange;
use crate::tools::{database_citation, downtime, oee, ToolContext};
use chrono::Utc;
use std::collections::BTreeSet;
use std::time::Duration as StdDuration;
use tokio::task::JoinSet;
use tokio::time::{sleep_until, timeout, Instant};

impl BriefingOrchestrator {
    /// Generates a briefing scoped to `assigned_asset_ids`. An empty
    /// assignment, or one whose assets fall in no recognized area,
    /// produces a single failed "no assets assigned" section.
    pub async fn generate_supervisor_briefing(&self, _user_id: &str, assigned_asset_ids: &[String], area_order: Option<&[String]>) -> BriefingResponse {
        if assigned_asset_ids.is_empty() {
            return finalize(vec![no_assets_assigned_section()], Vec::new());
        }

        let orchestrator_config = self.ctx.config.orchestrator;
        let per_area_timeout = StdDuration::from_secs(orchestrator_config.plant_area_timeout_seconds);
        let deadline = Instant::now() + StdDuration::from_secs(orchestrator_config.plant_total_timeout_seconds);
        let today = Utc::now().date_naive();
        let range = TimeRange { start: today, end: today, description: "today".to_string() };

        let order = resolve_area_order(area_order);
        let assigned: BTreeSet<&str> = assigned_asset_ids.iter().map(String::as_str).collect();

        let mut scoped: Vec<(String, Vec<String>)> = Vec::new();
        for area in &order {
            let Ok(assets) = self.ctx.gateway.get_assets_by_area(area).await else { continue };
            let ids: Vec<String> = assets.rows().iter().map(|a| a.id.clone()).filter(|id| assigned.contains(id.as_str())).collect();
            if !ids.is_empty() {
                scoped.push((area.clone(), ids));
            }
        }

        if scoped.is_empty() {
            return finalize(vec![no_assets_assigned_section()], Vec::new());
        }

        let mut join_set: JoinSet<(usize, AreaOutcome)> = JoinSet::new();
        for (index, (area, ids)) in scoped.iter().cloned().enumerate() {
            let ctx = self.ctx.clone();
            let range = range.clone();
            join_set.spawn(async move { (index, build_scoped_area_section(ctx, area, ids, range, per_area_timeout).await) });
        }

        let mut outcomes: Vec<Option<AreaOutcome>> = (0..scoped.len()).map(|_| None).collect();
        while !join_set.is_empty() {
            tokio::select! {
                biased;
                () = sleep_until(deadline) => {
                    join_set.abort_all();
                    break;
                }
                joined = join_set.join_next() => {
                    match joined {
                        Some(Ok((index, outcome))) => outcomes[index] = Some(outcome),
                        Some(Err(_)) | None => {}
                    }
                }
            }
        }

        let mut tool_failures = Vec::new();
        let mut sections = Vec::new();
        for (index, (area, _)) in scoped.iter().enumerate() {
            match outcomes[index].take() {
                Some(outcome) => {
                    tool_failures.extend(outcome.tool_failures);
                    sections.push(outcome.section);
                }
                None => sections.push(BriefingSection::timed_out("area", area.clone())),
            }
        }

        finalize(sections, tool_failures)
    }
}

fn no_assets_assigned_section() -> BriefingSection {
    BriefingSection::failed("error", "No Assets Assigned", "No assets assigned — contact your administrator")
}

/// Composes one area's section scoped to `asset_ids`, fetching live
/// snapshot, OEE/downtime, and safety data per asset directly from the
/// Gateway since no capability tool scopes to an arbitrary asset subset.
async fn build_scoped_area_section(ctx: ToolContext, area: String, asset_ids: Vec<String>, range: TimeRange, per_tool_timeout: StdDuration) -> AreaOutcome {
    let snapshots_fut = timeout(per_tool_timeout, fetch_snapshots(&ctx, &asset_ids));
    let oee_fut = timeout(per_tool_timeout, fetch_oee_rows(&ctx, &asset_ids, &range));
    let safety_fut = timeout(per_tool_timeout, fetch_safety_events(&ctx, &asset_ids, &range));

    let (snapshots_res, oee_res, safety_res) = tokio::join!(snapshots_fut, oee_fut, safety_fut);

    let mut tool_failures = Vec::new();
    let mut citations = Vec::new();
    let mut parts = Vec::new();
    let mut concern = None;

    match snapshots_res {
        Ok(rows) if !rows.is_empty() => {
            let total_current: u64 = rows.iter().map(|s| s.current_output).sum();
            let total_target: u64 = rows.iter().map(|s| s.target_output).sum();
            if total_target > 0 {
                let variance = (total_current as f64 - total_target as f64) / total_target as f64 * 100.0;
                let direction = if variance < 0.0 { "behind" } else { "ahead of" };
                parts.push(format!("{area} is running {:.0}% {direction} target", variance.abs()));
                if variance < -10.0 {
                    concern = Some(format!("{area}: running behind target"));
                }
            }
        }
        Ok(_) => parts.push(format!("{area} has no live production data")),
        Err(_) => tool_failures.push(format!("production_status:{area}: timed out")),
    }

    let mut oee_rows = Vec::new();
    match oee_res {
        Ok((rows, cites)) => {
            if let Some(mean) = oee::weighted_mean_oee(&rows) {
                parts.push(format!("OEE is running at {mean:.1}%"));
            }
            citations.extend(cites);
            oee_rows = rows;
        }
        Err(_) => tool_failures.push(format!("oee_query:{area}: timed out")),
    }

    match safety_res {
        Ok((rows, cites)) => {
            let active = rows.iter().filter(|e| e.is_active()).count();
            if active > 0 {
                parts.push(format!("{active} safety event(s) logged"));
                concern.get_or_insert_with(|| format!("{area}: safety event(s) logged"));
            }
            citations.extend(cites);
        }
        Err(_) => tool_failures.push(format!("safety_events:{area}: timed out")),
    }

    let total_downtime: f64 = oee_rows.iter().map(|r| r.downtime_minutes).sum();
    if total_downtime > super::DOWNTIME_MENTION_THRESHOLD_MINUTES {
        if let Some(reason) = downtime::top_reason(&oee_rows) {
            parts.push(format!("top downtime contributor is {reason} at {total_downtime:.0} minutes"));
        }
    }

    AreaOutcome { section: classify_area_section(&area, &parts, &tool_failures, citations), tool_failures, concern }
}

async fn fetch_snapshots(ctx: &ToolContext, asset_ids: &[String]) -> Vec<crate::types::LiveSnapshot> {
    let mut rows = Vec::new();
    for asset_id in asset_ids {
        if let Ok(result) = ctx.gateway.get_live_snapshot(asset_id).await {
            rows.extend(result.data);
        }
    }
    rows
}

async fn fetch_oee_rows(ctx: &ToolContext, asset_ids: &[String], range: &TimeRange) -> (Vec<crate::types::DailySummary>, Vec<crate::types::Citation>) {
    let mut rows = Vec::new();
    let mut citations = Vec::new();
    for asset_id in asset_ids {
        if let Ok(result) = ctx.gateway.get_oee(asset_id, range.start, range.end).await {
            if result.has_data() {
                citations.push(database_citation(
                    &result,
                    None,
                    Some(asset_id.clone()),
                    format!("{} daily summaries", result.rows().len()),
                    format!("[Source: daily_summaries/{asset_id}]"),
                ));
            }
            rows.extend(result.rows().iter().cloned());
        }
    }
    (rows, citations)
}

async fn fetch_safety_events(ctx: &ToolContext, asset_ids: &[String], range: &TimeRange) -> (Vec<crate::types::SafetyEvent>, Vec<crate::types::Citation>) {
    let mut rows = Vec::new();
    let mut citations = Vec::new();
    for asset_id in asset_ids {
        if let Ok(result) = ctx.gateway.get_safety_events(Some(asset_id.as_str()), range.start, range.end, false, None, None).await {
            if result.has_data() {
                citations.push(database_citation(
                    &result,
                    None,
                    Some(asset_id.clone()),
                    format!("{} safety events", result.rows().len()),
                    format!("[Source: safety_events/{asset_id}]"),
                ));
            }
            rows.extend(result.rows().iter().cloned());
        }
    }
    (rows, citations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_assets_assigned_section_is_a_failed_error_section() {
        let section = no_assets_assigned_section();
        assert_eq!(section.section_type, "error");
        assert_eq!(section.status, crate::briefing::SectionStatus::Failed);
        assert!(section.error_message.expect("message present").contains("No assets assigned"));
    }
}
