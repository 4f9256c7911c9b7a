//! Plant-wide briefing: a headline section plus one concurrently composed
//! section per production area, bounded by a shared total deadline.

use super::topology::resolve_area_order;
use super::{classify_area_section, finalize, AreaOutcome, BriefingOrchestrator, BriefingResponse, BriefingSection, StoredMorningBriefing};
use crate::time_range::TimeRange;
use crate::tools::{database_citation, oee, ToolContext, ToolRegistry};
use chrono::{Timelike, Utc};
use serde_json::json;
use std::time::Duration as StdDuration;
use tokio::task::JoinSet;
use tokio::time::{sleep_until, timeout, Instant};

impl BriefingOrchestrator {
    /// Generates the plant-wide briefing: a headline followed by one
    /// section per area in `area_order` (or the default topology order).
    /// Every area composes concurrently; an area whose fan-out calls
    /// haven't all returned by the shared deadline is reported
    /// `timed_out` rather than holding up the rest.
    pub async fn generate_plant_briefing(&self, user_id: &str, area_order: Option<&[String]>) -> BriefingResponse {
        let orchestrator_config = self.ctx.config.orchestrator;
        let per_area_timeout = StdDuration::from_secs(orchestrator_config.plant_area_timeout_seconds);
        let deadline = Instant::now() + StdDuration::from_secs(orchestrator_config.plant_total_timeout_seconds);
        let today = Utc::now().date_naive();
        let range = TimeRange { start: today, end: today, description: "today".to_string() };

        let order = resolve_area_order(area_order);

        let mut sections = vec![self.build_headline_section(&range).await.with_pause_point()];
        let mut tool_failures: Vec<String> = Vec::new();

        let mut join_set: JoinSet<(usize, AreaOutcome)> = JoinSet::new();
        for (index, area) in order.iter().cloned().enumerate() {
            let ctx = self.ctx.clone();
            let range = range.clone();
            join_set.spawn(async move { (index, build_area_section(ctx, area, range, per_area_timeout).await) });
        }

        let mut outcomes: Vec<Option<AreaOutcome>> = (0..order.len()).map(|_| None).collect();
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

        let mut concerns = Vec::new();
        for (index, area) in order.iter().enumerate() {
            match outcomes[index].take() {
                Some(outcome) => {
                    tool_failures.extend(outcome.tool_failures);
                    if let Some(concern) = outcome.concern {
                        concerns.push(concern);
                    }
                    sections.push(outcome.section);
                }
                None => sections.push(BriefingSection::timed_out("area", area.clone())),
            }
        }

        // Used by the same day's end-of-day summary as "this morning's
        // briefing" when one was generated before noon.
        if Utc::now().hour() < 12 {
            self.morning_briefings.insert((user_id.to_string(), today), StoredMorningBriefing { generated_at: Utc::now(), concerns });
        }

        finalize(sections, tool_failures)
    }

    pub(crate) async fn build_headline_section(&self, range: &TimeRange) -> BriefingSection {
        let (rows, citations) = super::fetch_plant_daily_summaries(&self.ctx, range).await;

        let overall_oee = oee::weighted_mean_oee(&rows);
        let total_downtime: f64 = rows.iter().map(|r| r.downtime_minutes).sum();
        let asset_count = rows.iter().map(|r| r.asset_id.as_str()).collect::<std::collections::BTreeSet<_>>().len();

        let active_safety_count = self
            .ctx
            .gateway
            .get_safety_events(None, range.start, range.end, false, None, None)
            .await
            .map(|result| result.rows().iter().filter(|e| e.is_active()).count())
            .unwrap_or(0);

        let oee_phrase = match overall_oee {
            Some(value) => format!("Plant-wide OEE is {value:.1}% across {asset_count} asset(s)"),
            None => "No production data is available for this period yet".to_string(),
        };
        let safety_phrase = if active_safety_count > 0 {
            format!(", with {active_safety_count} active safety event(s) requiring attention")
        } else {
            String::new()
        };
        let downtime_phrase = if total_downtime > super::DOWNTIME_MENTION_THRESHOLD_MINUTES {
            format!(". Total recorded downtime stands at {total_downtime:.0} minutes")
        } else {
            String::new()
        };

        BriefingSection::complete("headline", "Plant Headline", format!("{oee_phrase}{safety_phrase}{downtime_phrase}."), citations)
    }
}

/// Builds one area's section from its four concurrent fan-out calls —
/// production status, OEE, downtime, and safety — each individually
/// bounded by `per_tool_timeout`. Owns its inputs so it can be spawned
/// onto a `'static` `JoinSet` task.
async fn build_area_section(ctx: ToolContext, area: String, range: TimeRange, per_tool_timeout: StdDuration) -> AreaOutcome {
    let registry = ToolRegistry::new(ctx.clone());
    let time_range_desc = range.description.clone();

    let snapshots_fut = timeout(per_tool_timeout, ctx.gateway.get_live_snapshots_by_area(&area));
    let oee_fut = timeout(per_tool_timeout, registry.run("oee_query", "briefing", json!({"area": area, "time_range": time_range_desc})));
    let downtime_fut = timeout(per_tool_timeout, registry.run("downtime_analysis", "briefing", json!({"area": area, "time_range": time_range_desc})));
    let safety_fut = timeout(per_tool_timeout, registry.run("safety_events", "briefing", json!({"area": area, "time_range": time_range_desc})));

    let (snapshots_res, oee_res, downtime_res, safety_res) = tokio::join!(snapshots_fut, oee_fut, downtime_fut, safety_fut);

    let mut tool_failures = Vec::new();
    let mut citations = Vec::new();
    let mut parts = Vec::new();
    let mut concern = None;

    match snapshots_res {
        Ok(Ok(result)) if result.has_data() => {
            let rows = result.rows();
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
            citations.push(database_citation(
                &result,
                None,
                None,
                format!("{} live snapshots", rows.len()),
                format!("[Source: live_snapshots/{area}]"),
            ));
        }
        Ok(Ok(_)) => parts.push(format!("{area} has no live production data")),
        Ok(Err(err)) => tool_failures.push(format!("production_status:{area}: {err}")),
        Err(_) => tool_failures.push(format!("production_status:{area}: timed out")),
    }

    match oee_res {
        Ok(result) if result.success => {
            if let Some(summary) = result.data.get("summary").and_then(serde_json::Value::as_f64) {
                parts.push(format!("OEE is running at {summary:.1}%"));
            }
            citations.extend(result.citations);
        }
        Ok(result) => tool_failures.push(format!("oee_query:{area}: {}", result.error_message.unwrap_or_default())),
        Err(_) => tool_failures.push(format!("oee_query:{area}: timed out")),
    }

    match safety_res {
        Ok(result) if result.success => {
            let count = result.data.get("count").and_then(serde_json::Value::as_u64).unwrap_or(0);
            if count > 0 {
                parts.push(format!("{count} safety event(s) logged"));
                concern.get_or_insert_with(|| format!("{area}: safety event(s) logged"));
            }
            citations.extend(result.citations);
        }
        Ok(result) => tool_failures.push(format!("safety_events:{area}: {}", result.error_message.unwrap_or_default())),
        Err(_) => tool_failures.push(format!("safety_events:{area}: timed out")),
    }

    match downtime_res {
        Ok(result) if result.success => {
            let total_minutes = result.data.get("total_downtime_minutes").and_then(serde_json::Value::as_f64).unwrap_or(0.0);
            if total_minutes > super::DOWNTIME_MENTION_THRESHOLD_MINUTES {
                let reason = result
                    .data
                    .get("top_reasons")
                    .and_then(serde_json::Value::as_array)
                    .and_then(|reasons| reasons.first())
                    .and_then(|reason| reason.get("reason"))
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or("an unspecified cause");
                parts.push(format!("top downtime contributor is {reason} at {total_minutes:.0} minutes"));
            }
            citations.extend(result.citations);
        }
        Ok(result) => tool_failures.push(format!("downtime_analysis:{area}: {}", result.error_message.unwrap_or_default())),
        Err(_) => tool_failures.push(format!("downtime_analysis:{area}: timed out")),
    }

    AreaOutcome { section: classify_area_section(&area, &parts, &tool_failures, citations), tool_failures, concern }
}
