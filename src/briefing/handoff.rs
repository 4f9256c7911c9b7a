//! Shift handoff: a same-day synthesis for the incoming shift lead,
//! covering the last eight hours at day granularity (the Gateway's
//! summaries are day-scoped, so "last 8 hours" and "today" coincide).

use super::{finalize, fetch_plant_daily_summaries, BriefingOrchestrator, BriefingResponse, BriefingSection};
use crate::time_range::TimeRange;
use crate::tools::{downtime, oee};
use crate::types::Citation;
use chrono::Utc;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration as StdDuration;
use tokio::task::JoinSet;
use tokio::time::{sleep_until, timeout, Instant};

const SECTION_TYPES: [&str; 4] = ["overview", "issues", "ongoing_concerns", "recommended_focus"];
const SECTION_TITLES: [&str; 4] = ["Shift Overview", "Open Issues", "Ongoing Concerns", "Recommended Focus"];

impl BriefingOrchestrator {
    /// Generates the shift handoff synthesis for the outgoing shift lead.
    pub async fn generate_shift_handoff(&self, _user_id: &str) -> BriefingResponse {
        let orchestrator_config = self.ctx.config.orchestrator;
        let per_tool_timeout = StdDuration::from_secs(orchestrator_config.handoff_per_tool_timeout_seconds);
        let deadline = Instant::now() + StdDuration::from_secs(orchestrator_config.handoff_total_timeout_seconds);
        let today = Utc::now().date_naive();
        let range = TimeRange { start: today, end: today, description: "today".to_string() };

        type SectionBuilder = fn(
            crate::tools::ToolContext,
            TimeRange,
            StdDuration,
        ) -> Pin<Box<dyn Future<Output = (BriefingSection, Vec<String>)> + Send>>;

        let builders: [SectionBuilder; 4] = [
            |ctx, range, per_tool_timeout| Box::pin(build_overview_section(ctx, range, per_tool_timeout)),
            |ctx, range, per_tool_timeout| Box::pin(build_issues_section(ctx, range, per_tool_timeout)),
            |ctx, range, per_tool_timeout| Box::pin(build_ongoing_concerns_section(ctx, range, per_tool_timeout)),
            |ctx, range, per_tool_timeout| Box::pin(build_recommended_focus_section(ctx, range, per_tool_timeout)),
        ];

        let mut join_set: JoinSet<(usize, BriefingSection, Vec<String>)> = JoinSet::new();
        for (index, builder) in builders.into_iter().enumerate() {
            let ctx = self.ctx.clone();
            let range = range.clone();
            join_set.spawn(async move {
                let (section, tool_failures) = builder(ctx, range, per_tool_timeout).await;
                (index, section, tool_failures)
            });
        }

        let mut outcomes: Vec<Option<(BriefingSection, Vec<String>)>> = (0..SECTION_TYPES.len()).map(|_| None).collect();
        while !join_set.is_empty() {
            tokio::select! {
                biased;
                () = sleep_until(deadline) => {
                    join_set.abort_all();
                    break;
                }
                joined = join_set.join_next() => {
                    match joined {
                        Some(Ok((index, section, tool_failures))) => outcomes[index] = Some((section, tool_failures)),
                        Some(Err(_)) | None => {}
                    }
                }
            }
        }

        let mut sections = Vec::new();
        let mut tool_failures = Vec::new();
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Some((section, failures)) => {
                    tool_failures.extend(failures);
                    sections.push(section);
                }
                None => sections.push(BriefingSection::timed_out(SECTION_TYPES[index], SECTION_TITLES[index])),
            }
        }

        finalize(sections, tool_failures)
    }
}

fn classify_fixed_section(index: usize, parts: &[String], tool_failures: &[String], citations: Vec<Citation>) -> BriefingSection {
    let section_type = SECTION_TYPES[index];
    let title = SECTION_TITLES[index];
    if parts.is_empty() && !tool_failures.is_empty() {
        if tool_failures.iter().any(|f| f.ends_with("timed out")) {
            BriefingSection::timed_out(section_type, title)
        } else {
            BriefingSection::failed(section_type, title, tool_failures.join("; "))
        }
    } else if parts.is_empty() {
        BriefingSection::complete(section_type, title, "Nothing to report for this window.", citations)
    } else {
        BriefingSection::complete(section_type, title, format!("{}.", parts.join("; ")), citations)
    }
}

async fn build_overview_section(ctx: crate::tools::ToolContext, range: TimeRange, per_tool_timeout: StdDuration) -> (BriefingSection, Vec<String>) {
    let mut tool_failures = Vec::new();
    let mut parts = Vec::new();
    let mut citations = Vec::new();

    match timeout(per_tool_timeout, fetch_plant_daily_summaries(&ctx, &range)).await {
        Ok((rows, cites)) => {
            citations.extend(cites);
            if let Some(mean) = oee::weighted_mean_oee(&rows) {
                parts.push(format!("Plant-wide OEE this shift is running at {mean:.1}%"));
            }
            let asset_count = rows.iter().map(|r| r.asset_id.as_str()).collect::<std::collections::BTreeSet<_>>().len();
            if asset_count > 0 {
                parts.push(format!("{asset_count} asset(s) reporting"));
            }
        }
        Err(_) => tool_failures.push("plant_summary:overview: timed out".to_string()),
    }

    (classify_fixed_section(0, &parts, &tool_failures, citations), tool_failures)
}

async fn build_issues_section(ctx: crate::tools::ToolContext, range: TimeRange, per_tool_timeout: StdDuration) -> (BriefingSection, Vec<String>) {
    let mut tool_failures = Vec::new();
    let mut parts = Vec::new();
    let mut citations = Vec::new();

    match timeout(per_tool_timeout, ctx.gateway.get_safety_events(None, range.start, range.end, false, None, None)).await {
        Ok(Ok(result)) => {
            let active = result.rows().iter().filter(|e| e.is_active()).count();
            if active > 0 {
                parts.push(format!("{active} active safety event(s) require attention"));
            }
            if result.has_data() {
                citations.push(crate::tools::database_citation(
                    &result,
                    None,
                    None,
                    format!("{} safety events", result.rows().len()),
                    "[Source: safety_events/today]".to_string(),
                ));
            }
        }
        Ok(Err(err)) => tool_failures.push(format!("safety_events:issues: {err}")),
        Err(_) => tool_failures.push("safety_events:issues: timed out".to_string()),
    }

    (classify_fixed_section(1, &parts, &tool_failures, citations), tool_failures)
}

async fn build_ongoing_concerns_section(ctx: crate::tools::ToolContext, range: TimeRange, per_tool_timeout: StdDuration) -> (BriefingSection, Vec<String>) {
    let mut tool_failures = Vec::new();
    let mut parts = Vec::new();
    let mut citations = Vec::new();

    match timeout(per_tool_timeout, fetch_plant_daily_summaries(&ctx, &range)).await {
        Ok((rows, cites)) => {
            citations.extend(cites);
            let total_downtime: f64 = rows.iter().map(|r| r.downtime_minutes).sum();
            if total_downtime > super::DOWNTIME_MENTION_THRESHOLD_MINUTES {
                match downtime::top_reason(&rows) {
                    Some(reason) => parts.push(format!("{reason} remains the leading downtime contributor at {total_downtime:.0} minutes")),
                    None => parts.push(format!("{total_downtime:.0} minutes of downtime recorded with no dominant cause")),
                }
            }
        }
        Err(_) => tool_failures.push("downtime_analysis:ongoing_concerns: timed out".to_string()),
    }

    (classify_fixed_section(2, &parts, &tool_failures, citations), tool_failures)
}

async fn build_recommended_focus_section(ctx: crate::tools::ToolContext, range: TimeRange, per_tool_timeout: StdDuration) -> (BriefingSection, Vec<String>) {
    let mut tool_failures = Vec::new();
    let mut parts = Vec::new();
    let citations;

    match timeout(per_tool_timeout, fetch_plant_daily_summaries(&ctx, &range)).await {
        Ok((rows, cites)) => {
            citations = cites;
            let mut by_area_asset: std::collections::BTreeMap<&str, Vec<&crate::types::DailySummary>> = std::collections::BTreeMap::new();
            for row in &rows {
                by_area_asset.entry(row.asset_id.as_str()).or_default().push(row);
            }
            let worst = by_area_asset
                .into_iter()
                .filter_map(|(asset_id, asset_rows)| oee::weighted_mean_oee(&asset_rows.into_iter().cloned().collect::<Vec<_>>()).map(|mean| (asset_id, mean)))
                .min_by(|a, b| a.1.total_cmp(&b.1));
            if let Some((asset_id, mean)) = worst {
                parts.push(format!("asset {asset_id} is the lowest-performing asset at {mean:.1}% OEE and should be the incoming shift's first check"));
            }
        }
        Err(_) => {
            citations = Vec::new();
            tool_failures.push("oee_query:recommended_focus: timed out".to_string());
        }
    }

    (classify_fixed_section(3, &parts, &tool_failures, citations), tool_failures)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_fixed_section_reports_timeout_when_every_tool_timed_out() {
        let failures = vec!["plant_summary:overview: timed out".to_string()];
        let section = classify_fixed_section(0, &[], &failures, Vec::new());
        assert_eq!(section.section_type, "overview");
        assert_eq!(section.status, crate::briefing::SectionStatus::TimedOut);
    }

    #[test]
    fn classify_fixed_section_falls_back_to_nothing_to_report() {
        let section = classify_fixed_section(2, &[], &[], Vec::new());
        assert_eq!(section.status, crate::briefing::SectionStatus::Complete);
        assert!(section.content.contains("Nothing to report"));
    }

    #[test]
    fn classify_fixed_section_joins_multiple_parts() {
        let parts = vec!["part one".to_string(), "part two".to_string()];
        let section = classify_fixed_section(1, &parts, &[], Vec::new());
        assert_eq!(section.content, "part one; part two.");
    }
}
