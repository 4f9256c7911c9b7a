//! End-of-day summary: a single date's plant performance, compared
//! against the same day's morning plant briefing when one was generated.

use super::{finalize, BriefingOrchestrator, BriefingResponse, BriefingSection, StoredMorningBriefing};
use crate::time_range::TimeRange;
use crate::tools::{downtime, oee, ToolRegistry};
use crate::types::ToolResult;
use chrono::{Duration, NaiveDate, Utc};
use serde_json::json;

const TREND_WINDOW_DAYS: i64 = 6;
const TREND_MIN_ROWS: usize = 7;
const WIN_IMPROVEMENT_THRESHOLD: f64 = 1.0;

impl BriefingOrchestrator {
    /// Summarizes `summary_date` (defaulting to today) against the
    /// morning briefing generated earlier the same day, if any.
    pub async fn generate_eod_summary(&self, user_id: &str, summary_date: Option<NaiveDate>) -> BriefingResponse {
        let target_date = summary_date.unwrap_or_else(|| Utc::now().date_naive());
        let range = TimeRange { start: target_date, end: target_date, description: format!("{target_date} to {target_date}") };
        let mut tool_failures = Vec::new();

        let headline = self.build_headline_section(&range).await;
        let performance = BriefingSection { section_type: "performance".to_string(), title: "Plant Performance".to_string(), ..headline };

        let morning = self.morning_briefings.get(&(user_id.to_string(), target_date)).map(|entry| entry.clone());

        let registry = ToolRegistry::new(self.ctx.clone());
        let safety_result = registry.run("safety_events", "briefing", json!({"time_range": range.description})).await;
        if !safety_result.success {
            tool_failures.push(format!("safety_events:eod: {}", safety_result.error_message.clone().unwrap_or_default()));
        }

        let comparison = build_morning_comparison_section(morning.as_ref(), &safety_result);
        let concerns = build_concerns_section(morning.as_ref(), &safety_result);
        let wins = self.build_wins_section(&range, &mut tool_failures).await;
        let outlook = self.build_outlook_section(&range, &mut tool_failures).await;

        finalize(vec![performance, comparison, wins, concerns, outlook], tool_failures)
    }

    async fn build_wins_section(&self, range: &TimeRange, tool_failures: &mut Vec<String>) -> BriefingSection {
        let trend_range = TimeRange { start: range.start - Duration::days(TREND_WINDOW_DAYS), end: range.end, description: String::new() };
        let (mut rows, _citations) = super::fetch_plant_daily_summaries(&self.ctx, &trend_range).await;
        if rows.is_empty() {
            tool_failures.push("trend_analysis:plant: no daily summaries available".to_string());
        }
        rows.sort_by_key(|r| r.report_date);

        if rows.len() < TREND_MIN_ROWS {
            return BriefingSection::complete("wins", "Wins", "Not enough data yet to call out standout wins for today.", Vec::new());
        }

        let midpoint = rows.len() / 2;
        let (earlier, recent) = rows.split_at(midpoint);
        let content = match (oee::weighted_mean_oee(earlier), oee::weighted_mean_oee(recent)) {
            (Some(earlier_mean), Some(recent_mean)) if recent_mean > earlier_mean + WIN_IMPROVEMENT_THRESHOLD => {
                format!("Plant-wide OEE improved from {earlier_mean:.1}% to {recent_mean:.1}% across this window.")
            }
            _ => "No standout plant-wide wins to call out today.".to_string(),
        };
        BriefingSection::complete("wins", "Wins", content, Vec::new())
    }

    async fn build_outlook_section(&self, range: &TimeRange, tool_failures: &mut Vec<String>) -> BriefingSection {
        let (rows, _citations) = super::fetch_plant_daily_summaries(&self.ctx, range).await;
        if rows.is_empty() {
            tool_failures.push("downtime_analysis:plant: no daily summaries available".to_string());
        }
        let content = match downtime::top_reason(&rows) {
            Some(reason) => format!("Watch for recurring {reason} downtime carrying into tomorrow's shift."),
            None => "No recurring concerns are flagged heading into tomorrow.".to_string(),
        };
        BriefingSection::complete("outlook", "Tomorrow's Outlook", content, Vec::new())
    }
}

fn build_morning_comparison_section(morning: Option<&StoredMorningBriefing>, safety_result: &ToolResult) -> BriefingSection {
    let Some(stored) = morning else {
        return BriefingSection::complete("morning_comparison", "Morning Comparison", "No morning briefing to compare.", Vec::new());
    };
    let events_since = safety_result.data.get("count").and_then(serde_json::Value::as_u64).unwrap_or(0);
    let content = format!(
        "This morning's briefing ({}) flagged {} concern(s); {events_since} safety event(s) are on record for today.",
        stored.generated_at.format("%H:%M UTC"),
        stored.concerns.len(),
    );
    BriefingSection::complete("morning_comparison", "Morning Comparison", content, safety_result.citations.clone())
}

fn build_concerns_section(morning: Option<&StoredMorningBriefing>, safety_result: &ToolResult) -> BriefingSection {
    let Some(stored) = morning else {
        return BriefingSection::complete(
            "concerns",
            "Concerns Resolved/Escalated",
            "No morning briefing to compare concerns against.",
            Vec::new(),
        );
    };
    if stored.concerns.is_empty() {
        return BriefingSection::complete("concerns", "Concerns Resolved/Escalated", "This morning's briefing flagged no concerns.", Vec::new());
    }
    let still_active = safety_result.data.get("count").and_then(serde_json::Value::as_u64).unwrap_or(0) > 0;
    let content = if still_active {
        format!("{} concern(s) flagged this morning remain active and may need escalation.", stored.concerns.len())
    } else {
        format!("All {} concern(s) flagged this morning appear resolved.", stored.concerns.len())
    };
    BriefingSection::complete("concerns", "Concerns Resolved/Escalated", content, Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn morning(concerns: Vec<&str>) -> StoredMorningBriefing {
        StoredMorningBriefing { generated_at: Utc::now(), concerns: concerns.into_iter().map(str::to_string).collect() }
    }

    fn safety_result(count: u64) -> ToolResult {
        ToolResult::ok(json!({"count": count}), Vec::new(), crate::types::ToolMetadata::new(Utc::now()))
    }

    #[test]
    fn no_morning_briefing_falls_back_to_no_comparison() {
        let section = build_morning_comparison_section(None, &safety_result(0));
        assert!(section.content.contains("No morning briefing"));
    }

    #[test]
    fn concerns_section_reports_resolved_when_no_events_remain() {
        let stored = morning(vec!["Grinding: running behind target"]);
        let section = build_concerns_section(Some(&stored), &safety_result(0));
        assert!(section.content.contains("appear resolved"));
    }

    #[test]
    fn concerns_section_reports_escalation_when_events_persist() {
        let stored = morning(vec!["Grinding: running behind target"]);
        let section = build_concerns_section(Some(&stored), &safety_result(2));
        assert!(section.content.contains("may need escalation"));
    }

    #[test]
    fn concerns_section_handles_a_concern_free_morning() {
        let stored = morning(vec![]);
        let section = build_concerns_section(Some(&stored), &safety_result(0));
        assert!(section.content.contains("flagged no concerns"));
    }
}
