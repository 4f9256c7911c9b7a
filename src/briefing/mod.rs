//! Briefing Orchestrator — deadline-bounded, parallel composition of the
//! plant, supervisor, end-of-day, and shift-handoff briefings.
//!
//! Every kind shares the same budget discipline: a total deadline for the
//! whole briefing and a per-tool timeout for each concurrent fan-out call,
//! enforced with `tokio::time::timeout` and `tokio::task::JoinSet` the way
//! the ingestion supervisor races its own worker tasks.

pub mod eod;
pub mod handoff;
pub mod plant;
pub mod supervisor;
pub mod topology;

use crate::time_range::TimeRange;
use crate::tools::ToolContext;
use crate::types::{Citation, DailySummary};
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const CHARS_PER_SECOND: f64 = 12.5;
const MIN_DURATION_ESTIMATE_SECONDS: f64 = 75.0;

/// Downtime minutes below this are folded into silence rather than named
/// in a narrative — matches the tools' own top-reasons cutoff behavior.
pub(crate) const DOWNTIME_MENTION_THRESHOLD_MINUTES: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionStatus {
    Complete,
    TimedOut,
    Failed,
}

/// One narrative unit of a briefing: a plant headline, an area rollup, or
/// a fixed slot in an EOD/handoff template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BriefingSection {
    pub section_type: String,
    pub title: String,
    pub content: String,
    pub status: SectionStatus,
    pub error_message: Option<String>,
    pub pause_point: bool,
    pub citations: Vec<Citation>,
}

impl BriefingSection {
    pub fn complete(section_type: impl Into<String>, title: impl Into<String>, content: impl Into<String>, citations: Vec<Citation>) -> Self {
        Self {
            section_type: section_type.into(),
            title: title.into(),
            content: content.into(),
            status: SectionStatus::Complete,
            error_message: None,
            pause_point: false,
            citations,
        }
    }

    /// Used when the total or per-tool deadline elapsed before this
    /// section could be composed; `error_message` always mentions the
    /// timeout so callers can match on it without inspecting `status`.
    pub fn timed_out(section_type: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            section_type: section_type.into(),
            title: title.into(),
            content: String::new(),
            status: SectionStatus::TimedOut,
            error_message: Some("Generation timed out".to_string()),
            pause_point: false,
            citations: Vec::new(),
        }
    }

    pub fn failed(section_type: impl Into<String>, title: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            section_type: section_type.into(),
            title: title.into(),
            content: String::new(),
            status: SectionStatus::Failed,
            error_message: Some(error_message.into()),
            pause_point: false,
            citations: Vec::new(),
        }
    }

    pub fn with_pause_point(mut self) -> Self {
        self.pause_point = true;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BriefingResponse {
    pub sections: Vec<BriefingSection>,
    pub completion_percentage: f64,
    pub tool_failures: Vec<String>,
    pub total_duration_estimate: f64,
    /// Always `false`: briefings never continue generating in the
    /// background past the returned deadline.
    pub background_continuation: bool,
    pub generated_at: DateTime<Utc>,
}

fn completion_percentage(sections: &[BriefingSection]) -> f64 {
    if sections.is_empty() {
        return 0.0;
    }
    let complete = sections.iter().filter(|s| s.status == SectionStatus::Complete).count();
    complete as f64 / sections.len() as f64 * 100.0
}

/// Roughly 150 words per minute at ~5.5 characters per word, floored at
/// a minimum read time so a one-line briefing doesn't report as instant.
fn estimate_duration_seconds(sections: &[BriefingSection]) -> f64 {
    let total_chars: usize = sections.iter().map(|s| s.content.chars().count()).sum();
    (total_chars as f64 / CHARS_PER_SECOND).max(MIN_DURATION_ESTIMATE_SECONDS)
}

fn finalize(sections: Vec<BriefingSection>, tool_failures: Vec<String>) -> BriefingResponse {
    BriefingResponse {
        completion_percentage: completion_percentage(&sections),
        total_duration_estimate: estimate_duration_seconds(&sections),
        tool_failures,
        sections,
        background_continuation: false,
        generated_at: Utc::now(),
    }
}

/// The outcome of composing one area's section, carried back through a
/// `JoinSet` alongside the declared-order index it belongs at.
pub(crate) struct AreaOutcome {
    pub(crate) section: BriefingSection,
    pub(crate) tool_failures: Vec<String>,
    pub(crate) concern: Option<String>,
}

/// Shared classifier for an area-scoped section once its fan-out calls
/// have all returned: no narrative parts and at least one timeout means
/// the section itself timed out, not merely one of its inputs.
pub(crate) fn classify_area_section(area: &str, parts: &[String], tool_failures: &[String], citations: Vec<Citation>) -> BriefingSection {
    if parts.is_empty() && !tool_failures.is_empty() {
        if tool_failures.iter().any(|f| f.ends_with("timed out")) {
            BriefingSection::timed_out("area", area)
        } else {
            BriefingSection::failed("area", area, tool_failures.join("; "))
        }
    } else if parts.is_empty() {
        BriefingSection::complete("area", area, format!("No data is currently available for {area}."), citations)
    } else {
        BriefingSection::complete("area", area, format!("{}.", parts.join("; ")), citations)
    }
}

/// Every asset's daily summary over `range`, fetched plant-wide. A single
/// `get_oee` call per asset carries both OEE and downtime fields, so this
/// is the one fetch behind the plant headline, the EOD wins/outlook
/// sections, and the handoff's recommended-focus section.
pub(crate) async fn fetch_plant_daily_summaries(ctx: &ToolContext, range: &TimeRange) -> (Vec<DailySummary>, Vec<Citation>) {
    let mut rows = Vec::new();
    let mut citations = Vec::new();
    let Ok(assets) = ctx.gateway.get_all_assets().await else {
        return (rows, citations);
    };
    for asset in assets.rows() {
        if let Ok(result) = ctx.gateway.get_oee(&asset.id, range.start, range.end).await {
            if result.has_data() {
                citations.push(crate::tools::database_citation(
                    &result,
                    None,
                    Some(asset.id.clone()),
                    format!("{} daily summaries", result.rows().len()),
                    format!("[Source: daily_summaries/{}]", asset.id),
                ));
            }
            rows.extend(result.rows().iter().cloned());
        }
    }
    (rows, citations)
}

/// A previously generated plant briefing, kept only long enough for the
/// same day's end-of-day summary to compare against it.
#[derive(Debug, Clone)]
pub(crate) struct StoredMorningBriefing {
    pub(crate) generated_at: DateTime<Utc>,
    pub(crate) concerns: Vec<String>,
}

/// Shared entry point for every briefing kind; holds nothing but the tool
/// dependencies and the same-day morning-briefing memo used by the EOD
/// summary's comparison section.
#[derive(Clone)]
pub struct BriefingOrchestrator {
    pub(crate) ctx: ToolContext,
    pub(crate) morning_briefings: Arc<DashMap<(String, NaiveDate), StoredMorningBriefing>>,
}

impl BriefingOrchestrator {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx, morning_briefings: Arc::new(DashMap::new()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(status: SectionStatus) -> BriefingSection {
        BriefingSection {
            section_type: "area".into(),
            title: "Grinding".into(),
            content: if status == SectionStatus::Complete { "ok".into() } else { String::new() },
            status,
            error_message: None,
            pause_point: false,
            citations: Vec::new(),
        }
    }

    #[test]
    fn completion_percentage_counts_complete_sections_only() {
        let sections = vec![section(SectionStatus::Complete), section(SectionStatus::Complete), section(SectionStatus::TimedOut)];
        assert!((completion_percentage(&sections) - 66.666_666_666_666_66).abs() < 1e-9);
    }

    #[test]
    fn completion_percentage_is_zero_for_no_sections() {
        assert_eq!(completion_percentage(&[]), 0.0);
    }

    #[test]
    fn duration_estimate_has_a_floor() {
        let sections = vec![BriefingSection::complete("x", "x", "hi", Vec::new())];
        assert_eq!(estimate_duration_seconds(&sections), MIN_DURATION_ESTIMATE_SECONDS);
    }

    #[test]
    fn duration_estimate_scales_with_content_length() {
        let long_content = "a".repeat(1250);
        let sections = vec![BriefingSection::complete("x", "x", long_content, Vec::new())];
        assert_eq!(estimate_duration_seconds(&sections), 100.0);
    }

    #[test]
    fn classify_area_section_reports_timeout_when_every_tool_timed_out() {
        let failures = vec!["oee_query:Grinding: timed out".to_string(), "downtime_analysis:Grinding: timed out".to_string()];
        let section = classify_area_section("Grinding", &[], &failures, Vec::new());
        assert_eq!(section.status, SectionStatus::TimedOut);
        assert!(section.error_message.expect("timeout message present").contains("timed out"));
    }

    #[test]
    fn classify_area_section_reports_failure_when_no_timeout_involved() {
        let failures = vec!["oee_query:Grinding: connection refused".to_string()];
        let section = classify_area_section("Grinding", &[], &failures, Vec::new());
        assert_eq!(section.status, SectionStatus::Failed);
    }
}
