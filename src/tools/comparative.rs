//! Comparative Analysis — ranks assets or areas against one another.

use super::{database_citation, ToolContext, ToolSpec};
use crate::cache::Tier;
use crate::time_range;
use crate::types::{Citation, DailySummary, ToolMetadata, ToolResult};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

pub const SPEC: ToolSpec = ToolSpec {
    name: "comparative_analysis",
    description: "Compare OEE, output, downtime, and waste across 2-10 assets or areas and rank them.",
    citations_required: true,
};

const OEE_WEIGHT: f64 = 0.40;
const OUTPUT_WEIGHT: f64 = 0.25;
const DOWNTIME_WEIGHT: f64 = 0.20;
const WASTE_WEIGHT: f64 = 0.15;
const NO_TARGET_OUTPUT_BASELINE: f64 = 75.0;
const HOURS_PER_WEEK: f64 = 168.0;
/// A winner is only declared when it clears the runner-up by this many
/// composite-score points; narrower gaps are reported as a tie.
const WINNER_SCORE_GAP: f64 = 5.0;
const MAX_SUBJECTS: usize = 10;

#[derive(Debug, Deserialize)]
struct Input {
    #[serde(default = "default_time_range")]
    time_range: String,
    #[serde(default = "default_subject_type")]
    subject_type: String,
    subjects: Option<Vec<String>>,
    pattern: Option<String>,
}

fn default_time_range() -> String {
    "last 7 days".to_string()
}

fn default_subject_type() -> String {
    "asset".to_string()
}

#[derive(Debug, Clone)]
struct SubjectMetrics {
    subject: String,
    oee: f64,
    output_pct_target: f64,
    downtime_hours: f64,
    waste_pct: f64,
    score: f64,
}

pub async fn run(ctx: &ToolContext, user_id: &str, input: Value) -> ToolResult {
    let parsed: Input = match serde_json::from_value(input.clone()) {
        Ok(v) => v,
        Err(err) => return super::validation_failure(format!("invalid comparative_analysis input: {err}")),
    };
    if parsed.subject_type != "asset" && parsed.subject_type != "area" {
        return super::validation_failure("subject_type must be one of asset, area");
    }

    super::cached_run(ctx, SPEC.name, user_id, &input, Tier::Daily, || async move {
        let now = Utc::now();
        let range = time_range::parse(&parsed.time_range, now.date_naive());

        let subjects = match resolve_subjects(ctx, &parsed).await {
            Ok(s) => s,
            Err(message) => return super::validation_failure(message),
        };
        if subjects.len() < 2 {
            return super::validation_failure("comparative analysis needs at least 2 subjects");
        }

        let mut citations = Vec::new();
        let mut metrics = Vec::new();
        for subject in &subjects {
            let rows = if parsed.subject_type == "asset" {
                ctx.gateway.get_oee(subject, range.start, range.end).await
            } else {
                ctx.gateway.get_oee_by_area(subject, range.start, range.end).await
            };
            let result = match rows {
                Ok(r) => r,
                Err(err) => return ToolResult::failure(crate::error::Error::from(err).user_safe_message(), citations, ToolMetadata::new(now)),
            };
            if !result.has_data() {
                continue;
            }
            citations.push(database_citation(
                &result,
                None,
                (parsed.subject_type == "asset").then(|| subject.clone()),
                format!("{} daily summaries for {subject}", result.rows().len()),
                format!("[Source: daily_summaries/{subject}]"),
            ));
            metrics.push(score_subject(subject.clone(), result.rows()));
        }

        if metrics.len() < 2 {
            return super::validation_failure("fewer than 2 subjects had data in this time range");
        }

        metrics.sort_by(|a, b| b.score.total_cmp(&a.score));
        let winner = determine_winner(&metrics);

        citations.push(Citation::calculation(
            format!(
                "score = oee*{OEE_WEIGHT} + output*{OUTPUT_WEIGHT} + downtime*{DOWNTIME_WEIGHT} + waste*{WASTE_WEIGHT}"
            ),
            "[Source: calculation/comparative-score]",
        ));

        ToolResult::ok(
            json!({
                "time_range": range.description,
                "subject_type": parsed.subject_type,
                "rankings": metrics.iter().map(render_metrics).collect::<Vec<_>>(),
                "winner": winner,
            }),
            citations,
            ToolMetadata::new(now),
        )
    })
    .await
}

async fn resolve_subjects(ctx: &ToolContext, parsed: &Input) -> Result<Vec<String>, String> {
    if let Some(subjects) = &parsed.subjects {
        if subjects.is_empty() {
            return Err("subjects must not be empty".to_string());
        }
        return Ok(subjects.iter().take(MAX_SUBJECTS).cloned().collect());
    }
    let Some(pattern) = &parsed.pattern else {
        return Err("either subjects or pattern is required".to_string());
    };
    if parsed.subject_type != "asset" {
        return Err("pattern expansion is only supported for subject_type=asset".to_string());
    }
    let needle = expand_pattern(pattern);
    let assets = ctx.gateway.get_all_assets().await.map_err(|e| e.to_string())?;
    let matched: Vec<String> = assets
        .rows()
        .iter()
        .filter(|a| a.name.to_lowercase().contains(&needle))
        .take(MAX_SUBJECTS)
        .map(|a| a.id.clone())
        .collect();
    if matched.is_empty() {
        return Err(format!("no assets matched pattern '{pattern}'"));
    }
    Ok(matched)
}

/// Strips a leading `"all "` and a trailing plural `s`, lower-cased, for a
/// loose substring match against asset names.
fn expand_pattern(pattern: &str) -> String {
    let trimmed = pattern.trim().to_lowercase();
    let trimmed = trimmed.strip_prefix("all ").unwrap_or(&trimmed);
    trimmed.strip_suffix('s').unwrap_or(trimmed).to_string()
}

fn score_subject(subject: String, rows: &[DailySummary]) -> SubjectMetrics {
    let oee_values: Vec<f64> = rows.iter().filter_map(|r| r.oee_percentage).collect();
    let oee = if oee_values.is_empty() { 0.0 } else { oee_values.iter().sum::<f64>() / oee_values.len() as f64 };

    let total_actual: u64 = rows.iter().map(|r| r.actual_output).sum();
    let total_target: u64 = rows.iter().map(|r| r.target_output).sum();
    let output_pct_target = if total_target > 0 { (total_actual as f64 / total_target as f64 * 100.0).min(100.0) } else { NO_TARGET_OUTPUT_BASELINE };

    let downtime_hours = rows.iter().map(|r| r.downtime_minutes).sum::<f64>() / 60.0;
    let total_waste: u64 = rows.iter().map(|r| r.waste_count).sum();
    let waste_pct = if total_actual > 0 { total_waste as f64 / total_actual as f64 * 100.0 } else { 0.0 };

    let oee_component = oee * OEE_WEIGHT;
    let output_component = output_pct_target * OUTPUT_WEIGHT;
    let downtime_component = (100.0 - downtime_hours / HOURS_PER_WEEK * 100.0).max(0.0) * DOWNTIME_WEIGHT;
    let waste_component = (100.0 - waste_pct).max(0.0) * WASTE_WEIGHT;
    let score = (oee_component + output_component + downtime_component + waste_component).min(100.0);

    SubjectMetrics { subject, oee, output_pct_target, downtime_hours, waste_pct, score }
}

fn render_metrics(m: &SubjectMetrics) -> Value {
    json!({
        "subject": m.subject,
        "oee": m.oee,
        "output_pct_target": m.output_pct_target,
        "downtime_hours": m.downtime_hours,
        "waste_pct": m.waste_pct,
        "score": m.score,
    })
}

fn determine_winner(ranked: &[SubjectMetrics]) -> Option<Value> {
    if ranked.len() < 2 {
        return None;
    }
    let gap = ranked[0].score - ranked[1].score;
    if gap >= WINNER_SCORE_GAP {
        Some(json!({"subject": ranked[0].subject, "score": ranked[0].score, "score_gap": gap}))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(oee: f64, actual: u64, target: u64, downtime: f64, waste: u64) -> DailySummary {
        DailySummary {
            id: "s".into(),
            asset_id: "a1".into(),
            report_date: NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid date"),
            oee_percentage: Some(oee),
            availability: None,
            performance: None,
            quality: None,
            actual_output: actual,
            target_output: target,
            downtime_minutes: downtime,
            waste_count: waste,
            financial_loss_dollars: None,
            downtime_reasons: None,
        }
    }

    #[test]
    fn score_caps_at_one_hundred() {
        let rows = vec![row(100.0, 100, 100, 0.0, 0)];
        let metrics = score_subject("a1".into(), &rows);
        assert!(metrics.score <= 100.0);
    }

    #[test]
    fn expand_pattern_strips_prefix_and_plural() {
        assert_eq!(expand_pattern("all Grinders"), "grinder");
    }

    #[test]
    fn winner_requires_clearing_the_gap() {
        let close = vec![
            SubjectMetrics { subject: "a".into(), oee: 0.0, output_pct_target: 0.0, downtime_hours: 0.0, waste_pct: 0.0, score: 80.0 },
            SubjectMetrics { subject: "b".into(), oee: 0.0, output_pct_target: 0.0, downtime_hours: 0.0, waste_pct: 0.0, score: 78.0 },
        ];
        assert!(determine_winner(&close).is_none());
    }
}
