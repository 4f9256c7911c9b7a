//! Recommendation Engine — detects recurring loss patterns and ranks them
//! by estimated monthly ROI.

use super::{database_citation, ToolContext, ToolSpec};
use crate::cache::Tier;
use crate::time_range;
use crate::types::{DailySummary, ToolMetadata, ToolResult};
use chrono::{Datelike, Utc, Weekday};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};

pub const SPEC: ToolSpec = ToolSpec {
    name: "recommendation_engine",
    description: "Detect recurring downtime, weekly timing, and cross-asset loss patterns and rank them by estimated ROI.",
    citations_required: true,
};

const DEFAULT_HOURLY_COST: f64 = 2000.0;
const RECURRING_DOWNTIME_MIN_FREQUENCY: f64 = 0.10;
const TIME_PATTERN_MIN_POINTS: usize = 7;
const TIME_PATTERN_DROP_RATIO: f64 = 0.90;
const CROSS_ASSET_MIN_POINTS: usize = 20;
const CROSS_ASSET_MIN_ASSET_POINTS: usize = 3;
const CROSS_ASSET_DROP_RATIO: f64 = 0.85;

#[derive(Debug, Deserialize)]
struct Input {
    #[serde(default = "default_time_range")]
    time_range: String,
    asset_id: Option<String>,
    area: Option<String>,
}

fn default_time_range() -> String {
    "last 30 days".to_string()
}

#[derive(Debug, Clone, serde::Serialize)]
struct Recommendation {
    pattern_type: &'static str,
    description: String,
    confidence: f64,
    confidence_label: &'static str,
    estimated_roi_monthly: f64,
    priority: usize,
}

pub async fn run(ctx: &ToolContext, user_id: &str, input: Value) -> ToolResult {
    let parsed: Input = match serde_json::from_value(input.clone()) {
        Ok(v) => v,
        Err(err) => return super::validation_failure(format!("invalid recommendation_engine input: {err}")),
    };
    if parsed.asset_id.is_none() && parsed.area.is_none() {
        return super::validation_failure("one of asset_id or area is required");
    }

    super::cached_run(ctx, SPEC.name, user_id, &input, Tier::Daily, || async move {
        let now = Utc::now();
        let range = time_range::parse(&parsed.time_range, now.date_naive());
        let thresholds = ctx.config.recommendation;

        let result = if let Some(asset_id) = &parsed.asset_id {
            ctx.gateway.get_oee(asset_id, range.start, range.end).await
        } else {
            ctx.gateway.get_oee_by_area(parsed.area.as_deref().unwrap_or_default(), range.start, range.end).await
        };
        let result = match result {
            Ok(r) => r,
            Err(err) => return ToolResult::failure(crate::error::Error::from(err).user_safe_message(), Vec::new(), ToolMetadata::new(now)),
        };

        let rows = result.rows();
        if rows.len() < thresholds.minimum_data_points {
            return ToolResult::ok(
                json!({
                    "time_range": range.description,
                    "recommendations": [],
                    "message": format!("need at least {} data points, have {}", thresholds.minimum_data_points, rows.len()),
                }),
                Vec::new(),
                ToolMetadata::new(now),
            );
        }

        let mut recommendations = Vec::new();
        recommendations.extend(detect_recurring_downtime(rows, thresholds.confidence_high));
        recommendations.extend(detect_time_patterns(rows, thresholds.confidence_high));
        recommendations.extend(detect_cross_asset_correlations(rows, thresholds.confidence_high));

        recommendations.retain(|r| r.confidence >= thresholds.confidence_medium);
        recommendations.sort_by(|a, b| b.estimated_roi_monthly.total_cmp(&a.estimated_roi_monthly));
        recommendations.truncate(thresholds.max_recommendations);
        for (i, r) in recommendations.iter_mut().enumerate() {
            r.priority = i + 1;
        }

        let citation = database_citation(
            &result,
            None,
            parsed.asset_id.clone(),
            format!("{} daily summaries over {}", rows.len(), range.description),
            format!("[Source: daily_summaries/{}]", range.description.replace(' ', "-")),
        );

        ToolResult::ok(
            json!({"time_range": range.description, "recommendations": recommendations}),
            vec![citation],
            ToolMetadata::new(now),
        )
    })
    .await
}

fn confidence_label(confidence: f64, confidence_high: f64) -> &'static str {
    if confidence >= confidence_high {
        "high"
    } else {
        "medium"
    }
}

fn detect_recurring_downtime(rows: &[DailySummary], confidence_high: f64) -> Vec<Recommendation> {
    let with_downtime = rows.iter().filter(|r| r.downtime_minutes > 0.0).count();
    let frequency = with_downtime as f64 / rows.len() as f64;
    if frequency < RECURRING_DOWNTIME_MIN_FREQUENCY {
        return Vec::new();
    }
    let sample_factor = (rows.len() as f64 / 30.0).min(1.0);
    let confidence = ((frequency * 1.5 + 0.4) * sample_factor).min(0.95);
    let estimated_roi_monthly = frequency * 50.0 * DEFAULT_HOURLY_COST / 60.0;
    vec![Recommendation {
        pattern_type: "recurring_downtime",
        description: format!("Downtime recurs on {:.0}% of days in this window", frequency * 100.0),
        confidence,
        confidence_label: confidence_label(confidence, confidence_high),
        estimated_roi_monthly,
        priority: 0,
    }]
}

/// Flags weekdays whose average output-to-target ratio falls meaningfully
/// below the overall average.
fn detect_time_patterns(rows: &[DailySummary], confidence_high: f64) -> Vec<Recommendation> {
    if rows.len() < TIME_PATTERN_MIN_POINTS {
        return Vec::new();
    }
    let ratios: Vec<(Weekday, f64)> = rows
        .iter()
        .filter(|r| r.target_output > 0)
        .map(|r| (r.report_date.weekday(), r.actual_output as f64 / r.target_output as f64))
        .collect();
    if ratios.is_empty() {
        return Vec::new();
    }
    let overall_avg = ratios.iter().map(|(_, v)| v).sum::<f64>() / ratios.len() as f64;

    let mut by_day: HashMap<Weekday, Vec<f64>> = HashMap::new();
    for (day, ratio) in &ratios {
        by_day.entry(*day).or_default().push(*ratio);
    }

    let mut recommendations = Vec::new();
    for (day, values) in by_day {
        let day_avg = values.iter().sum::<f64>() / values.len() as f64;
        if day_avg >= overall_avg * TIME_PATTERN_DROP_RATIO {
            continue;
        }
        let variance = (overall_avg - day_avg).abs() / overall_avg;
        let sample_factor = (values.len() as f64 / 4.0).min(1.0);
        let confidence = ((variance + 0.5) * sample_factor).min(0.90);
        let gap_percent = variance * 100.0;
        let estimated_roi_monthly = gap_percent * DEFAULT_HOURLY_COST / 100.0 * 8.0 * 4.0;
        recommendations.push(Recommendation {
            pattern_type: "time_of_day",
            description: format!("Output on {day:?} runs {gap_percent:.0}% below the weekly average"),
            confidence,
            confidence_label: confidence_label(confidence, confidence_high),
            estimated_roi_monthly,
            priority: 0,
        });
    }
    recommendations
}

fn detect_cross_asset_correlations(rows: &[DailySummary], confidence_high: f64) -> Vec<Recommendation> {
    if rows.len() < CROSS_ASSET_MIN_POINTS {
        return Vec::new();
    }
    let mut by_asset: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for r in rows {
        if let Some(oee) = r.oee_percentage {
            by_asset.entry(r.asset_id.as_str()).or_default().push(oee);
        }
    }
    by_asset.retain(|_, values| values.len() >= CROSS_ASSET_MIN_ASSET_POINTS);
    if by_asset.len() < 2 {
        return Vec::new();
    }

    let all_values: Vec<f64> = by_asset.values().flatten().copied().collect();
    let plant_avg = all_values.iter().sum::<f64>() / all_values.len() as f64;
    if plant_avg == 0.0 {
        return Vec::new();
    }

    let mut recommendations = Vec::new();
    for (asset_id, values) in by_asset {
        let asset_avg = values.iter().sum::<f64>() / values.len() as f64;
        if asset_avg >= plant_avg * CROSS_ASSET_DROP_RATIO {
            continue;
        }
        let variance = (plant_avg - asset_avg).abs() / plant_avg;
        let confidence = (variance + 0.5).min(0.85);
        let gap_percent = variance * 100.0;
        let estimated_roi_monthly = gap_percent * DEFAULT_HOURLY_COST / 100.0 * 8.0 * 22.0;
        recommendations.push(Recommendation {
            pattern_type: "cross_asset",
            description: format!("{asset_id} runs {gap_percent:.0}% below the plant average OEE"),
            confidence,
            confidence_label: confidence_label(confidence, confidence_high),
            estimated_roi_monthly,
            priority: 0,
        });
    }
    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(date: NaiveDate, downtime: f64, actual: u64, target: u64, oee: Option<f64>, asset_id: &str) -> DailySummary {
        DailySummary {
            id: "s".into(),
            asset_id: asset_id.into(),
            report_date: date,
            oee_percentage: oee,
            availability: None,
            performance: None,
            quality: None,
            actual_output: actual,
            target_output: target,
            downtime_minutes: downtime,
            waste_count: 0,
            financial_loss_dollars: None,
            downtime_reasons: None,
        }
    }

    #[test]
    fn recurring_downtime_requires_minimum_frequency() {
        let rows: Vec<DailySummary> = (0..10)
            .map(|i| row(NaiveDate::from_ymd_opt(2026, 1, 1 + i).expect("valid"), 0.0, 100, 100, Some(80.0), "a1"))
            .collect();
        assert!(detect_recurring_downtime(&rows, 0.80).is_empty());
    }

    #[test]
    fn recurring_downtime_flags_frequent_pattern() {
        let rows: Vec<DailySummary> = (0..10)
            .map(|i| row(NaiveDate::from_ymd_opt(2026, 1, 1 + i).expect("valid"), if i % 2 == 0 { 30.0 } else { 0.0 }, 100, 100, Some(80.0), "a1"))
            .collect();
        let recs = detect_recurring_downtime(&rows, 0.80);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].pattern_type, "recurring_downtime");
    }

    #[test]
    fn cross_asset_requires_minimum_points() {
        let rows: Vec<DailySummary> = (0..5)
            .map(|i| row(NaiveDate::from_ymd_opt(2026, 1, 1 + i).expect("valid"), 0.0, 100, 100, Some(80.0), "a1"))
            .collect();
        assert!(detect_cross_asset_correlations(&rows, 0.80).is_empty());
    }
}
