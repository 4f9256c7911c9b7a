//! Trend Analysis.

use super::{database_citation, ToolContext, ToolSpec};
use crate::cache::Tier;
use crate::time_range;
use crate::types::{Citation, TrendPoint, ToolMetadata, ToolResult};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use statrs::statistics::Statistics;

pub const SPEC: ToolSpec = ToolSpec {
    name: "trend_analysis",
    description: "Analyze a metric's trend over time, flagging anomalies and the overall direction.",
    citations_required: true,
};

const MIN_DATA_POINTS: usize = 7;
const TREND_THRESHOLD: f64 = 0.05;
const ANOMALY_THRESHOLD_STD_DEV: f64 = 2.0;
const MAX_ANOMALIES: usize = 5;

#[derive(Debug, Deserialize)]
struct Input {
    #[serde(default = "default_time_range")]
    time_range: String,
    metric: String,
    asset_id: Option<String>,
    area: Option<String>,
}

fn default_time_range() -> String {
    "last 14 days".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
enum Direction {
    Improving,
    Declining,
    Stable,
}

pub async fn run(ctx: &ToolContext, user_id: &str, input: Value) -> ToolResult {
    let parsed: Input = match serde_json::from_value(input.clone()) {
        Ok(v) => v,
        Err(err) => return super::validation_failure(format!("invalid trend_analysis input: {err}")),
    };
    if parsed.asset_id.is_none() && parsed.area.is_none() {
        return super::validation_failure("one of asset_id or area is required");
    }

    super::cached_run(ctx, SPEC.name, user_id, &input, Tier::Daily, || async move {
        let now = Utc::now();
        let range = time_range::parse(&parsed.time_range, now.date_naive());

        let result = match ctx
            .gateway
            .get_trend_data(range.start, range.end, &parsed.metric, parsed.asset_id.as_deref(), parsed.area.as_deref())
            .await
        {
            Ok(r) => r,
            Err(err) => return ToolResult::failure(crate::error::Error::from(err).user_safe_message(), Vec::new(), ToolMetadata::new(now)),
        };

        let mut points = result.rows().to_vec();
        points.sort_by_key(|p| p.date);

        if points.len() < MIN_DATA_POINTS {
            return ToolResult::ok(
                json!({
                    "time_range": range.description,
                    "metric": parsed.metric,
                    "message": format!("need at least {MIN_DATA_POINTS} data points for trend analysis, have {}", points.len()),
                }),
                Vec::new(),
                ToolMetadata::new(now),
            );
        }

        let values: Vec<f64> = points.iter().map(|p| p.value).collect();
        let mean = values.iter().mean();
        let std_dev = values.iter().std_dev();
        let slope = ols_slope(&values);
        let direction = classify_direction(slope, mean, values.len(), &parsed.metric);
        let anomalies = detect_anomalies(&points, mean, std_dev);
        let baseline = baseline_comparison(&values);

        let citation = database_citation(
            &result,
            None,
            parsed.asset_id.clone(),
            format!("{} trend points over {}", points.len(), range.description),
            format!("[Source: trend_data/{}]", range.description.replace(' ', "-")),
        );
        let calc_citation = Citation::calculation(
            format!("OLS slope {slope:.4} over mean {mean:.2}, {std_dev:.2} std dev"),
            "[Source: calculation/trend-analysis]",
        );

        ToolResult::ok(
            json!({
                "time_range": range.description,
                "metric": parsed.metric,
                "mean": mean,
                "std_dev": std_dev,
                "min": Statistics::min(values.iter()),
                "max": Statistics::max(values.iter()),
                "direction": direction,
                "slope": slope,
                "anomalies": anomalies,
                "baseline_comparison": baseline,
            }),
            vec![citation, calc_citation],
            ToolMetadata::new(now),
        )
    })
    .await
}

/// Degree-1 ordinary-least-squares slope against `x = 0..n`.
fn ols_slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if n < 2.0 {
        return 0.0;
    }
    let xs: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
    let x_mean = xs.iter().mean();
    let y_mean = values.iter().mean();
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (x, y) in xs.iter().zip(values) {
        numerator += (x - x_mean) * (y - y_mean);
        denominator += (x - x_mean).powi(2);
    }
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// `downtime`/`waste` are loss metrics: a rising slope there is a decline,
/// not an improvement.
fn classify_direction(slope: f64, mean: f64, n: usize, metric: &str) -> Direction {
    if mean == 0.0 {
        return Direction::Stable;
    }
    let normalized = slope * n as f64 / mean;
    let inverted = matches!(metric.to_lowercase().as_str(), "downtime" | "waste");
    if normalized.abs() < TREND_THRESHOLD {
        Direction::Stable
    } else if (normalized > 0.0) != inverted {
        Direction::Improving
    } else {
        Direction::Declining
    }
}

fn detect_anomalies(points: &[TrendPoint], mean: f64, std_dev: f64) -> Vec<Value> {
    if std_dev == 0.0 {
        return Vec::new();
    }
    let mut flagged: Vec<(&TrendPoint, f64)> = points
        .iter()
        .filter_map(|p| {
            let deviation = (p.value - mean).abs();
            (deviation > ANOMALY_THRESHOLD_STD_DEV * std_dev).then_some((p, deviation))
        })
        .collect();
    flagged.sort_by(|a, b| b.1.total_cmp(&a.1));
    flagged.truncate(MAX_ANOMALIES);
    flagged
        .into_iter()
        .map(|(p, _)| {
            let possible_cause = p
                .downtime_reasons
                .as_ref()
                .and_then(|reasons| reasons.iter().max_by(|a, b| a.1.total_cmp(b.1)))
                .map(|(reason, _)| reason.clone());
            json!({"date": p.date, "value": p.value, "possible_cause": possible_cause})
        })
        .collect()
}

/// Mean of the first 7 points vs. the last 7 (or the remaining points when
/// the series has between 7 and 13 total).
fn baseline_comparison(values: &[f64]) -> Option<Value> {
    if values.len() < MIN_DATA_POINTS {
        return None;
    }
    let first = &values[..MIN_DATA_POINTS.min(values.len())];
    let recent_start = values.len().saturating_sub(MIN_DATA_POINTS).max(MIN_DATA_POINTS.min(values.len()));
    let recent = &values[recent_start..];
    if recent.is_empty() {
        return None;
    }
    let baseline_mean = first.iter().mean();
    let recent_mean = recent.iter().mean();
    let change_percent = if baseline_mean != 0.0 { (recent_mean - baseline_mean) / baseline_mean * 100.0 } else { 0.0 };
    Some(json!({"baseline_mean": baseline_mean, "recent_mean": recent_mean, "change_percent": change_percent}))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ols_slope_is_positive_for_increasing_series() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(ols_slope(&values) > 0.0);
    }

    #[test]
    fn direction_inverts_for_loss_metrics() {
        let direction = classify_direction(1.0, 10.0, 14, "downtime");
        assert_eq!(direction, Direction::Declining);
    }

    #[test]
    fn small_slope_is_stable() {
        let direction = classify_direction(0.001, 100.0, 14, "oee");
        assert_eq!(direction, Direction::Stable);
    }

    #[test]
    fn flat_series_has_no_anomalies() {
        let points: Vec<TrendPoint> = (0..7)
            .map(|i| TrendPoint { date: chrono::NaiveDate::from_ymd_opt(2026, 1, 1 + i).expect("valid"), value: 50.0, downtime_reasons: None, asset_name: None })
            .collect();
        assert!(detect_anomalies(&points, 50.0, 0.0).is_empty());
    }
}
