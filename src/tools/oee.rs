//! OEE Query.

use super::{database_citation, ToolContext, ToolSpec};
use crate::cache::Tier;
use crate::time_range;
use crate::types::{DailySummary, ToolMetadata, ToolResult};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

pub const SPEC: ToolSpec = ToolSpec {
    name: "oee_query",
    description: "Report OEE (availability × performance × quality) for an asset or area over a time range.",
    citations_required: true,
};

#[derive(Debug, Deserialize)]
struct Input {
    #[serde(default = "default_time_range")]
    time_range: String,
    asset_id: Option<String>,
    area: Option<String>,
}

fn default_time_range() -> String {
    "yesterday".to_string()
}

pub async fn run(ctx: &ToolContext, user_id: &str, input: Value) -> ToolResult {
    let parsed: Input = match serde_json::from_value(input.clone()) {
        Ok(v) => v,
        Err(err) => return super::validation_failure(format!("invalid oee_query input: {err}")),
    };
    if parsed.asset_id.is_none() && parsed.area.is_none() {
        return super::validation_failure("one of asset_id or area is required");
    }

    super::cached_run(ctx, SPEC.name, user_id, &input, Tier::Daily, || async move {
        let range = time_range::parse(&parsed.time_range, Utc::now().date_naive());

        let result = if let Some(asset_id) = &parsed.asset_id {
            ctx.gateway.get_oee(asset_id, range.start, range.end).await
        } else {
            ctx.gateway.get_oee_by_area(parsed.area.as_deref().unwrap_or_default(), range.start, range.end).await
        };
        let result = match result {
            Ok(r) => r,
            Err(err) => return ToolResult::failure(crate::error::Error::from(err).user_safe_message(), Vec::new(), ToolMetadata::new(Utc::now())),
        };

        if !result.has_data() {
            return ToolResult::ok(
                json!({"time_range": range.description, "summary": null, "per_asset": []}),
                Vec::new(),
                ToolMetadata::new(Utc::now()),
            );
        }

        let rows = result.rows();
        let summary = weighted_mean_oee(rows);
        let per_asset = per_asset_breakdown(rows);

        let citation = database_citation(
            &result,
            None,
            parsed.asset_id.clone(),
            format!("{} daily summaries over {}", rows.len(), range.description),
            format!("[Source: daily_summaries/{}]", range.description.replace(' ', "-")),
        );

        ToolResult::ok(
            json!({
                "time_range": range.description,
                "summary": summary,
                "days_considered": rows.len(),
                "per_asset": per_asset,
            }),
            vec![citation],
            ToolMetadata::new(Utc::now()),
        )
    })
    .await
}

/// Weighted by `actual_output` so a high-output day counts more than a
/// near-idle one; `None` when no row reports an `actual_output`.
pub(crate) fn weighted_mean_oee(rows: &[DailySummary]) -> Option<f64> {
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for row in rows {
        let Some(oee) = row.oee_percentage else { continue };
        let weight = row.actual_output as f64;
        weighted_sum += oee * weight;
        weight_total += weight;
    }
    if weight_total > 0.0 {
        Some(weighted_sum / weight_total)
    } else {
        None
    }
}

fn per_asset_breakdown(rows: &[DailySummary]) -> Vec<Value> {
    use std::collections::BTreeMap;
    let mut by_asset: BTreeMap<&str, Vec<&DailySummary>> = BTreeMap::new();
    for row in rows {
        by_asset.entry(row.asset_id.as_str()).or_default().push(row);
    }
    by_asset
        .into_iter()
        .map(|(asset_id, asset_rows)| {
            let values: Vec<f64> = asset_rows.iter().filter_map(|r| r.oee_percentage).collect();
            let mean = if values.is_empty() { None } else { Some(values.iter().sum::<f64>() / values.len() as f64) };
            json!({"asset_id": asset_id, "mean_oee": mean, "days_considered": asset_rows.len()})
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(asset_id: &str, oee: f64, actual_output: u64) -> DailySummary {
        DailySummary {
            id: "s".into(),
            asset_id: asset_id.into(),
            report_date: NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid date"),
            oee_percentage: Some(oee),
            availability: None,
            performance: None,
            quality: None,
            actual_output,
            target_output: 100,
            downtime_minutes: 0.0,
            waste_count: 0,
            financial_loss_dollars: None,
            downtime_reasons: None,
        }
    }

    #[test]
    fn weighted_mean_favors_high_output_days() {
        let rows = vec![row("a1", 90.0, 1000), row("a1", 10.0, 10)];
        let mean = weighted_mean_oee(&rows).expect("has data");
        assert!(mean > 80.0, "expected weighted mean close to 90, got {mean}");
    }

    #[test]
    fn empty_rows_yield_none() {
        assert_eq!(weighted_mean_oee(&[]), None);
    }

    #[test]
    fn per_asset_groups_by_asset_id() {
        let rows = vec![row("a1", 80.0, 100), row("a1", 90.0, 100), row("a2", 70.0, 100)];
        let breakdown = per_asset_breakdown(&rows);
        assert_eq!(breakdown.len(), 2);
    }
}
