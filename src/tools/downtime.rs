//! Downtime Analysis.

use super::{database_citation, ToolContext, ToolSpec};
use crate::cache::Tier;
use crate::time_range;
use crate::types::{DailySummary, ToolMetadata, ToolResult};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

pub const SPEC: ToolSpec = ToolSpec {
    name: "downtime_analysis",
    description: "Break down downtime minutes by reason and by asset over a time range, with the top contributing reasons.",
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
        Err(err) => return super::validation_failure(format!("invalid downtime_analysis input: {err}")),
    };
    if parsed.asset_id.is_none() && parsed.area.is_none() {
        return super::validation_failure("one of asset_id or area is required");
    }

    super::cached_run(ctx, SPEC.name, user_id, &input, Tier::Daily, || async move {
        let range = time_range::parse(&parsed.time_range, Utc::now().date_naive());

        let result = if let Some(asset_id) = &parsed.asset_id {
            ctx.gateway.get_downtime(asset_id, range.start, range.end).await
        } else {
            match ctx.gateway.get_assets_by_area(parsed.area.as_deref().unwrap_or_default()).await {
                Ok(assets) => {
                    let mut combined = Vec::new();
                    for asset in assets.rows() {
                        match ctx.gateway.get_downtime(&asset.id, range.start, range.end).await {
                            Ok(r) => combined.extend(r.rows().iter().cloned()),
                            Err(err) => return ToolResult::failure(crate::error::Error::from(err).user_safe_message(), Vec::new(), ToolMetadata::new(Utc::now())),
                        }
                    }
                    Ok(crate::types::DataResult::list(combined, "gateway", "daily_summaries", "area downtime", Utc::now()))
                }
                Err(err) => Err(err),
            }
        };
        let result = match result {
            Ok(r) => r,
            Err(err) => return ToolResult::failure(crate::error::Error::from(err).user_safe_message(), Vec::new(), ToolMetadata::new(Utc::now())),
        };

        if !result.has_data() {
            return ToolResult::ok(
                json!({"time_range": range.description, "total_downtime_minutes": 0.0, "top_reasons": [], "by_asset": []}),
                Vec::new(),
                ToolMetadata::new(Utc::now()),
            );
        }

        let rows = result.rows();
        let total_minutes: f64 = rows.iter().map(|r| r.downtime_minutes).sum();
        let top_reasons = top_reasons(rows, 3);
        let by_asset = minutes_by_asset(rows);
        let insight = insight_string(&top_reasons, total_minutes);

        let citation = database_citation(
            &result,
            None,
            parsed.asset_id.clone(),
            format!("{} downtime days over {}", rows.len(), range.description),
            format!("[Source: daily_summaries/{}]", range.description.replace(' ', "-")),
        );

        ToolResult::ok(
            json!({
                "time_range": range.description,
                "total_downtime_minutes": total_minutes,
                "top_reasons": top_reasons,
                "by_asset": by_asset,
                "insight": insight,
            }),
            vec![citation],
            ToolMetadata::new(Utc::now()),
        )
    })
    .await
}

fn top_reasons(rows: &[DailySummary], limit: usize) -> Vec<Value> {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for row in rows {
        if let Some(reasons) = &row.downtime_reasons {
            for (reason, minutes) in reasons {
                *totals.entry(reason.clone()).or_insert(0.0) += minutes;
            }
        }
    }
    let mut ranked: Vec<(String, f64)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(limit);
    ranked.into_iter().map(|(reason, minutes)| json!({"reason": reason, "minutes": minutes})).collect()
}

fn minutes_by_asset(rows: &[DailySummary]) -> Vec<Value> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for row in rows {
        *totals.entry(row.asset_id.as_str()).or_insert(0.0) += row.downtime_minutes;
    }
    totals.into_iter().map(|(asset_id, minutes)| json!({"asset_id": asset_id, "minutes": minutes})).collect()
}

/// The single largest downtime reason across `rows`, if any was recorded.
pub(crate) fn top_reason(rows: &[DailySummary]) -> Option<String> {
    top_reasons(rows, 1).into_iter().next().and_then(|v| v.get("reason").and_then(|r| r.as_str()).map(str::to_string))
}

fn insight_string(top_reasons: &[Value], total_minutes: f64) -> String {
    match top_reasons.first().and_then(|v| v.get("reason")).and_then(|v| v.as_str()) {
        Some(reason) => format!("Largest contributor: {reason}, out of {total_minutes:.0} total downtime minutes."),
        None => "No downtime reasons were recorded for this period.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(asset_id: &str, minutes: f64, reasons: Vec<(&str, f64)>) -> DailySummary {
        DailySummary {
            id: "s".into(),
            asset_id: asset_id.into(),
            report_date: NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid date"),
            oee_percentage: None,
            availability: None,
            performance: None,
            quality: None,
            actual_output: 0,
            target_output: 0,
            downtime_minutes: minutes,
            waste_count: 0,
            financial_loss_dollars: None,
            downtime_reasons: Some(reasons.into_iter().map(|(k, v)| (k.to_string(), v)).collect()),
        }
    }

    #[test]
    fn top_reasons_are_sorted_descending() {
        let rows = vec![row("a1", 60.0, vec![("jam", 20.0), ("changeover", 40.0)])];
        let reasons = top_reasons(&rows, 3);
        assert_eq!(reasons[0]["reason"], "changeover");
    }

    #[test]
    fn minutes_by_asset_sums_per_asset() {
        let rows = vec![row("a1", 30.0, vec![]), row("a1", 20.0, vec![]), row("a2", 10.0, vec![])];
        let by_asset = minutes_by_asset(&rows);
        let a1 = by_asset.iter().find(|v| v["asset_id"] == "a1").expect("a1 present");
        assert_eq!(a1["minutes"], 50.0);
    }

    #[test]
    fn no_reasons_yields_fallback_insight() {
        assert_eq!(insight_string(&[], 0.0), "No downtime reasons were recorded for this period.");
    }
}
