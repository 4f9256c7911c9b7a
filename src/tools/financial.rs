//! Financial Impact.

use super::{database_citation, ToolContext, ToolSpec};
use crate::cache::Tier;
use crate::time_range;
use crate::types::{Citation, FinancialRecord, ToolMetadata, ToolResult};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

pub const SPEC: ToolSpec = ToolSpec {
    name: "financial_impact",
    description: "Calculate the dollar cost of downtime and waste for an asset or area, with transparent formulas.",
    citations_required: true,
};

#[derive(Debug, Deserialize)]
struct Input {
    #[serde(default = "default_time_range")]
    time_range: String,
    asset_id: Option<String>,
    area: Option<String>,
    #[serde(default = "default_true")]
    include_breakdown: bool,
}

fn default_time_range() -> String {
    "yesterday".to_string()
}

fn default_true() -> bool {
    true
}

pub async fn run(ctx: &ToolContext, user_id: &str, input: Value) -> ToolResult {
    let parsed: Input = match serde_json::from_value(input.clone()) {
        Ok(v) => v,
        Err(err) => return super::validation_failure(format!("invalid financial_impact input: {err}")),
    };

    super::cached_run(ctx, SPEC.name, user_id, &input, Tier::Daily, || async move {
        let now = Utc::now();
        let range = time_range::parse(&parsed.time_range, now.date_naive());
        let mut citations = Vec::new();

        let result = match ctx
            .gateway
            .get_financial_metrics(range.start, range.end, parsed.asset_id.as_deref(), parsed.area.as_deref())
            .await
        {
            Ok(r) => r,
            Err(err) => return ToolResult::failure(crate::error::Error::from(err).user_safe_message(), Vec::new(), ToolMetadata::new(now)),
        };
        if result.has_data() {
            citations.push(database_citation(
                &result,
                None,
                parsed.asset_id.clone(),
                format!("{} financial records over {}", result.rows().len(), range.description),
                format!("[Source: daily_summaries+cost_centers/{}]", range.description.replace(' ', "-")),
            ));
        }

        let records = result.rows();
        if records.is_empty() {
            return ToolResult::ok(
                json!({"time_range": range.description, "total_loss": null, "message": "no financial data available for this period"}),
                citations,
                ToolMetadata::new(now),
            );
        }

        if !records.iter().any(FinancialRecord::has_cost_data) {
            let total_downtime: f64 = records.iter().map(|r| r.downtime_minutes).sum();
            let total_waste: u64 = records.iter().map(|r| r.waste_count).sum();
            return ToolResult::ok(
                json!({
                    "time_range": range.description,
                    "total_loss": null,
                    "message": "no cost center data configured for this scope",
                    "non_financial_metrics": {"downtime_minutes": total_downtime, "waste_count": total_waste},
                }),
                citations,
                ToolMetadata::new(now),
            );
        }

        let breakdown = calculate_breakdown(records);
        let total_loss: f64 = breakdown.iter().map(|b| b["amount"].as_f64().unwrap_or(0.0)).sum();

        let per_asset = if parsed.area.is_some() { Some(per_asset_breakdown(records)) } else { None };
        let highest_cost_asset = per_asset.as_ref().and_then(|rows: &Vec<Value>| {
            rows.iter().max_by(|a, b| {
                a["total_loss"].as_f64().unwrap_or(0.0).total_cmp(&b["total_loss"].as_f64().unwrap_or(0.0))
            }).cloned()
        });

        let average_comparison = average_comparison(ctx, records, parsed.asset_id.as_deref(), parsed.area.as_deref(), &range).await;
        citations.push(Citation::calculation(
            format!("downtime_minutes * rate/hr / 60 + waste_count * cost_per_unit, totaling ${total_loss:.2}"),
            "[Source: calculation/financial-breakdown]",
        ));

        ToolResult::ok(
            json!({
                "time_range": range.description,
                "total_loss": total_loss,
                "breakdown": if parsed.include_breakdown { breakdown } else { Vec::new() },
                "per_asset_breakdown": per_asset,
                "highest_cost_asset": highest_cost_asset,
                "average_comparison": average_comparison,
            }),
            citations,
            ToolMetadata::new(now),
        )
    })
    .await
}

/// `downtime_minutes × mean hourly rate / 60` plus `waste_count × mean
/// cost-per-unit`, aggregated once across every record in scope.
fn calculate_breakdown(records: &[FinancialRecord]) -> Vec<Value> {
    let mut total_downtime_minutes = 0.0;
    let mut total_waste_count = 0u64;
    let (mut rate_sum, mut rate_count) = (0.0, 0u32);
    let (mut unit_sum, mut unit_count) = (0.0, 0u32);

    for r in records {
        total_downtime_minutes += r.downtime_minutes;
        total_waste_count += r.waste_count;
        if let Some(rate) = r.standard_hourly_rate {
            rate_sum += rate;
            rate_count += 1;
        }
        if let Some(cost) = r.cost_per_unit {
            unit_sum += cost;
            unit_count += 1;
        }
    }
    let avg_rate = if rate_count > 0 { rate_sum / rate_count as f64 } else { 0.0 };
    let avg_unit_cost = if unit_count > 0 { unit_sum / unit_count as f64 } else { 0.0 };

    let mut breakdown = Vec::new();
    if total_downtime_minutes > 0.0 && avg_rate > 0.0 {
        let cost = total_downtime_minutes * avg_rate / 60.0;
        breakdown.push(json!({
            "category": "downtime",
            "amount": cost,
            "formula": format!("{total_downtime_minutes:.0} min * ${avg_rate:.2}/hr / 60 = ${cost:.2}"),
        }));
    }
    if total_waste_count > 0 && avg_unit_cost > 0.0 {
        let cost = total_waste_count as f64 * avg_unit_cost;
        breakdown.push(json!({
            "category": "waste",
            "amount": cost,
            "formula": format!("{total_waste_count} units * ${avg_unit_cost:.2}/unit = ${cost:.2}"),
        }));
    }
    breakdown
}

fn per_asset_breakdown(records: &[FinancialRecord]) -> Vec<Value> {
    let mut by_asset: BTreeMap<&str, Vec<&FinancialRecord>> = BTreeMap::new();
    for r in records {
        by_asset.entry(r.asset_id.as_str()).or_default().push(r);
    }
    let mut rows: Vec<Value> = by_asset
        .into_iter()
        .map(|(asset_id, rs)| {
            let asset_name = rs.first().map(|r| r.asset_name.clone()).unwrap_or_default();
            let grouped: Vec<FinancialRecord> = rs.into_iter().cloned().collect();
            let breakdown = calculate_breakdown(&grouped);
            let total: f64 = breakdown.iter().map(|b| b["amount"].as_f64().unwrap_or(0.0)).sum();
            json!({"asset_id": asset_id, "asset_name": asset_name, "total_loss": total})
        })
        .collect();
    rows.sort_by(|a, b| b["total_loss"].as_f64().unwrap_or(0.0).total_cmp(&a["total_loss"].as_f64().unwrap_or(0.0)));
    rows
}

async fn average_comparison(
    ctx: &ToolContext,
    current_records: &[FinancialRecord],
    asset_id: Option<&str>,
    area: Option<&str>,
    current_range: &time_range::TimeRange,
) -> Option<Value> {
    let today = Utc::now().date_naive();
    let historical = ctx.gateway.get_financial_metrics(today - Duration::days(30), today - Duration::days(1), asset_id, area).await.ok()?;
    if !historical.has_data() {
        return None;
    }

    let mut daily_totals: BTreeMap<chrono::NaiveDate, f64> = BTreeMap::new();
    for r in historical.rows() {
        let entry = daily_totals.entry(r.report_date).or_insert(0.0);
        *entry += r.downtime_cost().unwrap_or(0.0) + r.waste_cost().unwrap_or(0.0);
    }
    if daily_totals.is_empty() {
        return None;
    }
    let average_daily_loss: f64 = daily_totals.values().sum::<f64>() / daily_totals.len() as f64;

    let current_breakdown = calculate_breakdown(current_records);
    let current_loss: f64 = current_breakdown.iter().map(|b| b["amount"].as_f64().unwrap_or(0.0)).sum();
    let num_days = (current_range.end - current_range.start).num_days() + 1;
    let current_daily_avg = if num_days > 0 { current_loss / num_days as f64 } else { current_loss };

    let variance = current_daily_avg - average_daily_loss;
    let variance_percent = if average_daily_loss > 0.0 { variance / average_daily_loss * 100.0 } else { 0.0 };
    let direction = if variance > 0.0 { "above" } else { "below" };

    Some(json!({
        "average_daily_loss": average_daily_loss,
        "current_daily_average": current_daily_avg,
        "variance": variance,
        "variance_percent": variance_percent,
        "description": format!("${:.2} ({:.1}%) {direction} average", variance.abs(), variance_percent.abs()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(asset_id: &str, downtime: f64, waste: u64, rate: Option<f64>, cost_per_unit: Option<f64>) -> FinancialRecord {
        FinancialRecord {
            asset_id: asset_id.into(),
            asset_name: "Line".into(),
            report_date: NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid date"),
            downtime_minutes: downtime,
            waste_count: waste,
            standard_hourly_rate: rate,
            cost_per_unit,
            downtime_reasons: None,
        }
    }

    #[test]
    fn breakdown_includes_both_categories_when_present() {
        let records = vec![record("a1", 60.0, 10, Some(120.0), Some(2.0))];
        let breakdown = calculate_breakdown(&records);
        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown[0]["amount"], 120.0);
        assert_eq!(breakdown[1]["amount"], 20.0);
    }

    #[test]
    fn breakdown_omits_category_with_no_rate() {
        let records = vec![record("a1", 60.0, 0, Some(120.0), None)];
        let breakdown = calculate_breakdown(&records);
        assert_eq!(breakdown.len(), 1);
        assert_eq!(breakdown[0]["category"], "downtime");
    }

    #[test]
    fn per_asset_breakdown_sorts_by_loss_descending() {
        let records = vec![record("a1", 10.0, 0, Some(60.0), None), record("a2", 100.0, 0, Some(60.0), None)];
        let rows = per_asset_breakdown(&records);
        assert_eq!(rows[0]["asset_id"], "a2");
    }
}
