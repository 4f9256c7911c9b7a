//! Cost of Loss Ranking.

use super::{database_citation, ToolContext, ToolSpec};
use crate::cache::Tier;
use crate::time_range;
use crate::types::{Citation, FinancialRecord, ToolMetadata, ToolResult};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

pub const SPEC: ToolSpec = ToolSpec {
    name: "cost_of_loss",
    description: "Rank the largest sources of financial loss by category (downtime, waste, quality) over a time range.",
    citations_required: true,
};

#[derive(Debug, Deserialize)]
struct Input {
    #[serde(default = "default_time_range")]
    time_range: String,
    area: Option<String>,
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default)]
    compare_to_previous: bool,
}

fn default_time_range() -> String {
    "yesterday".to_string()
}

fn default_limit() -> usize {
    10
}

#[derive(Debug, Clone)]
struct LossItem {
    asset_id: String,
    asset_name: String,
    category: &'static str,
    amount: f64,
    root_cause: Option<String>,
}

pub async fn run(ctx: &ToolContext, user_id: &str, input: Value) -> ToolResult {
    let parsed: Input = match serde_json::from_value(input.clone()) {
        Ok(v) => v,
        Err(err) => return super::validation_failure(format!("invalid cost_of_loss input: {err}")),
    };

    super::cached_run(ctx, SPEC.name, user_id, &input, Tier::Daily, || async move {
        let now = Utc::now();
        let range = time_range::parse(&parsed.time_range, now.date_naive());

        let result = match ctx.gateway.get_cost_of_loss(range.start, range.end, parsed.area.as_deref()).await {
            Ok(r) => r,
            Err(err) => return ToolResult::failure(crate::error::Error::from(err).user_safe_message(), Vec::new(), ToolMetadata::new(now)),
        };
        if !result.has_data() {
            return ToolResult::ok(
                json!({"time_range": range.description, "items": [], "category_summaries": []}),
                Vec::new(),
                ToolMetadata::new(now),
            );
        }

        let records = result.rows();
        let mut items = all_losses(records);
        items.sort_by(|a, b| b.amount.total_cmp(&a.amount));
        let total_loss: f64 = items.iter().map(|i| i.amount).sum();
        let category_summaries = category_summaries(&items, total_loss);
        items.truncate(parsed.limit.max(1));

        let mut citations = vec![database_citation(
            &result,
            None,
            None,
            format!("{} records over {}", records.len(), range.description),
            format!("[Source: daily_summaries+cost_centers/{}]", range.description.replace(' ', "-")),
        )];
        citations.push(Citation::calculation(
            format!("ranked {} loss items totaling ${total_loss:.2}", items.len()),
            "[Source: calculation/cost-of-loss-ranking]",
        ));

        let trend = if parsed.compare_to_previous { previous_window_comparison(ctx, &range, parsed.area.as_deref(), total_loss).await } else { None };

        ToolResult::ok(
            json!({
                "time_range": range.description,
                "items": items.iter().map(render_item).collect::<Vec<_>>(),
                "total_loss": total_loss,
                "category_summaries": category_summaries,
                "trend": trend,
            }),
            citations,
            ToolMetadata::new(now),
        )
    })
    .await
}

fn render_item(item: &LossItem) -> Value {
    json!({
        "asset_id": item.asset_id,
        "asset_name": item.asset_name,
        "category": item.category,
        "amount": item.amount,
        "root_cause": item.root_cause,
    })
}

/// Extracts one `LossItem` per downtime reason (when `downtime_reasons` is
/// present) or one aggregate downtime item, plus one waste item, per record.
fn all_losses(records: &[FinancialRecord]) -> Vec<LossItem> {
    let mut items = Vec::new();
    for r in records {
        if r.downtime_minutes > 0.0 {
            if let Some(rate) = r.standard_hourly_rate {
                let cost_per_minute = rate / 60.0;
                match &r.downtime_reasons {
                    Some(reasons) if !reasons.is_empty() => {
                        for (reason, minutes) in reasons {
                            if *minutes > 0.0 {
                                items.push(LossItem {
                                    asset_id: r.asset_id.clone(),
                                    asset_name: r.asset_name.clone(),
                                    category: "downtime",
                                    amount: minutes * cost_per_minute,
                                    root_cause: Some(reason.clone()),
                                });
                            }
                        }
                    }
                    _ => {
                        items.push(LossItem {
                            asset_id: r.asset_id.clone(),
                            asset_name: r.asset_name.clone(),
                            category: "downtime",
                            amount: r.downtime_minutes * cost_per_minute,
                            root_cause: None,
                        });
                    }
                }
            }
        }
        if r.waste_count > 0 {
            if let Some(cost_per_unit) = r.cost_per_unit {
                items.push(LossItem {
                    asset_id: r.asset_id.clone(),
                    asset_name: r.asset_name.clone(),
                    category: "waste",
                    amount: r.waste_count as f64 * cost_per_unit,
                    root_cause: None,
                });
            }
        }
    }
    items
}

fn category_summaries(items: &[LossItem], total_loss: f64) -> Vec<Value> {
    let mut by_category: BTreeMap<&str, Vec<&LossItem>> = BTreeMap::new();
    for item in items {
        by_category.entry(item.category).or_default().push(item);
    }
    ["downtime", "waste", "quality"]
        .iter()
        .filter_map(|category| {
            let in_category = by_category.get(category)?;
            let subtotal: f64 = in_category.iter().map(|i| i.amount).sum();
            let percentage = if total_loss > 0.0 { subtotal / total_loss * 100.0 } else { 0.0 };
            Some(json!({"category": category, "total_amount": subtotal, "percentage": percentage}))
        })
        .collect()
}

async fn previous_window_comparison(ctx: &ToolContext, range: &time_range::TimeRange, area: Option<&str>, current_total: f64) -> Option<Value> {
    let span_days = (range.end - range.start).num_days() + 1;
    let previous_end = range.start - chrono::Duration::days(1);
    let previous_start = previous_end - chrono::Duration::days(span_days - 1);

    let result = ctx.gateway.get_cost_of_loss(previous_start, previous_end, area).await.ok()?;
    if !result.has_data() {
        return None;
    }
    let items = all_losses(result.rows());
    let previous_total: f64 = items.iter().map(|i| i.amount).sum();
    let change_percent = if previous_total > 0.0 { (current_total - previous_total) / previous_total * 100.0 } else { 0.0 };
    Some(json!({"previous_total_loss": previous_total, "change_percent": change_percent}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap as StdBTreeMap;

    fn record(downtime: f64, reasons: Option<Vec<(&str, f64)>>, waste: u64) -> FinancialRecord {
        FinancialRecord {
            asset_id: "a1".into(),
            asset_name: "Line".into(),
            report_date: chrono::NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid date"),
            downtime_minutes: downtime,
            waste_count: waste,
            standard_hourly_rate: Some(120.0),
            cost_per_unit: Some(2.0),
            downtime_reasons: reasons.map(|rs| rs.into_iter().map(|(k, v)| (k.to_string(), v)).collect::<StdBTreeMap<_, _>>()),
        }
    }

    #[test]
    fn explodes_downtime_reasons_into_separate_items() {
        let records = vec![record(60.0, Some(vec![("jam", 40.0), ("changeover", 20.0)]), 0)];
        let items = all_losses(&records);
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.category == "downtime"));
    }

    #[test]
    fn falls_back_to_aggregate_downtime_without_reasons() {
        let records = vec![record(60.0, None, 0)];
        let items = all_losses(&records);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].root_cause, None);
    }

    #[test]
    fn category_summary_percentages_sum_to_total() {
        let items = vec![
            LossItem { asset_id: "a1".into(), asset_name: "L".into(), category: "downtime", amount: 75.0, root_cause: None },
            LossItem { asset_id: "a1".into(), asset_name: "L".into(), category: "waste", amount: 25.0, root_cause: None },
        ];
        let summaries = category_summaries(&items, 100.0);
        let downtime = summaries.iter().find(|s| s["category"] == "downtime").expect("downtime present");
        assert_eq!(downtime["percentage"], 75.0);
    }
}
