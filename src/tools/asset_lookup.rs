//! Asset Lookup.

use super::{database_citation, ToolContext, ToolSpec};
use crate::cache::Tier;
use crate::types::{LiveSnapshot, ToolMetadata, ToolResult};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

pub const SPEC: ToolSpec = ToolSpec {
    name: "asset_lookup",
    description: "Look up an asset by name and report its current status and recent performance.",
    citations_required: true,
};

#[derive(Debug, Deserialize)]
struct Input {
    asset_name: String,
    #[serde(default = "default_true")]
    include_performance: bool,
    #[serde(default = "default_days_back")]
    days_back: i64,
}

fn default_true() -> bool {
    true
}

fn default_days_back() -> i64 {
    7
}

/// Lowercase, fold `# - _` to spaces, collapse whitespace, and split a
/// trailing digit run from its preceding letters ("grinder5" → "grinder 5").
fn normalize(name: &str) -> String {
    let folded: String = name
        .chars()
        .map(|c| if matches!(c, '#' | '-' | '_') { ' ' } else { c })
        .collect::<String>()
        .to_lowercase();

    let mut spaced = String::with_capacity(folded.len() + 1);
    let mut prev_alpha = false;
    for c in folded.chars() {
        if c.is_ascii_digit() && prev_alpha {
            spaced.push(' ');
        }
        prev_alpha = c.is_alphabetic();
        spaced.push(c);
    }

    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub async fn run(ctx: &ToolContext, user_id: &str, input: Value) -> ToolResult {
    let parsed: Input = match serde_json::from_value(input.clone()) {
        Ok(v) => v,
        Err(err) => return super::validation_failure(format!("invalid asset_lookup input: {err}")),
    };
    if parsed.asset_name.trim().is_empty() {
        return super::validation_failure("asset_name must not be empty");
    }

    super::cached_run(ctx, SPEC.name, user_id, &input, Tier::Daily, || async move {
        let normalized = normalize(&parsed.asset_name);
        let lookup = match ctx.gateway.get_asset_by_name(&normalized).await {
            Ok(r) => r,
            Err(err) => return ToolResult::failure(crate::error::Error::from(err).user_safe_message(), Vec::new(), ToolMetadata::new(Utc::now())),
        };

        let Some(asset) = lookup.data.clone() else {
            let suggestions = match ctx.gateway.get_similar_assets(&normalized, 5).await {
                Ok(r) => r.rows().iter().map(|a| a.name.clone()).collect::<Vec<_>>(),
                Err(_) => Vec::new(),
            };
            return ToolResult::ok(
                json!({"found": false, "suggestions": suggestions}),
                Vec::new(),
                ToolMetadata::new(Utc::now()),
            );
        };

        let mut citations = vec![database_citation(
            &lookup,
            Some(asset.id.clone()),
            Some(asset.id.clone()),
            format!("asset: {}", asset.name),
            format!("[Source: assets/asset-{}]", asset.name.to_lowercase().replace(' ', "-")),
        )];

        let snapshot_result = match ctx.gateway.get_live_snapshot(&asset.id).await {
            Ok(r) => r,
            Err(err) => return ToolResult::failure(crate::error::Error::from(err).user_safe_message(), citations, ToolMetadata::new(Utc::now())),
        };
        let now = Utc::now();
        let (status, data_stale, stale_message) = match snapshot_result.data.as_ref() {
            Some(snap) => {
                let stale = snap.is_stale(now);
                let message = stale.then(|| stale_notice(snap, now));
                (Some(snap.status), stale, message)
            }
            None => (None, false, None),
        };
        if snapshot_result.has_data() {
            citations.push(database_citation(
                &snapshot_result,
                None,
                Some(asset.id.clone()),
                "latest live snapshot",
                format!("[Source: live_snapshots/asset-{}]", asset.name.to_lowercase().replace(' ', "-")),
            ));
        }

        let mut data = json!({
            "found": true,
            "metadata": {"id": asset.id, "name": asset.name, "area": asset.area},
            "current_status": {
                "status": status,
                "data_stale": data_stale,
                "message": stale_message,
            },
        });

        if parsed.include_performance {
            let end = now.date_naive();
            let start = end - Duration::days(parsed.days_back.max(1) - 1);
            let oee_result = match ctx.gateway.get_oee(&asset.id, start, end).await {
                Ok(r) => r,
                Err(err) => return ToolResult::failure(crate::error::Error::from(err).user_safe_message(), citations, ToolMetadata::new(Utc::now())),
            };
            let rows = oee_result.rows();
            let values: Vec<f64> = rows.iter().filter_map(|r| r.oee_percentage).collect();
            let mean_oee = mean(&values);
            let trend = oee_trend(&values);

            let mut reason_totals: std::collections::BTreeMap<String, f64> = std::collections::BTreeMap::new();
            for row in rows {
                if let Some(reasons) = &row.downtime_reasons {
                    for (reason, minutes) in reasons {
                        *reason_totals.entry(reason.clone()).or_insert(0.0) += minutes;
                    }
                }
            }
            let top_reason = reason_totals.into_iter().max_by(|a, b| a.1.total_cmp(&b.1)).map(|(reason, _)| reason);

            if oee_result.has_data() {
                citations.push(super::database_citation(
                    &oee_result,
                    None,
                    Some(asset.id.clone()),
                    format!("{} days of daily summaries", rows.len()),
                    format!("[Source: daily_summaries/asset-{}]", asset.name.to_lowercase().replace(' ', "-")),
                ));
            }

            data["performance"] = json!({
                "mean_oee": mean_oee,
                "trend": trend,
                "top_downtime_reason": top_reason,
                "days_considered": rows.len(),
            });
        }

        ToolResult::ok(data, citations, ToolMetadata::new(now))
    })
    .await
}

fn stale_notice(snapshot: &LiveSnapshot, now: DateTime<Utc>) -> String {
    let age = (now - snapshot.snapshot_timestamp).num_minutes();
    format!("Live data is {age} minutes old; production floor connectivity may be degraded.")
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// `improving`/`declining`/`stable` by comparing first-half vs second-half
/// means with a 2-point dead-band; `insufficient_data` below 4 points.
fn oee_trend(values: &[f64]) -> &'static str {
    if values.len() < 4 {
        return "insufficient_data";
    }
    let mid = values.len() / 2;
    let (first_half, second_half) = values.split_at(mid);
    let Some(first_mean) = mean(first_half) else { return "insufficient_data" };
    let Some(second_mean) = mean(second_half) else { return "insufficient_data" };
    let delta = second_mean - first_mean;
    if delta.abs() <= 2.0 {
        "stable"
    } else if delta > 0.0 {
        "improving"
    } else {
        "declining"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_hash_dash_underscore_and_trailing_digits() {
        assert_eq!(normalize("Grinder#5"), "grinder 5");
        assert_eq!(normalize("line-1_press"), "line 1 press");
        assert_eq!(normalize("  Packer   9  "), "packer 9");
    }

    #[test]
    fn trend_requires_at_least_four_points() {
        assert_eq!(oee_trend(&[70.0, 72.0]), "insufficient_data");
    }

    #[test]
    fn trend_detects_improvement_outside_dead_band() {
        assert_eq!(oee_trend(&[60.0, 61.0, 80.0, 82.0]), "improving");
    }

    #[test]
    fn trend_is_stable_within_dead_band() {
        assert_eq!(oee_trend(&[70.0, 71.0, 71.5, 70.8]), "stable");
    }
}
