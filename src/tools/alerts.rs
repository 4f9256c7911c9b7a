//! Alert Check — merges safety events, production variance, and (reserved)
//! equipment status changes into one severity-sorted feed.

use super::{database_citation, ToolContext, ToolSpec};
use crate::cache::Tier;
use crate::types::{Severity, ToolMetadata, ToolResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const SPEC: ToolSpec = ToolSpec {
    name: "alert_check",
    description: "Check for active alerts and warnings across the plant, merged from safety events and production variance.",
    citations_required: true,
};

const STALE_ALERT_THRESHOLD_MINUTES: i64 = 60;
const PRODUCTION_VARIANCE_THRESHOLD: f64 = 0.20;

#[derive(Debug, Deserialize)]
struct Input {
    severity_filter: Option<String>,
    area_filter: Option<String>,
    #[serde(default)]
    include_resolved: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum AlertSeverity {
    Critical,
    Warning,
    Info,
}

impl AlertSeverity {
    fn rank(self) -> u8 {
        match self {
            AlertSeverity::Critical => 0,
            AlertSeverity::Warning => 1,
            AlertSeverity::Info => 2,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct AlertRow {
    alert_id: String,
    alert_type: &'static str,
    severity: AlertSeverity,
    asset_id: String,
    description: String,
    recommended_response: &'static str,
    triggered_at: DateTime<Utc>,
    duration_minutes: i64,
    requires_attention: bool,
    source_table: &'static str,
}

pub async fn run(ctx: &ToolContext, user_id: &str, input: Value) -> ToolResult {
    let parsed: Input = match serde_json::from_value(input.clone()) {
        Ok(v) => v,
        Err(err) => return super::validation_failure(format!("invalid alert_check input: {err}")),
    };
    let severity_filter = match parsed.severity_filter.as_deref().map(parse_alert_severity) {
        Some(Some(s)) => Some(s),
        Some(None) => return super::validation_failure("severity_filter must be one of critical, warning, info"),
        None => None,
    };

    super::cached_run(ctx, SPEC.name, user_id, &input, Tier::Live, || async move {
        let now = Utc::now();
        let today = now.date_naive();
        let yesterday = today - Duration::days(1);
        let mut citations = Vec::new();

        let safety_result = match ctx
            .gateway
            .get_safety_events(None, yesterday, today, parsed.include_resolved, parsed.area_filter.as_deref(), None)
            .await
        {
            Ok(r) => r,
            Err(err) => return ToolResult::failure(crate::error::Error::from(err).user_safe_message(), Vec::new(), ToolMetadata::new(now)),
        };
        let mut alerts: Vec<AlertRow> = Vec::new();
        if safety_result.has_data() {
            citations.push(database_citation(
                &safety_result,
                None,
                None,
                format!("{} safety events", safety_result.rows().len()),
                "[Source: safety_events]".to_string(),
            ));
            for event in safety_result.rows() {
                if !parsed.include_resolved && event.is_resolved {
                    continue;
                }
                let severity = map_safety_severity(event.severity);
                alerts.push(AlertRow {
                    alert_id: format!("safety-{}", event.id),
                    alert_type: "safety",
                    severity,
                    asset_id: event.asset_id.clone(),
                    description: if event.description.is_empty() {
                        format!("Safety event detected: {}", event.reason_code)
                    } else {
                        event.description.clone()
                    },
                    recommended_response: safety_response(severity),
                    triggered_at: event.event_timestamp,
                    duration_minutes: 0,
                    requires_attention: false,
                    source_table: "safety_events",
                });
            }
        }

        let snapshots_result = match &parsed.area_filter {
            Some(area) => match ctx.gateway.get_live_snapshots_by_area(area).await {
                Ok(r) => r,
                Err(err) => return ToolResult::failure(crate::error::Error::from(err).user_safe_message(), citations, ToolMetadata::new(now)),
            },
            None => {
                // No area filter: fan out across every asset's live snapshot.
                let assets = match ctx.gateway.get_all_assets().await {
                    Ok(r) => r,
                    Err(err) => return ToolResult::failure(crate::error::Error::from(err).user_safe_message(), citations, ToolMetadata::new(now)),
                };
                let mut combined = Vec::new();
                for asset in assets.rows() {
                    if let Ok(r) = ctx.gateway.get_live_snapshot(&asset.id).await {
                        combined.extend(r.data);
                    }
                }
                crate::types::DataResult::list(combined, "gateway", "live_snapshots", "all snapshots", now)
            }
        };
        if snapshots_result.has_data() {
            citations.push(database_citation(
                &snapshots_result,
                None,
                None,
                format!("{} live snapshots", snapshots_result.rows().len()),
                "[Source: live_snapshots]".to_string(),
            ));
            for snapshot in snapshots_result.rows() {
                if snapshot.target_output == 0 {
                    continue;
                }
                let variance = (snapshot.target_output as f64 - snapshot.current_output as f64) / snapshot.target_output as f64;
                if variance.abs() <= PRODUCTION_VARIANCE_THRESHOLD {
                    continue;
                }
                let direction = if variance > 0.0 { "below" } else { "above" };
                alerts.push(AlertRow {
                    alert_id: format!("variance-{}", snapshot.asset_id),
                    alert_type: "production_variance",
                    severity: AlertSeverity::Warning,
                    asset_id: snapshot.asset_id.clone(),
                    description: format!("Production {:.0}% {direction} target", variance.abs() * 100.0),
                    recommended_response: "Investigate production line status and operator availability",
                    triggered_at: snapshot.snapshot_timestamp,
                    duration_minutes: 0,
                    requires_attention: false,
                    source_table: "live_snapshots",
                });
            }
        }

        // Equipment status changes: reserved for a future equipment_status
        // table, currently contributes no alerts.

        for alert in &mut alerts {
            alert.duration_minutes = (now - alert.triggered_at).num_minutes().max(0);
            alert.requires_attention = alert.duration_minutes > STALE_ALERT_THRESHOLD_MINUTES;
        }

        if let Some(filter) = severity_filter {
            alerts.retain(|a| a.severity == filter);
        }

        alerts.sort_by(|a, b| a.severity.rank().cmp(&b.severity.rank()).then(b.duration_minutes.cmp(&a.duration_minutes)));

        let count_critical = alerts.iter().filter(|a| a.severity == AlertSeverity::Critical).count();
        let count_warning = alerts.iter().filter(|a| a.severity == AlertSeverity::Warning).count();
        let count_info = alerts.iter().filter(|a| a.severity == AlertSeverity::Info).count();

        let all_clear_since = if alerts.is_empty() {
            last_resolved_time(ctx, yesterday - Duration::days(6), today).await
        } else {
            None
        };

        let data = json!({
            "alerts": alerts,
            "count_by_severity": {"critical": count_critical, "warning": count_warning, "info": count_info},
            "total_count": alerts.len(),
            "all_clear_since": all_clear_since,
        });

        ToolResult::ok(data, citations, ToolMetadata::new(now))
    })
    .await
}

async fn last_resolved_time(ctx: &ToolContext, start: chrono::NaiveDate, end: chrono::NaiveDate) -> Option<DateTime<Utc>> {
    let result = ctx.gateway.get_safety_events(None, start, end, true, None, None).await.ok()?;
    result
        .rows()
        .iter()
        .filter_map(|e| e.is_resolved.then_some(e.resolved_at).flatten())
        .max()
}

fn map_safety_severity(severity: Severity) -> AlertSeverity {
    match severity {
        Severity::Critical | Severity::High => AlertSeverity::Critical,
        Severity::Medium => AlertSeverity::Warning,
        Severity::Low => AlertSeverity::Info,
    }
}

fn safety_response(severity: AlertSeverity) -> &'static str {
    match severity {
        AlertSeverity::Critical => "IMMEDIATE: stop operations, confirm lockout/tagout, notify supervisor",
        AlertSeverity::Warning => "Investigate promptly, isolate the affected area if necessary",
        AlertSeverity::Info => "Review during next shift handoff, document incident",
    }
}

fn parse_alert_severity(raw: &str) -> Option<AlertSeverity> {
    match raw.to_lowercase().as_str() {
        "critical" => Some(AlertSeverity::Critical),
        "warning" => Some(AlertSeverity::Warning),
        "info" => Some(AlertSeverity::Info),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_high_and_critical_safety_severity_to_critical_alert() {
        assert_eq!(map_safety_severity(Severity::Critical), AlertSeverity::Critical);
        assert_eq!(map_safety_severity(Severity::High), AlertSeverity::Critical);
        assert_eq!(map_safety_severity(Severity::Medium), AlertSeverity::Warning);
        assert_eq!(map_safety_severity(Severity::Low), AlertSeverity::Info);
    }

    #[test]
    fn parses_known_alert_severities() {
        assert_eq!(parse_alert_severity("CRITICAL"), Some(AlertSeverity::Critical));
        assert_eq!(parse_alert_severity("bogus"), None);
    }

    #[test]
    fn rank_orders_critical_before_warning_before_info() {
        assert!(AlertSeverity::Critical.rank() < AlertSeverity::Warning.rank());
        assert!(AlertSeverity::Warning.rank() < AlertSeverity::Info.rank());
    }
}
