//! Safety Events.

use super::{database_citation, ToolContext, ToolSpec};
use crate::cache::Tier;
use crate::time_range;
use crate::types::{Severity, ToolMetadata, ToolResult};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

pub const SPEC: ToolSpec = ToolSpec {
    name: "safety_events",
    description: "List safety incidents in a time window, with severity and resolution status.",
    citations_required: true,
};

#[derive(Debug, Deserialize)]
struct Input {
    #[serde(default = "default_time_range")]
    time_range: String,
    asset_id: Option<String>,
    area: Option<String>,
    severity: Option<String>,
    #[serde(default)]
    include_resolved: bool,
}

fn default_time_range() -> String {
    "this week".to_string()
}

pub async fn run(ctx: &ToolContext, user_id: &str, input: Value) -> ToolResult {
    let parsed: Input = match serde_json::from_value(input.clone()) {
        Ok(v) => v,
        Err(err) => return super::validation_failure(format!("invalid safety_events input: {err}")),
    };
    let severity = match parsed.severity.as_deref().map(parse_severity) {
        Some(Some(s)) => Some(s),
        Some(None) => return super::validation_failure("severity must be one of critical, high, medium, low"),
        None => None,
    };

    super::cached_run(ctx, SPEC.name, user_id, &input, Tier::Daily, || async move {
        let range = time_range::parse(&parsed.time_range, Utc::now().date_naive());

        let result = ctx
            .gateway
            .get_safety_events(
                parsed.asset_id.as_deref(),
                range.start,
                range.end,
                parsed.include_resolved,
                parsed.area.as_deref(),
                severity,
            )
            .await;
        let result = match result {
            Ok(r) => r,
            Err(err) => return ToolResult::failure(crate::error::Error::from(err).user_safe_message(), Vec::new(), ToolMetadata::new(Utc::now())),
        };

        let events: Vec<Value> = result
            .rows()
            .iter()
            .map(|e| {
                json!({
                    "id": e.id,
                    "asset_id": e.asset_id,
                    "timestamp": e.event_timestamp,
                    "severity": e.severity,
                    "reason_code": e.reason_code,
                    "description": e.description,
                    "is_resolved": e.is_resolved,
                })
            })
            .collect();

        let citations = if result.has_data() {
            vec![database_citation(
                &result,
                None,
                parsed.asset_id.clone(),
                format!("{} safety events over {}", events.len(), range.description),
                format!("[Source: safety_events/{}]", range.description.replace(' ', "-")),
            )]
        } else {
            Vec::new()
        };

        ToolResult::ok(
            json!({"time_range": range.description, "events": events, "count": events.len()}),
            citations,
            ToolMetadata::new(Utc::now()),
        )
    })
    .await
}

fn parse_severity(raw: &str) -> Option<Severity> {
    match raw.to_lowercase().as_str() {
        "critical" => Some(Severity::Critical),
        "high" => Some(Severity::High),
        "medium" => Some(Severity::Medium),
        "low" => Some(Severity::Low),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_severities_case_insensitively() {
        assert_eq!(parse_severity("CRITICAL"), Some(Severity::Critical));
        assert_eq!(parse_severity("low"), Some(Severity::Low));
    }

    #[test]
    fn rejects_unknown_severity() {
        assert_eq!(parse_severity("urgent"), None);
    }
}
