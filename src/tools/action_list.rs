//! Action List — thin tool wrapper around the Action Prioritization Engine.

use super::{ToolContext, ToolSpec};
use crate::types::{ActionCategory, Citation, ToolMetadata, ToolResult};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

pub const SPEC: ToolSpec = ToolSpec {
    name: "action_list",
    description: "Generate the prioritized daily action list across safety, OEE, and financial tiers.",
    citations_required: true,
};

#[derive(Debug, Deserialize)]
struct Input {
    report_date: Option<NaiveDate>,
    limit: Option<usize>,
    category: Option<String>,
    #[serde(default = "default_use_cache")]
    use_cache: bool,
}

fn default_use_cache() -> bool {
    true
}

pub async fn run(ctx: &ToolContext, _user_id: &str, input: Value) -> ToolResult {
    let parsed: Input = match serde_json::from_value(input.clone()) {
        Ok(v) => v,
        Err(err) => return super::validation_failure(format!("invalid action_list input: {err}")),
    };
    let category_filter = match parsed.category.as_deref().map(parse_category) {
        Some(Some(c)) => Some(c),
        Some(None) => return super::validation_failure("category must be one of safety, oee, financial"),
        None => None,
    };

    // Cached internally by the action engine; not wrapped in the Tool
    // Response Cache decorator since it already does its own invalidation.
    let response = ctx.action_engine.generate_action_list(parsed.report_date, parsed.limit, category_filter, parsed.use_cache, None).await;

    let citations: Vec<Citation> = response
        .actions
        .iter()
        .flat_map(|action| {
            action.evidence_refs.iter().map(move |evidence| {
                Citation::database(
                    evidence.source_table.clone(),
                    Some(evidence.record_id.clone()),
                    Some(action.asset_id.clone()),
                    action.created_at,
                    format!("{}: {}", evidence.metric_name, evidence.metric_value),
                    format!("[Source: {}/{}]", evidence.source_table, evidence.record_id),
                )
            })
        })
        .collect();

    ToolResult::ok(
        json!({
            "report_date": response.report_date,
            "actions": response.actions,
            "total_count": response.total_count,
            "counts_by_category": response.counts_by_category,
        }),
        citations,
        ToolMetadata::new(Utc::now()),
    )
}

fn parse_category(raw: &str) -> Option<ActionCategory> {
    match raw.to_lowercase().as_str() {
        "safety" => Some(ActionCategory::Safety),
        "oee" => Some(ActionCategory::Oee),
        "financial" => Some(ActionCategory::Financial),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_categories() {
        assert_eq!(parse_category("Safety"), Some(ActionCategory::Safety));
        assert_eq!(parse_category("bogus"), None);
    }
}
