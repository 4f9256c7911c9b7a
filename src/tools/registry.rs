//! Tool Registry: looks up a capability tool by name and dispatches its
//! typed-JSON input.

use super::{
    action_list, alerts, asset_lookup, comparative, cost_of_loss, downtime, financial, oee, recommendation,
    safety_events, trend, ToolContext, ToolSpec,
};
use crate::types::{ToolMetadata, ToolResult};
use serde_json::Value;

const SPECS: &[ToolSpec] = &[
    asset_lookup::SPEC,
    oee::SPEC,
    downtime::SPEC,
    safety_events::SPEC,
    alerts::SPEC,
    financial::SPEC,
    cost_of_loss::SPEC,
    trend::SPEC,
    comparative::SPEC,
    recommendation::SPEC,
    action_list::SPEC,
];

pub struct ToolRegistry {
    ctx: ToolContext,
}

impl ToolRegistry {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    /// The declared identity of every registered tool, for an external
    /// router's tool-selection prompt.
    pub fn specs(&self) -> &'static [ToolSpec] {
        SPECS
    }

    pub fn find(&self, tool_name: &str) -> Option<&'static ToolSpec> {
        SPECS.iter().find(|s| s.name == tool_name)
    }

    pub async fn run(&self, tool_name: &str, user_id: &str, input: Value) -> ToolResult {
        match tool_name {
            "asset_lookup" => asset_lookup::run(&self.ctx, user_id, input).await,
            "oee_query" => oee::run(&self.ctx, user_id, input).await,
            "downtime_analysis" => downtime::run(&self.ctx, user_id, input).await,
            "safety_events" => safety_events::run(&self.ctx, user_id, input).await,
            "alert_check" => alerts::run(&self.ctx, user_id, input).await,
            "financial_impact" => financial::run(&self.ctx, user_id, input).await,
            "cost_of_loss" => cost_of_loss::run(&self.ctx, user_id, input).await,
            "trend_analysis" => trend::run(&self.ctx, user_id, input).await,
            "comparative_analysis" => comparative::run(&self.ctx, user_id, input).await,
            "recommendation_engine" => recommendation::run(&self.ctx, user_id, input).await,
            "action_list" => action_list::run(&self.ctx, user_id, input).await,
            other => ToolResult::failure(format!("unknown tool: {other}"), Vec::new(), ToolMetadata::new(chrono::Utc::now())),
        }
    }
}
