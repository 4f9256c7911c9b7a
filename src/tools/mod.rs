//! Capability tools: the query-and-shape operators an external router
//! invokes by name. Every tool is a pure function of typed input to a
//! `ToolResult`, shares a `ToolContext`, and never raises through its
//! public boundary.

pub mod action_list;
pub mod alerts;
pub mod asset_lookup;
pub mod comparative;
pub mod cost_of_loss;
pub mod downtime;
pub mod financial;
pub mod oee;
pub mod recommendation;
pub mod registry;
pub mod safety_events;
pub mod trend;

use crate::action_engine::ActionPrioritizationEngine;
use crate::cache::{Tier, ToolCache};
use crate::config::ForemanConfig;
use crate::gateway::DataSourceGateway;
use crate::types::{Citation, DataResult, ToolMetadata, ToolResult};
use chrono::Utc;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

pub use registry::ToolRegistry;

/// Static identity every tool declares: `name` is the stable first cache-key
/// segment, `description` is the natural-language trigger an external
/// router matches against.
#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub citations_required: bool,
}

/// Dependencies every tool reads from; tools hold no state of their own.
#[derive(Clone)]
pub struct ToolContext {
    pub gateway: Arc<dyn DataSourceGateway>,
    pub cache: Arc<ToolCache>,
    pub config: ForemanConfig,
    pub action_engine: Arc<ActionPrioritizationEngine<dyn DataSourceGateway>>,
}

impl ToolContext {
    pub fn new(gateway: Arc<dyn DataSourceGateway>, cache: Arc<ToolCache>, config: ForemanConfig) -> Self {
        let action_engine = Arc::new(ActionPrioritizationEngine::new(gateway.clone(), config.action_engine));
        Self { gateway, cache, config, action_engine }
    }
}

/// The citation every tool must attach when it reads a `DataResult`: a
/// `source_type=database` citation naming the table and the query instant.
pub fn database_citation<T>(
    result: &DataResult<T>,
    record_id: Option<String>,
    asset_id: Option<String>,
    excerpt: impl Into<String>,
    display_text: impl Into<String>,
) -> Citation {
    Citation::database(result.table_name.clone(), record_id, asset_id, result.query_timestamp, excerpt, display_text)
}

/// Wraps a tool computation with the Tool Response Cache: looks up by
/// `(tool_name, user_id, params)`, tags a hit with `cache_tier`/`cached_at`,
/// and otherwise computes, tags the tier onto the fresh result, and writes
/// it back (skipped entirely for `Tier::None` or on `force_refresh`).
pub async fn cached_run<F, Fut>(ctx: &ToolContext, tool_name: &str, user_id: &str, params: &Value, tier: Tier, compute: F) -> ToolResult
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = ToolResult>,
{
    let force_refresh = params.get("force_refresh").and_then(Value::as_bool).unwrap_or(false);
    let key = crate::cache::key::build(tool_name, user_id, params);

    if !force_refresh {
        if let Some(hit) = ctx.cache.get(&key) {
            return hit;
        }
    }

    let mut result = compute().await;
    if result.success && !matches!(tier, Tier::None) {
        let ttl = tier.ttl_seconds(&ctx.config.cache);
        result.metadata = result.metadata.clone().with_cache_tier(tier.as_str(), ttl);
        ctx.cache.set(&key, tier, result.clone());
    }
    result
}

/// A tool-level input validation failure: rejected before the tool ever
/// touches the Gateway.
pub fn validation_failure(message: impl Into<String>) -> ToolResult {
    ToolResult::failure(message, Vec::new(), ToolMetadata::new(Utc::now()))
}
