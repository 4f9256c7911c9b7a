//! ToolResult — the envelope every capability tool returns.

use super::citation::Citation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolMetadata {
    pub cache_tier: Option<String>,
    pub ttl_seconds: Option<u64>,
    /// Set by the cache decorator on a hit; absent on a fresh computation.
    pub cached_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub follow_up_questions: Vec<String>,
    pub query_timestamp: DateTime<Utc>,
    /// Tool-specific extension fields (e.g. `data_stale`, `insight`).
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, Value>,
}

impl ToolMetadata {
    pub fn new(query_timestamp: DateTime<Utc>) -> Self {
        Self {
            cache_tier: None,
            ttl_seconds: None,
            cached_at: None,
            follow_up_questions: Vec::new(),
            query_timestamp,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_cache_tier(mut self, tier: impl Into<String>, ttl_seconds: u64) -> Self {
        self.cache_tier = Some(tier.into());
        self.ttl_seconds = Some(ttl_seconds);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub data: Value,
    pub citations: Vec<Citation>,
    pub error_message: Option<String>,
    pub metadata: ToolMetadata,
}

impl ToolResult {
    pub fn ok(data: Value, citations: Vec<Citation>, metadata: ToolMetadata) -> Self {
        Self { success: true, data, citations, error_message: None, metadata }
    }

    /// A failure still carries whatever citations were collected before
    /// the failure occurred.
    pub fn failure(message: impl Into<String>, citations: Vec<Citation>, metadata: ToolMetadata) -> Self {
        Self {
            success: false,
            data: Value::Null,
            citations,
            error_message: Some(message.into()),
            metadata,
        }
    }
}
