//! Citation — provenance record tied to a produced claim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Database,
    Memory,
    Calculation,
}

/// An opaque, non-owning pointer into the source that produced a value.
/// Carries identifying fields and a short evidence excerpt, never the full
/// record, so no cyclic reference can form between a result and its
/// citations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub source_type: SourceType,
    pub source_table: Option<String>,
    pub record_id: Option<String>,
    pub memory_id: Option<String>,
    pub asset_id: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub excerpt: String,
    pub confidence: f64,
    pub display_text: String,
    pub claim_text: Option<String>,
}

impl Citation {
    /// The citation every tool must attach when it reads a `DataResult`.
    pub fn database(
        table_name: impl Into<String>,
        record_id: Option<String>,
        asset_id: Option<String>,
        timestamp: DateTime<Utc>,
        excerpt: impl Into<String>,
        display_text: impl Into<String>,
    ) -> Self {
        let table_name = table_name.into();
        Self {
            source_type: SourceType::Database,
            source_table: Some(table_name),
            record_id,
            memory_id: None,
            asset_id,
            timestamp: Some(timestamp),
            excerpt: excerpt.into(),
            confidence: 1.0,
            display_text: display_text.into(),
            claim_text: None,
        }
    }

    /// A derived-calculation citation naming the rates/formulas used.
    pub fn calculation(excerpt: impl Into<String>, display_text: impl Into<String>) -> Self {
        Self {
            source_type: SourceType::Calculation,
            source_table: None,
            record_id: None,
            memory_id: None,
            asset_id: None,
            timestamp: None,
            excerpt: excerpt.into(),
            confidence: 1.0,
            display_text: display_text.into(),
            claim_text: None,
        }
    }

    pub fn memory(
        memory_id: impl Into<String>,
        confidence: f64,
        excerpt: impl Into<String>,
        display_text: impl Into<String>,
    ) -> Self {
        Self {
            source_type: SourceType::Memory,
            source_table: None,
            record_id: None,
            memory_id: Some(memory_id.into()),
            asset_id: None,
            timestamp: None,
            excerpt: excerpt.into(),
            confidence,
            display_text: display_text.into(),
            claim_text: None,
        }
    }

    pub fn with_claim_text(mut self, claim_text: impl Into<String>) -> Self {
        self.claim_text = Some(claim_text.into());
        self
    }
}
