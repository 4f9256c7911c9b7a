//! Claim & grounding result types.

use super::citation::Citation;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimType {
    Factual,
    Recommendation,
    Inference,
    Historical,
}

/// A single factual assertion extracted from a narrative response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub text: String,
    pub claim_type: ClaimType,
    pub requires_grounding: bool,
    pub entity_mentions: Vec<String>,
    pub metric_mentions: Vec<String>,
    pub temporal_reference: Option<String>,
}

/// The outcome of grounding one claim against retrieved evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundingResult {
    pub claim_text: String,
    pub is_grounded: bool,
    pub confidence: f64,
    pub supporting_citations: Vec<Citation>,
    pub fallback_text: Option<String>,
    pub validation_time_ms: u64,
}

/// A narrative response after claim-by-claim grounding, with inline
/// citations injected and low-confidence claims disclaimed or replaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitedResponse {
    pub response_text: String,
    pub citations: Vec<Citation>,
    pub claims: Vec<Claim>,
    pub grounding_score: f64,
    pub ungrounded_claims: Vec<String>,
    pub meta: Value,
}
