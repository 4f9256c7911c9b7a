//! Claim extraction — decomposes a narrative response into discrete claims
//!, LLM-assisted with a heuristic fallback.

use crate::llm::LlmClient;
use crate::types::{Claim, ClaimType};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

fn json_array_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\[.*\]").expect("static regex"))
}

const EXTRACTION_PROMPT: &str = "You are an expert at extracting factual claims from text. \
Given the following response about manufacturing data, extract each distinct factual claim. \
For each claim, identify the exact text, its type (factual, recommendation, inference, historical), \
whether it requires grounding with evidence, entity mentions, metric mentions, and any temporal \
reference. Return a JSON array of objects with fields: text, claim_type, requires_grounding, \
entity_mentions, metric_mentions, temporal_reference.";

#[derive(Debug, Deserialize)]
struct RawClaim {
    text: String,
    #[serde(default = "default_claim_type")]
    claim_type: String,
    #[serde(default = "default_true")]
    requires_grounding: bool,
    #[serde(default)]
    entity_mentions: Vec<String>,
    #[serde(default)]
    metric_mentions: Vec<String>,
    #[serde(default)]
    temporal_reference: Option<String>,
}

fn default_claim_type() -> String {
    "factual".to_string()
}

fn default_true() -> bool {
    true
}

pub async fn extract_claims(llm: &dyn LlmClient, response_text: &str) -> Vec<Claim> {
    let prompt = format!("{EXTRACTION_PROMPT}\n\nResponse to analyze:\n{response_text}");
    match llm.complete(None, &prompt).await {
        Ok(completion) => match parse_claims_json(&completion) {
            Some(claims) if !claims.is_empty() => claims,
            _ => fallback_claim(response_text),
        },
        Err(err) => {
            tracing::warn!(error = %err, "claim extraction fell back to heuristic mode");
            fallback_claim(response_text)
        }
    }
}

fn parse_claims_json(text: &str) -> Option<Vec<Claim>> {
    let raw: Vec<RawClaim> = serde_json::from_str(text).ok().or_else(|| {
        let found = json_array_re().find(text)?;
        serde_json::from_str(found.as_str()).ok()
    })?;

    Some(raw.into_iter().map(to_claim).collect())
}

fn to_claim(raw: RawClaim) -> Claim {
    let claim_type = match raw.claim_type.to_lowercase().as_str() {
        "recommendation" => ClaimType::Recommendation,
        "inference" => ClaimType::Inference,
        "historical" => ClaimType::Historical,
        _ => ClaimType::Factual,
    };
    Claim {
        text: raw.text,
        claim_type,
        requires_grounding: raw.requires_grounding,
        entity_mentions: raw.entity_mentions,
        metric_mentions: raw.metric_mentions,
        temporal_reference: raw.temporal_reference,
    }
}

/// Treat the whole response as a single factual claim when extraction
/// cannot be parsed.
fn fallback_claim(response_text: &str) -> Vec<Claim> {
    let truncated: String = response_text.chars().take(200).collect();
    vec![Claim {
        text: truncated,
        claim_type: ClaimType::Factual,
        requires_grounding: true,
        entity_mentions: Vec::new(),
        metric_mentions: Vec::new(),
        temporal_reference: None,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubLlm(String);

    #[async_trait::async_trait]
    impl LlmClient for StubLlm {
        async fn complete(&self, _system: Option<&str>, _prompt: &str) -> Result<String, crate::llm::LlmError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn parses_well_formed_claim_array() {
        let llm = StubLlm(
            r#"[{"text": "Grinder 5 had 47 minutes of downtime", "claim_type": "factual", "requires_grounding": true, "entity_mentions": ["Grinder 5"], "metric_mentions": ["47 minutes"], "temporal_reference": "yesterday"}]"#
                .to_string(),
        );
        let claims = extract_claims(&llm, "ignored").await;
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].claim_type, ClaimType::Factual);
        assert_eq!(claims[0].entity_mentions, vec!["Grinder 5".to_string()]);
    }

    #[tokio::test]
    async fn unparseable_completion_falls_back_to_single_claim() {
        let llm = StubLlm("not json".to_string());
        let claims = extract_claims(&llm, "the plant ran fine yesterday").await;
        assert_eq!(claims.len(), 1);
        assert!(claims[0].requires_grounding);
    }
}
