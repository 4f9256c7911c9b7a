//! Grounding Validator: decomposes free-form text into
//! claims, scores each against available evidence, injects inline
//! citations, and falls back when evidence is insufficient.

pub mod citation_display;
pub mod claims;
pub mod scoring;

use crate::config::GroundingConfig;
use crate::llm::LlmClient;
use crate::memory::MemoryEntry;
use crate::types::{Citation, Claim, CitedResponse, GroundingResult};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Instant;

/// A candidate database row the validator may cite against, flattened out
/// of whatever `DataResult` the caller already fetched. Tools assemble this
/// from the rows they consulted; the validator never queries the Gateway
/// directly.
#[derive(Debug, Clone)]
pub struct EvidenceRecord {
    pub source_table: String,
    pub record_id: Option<String>,
    pub asset_id: Option<String>,
    pub asset_name: Option<String>,
    pub timestamp: Option<chrono::DateTime<chrono::Utc>>,
    pub fields: BTreeMap<String, Value>,
}

pub struct GroundingValidator<'a> {
    llm: &'a dyn LlmClient,
    config: GroundingConfig,
}

impl<'a> GroundingValidator<'a> {
    pub fn new(llm: &'a dyn LlmClient, config: GroundingConfig) -> Self {
        Self { llm, config }
    }

    /// Score one claim against the evidence pool, returning its
    /// `GroundingResult`. Claims that don't require grounding auto-pass.
    pub fn validate_claim(&self, claim: &Claim, sources: &[EvidenceRecord], memory: &[MemoryEntry]) -> GroundingResult {
        let started = Instant::now();

        if !claim.requires_grounding {
            return GroundingResult {
                claim_text: claim.text.clone(),
                is_grounded: true,
                confidence: 1.0,
                supporting_citations: Vec::new(),
                fallback_text: None,
                validation_time_ms: elapsed_ms(started),
            };
        }

        let mut best_confidence = 0.0_f64;
        let mut candidates: Vec<(f64, Citation)> = Vec::new();

        for source in sources {
            let (confidence, citation) = scoring::match_claim_to_source(claim, source);
            if let Some(citation) = citation {
                best_confidence = best_confidence.max(confidence);
                candidates.push((confidence, citation));
            }
        }
        for entry in memory {
            let (confidence, citation) = scoring::match_claim_to_memory(claim, entry);
            if let Some(citation) = citation {
                best_confidence = best_confidence.max(confidence);
                candidates.push((confidence, citation));
            }
        }

        candidates.sort_by(|a, b| b.0.total_cmp(&a.0));
        let supporting_citations: Vec<Citation> = candidates.into_iter().map(|(_, c)| c).collect();
        let is_grounded = best_confidence >= self.config.grounding_threshold_min;

        GroundingResult {
            claim_text: claim.text.clone(),
            is_grounded,
            confidence: best_confidence,
            supporting_citations,
            fallback_text: if is_grounded { None } else { Some(claim.text.clone()) },
            validation_time_ms: elapsed_ms(started),
        }
    }

    /// Extract claims, validate each, inject citations, and apply the
    /// three-tier fallback policy.
    pub async fn validate_response(&self, response_text: &str, sources: &[EvidenceRecord], memory: &[MemoryEntry]) -> CitedResponse {
        let extracted = claims::extract_claims(self.llm, response_text).await;
        let results: Vec<GroundingResult> = extracted.iter().map(|c| self.validate_claim(c, sources, memory)).collect();

        let groundable: Vec<&GroundingResult> = results
            .iter()
            .zip(extracted.iter())
            .filter(|(_, c)| c.requires_grounding)
            .map(|(r, _)| r)
            .collect();
        let grounding_score = if groundable.is_empty() {
            1.0
        } else {
            (groundable.iter().map(|r| r.confidence).sum::<f64>() / groundable.len() as f64).clamp(0.0, 1.0)
        };

        let ungrounded_claims: Vec<String> = results.iter().filter(|r| !r.is_grounded).map(|r| r.claim_text.clone()).collect();

        let claim_citations: Vec<(String, Citation)> = results
            .iter()
            .filter_map(|r| r.supporting_citations.first().cloned().map(|c| (r.claim_text.clone(), c)))
            .collect();
        let injected = citation_display::inject_citations(response_text, &claim_citations);

        let response_text = self.generate_fallback_response(&injected, grounding_score, &ungrounded_claims);

        let citations: Vec<Citation> = results.iter().flat_map(|r| r.supporting_citations.clone()).collect();

        let mut meta = Map::new();
        meta.insert("claim_count".to_string(), Value::from(extracted.len()));
        meta.insert("groundable_claim_count".to_string(), Value::from(groundable.len()));

        CitedResponse {
            response_text,
            citations,
            claims: extracted,
            grounding_score,
            ungrounded_claims,
            meta: Value::Object(meta),
        }
    }

    /// Three-tier fallback: as-is above the min threshold, a disclaimer
    /// appended in the middle band, full replacement below the low
    /// threshold.
    fn generate_fallback_response(&self, text: &str, grounding_score: f64, ungrounded_claims: &[String]) -> String {
        if grounding_score >= self.config.grounding_threshold_min {
            return text.to_string();
        }
        if grounding_score < self.config.grounding_threshold_low {
            return "I cannot provide a reliable answer based on the available data. Please rephrase your question \
                    or ask about a specific asset or date range."
                .to_string();
        }

        let listed: Vec<String> = ungrounded_claims
            .iter()
            .take(3)
            .map(|c| {
                let truncated: String = c.chars().take(100).collect();
                format!("- {truncated}")
            })
            .collect();
        format!("{text}\n\nNote: some statements above could not be fully verified against available data:\n{}", listed.join("\n"))
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::UnconfiguredLlmClient;
    use crate::types::ClaimType;
    use serde_json::json;

    fn config() -> GroundingConfig {
        GroundingConfig {
            grounding_threshold_min: 0.6,
            grounding_threshold_high: 0.8,
            grounding_threshold_low: 0.3,
            validation_budget_ms: 200,
        }
    }

    fn evidence() -> EvidenceRecord {
        let mut fields = BTreeMap::new();
        fields.insert("asset_name".to_string(), json!("Grinder 5"));
        fields.insert("downtime_minutes".to_string(), json!(47.0));
        EvidenceRecord {
            source_table: "daily_summaries".into(),
            record_id: Some("ds-1".into()),
            asset_id: Some("a1".into()),
            asset_name: Some("Grinder 5".into()),
            timestamp: Some(chrono::Utc::now()),
            fields,
        }
    }

    #[test]
    fn grounded_claim_meets_threshold() {
        let llm = UnconfiguredLlmClient;
        let validator = GroundingValidator::new(&llm, config());
        let claim = Claim {
            text: "Grinder 5 had 47 minutes of downtime yesterday".into(),
            claim_type: ClaimType::Factual,
            requires_grounding: true,
            entity_mentions: vec!["Grinder 5".into()],
            metric_mentions: vec!["47 minutes".into()],
            temporal_reference: Some("yesterday".into()),
        };
        let result = validator.validate_claim(&claim, &[evidence()], &[]);
        assert!(result.is_grounded);
        assert!(result.confidence >= 0.6);
        assert!(!result.supporting_citations.is_empty());
    }

    #[test]
    fn ungrounded_claim_falls_below_threshold() {
        let llm = UnconfiguredLlmClient;
        let validator = GroundingValidator::new(&llm, config());
        let claim = Claim {
            text: "Grinder 5 lost approximately $12,000 yesterday".into(),
            claim_type: ClaimType::Factual,
            requires_grounding: true,
            entity_mentions: vec!["Grinder 5".into()],
            metric_mentions: vec!["$12,000".into()],
            temporal_reference: Some("yesterday".into()),
        };
        let result = validator.validate_claim(&claim, &[evidence()], &[]);
        assert!(!result.is_grounded);
        assert_eq!(result.fallback_text.as_deref(), Some(claim.text.as_str()));
    }

    #[test]
    fn non_groundable_claim_auto_passes() {
        let llm = UnconfiguredLlmClient;
        let validator = GroundingValidator::new(&llm, config());
        let claim = Claim {
            text: "Consider scheduling preventive maintenance".into(),
            claim_type: ClaimType::Recommendation,
            requires_grounding: false,
            entity_mentions: Vec::new(),
            metric_mentions: Vec::new(),
            temporal_reference: None,
        };
        let result = validator.validate_claim(&claim, &[], &[]);
        assert!(result.is_grounded);
        assert_eq!(result.confidence, 1.0);
    }

    #[tokio::test]
    async fn very_low_score_replaces_body() {
        let llm = UnconfiguredLlmClient;
        let validator = GroundingValidator::new(&llm, config());
        let response = validator.validate_response("Grinder 5 lost approximately $12,000 yesterday.", &[evidence()], &[]).await;
        assert!(response.grounding_score < 0.3);
        assert!(response.response_text.contains("cannot provide a reliable answer"));
    }
}
