//! Per-claim evidence scoring: entity, metric, and temporal
//! overlap heuristics against a database record or a memory entry.

use super::EvidenceRecord;
use crate::memory::MemoryEntry;
use crate::types::{Citation, Claim};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+\.?\d*").expect("static regex"))
}

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\w+").expect("static regex"))
}

/// Score a claim against one candidate database record.
///
/// A named-field entity match
/// (`asset_name`/`name`) counts more than an incidental substring hit, a
/// numeric metric match within tolerance counts more still, and a shared
/// date-bearing field contributes a flat temporal bonus.
pub fn match_claim_to_source(claim: &Claim, source: &EvidenceRecord) -> (f64, Option<Citation>) {
    let mut confidence: f64 = 0.0;
    let mut matches: Vec<String> = Vec::new();

    for entity in &claim.entity_mentions {
        let entity_lower = entity.to_lowercase();
        for (key, value) in &source.fields {
            let Some(text) = value.as_str() else { continue };
            if text.to_lowercase().contains(&entity_lower) {
                let weight = if key == "asset_name" || key == "name" { 0.4 } else { 0.3 };
                confidence += weight;
                matches.push(format!("{key}: {text}"));
            }
        }
    }

    for metric in &claim.metric_mentions {
        for num in extract_numbers(metric) {
            for (key, value) in &source.fields {
                let Some(field_num) = value.as_f64() else { continue };
                let close = (field_num - num).abs() < 0.5 || (num > 0.0 && ((field_num - num).abs() / num) < 0.01);
                if close {
                    confidence += 0.4;
                    matches.push(format!("{key}: {field_num}"));
                }
            }
        }
    }

    if claim.temporal_reference.is_some() && source.timestamp.is_some() {
        confidence += 0.2;
        matches.push(format!("timestamp: {}", source.timestamp.expect("checked above")));
    }

    confidence = confidence.min(1.0);

    if confidence <= 0.0 || matches.is_empty() {
        return (0.0, None);
    }

    let excerpt = matches.iter().take(3).cloned().collect::<Vec<_>>().join("; ");
    let display_text = format_citation_display(&source.source_table, source.timestamp, source.asset_name.as_deref());
    let citation = Citation::database(
        source.source_table.clone(),
        source.record_id.clone(),
        source.asset_id.clone(),
        source.timestamp.unwrap_or_else(chrono::Utc::now),
        excerpt,
        display_text,
    )
    .with_claim_text(claim.text.clone());
    (confidence, Some(citation))
}

/// Score a claim against one candidate memory entry: entity overlap,
/// metric-keyword overlap, and whole-text word overlap.
pub fn match_claim_to_memory(claim: &Claim, memory: &MemoryEntry) -> (f64, Option<Citation>) {
    if memory.content.is_empty() {
        return (0.0, None);
    }

    let memory_lower = memory.content.to_lowercase();
    let mut confidence = 0.0;

    for entity in &claim.entity_mentions {
        if memory_lower.contains(&entity.to_lowercase()) {
            confidence += 0.3;
        }
    }

    for metric in &claim.metric_mentions {
        for word in words(&metric.to_lowercase()) {
            if word.len() > 2 && memory_lower.contains(&word) {
                confidence += 0.2;
            }
        }
    }

    let claim_words: HashSet<String> = words(&claim.text.to_lowercase()).into_iter().collect();
    let memory_words: HashSet<String> = words(&memory_lower).into_iter().collect();
    if !claim_words.is_empty() && !memory_words.is_empty() {
        let overlap = claim_words.intersection(&memory_words).count() as f64 / claim_words.len() as f64;
        confidence += overlap * 0.3;
    }

    confidence = confidence.min(1.0);
    if confidence <= 0.0 {
        return (0.0, None);
    }

    let excerpt: String = if memory.content.chars().count() > 100 {
        let truncated: String = memory.content.chars().take(100).collect();
        format!("{truncated}...")
    } else {
        memory.content.clone()
    };
    let display_text = format!("[Memory: {}]", &memory.id[..memory.id.len().min(20)]);
    let citation = Citation::memory(memory.id.clone(), confidence, excerpt, display_text).with_claim_text(claim.text.clone());
    (confidence, Some(citation))
}

/// `[Source: table/date/asset-name]` display tag.
pub fn format_citation_display(source_table: &str, timestamp: Option<chrono::DateTime<chrono::Utc>>, asset_name: Option<&str>) -> String {
    let mut parts = vec![format!("Source: {source_table}")];
    if let Some(ts) = timestamp {
        parts.push(ts.format("%Y-%m-%d").to_string());
    }
    if let Some(name) = asset_name {
        parts.push(format!("asset-{}", name.to_lowercase().replace(' ', "-")));
    }
    format!("[{}]", parts.join("/"))
}

fn extract_numbers(text: &str) -> Vec<f64> {
    let cleaned = text.replace(',', "");
    number_re().find_iter(&cleaned).filter_map(|m| m.as_str().parse::<f64>().ok()).collect()
}

fn words(text: &str) -> Vec<String> {
    word_re().find_iter(text).map(|m| m.as_str().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClaimType;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn claim(entities: Vec<&str>, metrics: Vec<&str>, temporal: Option<&str>) -> Claim {
        Claim {
            text: "Grinder 5 had 47 minutes of downtime yesterday".into(),
            claim_type: ClaimType::Factual,
            requires_grounding: true,
            entity_mentions: entities.into_iter().map(String::from).collect(),
            metric_mentions: metrics.into_iter().map(String::from).collect(),
            temporal_reference: temporal.map(String::from),
        }
    }

    fn source() -> EvidenceRecord {
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
    fn strong_entity_and_metric_match_yields_high_confidence() {
        let c = claim(vec!["Grinder 5"], vec!["47 minutes"], Some("yesterday"));
        let (confidence, citation) = match_claim_to_source(&c, &source());
        assert!(confidence >= 0.6, "confidence was {confidence}");
        assert!(citation.is_some());
    }

    #[test]
    fn no_overlap_yields_zero_confidence() {
        let c = claim(vec!["Press 9"], vec!["999 minutes"], None);
        let (confidence, citation) = match_claim_to_source(&c, &source());
        assert_eq!(confidence, 0.0);
        assert!(citation.is_none());
    }

    #[test]
    fn memory_text_overlap_produces_citation() {
        let c = claim(vec!["Grinder 5"], vec![], None);
        let memory = MemoryEntry {
            id: "mem-1".into(),
            content: "Grinder 5 has a history of downtime on Mondays".into(),
            score: 0.9,
            metadata: json!({}),
        };
        let (confidence, citation) = match_claim_to_memory(&c, &memory);
        assert!(confidence > 0.0);
        assert!(citation.is_some());
    }
}
