//! Inline citation injection: locates the sentence a claim came from and
//! appends that claim's best citation's display text to it.

use crate::types::Citation;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\w+").expect("static regex"))
}

/// Split `text` into sentences, attach the highest-confidence citation for
/// each claim to the first sentence overlapping it by ≥30% of its words, and
/// rejoin.
pub fn inject_citations(text: &str, claim_citations: &[(String, Citation)]) -> String {
    if claim_citations.is_empty() {
        return text.to_string();
    }

    let mut sentences = split_sentences(text);
    let mut already_cited: HashSet<usize> = HashSet::new();

    for (claim_text, citation) in claim_citations {
        let claim_words: HashSet<String> = words(&claim_text.to_lowercase());
        if claim_words.is_empty() {
            continue;
        }

        let mut best: Option<(usize, f64)> = None;
        for (idx, sentence) in sentences.iter().enumerate() {
            let sentence_words = words(&sentence.to_lowercase());
            if sentence_words.is_empty() {
                continue;
            }
            let overlap = claim_words.intersection(&sentence_words).count() as f64 / claim_words.len() as f64;
            if overlap >= 0.3 && best.map(|(_, b)| overlap > b).unwrap_or(true) {
                best = Some((idx, overlap));
            }
        }

        if let Some((idx, _)) = best {
            if already_cited.insert(idx) {
                sentences[idx] = format!("{} {}", sentences[idx], citation.display_text);
            }
        }
    }

    sentences.join(" ")
}

/// Splits on whitespace that follows a sentence-ending punctuation mark.
/// `regex` has no lookbehind, so this walks the text directly rather than
/// using a `(?<=[.!?])\s+` pattern.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
                chars.next();
            }
            if chars.peek().is_some() {
                sentences.push(std::mem::take(&mut current));
            }
        }
    }
    if !current.is_empty() {
        sentences.push(current);
    }
    sentences
}

fn words(text: &str) -> HashSet<String> {
    word_re().find_iter(text).map(|m| m.as_str().to_string()).collect()
}
