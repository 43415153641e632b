//! Language-assistant capability.
//!
//! Semantic matching is an external capability consumed as a black box.
//! Resolution must keep working when it is missing or fails, so every call
//! site treats an error like "no confident answer".
//!
//! `KeywordMatcher` is the in-process stand-in: plain token overlap between
//! the passenger's description and each record's narrative.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::resolution::identifier::Identifier;
use crate::storage::models::BaggageRecord;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssistantError {
    #[error("language assistant unavailable: {0}")]
    Unavailable(String),
}

pub trait LanguageAssistant: Send + Sync {
    /// Pick the record in `corpus` the identifier most plausibly refers to.
    fn resolve_record_by_semantic_identifier(
        &self,
        identifier: &Identifier,
        corpus: &[BaggageRecord],
    ) -> Result<Option<BaggageRecord>, AssistantError>;

    /// Records in `candidates` relevant to the free-text description.
    fn match_by_description(
        &self,
        text: &str,
        candidates: &[BaggageRecord],
    ) -> Result<Vec<BaggageRecord>, AssistantError>;

    /// Free-text verdict on whether two photos show the same bag.
    fn compare_images(&self, reference_a: &str, reference_b: &str)
        -> Result<String, AssistantError>;
}

lazy_static! {
    /// Words: letters (any script) followed by letters, digits, apostrophes or hyphens; or digit runs.
    static ref TOKEN_PATTERN: Regex = Regex::new(r"\p{L}[\p{L}\p{N}'-]*|\p{N}+").unwrap();
}

/// Words too common in bag descriptions to signal a match.
const STOPWORDS: &[&str] = &[
    "the", "and", "with", "bag", "bags", "baggage", "luggage", "suitcase", "has", "have", "was",
    "its", "for", "from", "that", "this", "there", "inside", "found", "my", "our",
];

/// Minimum token length considered meaningful.
const MIN_TOKEN_LEN: usize = 3;

pub fn tokenize(text: &str) -> HashSet<String> {
    TOKEN_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(|t| t.chars().count() >= MIN_TOKEN_LEN && !STOPWORDS.contains(&t.as_str()))
        .collect()
}

/// Token-overlap matcher used when no external assistant is wired in.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    min_overlap: usize,
}

impl Default for KeywordMatcher {
    fn default() -> Self {
        Self { min_overlap: 1 }
    }
}

impl KeywordMatcher {
    pub fn new(min_overlap: usize) -> Self {
        Self {
            min_overlap: min_overlap.max(1),
        }
    }

    fn overlap(&self, wanted: &HashSet<String>, record: &BaggageRecord) -> usize {
        let have = tokenize(&record.description_text());
        wanted.intersection(&have).count()
    }
}

impl LanguageAssistant for KeywordMatcher {
    fn resolve_record_by_semantic_identifier(
        &self,
        _identifier: &Identifier,
        _corpus: &[BaggageRecord],
    ) -> Result<Option<BaggageRecord>, AssistantError> {
        Ok(None)
    }

    fn match_by_description(
        &self,
        text: &str,
        candidates: &[BaggageRecord],
    ) -> Result<Vec<BaggageRecord>, AssistantError> {
        let wanted = tokenize(text);
        if wanted.is_empty() {
            return Ok(Vec::new());
        }
        Ok(candidates
            .iter()
            .filter(|record| self.overlap(&wanted, record) >= self.min_overlap)
            .cloned()
            .collect())
    }

    fn compare_images(
        &self,
        _reference_a: &str,
        _reference_b: &str,
    ) -> Result<String, AssistantError> {
        Err(AssistantError::Unavailable(
            "image comparison needs an external assistant".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::models::{BaggageStatus, HistoryEntry};
    use chrono::Utc;

    fn found(pir: &str, details: &str) -> BaggageRecord {
        BaggageRecord::new(pir, BaggageStatus::FoundAwaitingClaim, "JED Warehouse B", Utc::now())
            .with_history(HistoryEntry {
                timestamp: Utc::now(),
                status_label: "Found".into(),
                location: "JED".into(),
                details: details.into(),
            })
    }

    #[test]
    fn test_tokenize_drops_noise() {
        let tokens = tokenize("My red bag, with a Samsonite tag & 2 wheels!");
        assert!(tokens.contains("red"));
        assert!(tokens.contains("samsonite"));
        assert!(tokens.contains("wheels"));
        assert!(!tokens.contains("bag"));
        assert!(!tokens.contains("my"));
        assert!(!tokens.contains("2"));
    }

    #[test]
    fn test_tokenize_non_latin() {
        let tokens = tokenize("حقيبة حمراء كبيرة");
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn test_match_preserves_candidate_order() {
        let pool = vec![
            found("JEDSV00001", "Blue hard-shell case with stickers"),
            found("JEDSV00002", "Black duffel, broken zipper"),
            found("JEDSV00003", "Navy blue backpack"),
        ];
        let matcher = KeywordMatcher::default();
        let hits = matcher.match_by_description("blue", &pool).unwrap();
        let ids: Vec<_> = hits.iter().map(|r| r.report_id.as_str()).collect();
        assert_eq!(ids, vec!["JEDSV00001", "JEDSV00003"]);
    }

    #[test]
    fn test_min_overlap_and_empty_text() {
        let pool = vec![found("JEDSV00001", "Blue hard-shell case with stickers")];
        let strict = KeywordMatcher::new(2);
        assert!(strict.match_by_description("blue duffel", &pool).unwrap().is_empty());
        assert_eq!(strict.match_by_description("blue stickers", &pool).unwrap().len(), 1);
        assert!(strict.match_by_description("   ", &pool).unwrap().is_empty());
    }

    #[test]
    fn test_image_comparison_unavailable_locally() {
        let matcher = KeywordMatcher::default();
        assert!(matcher.compare_images("a.jpg", "b.jpg").is_err());
    }
}
