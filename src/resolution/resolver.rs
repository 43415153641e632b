//! Identifier resolution.
//!
//! Deterministic matching first, in store iteration order; the language
//! assistant is consulted only after a miss, and only an answer naming a
//! record from the searched corpus is accepted. A miss is `NotFound`, which
//! callers answer by presenting the unclaimed "found" pool.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{TraceError, TraceResult};
use crate::logging::structured::LogContext;
use crate::security::pii::scrub_text;
use crate::storage::models::{BaggageRecord, BaggageStatus, MediaRefs};
use crate::storage::store::{DataSource, RecordStore};
use crate::{log_debug, log_info, log_warn};

use super::assistant::LanguageAssistant;
use super::identifier::{Identifier, IdentifierKind};

/// Verdict shown when the image comparison cannot run.
pub const COMPARISON_UNAVAILABLE: &str = "Service unavailable";

/// Outcome of comparing a passenger's photo with the found bag's photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "verdict", rename_all = "snake_case")]
pub enum PhotoComparison {
    /// The assistant's free-text verdict.
    Verdict(String),
    /// The record lacks the passenger photo or the baggage photo.
    MissingPhotos,
    /// No assistant, or it failed.
    Unavailable,
}

impl PhotoComparison {
    /// Text to display. Empty when there was nothing to compare.
    pub fn verdict_text(&self) -> &str {
        match self {
            PhotoComparison::Verdict(text) => text,
            PhotoComparison::MissingPhotos => "",
            PhotoComparison::Unavailable => COMPARISON_UNAVAILABLE,
        }
    }
}

#[derive(Default, Clone)]
pub struct IdentityResolver {
    assistant: Option<Arc<dyn LanguageAssistant>>,
}

impl IdentityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_assistant(assistant: Arc<dyn LanguageAssistant>) -> Self {
        Self {
            assistant: Some(assistant),
        }
    }

    /// Parse raw form input, then resolve.
    pub fn resolve_raw(
        &self,
        kind: IdentifierKind,
        raw: &str,
        store: &RecordStore,
        remote_snapshot: &[BaggageRecord],
        ctx: &LogContext,
    ) -> TraceResult<BaggageRecord> {
        let identifier = Identifier::parse(kind, raw).map_err(|err| {
            log_info!(ctx, "RESOLVE_REJECTED", kind = kind.wire_tag(), reason = "malformed");
            err
        })?;
        self.resolve(&identifier, store, remote_snapshot, ctx)
    }

    /// Resolve to a single record.
    ///
    /// Surname-only identifiers can hit several records; the first in store
    /// order wins. Use `candidates` to see all of them.
    pub fn resolve(
        &self,
        identifier: &Identifier,
        store: &RecordStore,
        remote_snapshot: &[BaggageRecord],
        ctx: &LogContext,
    ) -> TraceResult<BaggageRecord> {
        if let Identifier::ReportId { value } = identifier {
            if let Some(record) = store.get(value) {
                log_info!(ctx, "RESOLVE_HIT", kind = "pir", source = "store", pir = record.report_id);
                return Ok(record);
            }
        }

        let corpus = lookup_corpus(store, remote_snapshot);
        let mut hits = corpus.iter().filter(|record| identifier.matches(record));

        if let Some(first) = hits.next() {
            let others = hits.count();
            if others > 0 {
                log_warn!(
                    ctx,
                    "RESOLVE_AMBIGUOUS",
                    kind = identifier.kind().wire_tag(),
                    chosen = first.report_id,
                    other_matches = others,
                );
            } else {
                log_info!(
                    ctx,
                    "RESOLVE_HIT",
                    kind = identifier.kind().wire_tag(),
                    pir = first.report_id,
                );
            }
            return Ok(first.clone());
        }

        if let Some(record) = self.ask_assistant(identifier, &corpus, ctx) {
            return Ok(record);
        }

        log_info!(
            ctx,
            "RESOLVE_NOT_FOUND",
            kind = identifier.kind().wire_tag(),
            corpus = corpus.len(),
        );
        Err(TraceError::NotFound(identifier.query()))
    }

    /// Every record the identifier matches, in store order.
    pub fn candidates(
        &self,
        identifier: &Identifier,
        store: &RecordStore,
        remote_snapshot: &[BaggageRecord],
    ) -> Vec<BaggageRecord> {
        lookup_corpus(store, remote_snapshot)
            .into_iter()
            .filter(|record| identifier.matches(record))
            .collect()
    }

    /// Found bags awaiting a claim: local records first, then remote ones
    /// the store does not hold.
    pub fn unclaimed_pool(
        &self,
        store: &RecordStore,
        remote_snapshot: &[BaggageRecord],
    ) -> Vec<BaggageRecord> {
        merge(store.all(), remote_snapshot)
            .into_iter()
            .filter(|record| record.status == BaggageStatus::FoundAwaitingClaim)
            .collect()
    }

    /// Records in `pool` relevant to the passenger's description, in pool
    /// order. Empty means "no confident match": present the whole pool.
    pub fn match_by_description(
        &self,
        text: &str,
        pool: &[BaggageRecord],
        ctx: &LogContext,
    ) -> Vec<BaggageRecord> {
        let Some(assistant) = &self.assistant else {
            log_info!(ctx, "DESCRIPTION_MATCH_SKIPPED", reason = "no_assistant");
            return Vec::new();
        };
        if text.trim().is_empty() || pool.is_empty() {
            return Vec::new();
        }
        // Free text from chat may carry contact details.
        let (scrubbed, _) = scrub_text(text);
        log_debug!(ctx, "DESCRIPTION_QUERY", text = scrubbed);

        match assistant.match_by_description(text, pool) {
            Ok(judged) => {
                let relevant: HashSet<String> =
                    judged.into_iter().map(|record| record.report_id).collect();
                let matches: Vec<BaggageRecord> = pool
                    .iter()
                    .filter(|record| relevant.contains(&record.report_id))
                    .cloned()
                    .collect();
                log_info!(ctx, "DESCRIPTION_MATCH", pool = pool.len(), matches = matches.len());
                matches
            }
            Err(e) => {
                log_warn!(ctx, "DESCRIPTION_MATCH_FAILED", error = e.to_string());
                Vec::new()
            }
        }
    }

    /// Ask the assistant whether the passenger's photo and the primary
    /// baggage photo show the same bag.
    pub fn compare_photos(&self, media: &MediaRefs, ctx: &LogContext) -> PhotoComparison {
        let (Some(passenger), Some(baggage)) = (media.passenger_photo.as_deref(), media.baggage_photo())
        else {
            log_debug!(ctx, "PHOTO_COMPARE_SKIPPED", reason = "missing_photo");
            return PhotoComparison::MissingPhotos;
        };
        let Some(assistant) = &self.assistant else {
            log_info!(ctx, "PHOTO_COMPARE_SKIPPED", reason = "no_assistant");
            return PhotoComparison::Unavailable;
        };
        match assistant.compare_images(passenger, baggage) {
            Ok(verdict) => {
                log_info!(ctx, "PHOTO_COMPARED", verdict_len = verdict.len());
                PhotoComparison::Verdict(verdict)
            }
            Err(e) => {
                log_warn!(ctx, "PHOTO_COMPARE_FAILED", error = e.to_string());
                PhotoComparison::Unavailable
            }
        }
    }

    fn ask_assistant(
        &self,
        identifier: &Identifier,
        corpus: &[BaggageRecord],
        ctx: &LogContext,
    ) -> Option<BaggageRecord> {
        let assistant = self.assistant.as_ref()?;
        match assistant.resolve_record_by_semantic_identifier(identifier, corpus) {
            Ok(Some(answer)) => {
                let known = corpus
                    .iter()
                    .find(|record| record.report_id == answer.report_id)
                    .cloned();
                match &known {
                    Some(record) => log_info!(
                        ctx,
                        "RESOLVE_HIT",
                        kind = identifier.kind().wire_tag(),
                        source = "assistant",
                        pir = record.report_id,
                    ),
                    None => log_warn!(
                        ctx,
                        "ASSISTANT_ANSWER_DISCARDED",
                        pir = answer.report_id,
                        reason = "not_in_corpus",
                    ),
                }
                known
            }
            Ok(None) => None,
            Err(e) => {
                log_warn!(ctx, "ASSISTANT_RESOLVE_FAILED", error = e.to_string());
                None
            }
        }
    }
}

/// Records searched by `resolve`: the store, plus the remote snapshot when
/// the store mirrors the network.
fn lookup_corpus(store: &RecordStore, remote_snapshot: &[BaggageRecord]) -> Vec<BaggageRecord> {
    match store.data_source() {
        DataSource::RemoteBacked => merge(store.all(), remote_snapshot),
        DataSource::LocalImport => store.all(),
    }
}

/// Local records first; remote records only for PIRs the store lacks.
fn merge(local: Vec<BaggageRecord>, remote: &[BaggageRecord]) -> Vec<BaggageRecord> {
    let known: HashSet<String> = local.iter().map(|r| r.report_id.clone()).collect();
    let mut merged = local;
    merged.extend(
        remote
            .iter()
            .filter(|record| !known.contains(&record.report_id))
            .cloned(),
    );
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::resolution::assistant::{AssistantError, KeywordMatcher};
    use crate::storage::models::HistoryEntry;
    use chrono::Utc;

    fn record(pir: &str, status: BaggageStatus) -> BaggageRecord {
        BaggageRecord::new(pir, status, "JED Warehouse", Utc::now())
    }

    fn store(source: DataSource) -> RecordStore {
        let store = RecordStore::new(Arc::new(SystemClock), source);
        store
            .load(vec![
                record("JEDSV10001", BaggageStatus::InProgress)
                    .with_tag("SV100001")
                    .with_flight("SV123")
                    .with_passenger("Omar Haddad", "Haddad"),
                record("JEDSV10002", BaggageStatus::FoundAwaitingClaim)
                    .with_flight("SV450")
                    .with_passenger("Lina Haddad", "Haddad"),
                record("JEDSV10003", BaggageStatus::FoundAwaitingClaim).with_history(
                    HistoryEntry {
                        timestamp: Utc::now(),
                        status_label: "Found".into(),
                        location: "JED".into(),
                        details: "Red hard-shell suitcase with a blue ribbon".into(),
                    },
                ),
            ])
            .unwrap();
        store
    }

    fn ctx() -> LogContext {
        LogContext::new("test")
    }

    /// Answers with a fixed record regardless of input.
    struct FixedAssistant(Option<BaggageRecord>);

    impl LanguageAssistant for FixedAssistant {
        fn resolve_record_by_semantic_identifier(
            &self,
            _identifier: &Identifier,
            _corpus: &[BaggageRecord],
        ) -> Result<Option<BaggageRecord>, AssistantError> {
            Ok(self.0.clone())
        }

        fn match_by_description(
            &self,
            _text: &str,
            candidates: &[BaggageRecord],
        ) -> Result<Vec<BaggageRecord>, AssistantError> {
            // Reversed on purpose: the resolver must restore pool order.
            Ok(candidates.iter().rev().cloned().collect())
        }

        fn compare_images(&self, _a: &str, _b: &str) -> Result<String, AssistantError> {
            Ok("same bag".into())
        }
    }

    struct DownAssistant;

    impl LanguageAssistant for DownAssistant {
        fn resolve_record_by_semantic_identifier(
            &self,
            _identifier: &Identifier,
            _corpus: &[BaggageRecord],
        ) -> Result<Option<BaggageRecord>, AssistantError> {
            Err(AssistantError::Unavailable("quota".into()))
        }

        fn match_by_description(
            &self,
            _text: &str,
            _candidates: &[BaggageRecord],
        ) -> Result<Vec<BaggageRecord>, AssistantError> {
            Err(AssistantError::Unavailable("quota".into()))
        }

        fn compare_images(&self, _a: &str, _b: &str) -> Result<String, AssistantError> {
            Err(AssistantError::Unavailable("quota".into()))
        }
    }

    #[test]
    fn test_resolve_each_kind() {
        let store = store(DataSource::LocalImport);
        let resolver = IdentityResolver::new();

        let cases = [
            (IdentifierKind::ReportId, "jedsv10002", "JEDSV10002"),
            (IdentifierKind::TagNumber, "SV100001", "JEDSV10001"),
            (IdentifierKind::FlightAndSurname, "sv450|HADDAD", "JEDSV10002"),
            (IdentifierKind::SurnameOnly, "haddad", "JEDSV10001"),
        ];
        for (kind, raw, expected) in cases {
            let record = resolver.resolve_raw(kind, raw, &store, &[], &ctx()).unwrap();
            assert_eq!(record.report_id, expected, "kind {:?}", kind);
        }
    }

    #[test]
    fn test_malformed_flight_composite_is_not_found() {
        let store = store(DataSource::LocalImport);
        let result = IdentityResolver::new().resolve_raw(
            IdentifierKind::FlightAndSurname,
            "SV450 Haddad",
            &store,
            &[],
            &ctx(),
        );
        assert!(matches!(result, Err(TraceError::NotFound(_))));
    }

    #[test]
    fn test_surname_candidates_lists_all_hits() {
        let store = store(DataSource::LocalImport);
        let surname = Identifier::parse(IdentifierKind::SurnameOnly, "Haddad").unwrap();
        let all = IdentityResolver::new().candidates(&surname, &store, &[]);
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_remote_snapshot_only_for_remote_backed_store() {
        let snapshot = vec![record("FRALH65432", BaggageStatus::Urgent)];
        let pir = Identifier::parse(IdentifierKind::ReportId, "FRALH65432").unwrap();
        let resolver = IdentityResolver::new();

        let local = store(DataSource::LocalImport);
        assert!(resolver.resolve(&pir, &local, &snapshot, &ctx()).is_err());

        let mirrored = store(DataSource::RemoteBacked);
        let hit = resolver.resolve(&pir, &mirrored, &snapshot, &ctx()).unwrap();
        assert_eq!(hit.status, BaggageStatus::Urgent);
    }

    #[test]
    fn test_local_copy_wins_over_snapshot() {
        let snapshot = vec![record("JEDSV10001", BaggageStatus::Resolved)];
        let store = store(DataSource::RemoteBacked);
        let tag = Identifier::parse(IdentifierKind::TagNumber, "SV100001").unwrap();
        let hit = IdentityResolver::new()
            .resolve(&tag, &store, &snapshot, &ctx())
            .unwrap();
        assert_eq!(hit.status, BaggageStatus::InProgress);
    }

    #[test]
    fn test_assistant_answer_must_be_in_corpus() {
        let store = store(DataSource::LocalImport);
        let ghost = Identifier::parse(IdentifierKind::ReportId, "RUHXY99999").unwrap();

        let outsider = IdentityResolver::with_assistant(Arc::new(FixedAssistant(Some(record(
            "RUHXY99999",
            BaggageStatus::InProgress,
        )))));
        assert!(outsider.resolve(&ghost, &store, &[], &ctx()).is_err());

        let insider = IdentityResolver::with_assistant(Arc::new(FixedAssistant(
            store.get("JEDSV10003"),
        )));
        let hit = insider.resolve(&ghost, &store, &[], &ctx()).unwrap();
        assert_eq!(hit.report_id, "JEDSV10003");
    }

    #[test]
    fn test_compare_photos_verdicts() {
        let media = MediaRefs::default()
            .with_passenger_photo("passenger.jpg")
            .with_angle("bag-front.jpg");

        let up = IdentityResolver::with_assistant(Arc::new(FixedAssistant(None)));
        assert_eq!(
            up.compare_photos(&media, &ctx()),
            PhotoComparison::Verdict("same bag".into())
        );

        let down = IdentityResolver::with_assistant(Arc::new(DownAssistant));
        let failed = down.compare_photos(&media, &ctx());
        assert_eq!(failed, PhotoComparison::Unavailable);
        assert_eq!(failed.verdict_text(), COMPARISON_UNAVAILABLE);

        assert_eq!(
            IdentityResolver::new().compare_photos(&media, &ctx()),
            PhotoComparison::Unavailable
        );

        let no_bag_photo = MediaRefs::default().with_passenger_photo("passenger.jpg");
        let missing = up.compare_photos(&no_bag_photo, &ctx());
        assert_eq!(missing, PhotoComparison::MissingPhotos);
        assert_eq!(missing.verdict_text(), "");
    }

    #[test]
    fn test_unclaimed_pool_merges_remote() {
        let store = store(DataSource::LocalImport);
        let snapshot = vec![
            record("JEDSV10002", BaggageStatus::FoundAwaitingClaim),
            record("RUHSV20001", BaggageStatus::FoundAwaitingClaim),
            record("RUHSV20002", BaggageStatus::Delivered),
        ];
        let pool = IdentityResolver::new().unclaimed_pool(&store, &snapshot);
        let ids: Vec<_> = pool.iter().map(|r| r.report_id.as_str()).collect();
        assert_eq!(ids, vec!["JEDSV10002", "JEDSV10003", "RUHSV20001"]);
    }

    #[test]
    fn test_description_match_preserves_pool_order() {
        let store = store(DataSource::LocalImport);
        let resolver = IdentityResolver::with_assistant(Arc::new(FixedAssistant(None)));
        let pool = resolver.unclaimed_pool(&store, &[]);
        let matches = resolver.match_by_description("anything", &pool, &ctx());
        assert_eq!(matches, pool);
    }

    #[test]
    fn test_description_match_with_keyword_matcher() {
        let store = store(DataSource::LocalImport);
        let resolver = IdentityResolver::with_assistant(Arc::new(KeywordMatcher::default()));
        let pool = resolver.unclaimed_pool(&store, &[]);

        let matches = resolver.match_by_description("red suitcase, blue ribbon", &pool, &ctx());
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].report_id, "JEDSV10003");

        assert!(resolver
            .match_by_description("green backpack", &pool, &ctx())
            .is_empty());
    }

    #[test]
    fn test_assistant_failures_degrade_to_empty() {
        let store = store(DataSource::LocalImport);
        let resolver = IdentityResolver::with_assistant(Arc::new(DownAssistant));
        let pool = resolver.unclaimed_pool(&store, &[]);
        assert!(resolver.match_by_description("red", &pool, &ctx()).is_empty());

        let ghost = Identifier::parse(IdentifierKind::ReportId, "RUHXY99999").unwrap();
        assert!(matches!(
            resolver.resolve(&ghost, &store, &[], &ctx()),
            Err(TraceError::NotFound(_))
        ));

        assert!(IdentityResolver::new()
            .match_by_description("red", &pool, &ctx())
            .is_empty());
    }
}
