//! Fallback cache for the tracing network.
//!
//! Serves every gateway read in simulation mode and whenever a live call
//! fails. Owned by whoever builds the gateway and injected at construction,
//! so tests get their own copy.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::resolution::identifier::Identifier;
use crate::storage::models::{
    BaggageRecord, BaggageStatus, HistoryEntry, MediaRefs, RecordPatch,
};

#[derive(Debug, Default)]
pub struct FallbackCache {
    records: RwLock<Vec<BaggageRecord>>,
}

impl FallbackCache {
    pub fn new(records: Vec<BaggageRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// The simulation data set shipped with the station app.
    pub fn seeded(now: DateTime<Utc>) -> Self {
        let mut record = BaggageRecord::new(
            "FRALH65432",
            BaggageStatus::Urgent,
            "Frankfurt Airport (FRA)",
            now,
        )
        .with_passenger("Ahmed Al-Masri", "Al-Masri")
        .with_flight("LH630")
        .with_route("CAI", "FRA")
        .with_media(MediaRefs::default().with_angle(
            "https://images.unsplash.com/photo-1579052320412-d1e2f854b420?q=80&w=400",
        ))
        .with_history(HistoryEntry {
            timestamp: now,
            status_label: "Located".to_string(),
            location: "FRA".to_string(),
            details: "Bag found in the sorting area.".to_string(),
        });

        record.next_step = Some("Awaiting rescheduling.".to_string());
        record.estimated_arrival = Some("TBD".to_string());
        Self::new(vec![record])
    }

    pub fn snapshot(&self) -> Vec<BaggageRecord> {
        self.records.read().clone()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add a record the cache does not hold. Returns whether it was added.
    pub fn insert(&self, record: BaggageRecord) -> bool {
        let mut records = self.records.write();
        if records.iter().any(|r| r.matches_report_id(&record.report_id)) {
            return false;
        }
        records.push(record);
        true
    }

    pub fn find(&self, identifier: &Identifier) -> Option<BaggageRecord> {
        self.records
            .read()
            .iter()
            .find(|record| identifier.matches(record))
            .cloned()
    }

    /// Merge an outbound update into the cached copy. Records the cache does
    /// not hold are left alone, and so is a patch stamped earlier than the
    /// cached copy. Returns whether the copy was updated.
    pub fn apply(&self, report_id: &str, patch: &RecordPatch, stamp: DateTime<Utc>) -> bool {
        let mut records = self.records.write();
        match records.iter_mut().find(|r| r.matches_report_id(report_id)) {
            Some(record) if stamp < record.last_update => {
                log::debug!(
                    "CACHE_PATCH_STALE pir={} stamp={} cached={}",
                    record.report_id,
                    stamp.to_rfc3339(),
                    record.last_update.to_rfc3339()
                );
                false
            }
            Some(record) => {
                patch.apply(record, stamp);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolution::identifier::IdentifierKind;
    use chrono::Duration;

    #[test]
    fn test_seeded_cache_holds_simulation_record() {
        let cache = FallbackCache::seeded(Utc::now());
        assert_eq!(cache.len(), 1);
        let pir = Identifier::parse(IdentifierKind::ReportId, "fralh65432").unwrap();
        let record = cache.find(&pir).unwrap();
        assert_eq!(record.status, BaggageStatus::Urgent);
        assert_eq!(record.flight_number.as_deref(), Some("LH630"));
    }

    #[test]
    fn test_apply_updates_existing_only() {
        let now = Utc::now();
        let cache = FallbackCache::seeded(now);
        let later = now + Duration::minutes(3);
        let patch = RecordPatch::new().location("FRA Lost & Found");

        assert!(cache.apply("FRALH65432", &patch, later));
        assert!(!cache.apply("JEDSV00001", &patch, later));

        let snapshot = cache.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].current_location, "FRA Lost & Found");
        assert_eq!(snapshot[0].last_update, later);
    }

    #[test]
    fn test_insert_keeps_existing_copy() {
        let now = Utc::now();
        let cache = FallbackCache::seeded(now);
        let dup = BaggageRecord::new("fralh65432", BaggageStatus::Resolved, "MUC", now);
        assert!(!cache.insert(dup));
        assert!(cache.insert(BaggageRecord::new("RUHSV20001", BaggageStatus::FoundAwaitingClaim, "RUH", now)));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.snapshot()[0].status, BaggageStatus::Urgent);
    }

    #[test]
    fn test_apply_skips_stale_patch() {
        let now = Utc::now();
        let cache = FallbackCache::seeded(now);
        let newer = RecordPatch::new().status(BaggageStatus::Resolved);
        let older = RecordPatch::new().status(BaggageStatus::InProgress);

        assert!(cache.apply("FRALH65432", &newer, now + Duration::minutes(2)));
        assert!(!cache.apply("FRALH65432", &older, now + Duration::minutes(1)));

        let cached = cache.snapshot().remove(0);
        assert_eq!(cached.status, BaggageStatus::Resolved);
        assert_eq!(cached.last_update, now + Duration::minutes(2));
    }
}
