//! In-process authoritative record table.
//!
//! Records are keyed by the normalized PIR and kept in insertion order so
//! scans (and surname-only resolution) are deterministic. All mutations run
//! under a single write lock; remote calls never happen while it is held.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::{TraceError, TraceResult};

use super::models::{normalize_report_id, BaggageRecord, RecordPatch};

/// Where the store's records came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Loaded from a local import (spreadsheet, fixture).
    LocalImport,
    /// Mirrors the tracing network; lookups may be augmented by a remote snapshot.
    RemoteBacked,
}

#[derive(Debug, Default)]
struct Table {
    records: Vec<BaggageRecord>,
    index: HashMap<String, usize>,
}

impl Table {
    fn position(&self, report_id: &str) -> Option<usize> {
        self.index.get(&normalize_report_id(report_id)).copied()
    }

    fn insert(&mut self, record: BaggageRecord) -> TraceResult<()> {
        let key = normalize_report_id(&record.report_id);
        if self.index.contains_key(&key) {
            return Err(TraceError::DuplicateReport(key));
        }
        self.index.insert(key, self.records.len());
        self.records.push(record);
        Ok(())
    }
}

pub struct RecordStore {
    table: RwLock<Table>,
    clock: Arc<dyn Clock>,
    source: DataSource,
}

impl RecordStore {
    pub fn new(clock: Arc<dyn Clock>, source: DataSource) -> Self {
        Self {
            table: RwLock::new(Table::default()),
            clock,
            source,
        }
    }

    pub fn data_source(&self) -> DataSource {
        self.source
    }

    pub fn len(&self) -> usize {
        self.table.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add a new record. An existing PIR is never overwritten.
    pub fn insert(&self, record: BaggageRecord) -> TraceResult<()> {
        let report_id = record.report_id.clone();
        let mut table = self.table.write();
        if let Err(err) = table.insert(record) {
            log::error!("RECORD_DUPLICATE_REJECTED pir={}", report_id);
            return Err(err);
        }
        log::debug!("RECORD_INSERTED pir={}", report_id);
        Ok(())
    }

    /// Bulk import. Stops at the first duplicate; records before it stay loaded.
    pub fn load(&self, records: Vec<BaggageRecord>) -> TraceResult<usize> {
        let mut table = self.table.write();
        let mut loaded = 0;
        for record in records {
            let report_id = record.report_id.clone();
            if let Err(err) = table.insert(record) {
                log::error!(
                    "RECORD_LOAD_ABORTED pir={} loaded={}",
                    report_id,
                    loaded
                );
                return Err(err);
            }
            loaded += 1;
        }
        log::info!(
            "RECORD_STORE_LOADED records={} source={:?}",
            loaded,
            self.source
        );
        Ok(loaded)
    }

    pub fn get(&self, report_id: &str) -> Option<BaggageRecord> {
        let table = self.table.read();
        table
            .position(report_id)
            .map(|pos| table.records[pos].clone())
    }

    pub fn contains(&self, report_id: &str) -> bool {
        self.table.read().position(report_id).is_some()
    }

    /// All records matching `predicate`, in insertion order.
    pub fn find<P>(&self, predicate: P) -> Vec<BaggageRecord>
    where
        P: Fn(&BaggageRecord) -> bool,
    {
        self.table
            .read()
            .records
            .iter()
            .filter(|record| predicate(record))
            .cloned()
            .collect()
    }

    pub fn all(&self) -> Vec<BaggageRecord> {
        self.table.read().records.clone()
    }

    /// Merge `patch` into the record and stamp it with the call time.
    pub fn update(&self, report_id: &str, patch: RecordPatch) -> TraceResult<BaggageRecord> {
        self.update_with(report_id, |_| Ok(patch))
            .map(|(record, _)| record)
    }

    /// Atomic read-check-modify-write.
    ///
    /// `decide` sees the current record under the write lock and returns the
    /// patch to apply, or an error that leaves the record untouched.
    pub fn update_with<F>(
        &self,
        report_id: &str,
        decide: F,
    ) -> TraceResult<(BaggageRecord, RecordPatch)>
    where
        F: FnOnce(&BaggageRecord) -> TraceResult<RecordPatch>,
    {
        self.commit_with(
            report_id,
            |current| decide(current).map(|patch| (patch, ())),
            |_, ()| (),
        )
        .map(|(record, patch, ())| (record, patch))
    }

    /// `update_with` plus a hook that runs on the committed record before the
    /// write lock is released.
    ///
    /// `decide` may hand a value of its own to `on_commit`; commits to the same
    /// PIR run their hooks in commit order. The hook must not touch the store.
    pub fn commit_with<D, T, F, C>(
        &self,
        report_id: &str,
        decide: F,
        on_commit: C,
    ) -> TraceResult<(BaggageRecord, RecordPatch, T)>
    where
        F: FnOnce(&BaggageRecord) -> TraceResult<(RecordPatch, D)>,
        C: FnOnce(&BaggageRecord, D) -> T,
    {
        let mut table = self.table.write();
        let pos = table
            .position(report_id)
            .ok_or_else(|| TraceError::NotFound(normalize_report_id(report_id)))?;

        let current = &table.records[pos];
        let (patch, carried) = decide(current)?;
        let stamp = self.next_stamp(current.last_update);

        let record = &mut table.records[pos];
        patch.apply(record, stamp);

        log::debug!(
            "RECORD_UPDATED pir={} status={} last_update={}",
            record.report_id,
            record.status,
            record.last_update.to_rfc3339()
        );

        let committed = record.clone();
        let hooked = on_commit(&committed, carried);
        Ok((committed, patch, hooked))
    }

    /// Call time, nudged forward if the clock has not moved past the
    /// previous stamp.
    fn next_stamp(&self, previous: DateTime<Utc>) -> DateTime<Utc> {
        let now = self.clock.now();
        if now > previous {
            now
        } else {
            previous + Duration::microseconds(1)
        }
    }
}
