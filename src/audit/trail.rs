//! Append-only audit log.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::clock::Clock;
use crate::log_info;
use crate::logging::structured::LogContext;

use super::entry::{AuditCategory, AuditDraft, AuditEntry, GENESIS_HASH};

/// Where a chain check failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainBreak {
    pub sequence: u64,
    pub reason: &'static str,
}

pub struct AuditLog {
    entries: RwLock<Vec<AuditEntry>>,
    clock: Arc<dyn Clock>,
}

impl AuditLog {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            clock,
        }
    }

    /// Seal and append. The only way entries enter the log.
    pub fn append(&self, draft: AuditDraft) -> AuditEntry {
        let mut entries = self.entries.write();
        let prev_hash = entries
            .last()
            .map(|e| e.hash.clone())
            .unwrap_or_else(|| GENESIS_HASH.to_string());
        let entry = AuditEntry::seal(draft, entries.len() as u64, self.clock.now(), &prev_hash);

        let ctx = match &entry.report_id {
            Some(pir) => LogContext::new("audit").with_report(pir),
            None => LogContext::new("audit"),
        };
        log_info!(
            ctx,
            "AUDIT_APPENDED",
            seq = entry.sequence,
            category = entry.category.as_str(),
            status = entry.status.as_str(),
            actor = entry.actor,
            action = entry.action,
        );

        entries.push(entry.clone());
        entry
    }

    /// Administrative actions not tied to a record (config changes, imports).
    pub fn record_admin_action(&self, actor: &str, action: &str, details: &str) -> AuditEntry {
        self.append(AuditDraft::operations(actor, action, details))
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies of all entries, oldest first.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.read().clone()
    }

    pub fn by_category(&self, category: AuditCategory) -> Vec<AuditEntry> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.category == category)
            .cloned()
            .collect()
    }

    pub fn for_report(&self, report_id: &str) -> Vec<AuditEntry> {
        let wanted = report_id.trim().to_uppercase();
        self.entries
            .read()
            .iter()
            .filter(|e| e.report_id.as_deref() == Some(wanted.as_str()))
            .cloned()
            .collect()
    }

    /// Recheck every hash and link.
    pub fn verify_chain(&self) -> Result<(), ChainBreak> {
        verify_entries(&self.entries.read())
    }
}

/// Check a sequence of entries, e.g. one exported and reloaded elsewhere.
pub fn verify_entries(entries: &[AuditEntry]) -> Result<(), ChainBreak> {
    let mut expected_prev: &str = GENESIS_HASH;
    for (position, entry) in entries.iter().enumerate() {
        if entry.sequence != position as u64 {
            return Err(ChainBreak {
                sequence: entry.sequence,
                reason: "sequence_gap",
            });
        }
        if entry.prev_hash != expected_prev {
            return Err(ChainBreak {
                sequence: entry.sequence,
                reason: "broken_link",
            });
        }
        if entry.compute_hash() != entry.hash {
            return Err(ChainBreak {
                sequence: entry.sequence,
                reason: "hash_mismatch",
            });
        }
        expected_prev = entry.hash.as_str();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{Duration, TimeZone, Utc};

    fn log_with_three() -> (Arc<ManualClock>, AuditLog) {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()));
        let log = AuditLog::new(clock.clone());
        log.append(AuditDraft::operations("ops-1", "Status change", "a").for_report("JEDSV00001"));
        clock.advance(Duration::minutes(1));
        log.append(AuditDraft::security("Passenger", "Self-claim", "b").for_report("JEDSV00002"));
        clock.advance(Duration::minutes(1));
        log.record_admin_action("admin", "Integration toggled", "connected=true");
        (clock, log)
    }

    #[test]
    fn test_append_assigns_sequence_and_links() {
        let (_, log) = log_with_three();
        let entries = log.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].prev_hash, GENESIS_HASH);
        assert_eq!(entries[1].prev_hash, entries[0].hash);
        assert_eq!(entries[2].sequence, 2);
        assert!(entries[1].timestamp > entries[0].timestamp);
        assert!(log.verify_chain().is_ok());
    }

    #[test]
    fn test_filters() {
        let (_, log) = log_with_three();
        assert_eq!(log.by_category(AuditCategory::Security).len(), 1);
        assert_eq!(log.by_category(AuditCategory::Operations).len(), 2);
        assert_eq!(log.for_report("jedsv00001").len(), 1);
    }

    #[test]
    fn test_verify_detects_tampering() {
        let (_, log) = log_with_three();
        let mut exported = log.entries();
        exported[1].actor = "someone else".into();
        assert_eq!(
            verify_entries(&exported),
            Err(ChainBreak {
                sequence: 1,
                reason: "hash_mismatch"
            })
        );

        let mut dropped = log.entries();
        dropped.remove(1);
        assert_eq!(verify_entries(&dropped).unwrap_err().reason, "sequence_gap");
    }
}
