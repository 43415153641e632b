//! Audit entry types and chain hashing.
//!
//! Each entry commits to its predecessor through `prev_hash`; editing any
//! field of a stored entry breaks its own hash and every later link.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// `prev_hash` of the first entry.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditCategory {
    Security,
    Operations,
}

impl AuditCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditCategory::Security => "Security",
            AuditCategory::Operations => "Operations",
        }
    }
}

impl fmt::Display for AuditCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditStatus {
    Success,
    Failure,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Success => "Success",
            AuditStatus::Failure => "Failure",
        }
    }
}

/// What a caller hands to the log; sequence, time and hashes are assigned
/// on append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditDraft {
    pub actor: String,
    pub category: AuditCategory,
    pub action: String,
    pub details: String,
    pub status: AuditStatus,
    pub report_id: Option<String>,
}

impl AuditDraft {
    pub fn new(category: AuditCategory, actor: &str, action: &str, details: &str) -> Self {
        Self {
            actor: actor.to_string(),
            category,
            action: action.to_string(),
            details: details.to_string(),
            status: AuditStatus::Success,
            report_id: None,
        }
    }

    pub fn security(actor: &str, action: &str, details: &str) -> Self {
        Self::new(AuditCategory::Security, actor, action, details)
    }

    pub fn operations(actor: &str, action: &str, details: &str) -> Self {
        Self::new(AuditCategory::Operations, actor, action, details)
    }

    pub fn for_report(mut self, report_id: &str) -> Self {
        self.report_id = Some(report_id.to_uppercase());
        self
    }

    pub fn failed(mut self) -> Self {
        self.status = AuditStatus::Failure;
        self
    }
}

/// One immutable audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    /// Position in the log, starting at 0.
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub category: AuditCategory,
    pub action: String,
    pub details: String,
    pub status: AuditStatus,
    pub report_id: Option<String>,
    pub prev_hash: String,
    pub hash: String,
}

impl AuditEntry {
    pub(crate) fn seal(
        draft: AuditDraft,
        sequence: u64,
        timestamp: DateTime<Utc>,
        prev_hash: &str,
    ) -> Self {
        let mut entry = Self {
            id: Uuid::new_v4(),
            sequence,
            timestamp,
            actor: draft.actor,
            category: draft.category,
            action: draft.action,
            details: draft.details,
            status: draft.status,
            report_id: draft.report_id,
            prev_hash: prev_hash.to_string(),
            hash: String::new(),
        };
        entry.hash = entry.compute_hash();
        entry
    }

    /// SHA-256 (hex) over every field except `hash` itself.
    pub fn compute_hash(&self) -> String {
        let canonical = serde_json::json!({
            "id": self.id.to_string(),
            "sequence": self.sequence,
            "timestamp": self.timestamp.to_rfc3339(),
            "actor": self.actor,
            "category": self.category.as_str(),
            "action": self.action,
            "details": self.details,
            "status": self.status.as_str(),
            "report_id": self.report_id,
            "prev_hash": self.prev_hash,
        });
        compute_hash(&canonical.to_string())
    }
}

pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_hash() {
        let hash = compute_hash("hello world");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_seal_links_to_previous() {
        let draft = AuditDraft::security("SGS Operation Officer", "Handover", "bag released")
            .for_report("jedsv12345");
        let entry = AuditEntry::seal(draft, 0, Utc::now(), GENESIS_HASH);
        assert_eq!(entry.prev_hash, GENESIS_HASH);
        assert_eq!(entry.hash, entry.compute_hash());
        assert_eq!(entry.report_id.as_deref(), Some("JEDSV12345"));
        assert_eq!(entry.status, AuditStatus::Success);
    }

    #[test]
    fn test_any_field_change_breaks_hash() {
        let entry = AuditEntry::seal(
            AuditDraft::operations("ops", "Status change", "Urgent -> In Progress"),
            3,
            Utc::now(),
            GENESIS_HASH,
        );
        let mut tampered = entry.clone();
        tampered.details = "Urgent -> Resolved".into();
        assert_ne!(tampered.compute_hash(), entry.hash);
    }
}
