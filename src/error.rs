//! Domain error taxonomy.
//!
//! These are the only failures presentation layers ever see. Remote outages
//! never appear here: the gateway resolves them internally by falling back
//! to its cache.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::models::BaggageStatus;

/// Handover form fields that can fail verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoverField {
    RecipientName,
    IdNumber,
    Phone,
    ContentsAnswer,
    VisualConfirmation,
}

impl HandoverField {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandoverField::RecipientName => "recipient_name",
            HandoverField::IdNumber => "id_number",
            HandoverField::Phone => "phone",
            HandoverField::ContentsAnswer => "contents_answer",
            HandoverField::VisualConfirmation => "visual_confirmation",
        }
    }
}

impl fmt::Display for HandoverField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TraceError {
    /// No record for the identifier. Recoverable: the caller offers the
    /// unclaimed pool instead.
    #[error("no baggage record found for {0}")]
    NotFound(String),

    #[error("invalid transition for {report_id}: {from} -> {to}")]
    InvalidTransition {
        report_id: String,
        from: BaggageStatus,
        to: BaggageStatus,
    },

    #[error("incomplete preconditions for {report_id}: {missing:?}")]
    IncompletePreconditions {
        report_id: String,
        missing: Vec<HandoverField>,
    },

    /// A second record with an existing PIR. Fatal: the store refuses it.
    #[error("duplicate report id {0}")]
    DuplicateReport(String),
}

impl TraceError {
    /// Short machine-readable reason for presentation layers.
    pub fn reason(&self) -> &'static str {
        match self {
            TraceError::NotFound(_) => "not_found",
            TraceError::InvalidTransition { .. } => "invalid_transition",
            TraceError::IncompletePreconditions { .. } => "incomplete_preconditions",
            TraceError::DuplicateReport(_) => "duplicate_report",
        }
    }
}

pub type TraceResult<T> = Result<T, TraceError>;
