//! Passenger-supplied identifiers.
//!
//! Four identification forms are accepted at the counter and in chat:
//! report number (PIR), printed tag number, flight number plus surname,
//! and surname alone.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{TraceError, TraceResult};
use crate::storage::models::{normalize_report_id, BaggageRecord};

/// Separator between flight and surname in the composite form.
pub const FLIGHT_SURNAME_SEPARATOR: char = '|';

/// Which form the passenger chose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierKind {
    ReportId,
    TagNumber,
    FlightAndSurname,
    SurnameOnly,
}

impl IdentifierKind {
    /// Query `type` value understood by the tracing network.
    pub fn wire_tag(&self) -> &'static str {
        match self {
            IdentifierKind::ReportId => "pir",
            IdentifierKind::TagNumber => "tag",
            IdentifierKind::FlightAndSurname => "flight",
            IdentifierKind::SurnameOnly => "passengerName",
        }
    }

    /// Parse the identification-type tag sent by the passenger form.
    pub fn from_wire_tag(tag: &str) -> Option<Self> {
        match tag.trim() {
            "pir" => Some(IdentifierKind::ReportId),
            "tag" => Some(IdentifierKind::TagNumber),
            "flight" => Some(IdentifierKind::FlightAndSurname),
            "passengerName" | "lastName" => Some(IdentifierKind::SurnameOnly),
            _ => None,
        }
    }
}

/// A parsed identifier. Resolution dispatches exhaustively on this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Identifier {
    ReportId { value: String },
    TagNumber { value: String },
    FlightAndSurname { flight: String, surname: String },
    SurnameOnly { surname: String },
}

impl Identifier {
    /// Build an identifier from raw form input.
    ///
    /// Blank input, or a flight composite without both halves, cannot match
    /// anything and is reported as `NotFound`.
    pub fn parse(kind: IdentifierKind, raw: &str) -> TraceResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TraceError::NotFound(raw.to_string()));
        }

        let identifier = match kind {
            IdentifierKind::ReportId => Identifier::ReportId {
                value: normalize_report_id(trimmed),
            },
            IdentifierKind::TagNumber => Identifier::TagNumber {
                value: trimmed.to_string(),
            },
            IdentifierKind::FlightAndSurname => {
                let (flight, surname) = trimmed
                    .split_once(FLIGHT_SURNAME_SEPARATOR)
                    .ok_or_else(|| TraceError::NotFound(trimmed.to_string()))?;
                let (flight, surname) = (flight.trim(), surname.trim());
                if flight.is_empty() || surname.is_empty() {
                    return Err(TraceError::NotFound(trimmed.to_string()));
                }
                Identifier::FlightAndSurname {
                    flight: flight.to_uppercase(),
                    surname: surname.to_string(),
                }
            }
            IdentifierKind::SurnameOnly => Identifier::SurnameOnly {
                surname: trimmed.to_string(),
            },
        };
        Ok(identifier)
    }

    pub fn kind(&self) -> IdentifierKind {
        match self {
            Identifier::ReportId { .. } => IdentifierKind::ReportId,
            Identifier::TagNumber { .. } => IdentifierKind::TagNumber,
            Identifier::FlightAndSurname { .. } => IdentifierKind::FlightAndSurname,
            Identifier::SurnameOnly { .. } => IdentifierKind::SurnameOnly,
        }
    }

    /// Query string form for the network search endpoint.
    pub fn query(&self) -> String {
        match self {
            Identifier::ReportId { value } | Identifier::TagNumber { value } => value.clone(),
            Identifier::FlightAndSurname { flight, surname } => {
                format!("{}{}{}", flight, FLIGHT_SURNAME_SEPARATOR, surname)
            }
            Identifier::SurnameOnly { surname } => surname.clone(),
        }
    }

    /// Short form for passenger-facing messages (flight only for composites).
    pub fn display_value(&self) -> &str {
        match self {
            Identifier::ReportId { value } | Identifier::TagNumber { value } => value,
            Identifier::FlightAndSurname { flight, .. } => flight,
            Identifier::SurnameOnly { surname } => surname,
        }
    }

    pub fn matches(&self, record: &BaggageRecord) -> bool {
        match self {
            Identifier::ReportId { value } => record.matches_report_id(value),
            Identifier::TagNumber { value } => record.tag_number.as_deref() == Some(value.as_str()),
            Identifier::FlightAndSurname { flight, surname } => {
                let flight_matches = record
                    .flight_number
                    .as_deref()
                    .map(|f| f.trim().eq_ignore_ascii_case(flight))
                    .unwrap_or(false);
                flight_matches && surname_matches(record, surname)
            }
            Identifier::SurnameOnly { surname } => surname_matches(record, surname),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind().wire_tag(), self.query())
    }
}

fn surname_matches(record: &BaggageRecord, surname: &str) -> bool {
    record
        .passenger_surname
        .as_deref()
        .map(|s| s.trim().to_lowercase() == surname.trim().to_lowercase())
        .unwrap_or(false)
}
