//! Baggage record models.
//!
//! These models represent one lost-baggage case (a PIR) as held by the
//! in-process store and the gateway fallback cache.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// History slots carried per record (the network exposes History_1..History_3).
pub const HISTORY_SLOTS: usize = 3;

/// Baggage photos kept per record (the network's `BaggagePhotoUrl` and
/// `BaggagePhotoUrl_2`).
pub const MAX_ANGLE_PHOTOS: usize = 2;

/// Lifecycle status of a baggage record.
///
/// Serialized with the labels used by the tracing network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaggageStatus {
    #[serde(rename = "Found - Awaiting Claim")]
    FoundAwaitingClaim,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Out for Delivery")]
    OutForDelivery,
    #[serde(rename = "Delivered")]
    Delivered,
    #[serde(rename = "Urgent")]
    Urgent,
    #[serde(rename = "Resolved")]
    Resolved,
    #[serde(rename = "Needs Staff Review")]
    NeedsStaffReview,
}

impl BaggageStatus {
    pub const ALL: [BaggageStatus; 7] = [
        BaggageStatus::FoundAwaitingClaim,
        BaggageStatus::InProgress,
        BaggageStatus::OutForDelivery,
        BaggageStatus::Delivered,
        BaggageStatus::Urgent,
        BaggageStatus::Resolved,
        BaggageStatus::NeedsStaffReview,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BaggageStatus::FoundAwaitingClaim => "Found - Awaiting Claim",
            BaggageStatus::InProgress => "In Progress",
            BaggageStatus::OutForDelivery => "Out for Delivery",
            BaggageStatus::Delivered => "Delivered",
            BaggageStatus::Urgent => "Urgent",
            BaggageStatus::Resolved => "Resolved",
            BaggageStatus::NeedsStaffReview => "Needs Staff Review",
        }
    }

    /// Parse a network label. Accepts the enum spelling too ("InProgress").
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        Self::ALL.into_iter().find(|status| {
            status.as_str().eq_ignore_ascii_case(trimmed)
                || format!("{:?}", status).eq_ignore_ascii_case(trimmed)
        })
    }

    /// Delivered is the only state with no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BaggageStatus::Delivered)
    }
}

impl fmt::Display for BaggageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One timeline entry on a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub status_label: String,
    pub location: String,
    pub details: String,
}

/// Opaque photo references. The core never interprets them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaRefs {
    pub passenger_photo: Option<String>,
    /// Baggage photos, first angle first.
    pub baggage_angles: Vec<String>,
}

impl MediaRefs {
    pub fn with_passenger_photo(mut self, uri: &str) -> Self {
        self.passenger_photo = Some(uri.to_string());
        self
    }

    /// Primary baggage photo.
    pub fn baggage_photo(&self) -> Option<&str> {
        self.baggage_angles.first().map(String::as_str)
    }

    pub fn with_angle(mut self, uri: &str) -> Self {
        if self.baggage_angles.len() < MAX_ANGLE_PHOTOS {
            self.baggage_angles.push(uri.to_string());
        }
        self
    }
}

/// One lost-baggage case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaggageRecord {
    pub report_id: String,
    pub tag_number: Option<String>,
    pub flight_number: Option<String>,
    pub passenger_surname: Option<String>,
    pub passenger_name: Option<String>,

    pub status: BaggageStatus,
    pub created_at: DateTime<Utc>,
    pub last_update: DateTime<Utc>,

    pub current_location: String,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub next_step: Option<String>,
    pub estimated_arrival: Option<String>,

    /// Oldest first.
    pub history: Vec<HistoryEntry>,
    pub media: MediaRefs,
    pub confirmed_by_passenger: bool,
}

impl BaggageRecord {
    /// Create a record. The PIR is stored trimmed and upper-cased.
    pub fn new(
        report_id: &str,
        status: BaggageStatus,
        current_location: &str,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            report_id: normalize_report_id(report_id),
            tag_number: None,
            flight_number: None,
            passenger_surname: None,
            passenger_name: None,
            status,
            created_at,
            last_update: created_at,
            current_location: current_location.to_string(),
            origin: None,
            destination: None,
            next_step: None,
            estimated_arrival: None,
            history: Vec::new(),
            media: MediaRefs::default(),
            confirmed_by_passenger: false,
        }
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tag_number = Some(tag.trim().to_string());
        self
    }

    pub fn with_flight(mut self, flight: &str) -> Self {
        self.flight_number = Some(flight.trim().to_uppercase());
        self
    }

    pub fn with_passenger(mut self, full_name: &str, surname: &str) -> Self {
        self.passenger_name = Some(full_name.trim().to_string());
        self.passenger_surname = Some(surname.trim().to_string());
        self
    }

    pub fn with_route(mut self, origin: &str, destination: &str) -> Self {
        self.origin = Some(origin.to_string());
        self.destination = Some(destination.to_string());
        self
    }

    pub fn with_media(mut self, media: MediaRefs) -> Self {
        self.media = media;
        self
    }

    pub fn with_history(mut self, entry: HistoryEntry) -> Self {
        self.push_history(entry);
        self
    }

    /// Append a timeline entry, dropping the oldest once all slots are used.
    pub fn push_history(&mut self, entry: HistoryEntry) {
        self.history.push(entry);
        if self.history.len() > HISTORY_SLOTS {
            let overflow = self.history.len() - HISTORY_SLOTS;
            self.history.drain(..overflow);
        }
    }

    pub fn latest_history(&self) -> Option<&HistoryEntry> {
        self.history.last()
    }

    /// Free text describing the bag: every history narrative plus location.
    pub fn description_text(&self) -> String {
        let mut parts: Vec<&str> = self.history.iter().map(|h| h.details.as_str()).collect();
        parts.push(&self.current_location);
        parts.join(" ")
    }

    pub fn matches_report_id(&self, report_id: &str) -> bool {
        self.report_id == normalize_report_id(report_id)
    }
}

/// Canonical key form of a PIR.
pub fn normalize_report_id(report_id: &str) -> String {
    report_id.trim().to_uppercase()
}

/// Partial update merged into a record by the store and the fallback cache.
///
/// `status` is crate-private: only the lifecycle engine moves a record
/// between states.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    pub(crate) status: Option<BaggageStatus>,
    pub current_location: Option<String>,
    pub next_step: Option<String>,
    pub estimated_arrival: Option<String>,
    pub tag_number: Option<String>,
    pub flight_number: Option<String>,
    pub passenger_surname: Option<String>,
    pub passenger_name: Option<String>,
    pub media: Option<MediaRefs>,
    pub confirmed_by_passenger: Option<bool>,
    pub history: Option<HistoryEntry>,
}

impl RecordPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn status(mut self, status: BaggageStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn status_change(&self) -> Option<BaggageStatus> {
        self.status
    }

    pub fn location(mut self, location: &str) -> Self {
        self.current_location = Some(location.to_string());
        self
    }

    pub fn next_step(mut self, instruction: &str) -> Self {
        self.next_step = Some(instruction.to_string());
        self
    }

    pub fn estimated_arrival(mut self, eta: &str) -> Self {
        self.estimated_arrival = Some(eta.to_string());
        self
    }

    pub fn tag_number(mut self, tag: &str) -> Self {
        self.tag_number = Some(tag.trim().to_string());
        self
    }

    pub fn flight_number(mut self, flight: &str) -> Self {
        self.flight_number = Some(flight.trim().to_uppercase());
        self
    }

    pub fn passenger(mut self, full_name: &str, surname: &str) -> Self {
        self.passenger_name = Some(full_name.trim().to_string());
        self.passenger_surname = Some(surname.trim().to_string());
        self
    }

    pub fn media(mut self, media: MediaRefs) -> Self {
        self.media = Some(media);
        self
    }

    pub fn confirmed(mut self, confirmed: bool) -> Self {
        self.confirmed_by_passenger = Some(confirmed);
        self
    }

    pub fn history(mut self, entry: HistoryEntry) -> Self {
        self.history = Some(entry);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge into `record` and stamp `last_update`.
    pub fn apply(&self, record: &mut BaggageRecord, stamp: DateTime<Utc>) {
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(location) = &self.current_location {
            record.current_location = location.clone();
        }
        if let Some(step) = &self.next_step {
            record.next_step = Some(step.clone());
        }
        if let Some(eta) = &self.estimated_arrival {
            record.estimated_arrival = Some(eta.clone());
        }
        if let Some(tag) = &self.tag_number {
            record.tag_number = Some(tag.clone());
        }
        if let Some(flight) = &self.flight_number {
            record.flight_number = Some(flight.clone());
        }
        if let Some(surname) = &self.passenger_surname {
            record.passenger_surname = Some(surname.clone());
        }
        if let Some(name) = &self.passenger_name {
            record.passenger_name = Some(name.clone());
        }
        if let Some(media) = &self.media {
            record.media = media.clone();
        }
        if let Some(confirmed) = self.confirmed_by_passenger {
            record.confirmed_by_passenger = confirmed;
        }
        if let Some(entry) = &self.history {
            record.push_history(entry.clone());
        }
        record.last_update = stamp;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()
    }

    fn entry(label: &str, offset_min: i64) -> HistoryEntry {
        HistoryEntry {
            timestamp: t0() + Duration::minutes(offset_min),
            status_label: label.to_string(),
            location: "JED".to_string(),
            details: format!("{} details", label),
        }
    }

    #[test]
    fn test_status_labels_round_trip_through_parse() {
        for status in BaggageStatus::ALL {
            assert_eq!(BaggageStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(
            BaggageStatus::parse("inprogress"),
            Some(BaggageStatus::InProgress)
        );
        assert_eq!(BaggageStatus::parse("Lost"), None);
    }

    #[test]
    fn test_only_delivered_is_terminal() {
        let terminal: Vec<_> = BaggageStatus::ALL
            .into_iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(terminal, vec![BaggageStatus::Delivered]);
    }

    #[test]
    fn test_report_id_normalized() {
        let record = BaggageRecord::new(" fralh65432 ", BaggageStatus::Urgent, "FRA", t0());
        assert_eq!(record.report_id, "FRALH65432");
        assert!(record.matches_report_id("FraLH65432"));
    }

    #[test]
    fn test_history_is_capped_dropping_oldest() {
        let mut record = BaggageRecord::new("JEDSV12345", BaggageStatus::InProgress, "JED", t0());
        for (i, label) in ["a", "b", "c", "d"].iter().enumerate() {
            record.push_history(entry(label, i as i64));
        }
        assert_eq!(record.history.len(), HISTORY_SLOTS);
        assert_eq!(record.history[0].status_label, "b");
        assert_eq!(record.latest_history().unwrap().status_label, "d");
    }

    #[test]
    fn test_angle_photos_capped() {
        let media = MediaRefs::default()
            .with_angle("a.jpg")
            .with_angle("b.jpg")
            .with_angle("c.jpg");
        assert_eq!(media.baggage_angles, vec!["a.jpg", "b.jpg"]);
        assert_eq!(media.baggage_photo(), Some("a.jpg"));
        assert_eq!(MediaRefs::default().baggage_photo(), None);
    }

    #[test]
    fn test_patch_apply_merges_only_given_fields() {
        let mut record = BaggageRecord::new("JEDSV12345", BaggageStatus::InProgress, "JED", t0())
            .with_tag("SV123456");
        let stamp = t0() + Duration::hours(1);

        RecordPatch::new()
            .location("RUH T2")
            .confirmed(true)
            .apply(&mut record, stamp);

        assert_eq!(record.current_location, "RUH T2");
        assert!(record.confirmed_by_passenger);
        assert_eq!(record.tag_number.as_deref(), Some("SV123456"));
        assert_eq!(record.status, BaggageStatus::InProgress);
        assert_eq!(record.last_update, stamp);
    }

    #[test]
    fn test_empty_patch() {
        assert!(RecordPatch::new().is_empty());
        assert!(!RecordPatch::new().next_step("go").is_empty());
    }
}
