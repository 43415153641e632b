//! Tracing network wire format.
//!
//! The network exchanges flat PascalCase records with three fixed history
//! slots (`History_1_*` is the most recent). Decoding is lenient: keys are
//! looked up in both spellings the network has been seen to send, and
//! empty history slots are skipped.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::storage::models::{
    BaggageRecord, BaggageStatus, HistoryEntry, MediaRefs, RecordPatch, HISTORY_SLOTS,
    MAX_ANGLE_PHOTOS,
};

/// Network keys of the two baggage angles, first angle first.
const BAGGAGE_PHOTO_KEYS: [&[&str]; MAX_ANGLE_PHOTOS] = [
    &["BaggagePhotoUrl", "baggagePhotoUrl"],
    &["BaggagePhotoUrl_2", "baggagePhotoUrl_2"],
];

/// Convert a JSON value to a string representation.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => value.to_string(),
    }
}

/// Convert a JSON value to a boolean if possible.
pub fn value_to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.to_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        _ => None,
    }
}

fn field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| obj.get(*key))
}

/// Non-empty string field.
fn text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    field(obj, keys)
        .map(value_to_string)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Decode one network record. Returns `None` when there is no PIR or the
/// status label is unknown.
pub fn decode_record(value: &Value, received_at: DateTime<Utc>) -> Option<BaggageRecord> {
    let obj = value.as_object()?;
    let report_id = text(obj, &["PIR", "pir"])?;

    let status_label = text(obj, &["Status", "status"])?;
    let Some(status) = BaggageStatus::parse(&status_label) else {
        log::warn!(
            "WIRE_STATUS_UNKNOWN pir={} status={:?}",
            report_id,
            status_label
        );
        return None;
    };

    let last_update = text(obj, &["LastUpdate", "lastUpdate"])
        .and_then(|raw| timestamp(&raw))
        .unwrap_or(received_at);
    let created_at = text(obj, &["CreatedAt", "createdAt"])
        .and_then(|raw| timestamp(&raw))
        .unwrap_or(last_update);
    let location = text(obj, &["CurrentLocation", "currentLocation"]).unwrap_or_default();

    let mut record = BaggageRecord::new(&report_id, status, &location, created_at);
    record.last_update = last_update;
    record.tag_number = text(obj, &["TagNumber", "tagNumber"]);
    record.flight_number = text(obj, &["Flight", "flight"]).map(|f| f.to_uppercase());
    record.passenger_name = text(obj, &["PassengerName", "passengerName"]);
    record.passenger_surname = text(obj, &["PassengerSurname", "passengerSurname"]).or_else(|| {
        record
            .passenger_name
            .as_deref()
            .and_then(|name| name.split_whitespace().last())
            .map(str::to_string)
    });
    record.origin = text(obj, &["Origin", "origin"]);
    record.destination = text(obj, &["Destination", "destination"]);
    record.next_step = text(obj, &["NextStep", "nextStep"]);
    record.estimated_arrival = text(obj, &["EstimatedArrival", "estimatedArrival"]);
    record.confirmed_by_passenger = field(obj, &["IsConfirmedByPassenger", "isConfirmedByPassenger"])
        .and_then(value_to_bool)
        .unwrap_or(false);

    let mut media = MediaRefs {
        passenger_photo: text(obj, &["PassengerPhotoUrl", "passengerPhotoUrl"]),
        baggage_angles: Vec::new(),
    };
    for keys in BAGGAGE_PHOTO_KEYS {
        if let Some(uri) = text(obj, keys) {
            media = media.with_angle(&uri);
        }
    }
    record.media = media;

    // Slot 1 is the newest; the record keeps oldest first.
    for slot in (1..=HISTORY_SLOTS).rev() {
        let key = |suffix: &str| format!("History_{}_{}", slot, suffix);
        let Some(label) = text(obj, &[key("Status").as_str()]) else {
            continue;
        };
        record.push_history(HistoryEntry {
            timestamp: text(obj, &[key("Timestamp").as_str()])
                .and_then(|raw| timestamp(&raw))
                .unwrap_or(last_update),
            status_label: label,
            location: text(obj, &[key("Location").as_str()]).unwrap_or_default(),
            details: text(obj, &[key("Details").as_str()]).unwrap_or_default(),
        });
    }

    Some(record)
}

/// Decode a response body that should hold a list of records.
pub fn decode_record_list(body: &str, received_at: DateTime<Utc>) -> Option<Vec<BaggageRecord>> {
    let value: Value = serde_json::from_str(body).ok()?;
    let items = value.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| decode_record(item, received_at))
            .collect(),
    )
}

/// Decode a search response: a single record, or a list whose first record wins.
pub fn decode_search_hit(body: &str, received_at: DateTime<Utc>) -> Option<BaggageRecord> {
    let value: Value = serde_json::from_str(body).ok()?;
    match &value {
        Value::Array(items) => items.iter().find_map(|item| decode_record(item, received_at)),
        Value::Object(_) => decode_record(&value, received_at),
        _ => None,
    }
}

fn insert_history_slots(obj: &mut Map<String, Value>, record: &BaggageRecord) {
    for slot in 1..=HISTORY_SLOTS {
        let entry = record.history.iter().rev().nth(slot - 1);
        let key = |suffix: &str| format!("History_{}_{}", slot, suffix);
        let (ts, label, location, details) = match entry {
            Some(h) => (
                h.timestamp.to_rfc3339(),
                h.status_label.clone(),
                h.location.clone(),
                h.details.clone(),
            ),
            None => Default::default(),
        };
        obj.insert(key("Timestamp"), Value::String(ts));
        obj.insert(key("Status"), Value::String(label));
        obj.insert(key("Location"), Value::String(location));
        obj.insert(key("Details"), Value::String(details));
    }
}

fn insert_opt(obj: &mut Map<String, Value>, key: &str, value: &Option<String>) {
    if let Some(v) = value {
        obj.insert(key.to_string(), Value::String(v.clone()));
    }
}

fn insert_media(obj: &mut Map<String, Value>, media: &MediaRefs) {
    insert_opt(obj, "PassengerPhotoUrl", &media.passenger_photo);
    for (keys, uri) in BAGGAGE_PHOTO_KEYS.iter().zip(&media.baggage_angles) {
        obj.insert(keys[0].to_string(), Value::String(uri.clone()));
    }
}

/// Encode a full record in network form.
pub fn encode_record(record: &BaggageRecord) -> Value {
    let mut obj = Map::new();
    obj.insert("PIR".into(), Value::String(record.report_id.clone()));
    obj.insert("Status".into(), Value::String(record.status.as_str().into()));
    obj.insert("LastUpdate".into(), Value::String(record.last_update.to_rfc3339()));
    obj.insert("CreatedAt".into(), Value::String(record.created_at.to_rfc3339()));
    obj.insert(
        "CurrentLocation".into(),
        Value::String(record.current_location.clone()),
    );
    insert_opt(&mut obj, "TagNumber", &record.tag_number);
    insert_opt(&mut obj, "Flight", &record.flight_number);
    insert_opt(&mut obj, "PassengerName", &record.passenger_name);
    insert_opt(&mut obj, "PassengerSurname", &record.passenger_surname);
    insert_opt(&mut obj, "Origin", &record.origin);
    insert_opt(&mut obj, "Destination", &record.destination);
    insert_opt(&mut obj, "NextStep", &record.next_step);
    insert_opt(&mut obj, "EstimatedArrival", &record.estimated_arrival);
    insert_media(&mut obj, &record.media);
    obj.insert(
        "IsConfirmedByPassenger".into(),
        Value::Bool(record.confirmed_by_passenger),
    );
    insert_history_slots(&mut obj, record);
    Value::Object(obj)
}

/// PATCH body for an update already committed locally.
///
/// Only the patched fields travel, plus `LastUpdate`; an appended history
/// entry sends all three slots as the committed record now holds them.
pub fn encode_patch(patch: &RecordPatch, committed: &BaggageRecord) -> Value {
    let mut obj = Map::new();
    obj.insert(
        "LastUpdate".into(),
        Value::String(committed.last_update.to_rfc3339()),
    );
    if let Some(status) = patch.status_change() {
        obj.insert("Status".into(), Value::String(status.as_str().into()));
    }
    insert_opt(&mut obj, "CurrentLocation", &patch.current_location);
    insert_opt(&mut obj, "NextStep", &patch.next_step);
    insert_opt(&mut obj, "EstimatedArrival", &patch.estimated_arrival);
    insert_opt(&mut obj, "TagNumber", &patch.tag_number);
    insert_opt(&mut obj, "Flight", &patch.flight_number);
    insert_opt(&mut obj, "PassengerName", &patch.passenger_name);
    insert_opt(&mut obj, "PassengerSurname", &patch.passenger_surname);
    if let Some(media) = &patch.media {
        insert_media(&mut obj, media);
    }
    if let Some(confirmed) = patch.confirmed_by_passenger {
        obj.insert("IsConfirmedByPassenger".into(), Value::Bool(confirmed));
    }
    if patch.history.is_some() {
        insert_history_slots(&mut obj, committed);
    }
    Value::Object(obj)
}
