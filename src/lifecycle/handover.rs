//! Security handover form.
//!
//! Release of a bag to a recipient requires identity and contents
//! verification. Lengths are counted in characters after trimming, and each
//! field must be strictly longer than its minimum.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::HandoverField;
use crate::security::pii::mask_identifier;

pub const MIN_RECIPIENT_NAME_LEN: usize = 5;
pub const MIN_ID_NUMBER_LEN: usize = 5;
pub const MIN_PHONE_LEN: usize = 8;
pub const MIN_CONTENTS_ANSWER_LEN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IdDocumentType {
    #[default]
    #[serde(rename = "National ID")]
    NationalId,
    #[serde(rename = "Passport")]
    Passport,
    #[serde(rename = "Residence Permit")]
    ResidencePermit,
}

impl IdDocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdDocumentType::NationalId => "National ID",
            IdDocumentType::Passport => "Passport",
            IdDocumentType::ResidencePermit => "Residence Permit",
        }
    }
}

impl fmt::Display for IdDocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoverRecord {
    pub recipient_name: String,
    pub id_type: IdDocumentType,
    pub id_number: String,
    pub phone: String,
    /// Recipient's statement of the bag's contents.
    pub contents_answer: String,
    /// Optional answer about distinguishing marks. Recorded, not verified.
    pub marks_answer: Option<String>,
}

impl HandoverRecord {
    pub fn new(recipient_name: &str, id_number: &str, phone: &str, contents_answer: &str) -> Self {
        Self {
            recipient_name: recipient_name.to_string(),
            id_number: id_number.to_string(),
            phone: phone.to_string(),
            contents_answer: contents_answer.to_string(),
            ..Self::default()
        }
    }

    pub fn with_id_type(mut self, id_type: IdDocumentType) -> Self {
        self.id_type = id_type;
        self
    }

    pub fn with_marks(mut self, marks: &str) -> Self {
        self.marks_answer = Some(marks.to_string());
        self
    }

    /// Fields failing their length rule, in form order. Empty means ready.
    pub fn missing_fields(&self) -> Vec<HandoverField> {
        let checks = [
            (HandoverField::RecipientName, &self.recipient_name, MIN_RECIPIENT_NAME_LEN),
            (HandoverField::IdNumber, &self.id_number, MIN_ID_NUMBER_LEN),
            (HandoverField::Phone, &self.phone, MIN_PHONE_LEN),
            (HandoverField::ContentsAnswer, &self.contents_answer, MIN_CONTENTS_ANSWER_LEN),
        ];
        checks
            .into_iter()
            .filter(|(_, value, min)| value.trim().chars().count() <= *min)
            .map(|(field, _, _)| field)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Narrative stored in the record's history.
    pub fn history_details(&self) -> String {
        let mut details = format!(
            "Released to recipient: {}. ID: {} ({}). Phone: {}. Stated contents: {}.",
            self.recipient_name.trim(),
            self.id_type,
            self.id_number.trim(),
            self.phone.trim(),
            self.contents_answer.trim()
        );
        if let Some(marks) = self.marks_answer.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
            details.push_str(&format!(" Marks: {}.", marks));
        }
        details
    }

    /// Verification note appended to a self-claim history entry.
    pub fn claim_details(&self) -> String {
        format!(
            "Security verification: recipient {}, ID {} ({}).",
            self.recipient_name.trim(),
            self.id_type,
            self.id_number.trim()
        )
    }

    /// Audit and log form: identity numbers masked.
    pub fn masked_summary(&self) -> String {
        format!(
            "recipient={} id_type={} id={} phone={}",
            self.recipient_name.trim(),
            self.id_type,
            mask_identifier(&self.id_number),
            mask_identifier(&self.phone)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> HandoverRecord {
        HandoverRecord::new("Ahmed Ali", "1098765432", "0551234567", "Clothes and a laptop")
    }

    #[test]
    fn test_complete_form() {
        assert!(complete().is_complete());
    }

    #[test]
    fn test_name_length_boundary() {
        let mut form = complete();
        form.recipient_name = "Ahmed".into();
        assert_eq!(form.missing_fields(), vec![HandoverField::RecipientName]);
        form.recipient_name = "Ahmed1".into();
        assert!(form.is_complete());
    }

    #[test]
    fn test_whitespace_does_not_count() {
        let mut form = complete();
        form.phone = "  12345678  ".into();
        assert_eq!(form.missing_fields(), vec![HandoverField::Phone]);
        form.phone = "123456789".into();
        assert!(form.is_complete());
    }

    #[test]
    fn test_lengths_count_characters() {
        let mut form = complete();
        // Five Arabic letters: ten bytes, five characters.
        form.contents_answer = "ملابس".into();
        assert_eq!(form.missing_fields(), vec![HandoverField::ContentsAnswer]);
    }

    #[test]
    fn test_empty_form_lists_all_fields_in_order() {
        assert_eq!(
            HandoverRecord::default().missing_fields(),
            vec![
                HandoverField::RecipientName,
                HandoverField::IdNumber,
                HandoverField::Phone,
                HandoverField::ContentsAnswer,
            ]
        );
    }

    #[test]
    fn test_history_details_and_masking() {
        let form = complete()
            .with_id_type(IdDocumentType::Passport)
            .with_marks("Green ribbon");
        let details = form.history_details();
        assert!(details.contains("Passport (1098765432)"));
        assert!(details.ends_with("Marks: Green ribbon."));

        let summary = form.masked_summary();
        assert!(summary.contains("id=******5432"));
        assert!(!summary.contains("1098765432"));
    }

    #[test]
    fn test_claim_details_name_recipient() {
        let details = complete().claim_details();
        assert_eq!(
            details,
            "Security verification: recipient Ahmed Ali, ID National ID (1098765432)."
        );
    }
}
