//! PII masking for log output.
//!
//! Identity document numbers and phone numbers collected at handover are
//! stored on the record (the history entry embeds them) but never written
//! to logs in clear:
//! - `mask_identifier` keeps the last four characters of a known value
//! - `scrub_text` replaces emails and phone-like digit runs in free text

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Email pattern
    static ref EMAIL_PATTERN: Regex = Regex::new(
        r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}"
    ).unwrap();

    /// Phone numbers: optional +, then 8+ digits with optional separators
    static ref PHONE_PATTERN: Regex = Regex::new(
        r"\+?\d(?:[\s-]?\d){7,}"
    ).unwrap();
}

/// Characters left visible at the end of a masked value.
const VISIBLE_SUFFIX: usize = 4;

/// Counts of what `scrub_text` replaced.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PiiScrubResult {
    pub emails_found: usize,
    pub phones_found: usize,
}

impl PiiScrubResult {
    pub fn total_entities(&self) -> usize {
        self.emails_found + self.phones_found
    }
}

/// `1234567890` -> `******7890`. Short values are masked entirely.
pub fn mask_identifier(value: &str) -> String {
    let chars: Vec<char> = value.trim().chars().collect();
    if chars.len() <= VISIBLE_SUFFIX {
        return "*".repeat(chars.len());
    }
    let hidden = chars.len() - VISIBLE_SUFFIX;
    let mut masked = "*".repeat(hidden);
    masked.extend(&chars[hidden..]);
    masked
}

/// Replace emails with `[EMAIL]` and phone numbers with `[PHONE]`.
pub fn scrub_text(text: &str) -> (String, PiiScrubResult) {
    let emails_found = EMAIL_PATTERN.find_iter(text).count();
    let without_emails = EMAIL_PATTERN.replace_all(text, "[EMAIL]");

    let phones_found = PHONE_PATTERN.find_iter(&without_emails).count();
    let scrubbed = PHONE_PATTERN.replace_all(&without_emails, "[PHONE]");

    (
        scrubbed.into_owned(),
        PiiScrubResult {
            emails_found,
            phones_found,
        },
    )
}
