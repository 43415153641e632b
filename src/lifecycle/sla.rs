//! SLA risk classification.
//!
//! Elapsed time is measured from the record's `last_update`. Bands:
//! - Nominal: elapsed < 75% of the limit
//! - Warning: 75% of the limit <= elapsed < limit
//! - Breach: elapsed >= limit
//!
//! Nothing is cached; callers recompute whenever they need a band.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaBand {
    Nominal,
    Warning,
    Breach,
}

/// Band plus the numbers a dashboard timer shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaAssessment {
    pub band: SlaBand,
    pub elapsed_hours: i64,
    /// Minutes past `elapsed_hours` (0..60).
    pub elapsed_minutes: i64,
    /// Whole minutes left before breach; 0 once breached.
    pub remaining_minutes: i64,
}

/// Classify `now - last_update` against `limit`. A `last_update` in the
/// future counts as zero elapsed.
pub fn classify(last_update: DateTime<Utc>, now: DateTime<Utc>, limit: Duration) -> SlaBand {
    let elapsed = elapsed_since(last_update, now).num_milliseconds();
    let limit = limit.num_milliseconds();

    if elapsed >= limit {
        SlaBand::Breach
    } else if elapsed * 4 >= limit * 3 {
        SlaBand::Warning
    } else {
        SlaBand::Nominal
    }
}

pub fn assess(last_update: DateTime<Utc>, now: DateTime<Utc>, limit: Duration) -> SlaAssessment {
    let elapsed = elapsed_since(last_update, now);
    let remaining = (limit - elapsed).max(Duration::zero());
    SlaAssessment {
        band: classify(last_update, now, limit),
        elapsed_hours: elapsed.num_hours(),
        elapsed_minutes: elapsed.num_minutes() % 60,
        remaining_minutes: remaining.num_minutes(),
    }
}

fn elapsed_since(last_update: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - last_update).max(Duration::zero())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_default_limit_bands() {
        let limit = Duration::hours(24);
        assert_eq!(classify(t0(), t0() + Duration::hours(17), limit), SlaBand::Nominal);
        assert_eq!(classify(t0(), t0() + Duration::hours(18), limit), SlaBand::Warning);
        assert_eq!(
            classify(t0(), t0() + Duration::hours(23) + Duration::minutes(59), limit),
            SlaBand::Warning
        );
        assert_eq!(classify(t0(), t0() + Duration::hours(24), limit), SlaBand::Breach);
        assert_eq!(classify(t0(), t0() + Duration::days(3), limit), SlaBand::Breach);
    }

    #[test]
    fn test_future_update_is_nominal() {
        let limit = Duration::hours(24);
        assert_eq!(classify(t0(), t0() - Duration::hours(2), limit), SlaBand::Nominal);
    }

    #[test]
    fn test_assessment_numbers() {
        let limit = Duration::hours(24);
        let a = assess(t0(), t0() + Duration::hours(18) + Duration::minutes(25), limit);
        assert_eq!(a.band, SlaBand::Warning);
        assert_eq!(a.elapsed_hours, 18);
        assert_eq!(a.elapsed_minutes, 25);
        assert_eq!(a.remaining_minutes, 5 * 60 + 35);

        let late = assess(t0(), t0() + Duration::hours(30), limit);
        assert_eq!(late.band, SlaBand::Breach);
        assert_eq!(late.remaining_minutes, 0);
    }

    fn rank(band: SlaBand) -> u8 {
        match band {
            SlaBand::Nominal => 0,
            SlaBand::Warning => 1,
            SlaBand::Breach => 2,
        }
    }

    proptest! {
        #[test]
        fn prop_band_never_improves_with_time(
            limit_hours in 1i64..96,
            a in 0i64..400_000,
            b in 0i64..400_000,
        ) {
            let limit = Duration::hours(limit_hours);
            let (early, late) = if a <= b { (a, b) } else { (b, a) };
            let first = classify(t0(), t0() + Duration::seconds(early), limit);
            let second = classify(t0(), t0() + Duration::seconds(late), limit);
            prop_assert!(rank(first) <= rank(second));
        }

        #[test]
        fn prop_band_matches_thresholds(limit_hours in 1i64..96, secs in 0i64..400_000) {
            let limit = Duration::hours(limit_hours);
            let band = classify(t0(), t0() + Duration::seconds(secs), limit);
            let limit_secs = limit.num_seconds();
            let expected = if secs >= limit_secs {
                SlaBand::Breach
            } else if secs * 4 >= limit_secs * 3 {
                SlaBand::Warning
            } else {
                SlaBand::Nominal
            };
            prop_assert_eq!(band, expected);
        }
    }
}
