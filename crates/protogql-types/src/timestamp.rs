//! Well-known timestamp value (`seconds` + `nanos` since the Unix epoch).

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Seconds of 0001-01-01T00:00:00Z.
pub const MIN_VALID_SECONDS: i64 = -62_135_596_800;
/// Seconds of 10000-01-01T00:00:00Z (exclusive upper bound).
pub const MAX_VALID_SECONDS: i64 = 253_402_300_800;

const NANOS_PER_SECOND: i32 = 1_000_000_000;
const NANOS_PER_MILLI: i32 = 1_000_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimestampError {
    #[error("timestamp {0}: before 0001-01-01")]
    TooEarly(Timestamp),
    #[error("timestamp {0}: after 10000-01-01")]
    TooLate(Timestamp),
    #[error("timestamp {0}: nanos not in range [0, 1e9)")]
    NanosOutOfRange(Timestamp),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: i32,
}

impl Timestamp {
    pub fn new(seconds: i64, nanos: i32) -> Self {
        Self { seconds, nanos }
    }

    pub fn from_seconds(seconds: i64) -> Self {
        Self { seconds, nanos: 0 }
    }

    pub fn validate(&self) -> Result<(), TimestampError> {
        if self.seconds < MIN_VALID_SECONDS {
            return Err(TimestampError::TooEarly(*self));
        }
        if self.seconds >= MAX_VALID_SECONDS {
            return Err(TimestampError::TooLate(*self));
        }
        if !(0..NANOS_PER_SECOND).contains(&self.nanos) {
            return Err(TimestampError::NanosOutOfRange(*self));
        }
        Ok(())
    }

    /// Milliseconds since the epoch; sub-millisecond nanos are truncated.
    pub fn millis(&self) -> i64 {
        self.seconds
            .saturating_mul(1000)
            .saturating_add(i64::from(self.nanos / NANOS_PER_MILLI))
    }

    pub fn to_datetime(&self) -> Result<DateTime<Utc>, TimestampError> {
        self.validate()?;
        Utc.timestamp_opt(self.seconds, self.nanos as u32)
            .single()
            .ok_or(TimestampError::NanosOutOfRange(*self))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self {
            seconds: dt.timestamp(),
            nanos: dt.timestamp_subsec_nanos() as i32,
        }
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "seconds:{} nanos:{}", self.seconds, self.nanos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_truncates_sub_millisecond_nanos() {
        assert_eq!(Timestamp::new(100, 100).millis(), 100_000);
        assert_eq!(Timestamp::new(2, 5_999_999).millis(), 2_005);
        assert_eq!(Timestamp::new(-1, 0).millis(), -1_000);
    }

    #[test]
    fn validate_enforces_range() {
        assert!(Timestamp::new(0, 0).validate().is_ok());
        assert!(Timestamp::new(MIN_VALID_SECONDS, 0).validate().is_ok());
        assert!(matches!(
            Timestamp::new(MIN_VALID_SECONDS - 1, 0).validate(),
            Err(TimestampError::TooEarly(_))
        ));
        assert!(matches!(
            Timestamp::new(MAX_VALID_SECONDS, 0).validate(),
            Err(TimestampError::TooLate(_))
        ));
        assert!(matches!(
            Timestamp::new(0, NANOS_PER_SECOND).validate(),
            Err(TimestampError::NanosOutOfRange(_))
        ));
        assert!(Timestamp::new(0, -1).validate().is_err());
    }

    #[test]
    fn chrono_roundtrip_preserves_nanos() {
        let ts = Timestamp::new(1_700_000_000, 123_456_789);
        let dt = ts.to_datetime().unwrap();
        assert_eq!(Timestamp::from(dt), ts);
    }
}
