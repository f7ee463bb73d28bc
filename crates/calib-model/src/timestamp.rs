//! Timestamp encoding at the serialization boundary.
//!
//! Timestamps are written as RFC 3339 text in UTC with microsecond precision.
//! On read, RFC 3339 text, naive ISO text (taken as UTC) and the legacy
//! epoch-millisecond numbers are all accepted and converted here, so the rest
//! of the model only ever sees `DateTime<Utc>`.
//!
//! Use with `#[serde(with = "crate::timestamp")]`.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};

use crate::error::{ModelError, Result};

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Persisted text form of a timestamp.
pub fn format(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse textual timestamps, with or without an offset.
pub fn parse_text(value: &str) -> Result<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ModelError::InvalidTimestamp {
            field: "timestamp",
            value: value.to_string(),
        })
}

/// Convert a legacy epoch-millisecond value.
pub fn from_epoch_millis(millis: f64) -> Result<DateTime<Utc>> {
    let invalid = || ModelError::InvalidTimestamp {
        field: "timestamp",
        value: millis.to_string(),
    };
    if !millis.is_finite() {
        return Err(invalid());
    }
    let micros = (millis * 1000.0).round();
    if micros.abs() > i64::MAX as f64 {
        return Err(invalid());
    }
    DateTime::from_timestamp_micros(micros as i64).ok_or_else(invalid)
}

pub fn serialize<S: Serializer>(
    timestamp: &DateTime<Utc>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&format(timestamp))
}

pub fn deserialize<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<DateTime<Utc>, D::Error> {
    deserializer.deserialize_any(TimestampVisitor)
}

struct TimestampVisitor;

impl Visitor<'_> for TimestampVisitor {
    type Value = DateTime<Utc>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an RFC 3339 timestamp or epoch milliseconds")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<Self::Value, E> {
        parse_text(value).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> std::result::Result<Self::Value, E> {
        DateTime::from_timestamp_millis(value).ok_or_else(|| {
            E::custom(ModelError::InvalidTimestamp {
                field: "timestamp",
                value: value.to_string(),
            })
        })
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> std::result::Result<Self::Value, E> {
        let millis = i64::try_from(value).map_err(|_| {
            E::custom(ModelError::InvalidTimestamp {
                field: "timestamp",
                value: value.to_string(),
            })
        })?;
        self.visit_i64(millis)
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> std::result::Result<Self::Value, E> {
        from_epoch_millis(value).map_err(E::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn formats_with_microseconds_in_utc() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 29, 12, 30, 0).unwrap();
        assert_eq!(format(&ts), "2024-03-29T12:30:00.000000Z");
    }

    #[test]
    fn parses_offsets_and_naive_text() {
        let a = parse_text("2024-03-29T14:30:00+02:00").unwrap();
        let b = parse_text("2024-03-29T12:30:00").unwrap();
        let c = parse_text("2024-03-29 12:30:00.000").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn converts_legacy_millis() {
        let ts = from_epoch_millis(1_711_715_400_250.0).unwrap();
        assert_eq!(ts.timestamp_millis(), 1_711_715_400_250);
        assert!(from_epoch_millis(f64::NAN).is_err());
    }

    #[test]
    fn rejects_unparseable_text() {
        assert!(parse_text("yesterday").is_err());
    }
}
