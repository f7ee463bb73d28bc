use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ModelError, Result};

/// Run number, persisted as a decimal string.
///
/// Older files wrote the run number as a JSON integer; both are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunNumber(u64);

impl RunNumber {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ModelError::InvalidRunNumber {
                field: "runNumber",
                value: value.to_string(),
            });
        }
        trimmed
            .parse()
            .map(Self)
            .map_err(|_| ModelError::InvalidRunNumber {
                field: "runNumber",
                value: value.to_string(),
            })
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for RunNumber {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl std::str::FromStr for RunNumber {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for RunNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for RunNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RunNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(RunNumberVisitor)
    }
}

struct RunNumberVisitor;

impl Visitor<'_> for RunNumberVisitor {
    type Value = RunNumber;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a run number as a decimal string or non-negative integer")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> std::result::Result<RunNumber, E> {
        Ok(RunNumber(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> std::result::Result<RunNumber, E> {
        u64::try_from(value)
            .map(RunNumber)
            .map_err(|_| E::custom(format!("run number must be non-negative, got {value}")))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<RunNumber, E> {
        RunNumber::parse(value).map_err(E::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_string_and_legacy_integer() {
        let a: RunNumber = serde_json::from_str("\"46342\"").unwrap();
        let b: RunNumber = serde_json::from_str("46342").unwrap();
        assert_eq!(a, b);
        assert_eq!(serde_json::to_string(&a).unwrap(), "\"46342\"");
    }

    #[test]
    fn rejects_non_numeric() {
        assert!(RunNumber::parse("run-1").is_err());
        assert!(RunNumber::parse("").is_err());
        assert!(serde_json::from_str::<RunNumber>("-3").is_err());
    }
}
