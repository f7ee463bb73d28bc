//! Version markers and the rules for turning them into concrete integers.
//!
//! A [`Version`] is either a concrete integer or one of three symbols that
//! only make sense at resolution time. Persisted objects always carry a
//! concrete version; [`serialize_concrete`] is the serde guard that enforces
//! this at the serialization boundary.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ModelError, Result};

/// Default version floor.
pub const VERSION_START: u32 = 1;

/// Default zero-padding width of version directory names (`v0001`).
pub const VERSION_WIDTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Version {
    Concrete(u32),
    /// The version a consumer gets when it does not ask for one.
    Default,
    /// Highest version applicable to a run.
    Latest,
    /// One past the highest version in the index.
    Next,
}

impl Version {
    pub fn as_concrete(&self) -> Option<u32> {
        match self {
            Version::Concrete(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_symbolic(&self) -> bool {
        !matches!(self, Version::Concrete(_))
    }

    /// Return the concrete value or fail with `UnresolvedSymbolicVersion`.
    pub fn require_concrete(&self, object: &'static str, field: &'static str) -> Result<u32> {
        self.as_concrete()
            .ok_or(ModelError::UnresolvedSymbolicVersion {
                object,
                field,
                version: *self,
            })
    }

    fn symbol(&self) -> Option<&'static str> {
        match self {
            Version::Concrete(_) => None,
            Version::Default => Some("default"),
            Version::Latest => Some("latest"),
            Version::Next => Some("next"),
        }
    }
}

impl From<u32> for Version {
    fn from(value: u32) -> Self {
        Version::Concrete(value)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::Concrete(value) => write!(f, "{value}"),
            other => f.write_str(other.symbol().unwrap_or_default()),
        }
    }
}

impl FromStr for Version {
    type Err = ModelError;

    /// Parse user input such as a CLI argument. Symbols are case-insensitive.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "default" => Ok(Version::Default),
            "latest" => Ok(Version::Latest),
            "next" => Ok(Version::Next),
            _ => trimmed
                .parse::<u32>()
                .map(Version::Concrete)
                .map_err(|_| ModelError::VersionOutOfRange {
                    field: "version",
                    value: format!("'{trimmed}'"),
                    floor: 0,
                }),
        }
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Version::Concrete(value) => serializer.serialize_u32(*value),
            other => serializer.serialize_str(other.symbol().unwrap_or_default()),
        }
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(VersionVisitor)
    }
}

struct VersionVisitor;

impl Visitor<'_> for VersionVisitor {
    type Value = Version;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative integer version or one of \"default\", \"latest\", \"next\"")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> std::result::Result<Version, E> {
        u32::try_from(value)
            .map(Version::Concrete)
            .map_err(|_| E::custom(format!("version {value} exceeds {}", u32::MAX)))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> std::result::Result<Version, E> {
        if value < 0 {
            return Err(E::custom(format!(
                "version must be a non-negative integer, got {value}"
            )));
        }
        self.visit_u64(value.unsigned_abs())
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> std::result::Result<Version, E> {
        if value.fract() != 0.0 || !value.is_finite() {
            return Err(E::custom(format!(
                "version must be an integer, got non-integral value {value}"
            )));
        }
        if value < 0.0 || value > f64::from(u32::MAX) {
            return Err(E::custom(format!("version {value} is out of range")));
        }
        // Integral and bounded by the checks above.
        Ok(Version::Concrete(value as u32))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<Version, E> {
        match value {
            "default" => Ok(Version::Default),
            "latest" => Ok(Version::Latest),
            "next" => Ok(Version::Next),
            other => Err(E::custom(format!(
                "version must be an integer or one of \"default\", \"latest\", \"next\"; \
                 got string '{other}'"
            ))),
        }
    }
}

/// Serialize a version field that must already be concrete.
///
/// Used as `#[serde(serialize_with = "serialize_concrete")]` on persisted
/// structures; a symbolic value aborts serialization.
pub fn serialize_concrete<S: Serializer>(
    version: &Version,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match version {
        Version::Concrete(value) => serializer.serialize_u32(*value),
        other => Err(serde::ser::Error::custom(format!(
            "refusing to serialize unresolved version '{other}'"
        ))),
    }
}

/// Version floor and directory naming, threaded into indexes and stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionConfig {
    pub start: u32,
    pub width: usize,
}

impl Default for VersionConfig {
    fn default() -> Self {
        Self {
            start: VERSION_START,
            width: VERSION_WIDTH,
        }
    }
}

impl VersionConfig {
    /// Reject concrete versions below the floor; symbols pass through.
    pub fn check(&self, field: &'static str, version: Version) -> Result<Version> {
        match version {
            Version::Concrete(value) if value < self.start => Err(ModelError::VersionOutOfRange {
                field,
                value: value.to_string(),
                floor: self.start,
            }),
            other => Ok(other),
        }
    }

    /// Directory name for a concrete version, e.g. `v0003`.
    pub fn dir_name(&self, version: u32) -> String {
        format!("v{version:0width$}", width = self.width)
    }

    /// Inverse of [`VersionConfig::dir_name`]; `None` for anything else.
    pub fn parse_dir_name(&self, name: &str) -> Option<u32> {
        let digits = name.strip_prefix('v')?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_integers_and_symbols() {
        let v: Version = serde_json::from_str("3").unwrap();
        assert_eq!(v, Version::Concrete(3));
        let v: Version = serde_json::from_str("\"latest\"").unwrap();
        assert_eq!(v, Version::Latest);
        let v: Version = serde_json::from_str("2.0").unwrap();
        assert_eq!(v, Version::Concrete(2));
    }

    #[test]
    fn rejects_string_numbers_and_fractions() {
        assert!(serde_json::from_str::<Version>("\"3\"").is_err());
        assert!(serde_json::from_str::<Version>("2.5").is_err());
        assert!(serde_json::from_str::<Version>("-1").is_err());
        assert!(serde_json::from_str::<Version>("\"newest\"").is_err());
    }

    #[test]
    fn floor_is_enforced() {
        let config = VersionConfig {
            start: 1,
            width: 4,
        };
        let err = config.check("version", Version::Concrete(0)).unwrap_err();
        assert!(matches!(
            err,
            ModelError::VersionOutOfRange { floor: 1, .. }
        ));
        assert_eq!(
            config.check("version", Version::Next).unwrap(),
            Version::Next
        );
    }

    #[test]
    fn concrete_guard_rejects_symbols() {
        let mut buf = Vec::new();
        let mut ser = serde_json::Serializer::new(&mut buf);
        assert!(serialize_concrete(&Version::Next, &mut ser).is_err());
        let err = Version::Default
            .require_concrete("record", "version")
            .unwrap_err();
        assert!(err.to_string().contains("'default'"));
    }

    #[test]
    fn dir_names_round_trip() {
        let config = VersionConfig::default();
        assert_eq!(config.dir_name(3), "v0003");
        assert_eq!(config.parse_dir_name("v0003"), Some(3));
        assert_eq!(config.parse_dir_name("v"), None);
        assert_eq!(config.parse_dir_name("x0003"), None);
    }

    #[test]
    fn parses_cli_input() {
        assert_eq!("Latest".parse::<Version>().unwrap(), Version::Latest);
        assert_eq!("7".parse::<Version>().unwrap(), Version::Concrete(7));
        assert!("seven".parse::<Version>().is_err());
    }
}
