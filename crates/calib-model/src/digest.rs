//! Content digests: truncated extendable-output hashes of canonical JSON.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ModelError, Result};

/// Minimum (and default) digest length in hex characters.
pub const DIGEST_MIN_LEN: usize = 16;

/// Truncated cryptographic fingerprint of an object's canonical serialization.
///
/// Equality only looks at the hex string; the canonical bytes the digest was
/// computed from are kept when available but never compared.
#[derive(Debug, Clone)]
pub struct ContentDigest {
    hex: String,
    source: Option<Vec<u8>>,
}

impl ContentDigest {
    /// Digest `object` with the default length.
    pub fn from_object<T: Serialize + ?Sized>(object: &T) -> Result<Self> {
        Self::from_object_with_len(object, DIGEST_MIN_LEN)
    }

    /// Digest `object`, truncated to `length` hex characters.
    ///
    /// Odd lengths are rounded up to the next whole byte.
    pub fn from_object_with_len<T: Serialize + ?Sized>(object: &T, length: usize) -> Result<Self> {
        if length < DIGEST_MIN_LEN {
            return Err(ModelError::InvalidDigest {
                field: "length",
                value: length.to_string(),
            });
        }
        let bytes = canonical_bytes(object)?;
        let mut out = vec![0u8; length.div_ceil(2)];
        let mut hasher = blake3::Hasher::new();
        hasher.update(&bytes);
        hasher.finalize_xof().fill(&mut out);
        Ok(Self {
            hex: hex::encode(out),
            source: Some(bytes),
        })
    }

    /// Accept a digest that was computed elsewhere, e.g. read from a path.
    pub fn from_hex(value: &str) -> Result<Self> {
        validate_hex("digest", value)?;
        Ok(Self {
            hex: value.to_string(),
            source: None,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.hex
    }

    /// Canonical bytes the digest was computed from, if computed locally.
    pub fn source_bytes(&self) -> Option<&[u8]> {
        self.source.as_deref()
    }
}

/// Sorted-key compact JSON. `serde_json::Map` is ordered by key unless the
/// `preserve_order` feature is enabled, which this workspace never does.
fn canonical_bytes<T: Serialize + ?Sized>(object: &T) -> Result<Vec<u8>> {
    let value = serde_json::to_value(object)?;
    Ok(serde_json::to_vec(&value)?)
}

pub(crate) fn validate_hex(field: &'static str, value: &str) -> Result<()> {
    let valid = value.len() >= DIGEST_MIN_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    if valid {
        Ok(())
    } else {
        Err(ModelError::InvalidDigest {
            field,
            value: value.to_string(),
        })
    }
}

impl PartialEq for ContentDigest {
    fn eq(&self, other: &Self) -> bool {
        self.hex == other.hex
    }
}

impl Eq for ContentDigest {}

impl std::hash::Hash for ContentDigest {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.hex.hash(state);
    }
}

impl PartialEq<str> for ContentDigest {
    fn eq(&self, other: &str) -> bool {
        self.hex == other
    }
}

impl PartialEq<&str> for ContentDigest {
    fn eq(&self, other: &&str) -> bool {
        self.hex == *other
    }
}

impl FromStr for ContentDigest {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex)
    }
}

impl Serialize for ContentDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.hex)
    }
}

impl<'de> Deserialize<'de> for ContentDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
