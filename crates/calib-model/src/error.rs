#![deny(unsafe_code)]

use crate::version::Version;

/// Validation and lookup failures raised by the data model.
///
/// Every variant names the offending field and the expected format so the
/// on-disk artifact can be repaired by hand.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error(
        "malformed applicability expression in {field}: conditional '{conditional}' of '{input}' \
         must be an optional comparison (>=, <=, <, >) followed by a run number"
    )]
    MalformedApplicabilityExpression {
        field: &'static str,
        input: String,
        conditional: String,
    },

    #[error("{field} out of range: {value} (expected an integer >= {floor})")]
    VersionOutOfRange {
        field: &'static str,
        value: String,
        floor: u32,
    },

    #[error("{field} space exhausted: no version follows {max}")]
    VersionExhausted { field: &'static str, max: u32 },

    #[error(
        "cannot persist {object} with unresolved version '{version}' in {field} \
         (resolve it against the index first)"
    )]
    UnresolvedSymbolicVersion {
        object: &'static str,
        field: &'static str,
        version: Version,
    },

    #[error("state identity mismatch in {field}: expected {expected}, found {found}")]
    StateIdentityMismatch {
        field: &'static str,
        expected: String,
        found: String,
    },

    #[error("no applicable version for run {run_number} (requested version '{requested}')")]
    NoApplicableVersion { requested: Version, run_number: u64 },

    #[error("{field} mismatch: index holds {expected} entries, got a {found} entry")]
    ModeMismatch {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("duplicate version {version} in index")]
    DuplicateVersion { version: u32 },

    #[error("{field} mismatch between record and index entry: record has {record}, entry has {entry}")]
    RecordEntryMismatch {
        field: &'static str,
        record: String,
        entry: String,
    },

    #[error("invalid content digest in {field}: '{value}' (expected at least 16 lowercase hex digits)")]
    InvalidDigest { field: &'static str, value: String },

    #[error("invalid run number in {field}: '{value}' (expected a non-negative integer)")]
    InvalidRunNumber { field: &'static str, value: String },

    #[error("invalid reading for {field}: {value} (expected a finite number)")]
    InvalidReading { field: &'static str, value: f64 },

    #[error("invalid timestamp in {field}: {value} (expected RFC 3339 text or epoch milliseconds)")]
    InvalidTimestamp { field: &'static str, value: String },

    #[error("failed to canonicalize object for hashing: {0}")]
    Canonicalize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ModelError>;
