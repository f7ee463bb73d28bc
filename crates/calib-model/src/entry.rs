use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::applies_to::{AppliesTo, Conditional};
use crate::digest::ContentDigest;
use crate::run::RunNumber;
use crate::version::{Version, serialize_concrete};

/// Versioned, conditionally applicable pointer to one persisted artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    pub run_number: RunNumber,
    pub use_lite_mode: bool,
    #[serde(serialize_with = "serialize_concrete")]
    pub version: Version,
    /// `None` means the entry applies to its own run only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applies_to: Option<AppliesTo>,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub author: String,
    #[serde(with = "crate::timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Digest of the persisted record; absent in entries written before
    /// digests were tracked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_digest: Option<ContentDigest>,
}

impl IndexEntry {
    /// A fresh entry awaiting version assignment.
    pub fn new(
        run_number: RunNumber,
        use_lite_mode: bool,
        applies_to: Option<AppliesTo>,
        comments: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        Self {
            run_number,
            use_lite_mode,
            version: Version::Next,
            applies_to,
            comments: comments.into(),
            author: author.into(),
            timestamp: Utc::now(),
            record_digest: None,
        }
    }

    /// Effective conditionals, defaulting to equality with the entry's run.
    pub fn conditionals(&self) -> Vec<Conditional> {
        match &self.applies_to {
            Some(expr) => expr.conditionals().to_vec(),
            None => vec![Conditional::exact(self.run_number.value())],
        }
    }

    pub fn applies_to_run(&self, run_number: u64) -> bool {
        match &self.applies_to {
            Some(expr) => expr.matches(run_number),
            None => self.run_number.value() == run_number,
        }
    }

    /// Text form of the effective applicability expression.
    pub fn applies_to_text(&self) -> String {
        match &self.applies_to {
            Some(expr) => expr.to_string(),
            None => self.run_number.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_applies_to_means_own_run() {
        let entry = IndexEntry::new(RunNumber::new(46342), false, None, "", "");
        assert!(entry.applies_to_run(46342));
        assert!(!entry.applies_to_run(46343));
        assert_eq!(entry.conditionals(), vec![Conditional::exact(46342)]);
        assert_eq!(entry.version, Version::Next);
    }

    #[test]
    fn symbolic_version_cannot_be_serialized() {
        let entry = IndexEntry::new(RunNumber::new(1), true, None, "", "");
        assert!(serde_json::to_string(&entry).is_err());
    }

    #[test]
    fn malformed_applies_to_fails_to_load() {
        let json = r#"{
            "runNumber": "57514",
            "useLiteMode": true,
            "version": 2,
            "appliesTo": ">=57514,abc",
            "timestamp": "2024-03-29T12:30:00Z"
        }"#;
        let err = serde_json::from_str::<IndexEntry>(json).unwrap_err();
        assert!(err.to_string().contains("abc"));
    }
}
