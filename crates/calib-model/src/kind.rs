use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Family of versioned artifacts. Each kind has its own index per state and
/// resolution mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Calibration,
    Normalization,
    Reduction,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [
        ArtifactKind::Calibration,
        ArtifactKind::Normalization,
        ArtifactKind::Reduction,
    ];

    /// Directory under `{state}/{mode}/`.
    pub fn dir_name(&self) -> &'static str {
        match self {
            ArtifactKind::Calibration => "calibration",
            ArtifactKind::Normalization => "normalization",
            ArtifactKind::Reduction => "reduction",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ArtifactKind::Calibration => "Calibration",
            ArtifactKind::Normalization => "Normalization",
            ArtifactKind::Reduction => "Reduction",
        }
    }

    /// Merged index file, e.g. `CalibrationIndex.json`.
    pub fn index_file_name(&self) -> String {
        format!("{}Index.json", self.label())
    }

    /// Record file inside a version directory, e.g. `CalibrationRecord.json`.
    pub fn record_file_name(&self) -> String {
        format!("{}Record.json", self.label())
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "calibration" => Ok(ArtifactKind::Calibration),
            "normalization" => Ok(ArtifactKind::Normalization),
            "reduction" => Ok(ArtifactKind::Reduction),
            _ => Err(format!(
                "Unknown artifact kind: {s} (expected calibration, normalization or reduction)"
            )),
        }
    }
}

/// Resolution mode label used for directory names and messages.
pub fn mode_name(use_lite_mode: bool) -> &'static str {
    if use_lite_mode { "lite" } else { "native" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names() {
        assert_eq!(
            ArtifactKind::Normalization.index_file_name(),
            "NormalizationIndex.json"
        );
        assert_eq!(
            ArtifactKind::Calibration.record_file_name(),
            "CalibrationRecord.json"
        );
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(
            "Reduction".parse::<ArtifactKind>().unwrap(),
            ArtifactKind::Reduction
        );
        assert!("focus".parse::<ArtifactKind>().is_err());
    }
}
