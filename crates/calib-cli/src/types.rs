use std::path::PathBuf;

use calib_model::{ArtifactKind, ContentDigest, IndexEntry, Record, StateFingerprint, Version};
use calib_store::{GroupingMap, PrunedGroup};

/// Where a command gets its state from.
#[derive(Debug, Clone)]
pub enum StateSelector {
    /// A state identifier typed by the user.
    Id(String),
    /// A JSON file holding raw detector readings.
    Detector(PathBuf),
    Readings {
        arc1: f64,
        arc2: f64,
        wavelength: f64,
        frequency: f64,
        position: i64,
    },
}

#[derive(Debug)]
pub struct StateIdReport {
    pub fingerprint: StateFingerprint,
    pub state_id: ContentDigest,
    pub state_dir: PathBuf,
    pub initialized: bool,
}

#[derive(Debug)]
pub struct IndexReport {
    pub state_id: ContentDigest,
    pub kind: ArtifactKind,
    pub use_lite_mode: bool,
    pub entries: Vec<IndexEntry>,
}

#[derive(Debug)]
pub struct ResolveReport {
    pub state_id: ContentDigest,
    pub kind: ArtifactKind,
    pub run_number: u64,
    pub requested: Version,
    pub entry: IndexEntry,
    pub record_path: PathBuf,
    pub record: Record<serde_json::Value>,
}

#[derive(Debug)]
pub struct GroupsReport {
    pub state_id: ContentDigest,
    pub map: GroupingMap,
    pub pruned: Vec<PrunedGroup>,
}

#[derive(Debug)]
pub struct ExportReport {
    pub state_id: ContentDigest,
    pub kind: ArtifactKind,
    pub entry: IndexEntry,
    pub record_path: PathBuf,
}

/// Options for [`crate::commands::run_export`].
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub kind: ArtifactKind,
    pub use_lite_mode: bool,
    pub run_number: u64,
    pub payload: PathBuf,
    pub applies_to: Option<String>,
    pub comments: String,
    pub author: String,
}
