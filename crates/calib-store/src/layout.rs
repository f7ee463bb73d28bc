//! On-disk layout.
//!
//! ```text
//! <data_root>/
//!   <stateId>/
//!     stateConfig.json
//!     native/ | lite/
//!       calibration/ | normalization/ | reduction/
//!         CalibrationIndex.json
//!         .index.lock
//!         v0001/CalibrationRecord.json
//! ```

use std::path::{Path, PathBuf};

use calib_model::{ArtifactKind, ContentDigest, VersionConfig, mode_name};

pub const STATE_CONFIG_FILE: &str = "stateConfig.json";
pub const LOCK_FILE: &str = ".index.lock";

#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
    version: VersionConfig,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>, version: VersionConfig) -> Self {
        Self {
            root: root.into(),
            version,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state_dir(&self, state_id: &ContentDigest) -> PathBuf {
        self.root.join(state_id.as_str())
    }

    pub fn state_config_path(&self, state_id: &ContentDigest) -> PathBuf {
        self.state_dir(state_id).join(STATE_CONFIG_FILE)
    }

    pub fn kind_dir(
        &self,
        state_id: &ContentDigest,
        use_lite_mode: bool,
        kind: ArtifactKind,
    ) -> PathBuf {
        self.state_dir(state_id)
            .join(mode_name(use_lite_mode))
            .join(kind.dir_name())
    }

    pub fn index_path(
        &self,
        state_id: &ContentDigest,
        use_lite_mode: bool,
        kind: ArtifactKind,
    ) -> PathBuf {
        self.kind_dir(state_id, use_lite_mode, kind)
            .join(kind.index_file_name())
    }

    pub fn lock_path(
        &self,
        state_id: &ContentDigest,
        use_lite_mode: bool,
        kind: ArtifactKind,
    ) -> PathBuf {
        self.kind_dir(state_id, use_lite_mode, kind).join(LOCK_FILE)
    }

    pub fn version_dir(
        &self,
        state_id: &ContentDigest,
        use_lite_mode: bool,
        kind: ArtifactKind,
        version: u32,
    ) -> PathBuf {
        self.kind_dir(state_id, use_lite_mode, kind)
            .join(self.version.dir_name(version))
    }

    pub fn record_path(
        &self,
        state_id: &ContentDigest,
        use_lite_mode: bool,
        kind: ArtifactKind,
        version: u32,
    ) -> PathBuf {
        self.version_dir(state_id, use_lite_mode, kind, version)
            .join(kind.record_file_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_follow_state_mode_kind_version() {
        let layout = Layout::new("/data", VersionConfig::default());
        let state = ContentDigest::from_hex("0123456789abcdef").unwrap();
        assert_eq!(
            layout.record_path(&state, true, ArtifactKind::Calibration, 3),
            PathBuf::from("/data/0123456789abcdef/lite/calibration/v0003/CalibrationRecord.json")
        );
        assert_eq!(
            layout.index_path(&state, false, ArtifactKind::Normalization),
            PathBuf::from("/data/0123456789abcdef/native/normalization/NormalizationIndex.json")
        );
    }
}
