//! Store configuration.
//!
//! Passed explicitly into [`crate::DataStore`]; there is no process-wide
//! configuration singleton.

use std::path::{Path, PathBuf};

use calib_model::{DIGEST_MIN_LEN, VersionConfig};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Environment variable overriding [`StoreConfig::data_root`].
pub const DATA_ROOT_ENV_VAR: &str = "CALIB_DATA_ROOT";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding one subdirectory per state.
    pub data_root: PathBuf,
    /// Base for relative grouping-schema paths (default: `<data_root>/groupings`).
    pub grouping_root: Option<PathBuf>,
    /// Grouping map seeded into new states
    /// (default: `<grouping_root>/defaultGroupingMap.json`).
    pub default_grouping_map: Option<PathBuf>,
    pub version: VersionConfig,
    /// Hex characters in state identifiers.
    pub digest_length: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("calibration"),
            grouping_root: None,
            default_grouping_map: None,
            version: VersionConfig::default(),
            digest_length: DIGEST_MIN_LEN,
        }
    }
}

impl StoreConfig {
    pub fn with_data_root(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
            ..Self::default()
        }
    }

    /// Load a TOML config file. Relative paths inside it are taken relative
    /// to the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| StoreError::io("read", path, e))?;
        let mut config: Self = toml::from_str(&contents).map_err(|e| StoreError::Toml {
            path: path.to_path_buf(),
            source: e,
        })?;
        if let Some(base) = path.parent() {
            config.data_root = base.join(&config.data_root);
            config.grouping_root = config.grouping_root.map(|p| base.join(p));
            config.default_grouping_map = config.default_grouping_map.map(|p| base.join(p));
        }
        config.validate()?;
        Ok(config)
    }

    /// Apply `CALIB_DATA_ROOT` if set.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(root) = std::env::var(DATA_ROOT_ENV_VAR) {
            self.data_root = PathBuf::from(root);
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.digest_length < DIGEST_MIN_LEN {
            return Err(StoreError::InvalidConfig {
                message: format!(
                    "digest_length must be at least {DIGEST_MIN_LEN}, got {}",
                    self.digest_length
                ),
            });
        }
        if self.version.width == 0 {
            return Err(StoreError::InvalidConfig {
                message: "version.width must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn grouping_root(&self) -> PathBuf {
        self.grouping_root
            .clone()
            .unwrap_or_else(|| self.data_root.join("groupings"))
    }

    pub fn default_grouping_map_path(&self) -> PathBuf {
        self.default_grouping_map
            .clone()
            .unwrap_or_else(|| self.grouping_root().join("defaultGroupingMap.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_toml_relative_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calib.toml");
        std::fs::write(
            &path,
            r#"
data_root = "states"
digest_length = 20

[version]
start = 0
"#,
        )
        .unwrap();
        let config = StoreConfig::load(&path).unwrap();
        assert_eq!(config.data_root, dir.path().join("states"));
        assert_eq!(config.digest_length, 20);
        assert_eq!(config.version.start, 0);
        assert_eq!(config.version.width, 4);
        assert_eq!(config.grouping_root(), dir.path().join("states/groupings"));
    }

    #[test]
    fn rejects_short_digests() {
        let config = StoreConfig {
            digest_length: 8,
            ..StoreConfig::default()
        };
        assert!(matches!(
            config.validate().unwrap_err(),
            StoreError::InvalidConfig { .. }
        ));
    }

    #[test]
    fn unknown_file_is_an_io_error() {
        let err = StoreConfig::load(Path::new("/nonexistent/calib.toml")).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }
}
