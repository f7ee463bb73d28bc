//! Per-state catalog of pixel-grouping schema files.
//!
//! A missing grouping file degrades the catalog rather than aborting state
//! resolution: [`GroupingMap::validate`] prunes unusable entries with a
//! warning and never fails.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use calib_model::{ContentDigest, DIGEST_MIN_LEN, mode_name};

/// Extensions of the binary and XML grouping formats (compared
/// case-insensitively).
pub const SUPPORTED_GROUPING_EXTENSIONS: &[&str] = &["h5", "hdf", "hdf5", "nxs", "nxs5", "xml"];

/// Why an entry was pruned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupingFileProblem {
    Missing,
    NotAFile,
    UnsupportedExtension,
}

impl fmt::Display for GroupingFileProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupingFileProblem::Missing => f.write_str("file does not exist"),
            GroupingFileProblem::NotAFile => f.write_str("path is not a regular file"),
            GroupingFileProblem::UnsupportedExtension => write!(
                f,
                "unsupported extension (expected one of: {})",
                SUPPORTED_GROUPING_EXTENSIONS.join(", ")
            ),
        }
    }
}

/// A grouping entry dropped by validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrunedGroup {
    pub mode: &'static str,
    pub name: String,
    pub path: PathBuf,
    pub problem: GroupingFileProblem,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusGroup {
    pub name: String,
    pub definition: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupingMapFile {
    state_id: String,
    #[serde(default)]
    native_focus_groups: Vec<FocusGroup>,
    #[serde(default)]
    lite_focus_groups: Vec<FocusGroup>,
}

/// Available grouping schemas per resolution mode, keyed by schema name.
///
/// `state_id` is kept as raw text: a malformed value is warned about, not
/// rejected. The owning state config enforces that it matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "GroupingMapFile", into = "GroupingMapFile")]
pub struct GroupingMap {
    pub state_id: String,
    native: BTreeMap<String, PathBuf>,
    lite: BTreeMap<String, PathBuf>,
}

impl From<GroupingMapFile> for GroupingMap {
    fn from(file: GroupingMapFile) -> Self {
        Self {
            native: collect_groups(&file.state_id, false, file.native_focus_groups),
            lite: collect_groups(&file.state_id, true, file.lite_focus_groups),
            state_id: file.state_id,
        }
    }
}

/// Keys focus groups by name. The first definition of a name wins.
fn collect_groups(
    state_id: &str,
    use_lite_mode: bool,
    groups: Vec<FocusGroup>,
) -> BTreeMap<String, PathBuf> {
    let mut collected: BTreeMap<String, PathBuf> = BTreeMap::new();
    for group in groups {
        if let Some(kept) = collected.get(&group.name) {
            warn!(
                mode = mode_name(use_lite_mode),
                state_id,
                group = %group.name,
                kept = %kept.display(),
                dropped = %group.definition.display(),
                "duplicate grouping schema name; dropping later entry"
            );
            continue;
        }
        collected.insert(group.name, group.definition);
    }
    collected
}

impl From<GroupingMap> for GroupingMapFile {
    fn from(map: GroupingMap) -> Self {
        let expand = |groups: BTreeMap<String, PathBuf>| {
            groups
                .into_iter()
                .map(|(name, definition)| FocusGroup { name, definition })
                .collect()
        };
        Self {
            state_id: map.state_id,
            native_focus_groups: expand(map.native),
            lite_focus_groups: expand(map.lite),
        }
    }
}

impl GroupingMap {
    pub fn new(state_id: impl Into<String>) -> Self {
        Self {
            state_id: state_id.into(),
            native: BTreeMap::new(),
            lite: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, use_lite_mode: bool, name: impl Into<String>, path: impl Into<PathBuf>) {
        self.groups_mut(use_lite_mode).insert(name.into(), path.into());
    }

    pub fn groups(&self, use_lite_mode: bool) -> &BTreeMap<String, PathBuf> {
        if use_lite_mode { &self.lite } else { &self.native }
    }

    fn groups_mut(&mut self, use_lite_mode: bool) -> &mut BTreeMap<String, PathBuf> {
        if use_lite_mode {
            &mut self.lite
        } else {
            &mut self.native
        }
    }

    pub fn get(&self, use_lite_mode: bool, name: &str) -> Option<&Path> {
        self.groups(use_lite_mode).get(name).map(PathBuf::as_path)
    }

    /// Copy of this map re-keyed to another state, e.g. when seeding a new
    /// state from the default map.
    #[must_use]
    pub fn for_state(&self, state_id: impl Into<String>) -> Self {
        Self {
            state_id: state_id.into(),
            ..self.clone()
        }
    }

    /// Join relative definitions onto `root`.
    #[must_use]
    pub fn resolved_against(mut self, root: &Path) -> Self {
        for groups in [&mut self.native, &mut self.lite] {
            for path in groups.values_mut() {
                if path.is_relative() {
                    *path = root.join(&*path);
                }
            }
        }
        self
    }

    /// Prune entries that are missing, not regular files, or of an
    /// unsupported format. Warns about each pruned entry, about a malformed
    /// `state_id`, and about any mode left without usable groups.
    pub fn validate(&mut self) -> Vec<PrunedGroup> {
        if ContentDigest::from_hex(&self.state_id).is_err() {
            warn!(
                state_id = %self.state_id,
                "grouping map stateId is not a lowercase hex digest of at least {DIGEST_MIN_LEN} digits"
            );
        }

        let mut pruned = Vec::new();
        for use_lite_mode in [false, true] {
            let mode = mode_name(use_lite_mode);
            self.groups_mut(use_lite_mode).retain(|name, path| {
                let Some(problem) = check_grouping_file(path) else {
                    return true;
                };
                warn!(
                    mode,
                    group = %name,
                    path = %path.display(),
                    %problem,
                    "missing or invalid grouping file; dropping entry"
                );
                pruned.push(PrunedGroup {
                    mode,
                    name: name.clone(),
                    path: path.clone(),
                    problem,
                });
                false
            });
            if self.groups(use_lite_mode).is_empty() {
                warn!(
                    mode,
                    state_id = %self.state_id,
                    "no usable grouping schemas for resolution mode"
                );
            }
        }
        pruned
    }

    /// Consuming form of [`GroupingMap::validate`].
    #[must_use]
    pub fn validated(mut self) -> Self {
        self.validate();
        self
    }
}

fn check_grouping_file(path: &Path) -> Option<GroupingFileProblem> {
    let Ok(metadata) = std::fs::metadata(path) else {
        return Some(GroupingFileProblem::Missing);
    };
    if !metadata.is_file() {
        return Some(GroupingFileProblem::NotAFile);
    }
    let supported = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_GROUPING_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        });
    if supported {
        None
    } else {
        Some(GroupingFileProblem::UnsupportedExtension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::write(path, b"grouping").unwrap();
    }

    #[test]
    fn prunes_missing_files_and_keeps_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("Column.xml"));
        touch(&dir.path().join("Bank.h5"));

        let mut map = GroupingMap::new("0123456789abcdef");
        map.insert(false, "Column", "Column.xml");
        map.insert(false, "Bank", "Bank.h5");
        map.insert(false, "All", "All.nxs");
        map.insert(true, "Column", "Column.xml");
        let mut map = map.resolved_against(dir.path());

        let pruned = map.validate();
        assert_eq!(pruned.len(), 1);
        assert_eq!(pruned[0].name, "All");
        assert_eq!(pruned[0].problem, GroupingFileProblem::Missing);
        assert_eq!(map.groups(false).len(), 2);
        assert_eq!(map.groups(true).len(), 1);
    }

    #[test]
    fn prunes_directories_and_unsupported_extensions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("Folder.xml")).unwrap();
        touch(&dir.path().join("Notes.txt"));
        touch(&dir.path().join("Upper.HDF5"));

        let mut map = GroupingMap::new("not-a-state-id");
        map.insert(true, "Folder", dir.path().join("Folder.xml"));
        map.insert(true, "Notes", dir.path().join("Notes.txt"));
        map.insert(true, "Upper", dir.path().join("Upper.HDF5"));

        let pruned = map.validate();
        let problems: Vec<_> = pruned.iter().map(|p| (p.name.as_str(), p.problem)).collect();
        assert_eq!(
            problems,
            vec![
                ("Folder", GroupingFileProblem::NotAFile),
                ("Notes", GroupingFileProblem::UnsupportedExtension),
            ]
        );
        assert!(map.get(true, "Upper").is_some());
    }

    #[test]
    fn persisted_form_lists_focus_groups() {
        let mut map = GroupingMap::new("0123456789abcdef");
        map.insert(false, "Column", "Column.xml");
        let value = serde_json::to_value(&map).unwrap();
        assert_eq!(value["stateId"], "0123456789abcdef");
        assert_eq!(value["nativeFocusGroups"][0]["name"], "Column");
        assert_eq!(value["liteFocusGroups"].as_array().unwrap().len(), 0);

        let back: GroupingMap = serde_json::from_value(value).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn duplicate_names_keep_the_first_definition() {
        let value = serde_json::json!({
            "stateId": "0123456789abcdef0123",
            "nativeFocusGroups": [
                {"name": "Column", "definition": "Column.xml"},
                {"name": "Column", "definition": "ColumnOld.xml"},
                {"name": "Bank", "definition": "Bank.h5"},
            ],
            "liteFocusGroups": [{"name": "Column", "definition": "ColumnLite.xml"}],
        });
        let map: GroupingMap = serde_json::from_value(value).unwrap();
        assert_eq!(map.groups(false).len(), 2);
        assert_eq!(map.get(false, "Column"), Some(Path::new("Column.xml")));
        assert_eq!(map.get(true, "Column"), Some(Path::new("ColumnLite.xml")));
    }

    #[test]
    fn state_id_format_follows_digest_rules() {
        assert!(ContentDigest::from_hex("0123456789abcdef0123").is_ok());
        assert!(ContentDigest::from_hex("0123456789abcdef").is_ok());
        assert!(ContentDigest::from_hex("0123456789ABCDEF").is_err());
        assert!(ContentDigest::from_hex("0123").is_err());
    }

    #[test]
    fn for_state_rekeys() {
        let mut map = GroupingMap::new("0000000000000000");
        map.insert(true, "All", "All.xml");
        let seeded = map.for_state("0123456789abcdef");
        assert_eq!(seeded.state_id, "0123456789abcdef");
        assert_eq!(seeded.groups(true), map.groups(true));
    }
}
