//! In-memory index for one `(state, resolution mode)` pair.
//!
//! The index maps concrete versions to entries and answers the central
//! question of the subsystem: given a requested version and a run number,
//! which concrete version applies?

use std::collections::BTreeMap;

use tracing::debug;

use crate::entry::IndexEntry;
use crate::error::{ModelError, Result};
use crate::kind::mode_name;
use crate::version::{Version, VersionConfig};

#[derive(Debug, Clone)]
pub struct Index {
    config: VersionConfig,
    use_lite_mode: bool,
    entries: BTreeMap<u32, IndexEntry>,
}

impl Index {
    pub fn new(config: VersionConfig, use_lite_mode: bool) -> Self {
        Self {
            config,
            use_lite_mode,
            entries: BTreeMap::new(),
        }
    }

    /// Build an index from persisted entries.
    ///
    /// Every entry must carry a concrete version at or above the floor,
    /// belong to this index's resolution mode, and be unique.
    pub fn from_entries(
        config: VersionConfig,
        use_lite_mode: bool,
        entries: impl IntoIterator<Item = IndexEntry>,
    ) -> Result<Self> {
        let mut index = Self::new(config, use_lite_mode);
        for entry in entries {
            let version = entry.version.require_concrete("index entry", "version")?;
            index.check_entry(&entry, version)?;
            index.entries.insert(version, entry);
        }
        Ok(index)
    }

    pub fn config(&self) -> &VersionConfig {
        &self.config
    }

    pub fn use_lite_mode(&self) -> bool {
        self.use_lite_mode
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending version order.
    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }

    pub fn versions(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.keys().copied()
    }

    pub fn get(&self, version: u32) -> Option<&IndexEntry> {
        self.entries.get(&version)
    }

    pub fn into_entries(self) -> Vec<IndexEntry> {
        self.entries.into_values().collect()
    }

    /// One past the highest version, or the floor for an empty index.
    pub fn next_version(&self) -> Result<u32> {
        match self.entries.keys().next_back() {
            None => Ok(self.config.start),
            Some(&max) => max.checked_add(1).ok_or(ModelError::VersionExhausted {
                field: "version",
                max,
            }),
        }
    }

    /// Highest-versioned entry whose conditionals all hold for `run_number`.
    pub fn latest_applicable(&self, run_number: u64) -> Option<&IndexEntry> {
        self.entries
            .values()
            .rev()
            .find(|entry| entry.applies_to_run(run_number))
    }

    /// Resolve a requested version to a concrete one for `run_number`.
    ///
    /// - `Next` succeeds with [`Index::next_version`].
    /// - `Concrete(n)` below the floor is out of range; otherwise it
    ///   succeeds iff version `n` exists, whatever its applicability.
    /// - `Latest` and `Default` pick the highest version whose conditionals
    ///   are all satisfied by `run_number`.
    pub fn resolve(&self, version: Version, run_number: u64) -> Result<u32> {
        self.config.check("version", version)?;
        let resolved = match version {
            Version::Next => Some(self.next_version()?),
            Version::Concrete(n) => self.entries.contains_key(&n).then_some(n),
            Version::Latest | Version::Default => self
                .latest_applicable(run_number)
                .and_then(|entry| entry.version.as_concrete()),
        };
        match resolved {
            Some(concrete) => {
                debug!(
                    requested = %version,
                    run_number,
                    resolved = concrete,
                    mode = mode_name(self.use_lite_mode),
                    "resolved version"
                );
                Ok(concrete)
            }
            None => Err(ModelError::NoApplicableVersion {
                requested: version,
                run_number,
            }),
        }
    }

    /// Add a new entry, concretizing `Next` and returning the stored entry.
    ///
    /// A concrete version is accepted only if it is above the floor and not
    /// already taken; `Latest`/`Default` cannot name a new version.
    pub fn append(&mut self, mut entry: IndexEntry) -> Result<&IndexEntry> {
        let version = self.assign_version(&entry)?;
        entry.version = Version::Concrete(version);
        Ok(self.entries.entry(version).or_insert(entry))
    }

    /// The concrete version [`Index::append`] would store `entry` under,
    /// without modifying the index.
    pub fn assign_version(&self, entry: &IndexEntry) -> Result<u32> {
        let version = match entry.version {
            Version::Next => self.next_version()?,
            Version::Concrete(n) => n,
            symbolic => {
                return Err(ModelError::UnresolvedSymbolicVersion {
                    object: "index entry",
                    field: "version",
                    version: symbolic,
                });
            }
        };
        self.check_entry(entry, version)?;
        Ok(version)
    }

    fn check_entry(&self, entry: &IndexEntry, version: u32) -> Result<()> {
        self.config.check("version", Version::Concrete(version))?;
        if entry.use_lite_mode != self.use_lite_mode {
            return Err(ModelError::ModeMismatch {
                field: "useLiteMode",
                expected: mode_name(self.use_lite_mode),
                found: mode_name(entry.use_lite_mode),
            });
        }
        if self.entries.contains_key(&version) {
            return Err(ModelError::DuplicateVersion { version });
        }
        Ok(())
    }
}
