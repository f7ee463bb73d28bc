//! Filesystem-backed data store.
//!
//! [`DataStore::write_record`] is the producer side: it assigns the next
//! version under an exclusive lock and persists the record before the index
//! that references it. [`DataStore::read_record`] is the consumer side: it
//! resolves a requested version for a run and returns the record only after
//! its digest, state and entry all check out.

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, info_span, warn};

use calib_model::{
    AppliesTo, ArtifactKind, ContentDigest, Index, IndexEntry, ModelError, Record, RunNumber,
    StateFingerprint, Version, mode_name,
};

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::grouping::GroupingMap;
use crate::io::{from_value, read_json, read_json_value, write_json_atomic};
use crate::layout::Layout;
use crate::lock::IndexLock;
use crate::state_config::StateConfig;

/// Everything a producing algorithm hands over for one new artifact.
#[derive(Debug, Clone)]
pub struct ExportRequest<P> {
    pub run_number: RunNumber,
    pub use_lite_mode: bool,
    pub calculation_parameters: P,
    pub applies_to: Option<AppliesTo>,
    pub comments: String,
    pub author: String,
    /// `Next` unless a caller pins a specific unused version.
    pub version: Version,
}

impl<P> ExportRequest<P> {
    pub fn new(run_number: RunNumber, use_lite_mode: bool, calculation_parameters: P) -> Self {
        Self {
            run_number,
            use_lite_mode,
            calculation_parameters,
            applies_to: None,
            comments: String::new(),
            author: String::new(),
            version: Version::Next,
        }
    }

    #[must_use]
    pub fn applies_to(mut self, applies_to: AppliesTo) -> Self {
        self.applies_to = Some(applies_to);
        self
    }

    #[must_use]
    pub fn comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = comments.into();
        self
    }

    #[must_use]
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }
}

/// A consumer's lookup key.
#[derive(Debug, Clone, Copy)]
pub struct RecordRequest {
    pub fingerprint: StateFingerprint,
    pub kind: ArtifactKind,
    pub run_number: RunNumber,
    pub use_lite_mode: bool,
    pub version: Version,
}

/// A record together with the index entry that selected it.
#[derive(Debug, Clone)]
pub struct Resolved<P> {
    pub entry: IndexEntry,
    pub record: Record<P>,
}

#[derive(Debug, Clone)]
pub struct DataStore {
    config: StoreConfig,
    layout: Layout,
}

impl DataStore {
    pub fn new(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let layout = Layout::new(config.data_root.clone(), config.version);
        Ok(Self { config, layout })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// State identifier at the configured digest length.
    pub fn state_id(&self, fingerprint: &StateFingerprint) -> Result<ContentDigest> {
        Ok(fingerprint.state_id_with_len(self.config.digest_length)?)
    }

    /// Create the state directory and its config, or load the existing one.
    pub fn init_state(&self, fingerprint: &StateFingerprint) -> Result<StateConfig> {
        let state_id = self.state_id(fingerprint)?;
        let path = self.layout.state_config_path(&state_id);
        if path.is_file() {
            debug!(state_id = %state_id, "state already initialized");
            return self.state_config(&state_id);
        }

        let grouping_map = match self.default_grouping_map()? {
            Some(map) => map.for_state(state_id.as_str()),
            None => GroupingMap::new(state_id.as_str()),
        };
        let config = StateConfig::new(*fingerprint, state_id.clone(), grouping_map);
        config
            .validate()
            .map_err(|e| StoreError::invalid(&path, e))?;
        write_json_atomic(&path, &config)?;
        info!(state_id = %state_id, path = %path.display(), "initialized state");
        Ok(config)
    }

    /// The configured default grouping map, if its file exists.
    pub fn default_grouping_map(&self) -> Result<Option<GroupingMap>> {
        let path = self.config.default_grouping_map_path();
        if !path.is_file() {
            warn!(
                path = %path.display(),
                "default grouping map not found; new states start without grouping schemas"
            );
            return Ok(None);
        }
        read_json(&path).map(Some)
    }

    pub fn state_config(&self, state_id: &ContentDigest) -> Result<StateConfig> {
        let path = self.layout.state_config_path(state_id);
        if !path.is_file() {
            return Err(StoreError::StateNotFound {
                state_id: state_id.to_string(),
                path: self.layout.state_dir(state_id),
            });
        }
        let config: StateConfig = read_json(&path)?;
        if &config.state_id != state_id {
            return Err(StoreError::invalid(
                &path,
                ModelError::StateIdentityMismatch {
                    field: "stateId",
                    expected: state_id.to_string(),
                    found: config.state_id.to_string(),
                },
            ));
        }
        config
            .validate()
            .map_err(|e| StoreError::invalid(&path, e))?;
        Ok(config)
    }

    /// The state's grouping map with paths resolved and unusable entries
    /// pruned.
    pub fn grouping_map(&self, state_id: &ContentDigest) -> Result<GroupingMap> {
        let config = self.state_config(state_id)?;
        Ok(config
            .grouping_map
            .resolved_against(&self.config.grouping_root())
            .validated())
    }

    /// State identifiers present under the data root, sorted.
    pub fn list_states(&self) -> Result<Vec<ContentDigest>> {
        let root = self.layout.root();
        if !root.is_dir() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(root).map_err(|e| StoreError::io("list", root, e))?;
        let mut states = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io("list", root, e))?;
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name();
            if let Some(state_id) = name.to_str().and_then(|n| ContentDigest::from_hex(n).ok()) {
                states.push(state_id);
            }
        }
        states.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(states)
    }

    /// Load the index for one state, mode and kind. A state that has never
    /// been written for this kind yields an empty index.
    pub fn read_index(
        &self,
        state_id: &ContentDigest,
        kind: ArtifactKind,
        use_lite_mode: bool,
    ) -> Result<Index> {
        let state_dir = self.layout.state_dir(state_id);
        if !state_dir.is_dir() {
            return Err(StoreError::StateNotFound {
                state_id: state_id.to_string(),
                path: state_dir,
            });
        }
        let path = self.layout.index_path(state_id, use_lite_mode, kind);
        if !path.is_file() {
            return Ok(Index::new(self.config.version, use_lite_mode));
        }
        let entries: Vec<IndexEntry> = read_json(&path)?;
        Index::from_entries(self.config.version, use_lite_mode, entries)
            .map_err(|e| StoreError::invalid(&path, e))
    }

    /// Persist a new record and append its entry to the index.
    pub fn write_record<P: Serialize>(
        &self,
        state_id: &ContentDigest,
        kind: ArtifactKind,
        request: ExportRequest<P>,
    ) -> Result<IndexEntry> {
        let mode = mode_name(request.use_lite_mode);
        let _span = info_span!("write_record", state_id = %state_id, %kind, mode).entered();

        self.state_config(state_id)?;
        let _lock = IndexLock::acquire(&self.layout.lock_path(state_id, request.use_lite_mode, kind))?;
        let mut index = self.read_index(state_id, kind, request.use_lite_mode)?;

        let mut entry = IndexEntry::new(
            request.run_number,
            request.use_lite_mode,
            request.applies_to,
            request.comments,
            request.author,
        );
        entry.version = request.version;
        let version = index.assign_version(&entry)?;
        entry.version = Version::Concrete(version);

        let mut record = Record::new(
            request.run_number,
            request.use_lite_mode,
            state_id.clone(),
            request.calculation_parameters,
        );
        record.version = Version::Concrete(version);
        record.validate_against(&entry)?;
        entry.record_digest = Some(record.digest()?);

        let version_dir = self
            .layout
            .version_dir(state_id, request.use_lite_mode, kind, version);
        if version_dir.exists() {
            return Err(StoreError::VersionExists { path: version_dir });
        }
        let record_path = self
            .layout
            .record_path(state_id, request.use_lite_mode, kind, version);
        persist_record(&record_path, &record)?;

        let stored = index.append(entry)?.clone();
        let index_path = self.layout.index_path(state_id, request.use_lite_mode, kind);
        write_json_atomic(&index_path, &index.entries().collect::<Vec<_>>())?;

        info!(
            version,
            run_number = %stored.run_number,
            path = %record_path.display(),
            "wrote record"
        );
        Ok(stored)
    }

    /// Resolve and load the record a consumer asked for.
    pub fn read_record<P: DeserializeOwned>(&self, request: &RecordRequest) -> Result<Resolved<P>> {
        let state_id = self.state_id(&request.fingerprint)?;
        self.read_record_for_state(
            &state_id,
            request.kind,
            request.run_number,
            request.use_lite_mode,
            request.version,
        )
    }

    /// [`DataStore::read_record`] for an already computed state identifier.
    pub fn read_record_for_state<P: DeserializeOwned>(
        &self,
        state_id: &ContentDigest,
        kind: ArtifactKind,
        run_number: RunNumber,
        use_lite_mode: bool,
        requested: Version,
    ) -> Result<Resolved<P>> {
        let _span = info_span!(
            "read_record",
            state_id = %state_id,
            %kind,
            mode = mode_name(use_lite_mode)
        )
        .entered();

        let index = self.read_index(state_id, kind, use_lite_mode)?;
        let version = index.resolve(requested, run_number.value())?;
        let Some(entry) = index.get(version) else {
            return Err(ModelError::NoApplicableVersion {
                requested,
                run_number: run_number.value(),
            }
            .into());
        };

        let path = self.layout.record_path(state_id, use_lite_mode, kind, version);
        if !path.is_file() {
            return Err(StoreError::RecordMissing { path });
        }
        let value = read_json_value(&path)?;

        match &entry.record_digest {
            Some(expected) => {
                let actual = ContentDigest::from_object_with_len(&value, expected.as_str().len())
                    .map_err(|e| StoreError::invalid(&path, e))?;
                if &actual != expected {
                    return Err(StoreError::DigestMismatch {
                        path,
                        expected: expected.to_string(),
                        actual: actual.to_string(),
                    });
                }
            }
            None => debug!(version, "index entry carries no record digest; skipping check"),
        }

        let record: Record<P> = from_value(&path, value)?;
        record
            .validate_state(state_id)
            .and_then(|()| record.validate_against(entry))
            .map_err(|e| StoreError::invalid(&path, e))?;

        debug!(version, path = %path.display(), "loaded record");
        Ok(Resolved {
            entry: entry.clone(),
            record,
        })
    }
}

fn persist_record<P: Serialize>(path: &Path, record: &Record<P>) -> Result<()> {
    record
        .persistable_version()
        .map_err(|e| StoreError::invalid(path, e))?;
    write_json_atomic(path, record)
}
