use serde::{Deserialize, Serialize};

use crate::digest::ContentDigest;
use crate::entry::IndexEntry;
use crate::error::{ModelError, Result};
use crate::kind::mode_name;
use crate::run::RunNumber;
use crate::version::{Version, serialize_concrete};

/// Versioned payload governed by one index entry.
///
/// `P` is the domain payload supplied by the producing algorithm
/// (calibration constants, normalization parameters, reduction settings);
/// the index only cares about the envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionedObject<P> {
    pub run_number: RunNumber,
    pub use_lite_mode: bool,
    #[serde(serialize_with = "serialize_concrete")]
    pub version: Version,
    pub state_id: ContentDigest,
    pub calculation_parameters: P,
}

pub type Record<P> = VersionedObject<P>;

impl<P> VersionedObject<P> {
    pub fn new(
        run_number: RunNumber,
        use_lite_mode: bool,
        state_id: ContentDigest,
        calculation_parameters: P,
    ) -> Self {
        Self {
            run_number,
            use_lite_mode,
            version: Version::Next,
            state_id,
            calculation_parameters,
        }
    }

    /// The concrete version, or `UnresolvedSymbolicVersion`.
    pub fn persistable_version(&self) -> Result<u32> {
        self.version.require_concrete("record", "version")
    }

    /// Check the record against the entry that points at it.
    pub fn validate_against(&self, entry: &IndexEntry) -> Result<()> {
        let record_version = self.persistable_version()?;
        let entry_version = entry.version.require_concrete("index entry", "version")?;
        if record_version != entry_version {
            return Err(ModelError::RecordEntryMismatch {
                field: "version",
                record: record_version.to_string(),
                entry: entry_version.to_string(),
            });
        }
        if self.run_number != entry.run_number {
            return Err(ModelError::RecordEntryMismatch {
                field: "runNumber",
                record: self.run_number.to_string(),
                entry: entry.run_number.to_string(),
            });
        }
        if self.use_lite_mode != entry.use_lite_mode {
            return Err(ModelError::RecordEntryMismatch {
                field: "useLiteMode",
                record: mode_name(self.use_lite_mode).to_string(),
                entry: mode_name(entry.use_lite_mode).to_string(),
            });
        }
        Ok(())
    }

    /// Check the record belongs to the state it was loaded from.
    pub fn validate_state(&self, state_id: &ContentDigest) -> Result<()> {
        if &self.state_id != state_id {
            return Err(ModelError::StateIdentityMismatch {
                field: "stateId",
                expected: state_id.to_string(),
                found: self.state_id.to_string(),
            });
        }
        Ok(())
    }
}

impl<P: Serialize> VersionedObject<P> {
    /// Digest of the record as persisted; requires a concrete version.
    pub fn digest(&self) -> Result<ContentDigest> {
        self.persistable_version()?;
        ContentDigest::from_object(self)
    }
}
