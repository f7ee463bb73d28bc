//! Store error types.
//!
//! Every failure carries the path of the artifact involved so that a human
//! can locate and repair it; [`StoreError::suggestion`] adds a remediation
//! hint where one exists.

use std::path::PathBuf;

use calib_model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to {operation} {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse JSON {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse TOML config {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {message}")]
    InvalidConfig { message: String },

    #[error("invalid artifact {path}: {source}")]
    InvalidArtifact {
        path: PathBuf,
        #[source]
        source: ModelError,
    },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("failed to replace {target_path} with {temp_path}: {source}")]
    AtomicWriteFailed {
        temp_path: PathBuf,
        target_path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to lock index {path}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("state {state_id} not found under {path}")]
    StateNotFound { state_id: String, path: PathBuf },

    #[error("version directory already exists: {path}")]
    VersionExists { path: PathBuf },

    #[error("record file missing for indexed version: {path}")]
    RecordMissing { path: PathBuf },

    #[error("record digest mismatch for {path} (index has {expected}, file hashes to {actual})")]
    DigestMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
}

impl StoreError {
    pub(crate) fn io(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(path: impl Into<PathBuf>, source: ModelError) -> Self {
        Self::InvalidArtifact {
            path: path.into(),
            source,
        }
    }

    /// The model-level cause, if any.
    pub fn model_error(&self) -> Option<&ModelError> {
        match self {
            Self::Model(source) | Self::InvalidArtifact { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Short description for display outside a log line.
    pub fn user_message(&self) -> String {
        match self {
            Self::Io {
                operation, path, ..
            } => format!("Could not {} {}", operation, path.display()),
            Self::Json { path, .. } | Self::InvalidArtifact { path, .. } => {
                format!("The artifact at {} is not valid", path.display())
            }
            Self::StateNotFound { state_id, .. } => {
                format!("No data has been stored for state {state_id}")
            }
            Self::RecordMissing { path } => {
                format!("The index references a record that is missing: {}", path.display())
            }
            Self::DigestMismatch { path, .. } => {
                format!("The record at {} changed after it was indexed", path.display())
            }
            other => other.to_string(),
        }
    }

    /// How a human might fix the on-disk state behind this error.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::Json { .. } | Self::InvalidArtifact { .. } => {
                Some("Edit the file so the named field matches the expected format.".into())
            }
            Self::StateNotFound { .. } => {
                Some("Initialize the state before writing artifacts for it.".into())
            }
            Self::VersionExists { .. } => Some(
                "A previous write was interrupted; remove the orphaned version directory if the \
                 index does not reference it."
                    .into(),
            ),
            Self::RecordMissing { .. } | Self::DigestMismatch { .. } => Some(
                "The record was moved or modified after it was indexed; restore it from backup."
                    .into(),
            ),
            Self::Lock { .. } => Some("Check that no other writer holds the index lock.".into()),
            Self::Model(ModelError::NoApplicableVersion { .. }) => Some(
                "No indexed version applies to this run; request a concrete version or export a \
                 new one."
                    .into(),
            ),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
