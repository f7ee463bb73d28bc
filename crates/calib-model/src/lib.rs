//! Data model for a filesystem-backed, versioned index of calibration
//! artifacts.
//!
//! # Overview
//!
//! - [`StateFingerprint`] rounds instrument readings into a stable identity;
//!   its [`ContentDigest`] names the state on disk.
//! - [`IndexEntry`] points at one versioned artifact and carries the
//!   [`AppliesTo`] expression deciding which runs it serves.
//! - [`Index`] resolves a requested [`Version`] against a run number.
//! - [`VersionedObject`] (alias [`Record`]) is the payload envelope validated
//!   against its entry.
//!
//! Nothing here touches the filesystem; see the `calib-store` crate.

#![deny(unsafe_code)]

pub mod applies_to;
pub mod digest;
pub mod entry;
pub mod error;
pub mod index;
pub mod kind;
pub mod record;
pub mod run;
pub mod state;
pub mod timestamp;
pub mod version;

pub use applies_to::{AppliesTo, Comparison, Conditional, parse_applies_to};
pub use digest::{ContentDigest, DIGEST_MIN_LEN};
pub use entry::IndexEntry;
pub use error::{ModelError, Result};
pub use index::Index;
pub use kind::{ArtifactKind, mode_name};
pub use record::{Record, VersionedObject};
pub use run::RunNumber;
pub use state::{DetectorState, StateFingerprint};
pub use version::{VERSION_START, VERSION_WIDTH, Version, VersionConfig};
