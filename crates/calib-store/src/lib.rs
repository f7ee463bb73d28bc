//! Filesystem database for versioned calibration artifacts.
//!
//! Each instrument state owns a directory named by its digest. Inside it,
//! every `(resolution mode, artifact kind)` pair keeps an index file plus
//! one zero-padded directory per version. See [`layout`] for the tree and
//! [`DataStore`] for the producer and consumer operations.

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod grouping;
pub mod io;
pub mod layout;
pub mod lock;
pub mod state_config;
pub mod store;

pub use config::{DATA_ROOT_ENV_VAR, StoreConfig};
pub use error::{Result, StoreError};
pub use grouping::{
    FocusGroup, GroupingFileProblem, GroupingMap, PrunedGroup, SUPPORTED_GROUPING_EXTENSIONS,
};
pub use layout::Layout;
pub use lock::IndexLock;
pub use state_config::StateConfig;
pub use store::{DataStore, ExportRequest, RecordRequest, Resolved};
