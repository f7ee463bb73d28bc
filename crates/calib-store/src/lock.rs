use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs4::FileExt;

use crate::error::{Result, StoreError};

/// Advisory exclusive lock on one index directory.
///
/// Held for the read-max / write-max+1 sequence of a version export. Released
/// when dropped.
#[derive(Debug)]
pub struct IndexLock {
    _file: File,
    path: PathBuf,
}

impl IndexLock {
    /// Block until the lock at `path` is acquired.
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io("create directory", parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(|e| StoreError::io("open", path, e))?;
        file.lock_exclusive().map_err(|e| StoreError::Lock {
            path: path.to_path_buf(),
            source: e,
        })?;
        tracing::trace!(path = %path.display(), "acquired index lock");
        Ok(Self {
            _file: file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_can_be_reacquired_after_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kind/.index.lock");
        {
            let lock = IndexLock::acquire(&path).unwrap();
            assert_eq!(lock.path(), path.as_path());
        }
        IndexLock::acquire(&path).unwrap();
        assert!(path.exists());
    }
}
