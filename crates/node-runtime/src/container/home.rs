//! # Node Home
//!
//! Everything a node keeps on disk lives under one directory:
//!
//! ```text
//! <home>/config.yaml   0600
//! <home>/keys          0600, the identity seed
//! <home>/datastore/    local order state (RocksDB)
//! <home>/ipfs-data/    embedded content store
//! <home>/LOCK          held while a daemon runs
//! ```

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

/// Overrides the home directory.
pub const ENV_HOME: &str = "DTA_HOME";

const DEFAULT_DIR_NAME: &str = ".dta";

#[derive(Debug, Error)]
pub enum HomeError {
    #[error("cannot locate a home directory; set DTA_HOME")]
    Unresolved,

    #[error("node home {} is in use by pid {pid:?}", .path.display())]
    AlreadyLocked { path: PathBuf, pid: Option<u32> },

    #[error("node home I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct NodeHome {
    root: PathBuf,
}

impl NodeHome {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `$DTA_HOME`, else `$HOME/.dta`.
    pub fn from_env() -> Result<Self, HomeError> {
        if let Some(root) = std::env::var_os(ENV_HOME) {
            return Ok(Self::new(root));
        }
        std::env::var_os("HOME")
            .map(|home| Self::new(PathBuf::from(home).join(DEFAULT_DIR_NAME)))
            .ok_or(HomeError::Unresolved)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn keys_path(&self) -> PathBuf {
        self.root.join("keys")
    }

    pub fn datastore_path(&self) -> PathBuf {
        self.root.join("datastore")
    }

    pub fn content_path(&self) -> PathBuf {
        self.root.join("ipfs-data")
    }

    /// Take the exclusive lock on this home. Released when the guard drops.
    pub fn lock(&self) -> Result<HomeLock, HomeError> {
        let path = self.root.join(HomeLock::FILE_NAME);
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)?;

        if file.try_lock_exclusive().is_err() {
            let pid = std::fs::read_to_string(&path)
                .ok()
                .and_then(|s| s.trim().parse().ok());
            return Err(HomeError::AlreadyLocked { path, pid });
        }

        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        file.sync_all()?;
        Ok(HomeLock { file, path })
    }
}

/// Exclusive hold on a [`NodeHome`].
pub struct HomeLock {
    file: File,
    path: PathBuf,
}

impl HomeLock {
    const FILE_NAME: &'static str = "LOCK";

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for HomeLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_lock_refused_until_first_drops() {
        let dir = tempfile::tempdir().unwrap();
        let home = NodeHome::new(dir.path());

        let first = home.lock().unwrap();
        match home.lock() {
            Err(HomeError::AlreadyLocked { pid, .. }) => {
                assert_eq!(pid, Some(std::process::id()));
            }
            other => panic!("expected AlreadyLocked, got {:?}", other.err()),
        }

        drop(first);
        assert!(home.lock().is_ok());
    }

    #[test]
    fn test_layout() {
        let home = NodeHome::new("/srv/dta");
        assert_eq!(home.keys_path(), PathBuf::from("/srv/dta/keys"));
        assert_eq!(home.datastore_path(), PathBuf::from("/srv/dta/datastore"));
        assert_eq!(home.content_path(), PathBuf::from("/srv/dta/ipfs-data"));
    }
}
