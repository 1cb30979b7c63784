//! Directory-backed parameter store.
//!
//! Each key is one file under the store directory. Writes go through a
//! temporary file followed by an atomic rename, so readers never observe
//! a partially written value and a crash mid-write leaves the previous
//! value intact.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::ParamStore;

/// File-per-key parameter store.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: &Path) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Directory backing this store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, key: &str) -> PathBuf {
        debug_assert!(
            !key.contains(['/', '\\']),
            "store keys must not contain path separators"
        );
        self.dir.join(key)
    }
}

impl ParamStore for FileStore {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        fs::read(self.key_path(key)).ok()
    }

    fn put(&mut self, key: &str, value: &[u8]) -> io::Result<()> {
        let tmp = self.dir.join(format!(".{key}.tmp"));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, self.key_path(key))
    }
}
