use std::fs;
use std::path::{Path, PathBuf};

use tempfile::{Builder, NamedTempFile, TempDir};

use crate::error::FetchError;

/// Scratch directory owned by one run. Everything inside it is removed when
/// the workspace is dropped, on the success path and on every error path.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    next_id: usize,
}

impl Workspace {
    pub fn new() -> Result<Self, FetchError> {
        let dir = Builder::new()
            .prefix("tx2gene-fetch")
            .tempdir()
            .map_err(|err| FetchError::Filesystem(err.to_string()))?;
        Ok(Self { dir, next_id: 0 })
    }

    pub fn new_in(parent: &Path) -> Result<Self, FetchError> {
        let dir = Builder::new()
            .prefix("tx2gene-fetch")
            .tempdir_in(parent)
            .map_err(|err| FetchError::Filesystem(err.to_string()))?;
        Ok(Self { dir, next_id: 0 })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Creates an empty file to spool a stream into.
    pub fn spool_file(&self, prefix: &str) -> Result<NamedTempFile, FetchError> {
        Builder::new()
            .prefix(prefix)
            .tempfile_in(self.dir.path())
            .map_err(|err| FetchError::Filesystem(err.to_string()))
    }

    /// Creates a fresh subdirectory, distinct for every call.
    pub fn member_dir(&mut self, prefix: &str) -> Result<PathBuf, FetchError> {
        self.next_id += 1;
        let dir = self.dir.path().join(format!("{prefix}-{}", self.next_id));
        fs::create_dir(&dir).map_err(|err| FetchError::Filesystem(err.to_string()))?;
        Ok(dir)
    }

    pub fn close(self) -> Result<(), FetchError> {
        self.dir
            .close()
            .map_err(|err| FetchError::Filesystem(err.to_string()))
    }
}
