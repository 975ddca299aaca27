//! Historical schema snapshots.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::GitDdlResult;
use crate::vcs::VersionControl;
use crate::version::SchemaVersion;

/// The schema file's exact bytes at one version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    version: SchemaVersion,
    path: PathBuf,
    bytes: Vec<u8>,
}

impl Snapshot {
    /// Fetch `path` at `version` from version control.
    pub fn retrieve(
        repo: &dyn VersionControl,
        version: &SchemaVersion,
        path: &Path,
    ) -> GitDdlResult<Self> {
        let bytes = repo.read_blob(version, path)?;
        Ok(Self {
            version: version.clone(),
            path: path.to_path_buf(),
            bytes,
        })
    }

    /// The version this snapshot was taken at.
    pub fn version(&self) -> &SchemaVersion {
        &self.version
    }

    /// The schema file path, relative to the work tree.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The raw content.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the snapshot, returning the raw content.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Write the content to a temporary file.
    ///
    /// The file is deleted when the returned handle is dropped.
    pub fn materialize(&self) -> GitDdlResult<NamedTempFile> {
        let mut file = tempfile::Builder::new()
            .prefix(&format!("gitddl-{}-", self.version.short()))
            .suffix(".sql")
            .tempfile()?;
        file.write_all(&self.bytes)?;
        file.flush()?;
        Ok(file)
    }
}
