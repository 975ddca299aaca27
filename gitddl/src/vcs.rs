//! Version control access.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tracing::{debug, trace};

use crate::error::{GitDdlError, GitDdlResult};
use crate::version::SchemaVersion;

/// Read-only view of the history that tracks the schema file.
pub trait VersionControl {
    /// The most recent commit that modified `path`, if any.
    fn latest_commit_touching(&self, path: &Path) -> GitDdlResult<Option<SchemaVersion>>;

    /// The exact bytes of `path` as committed at `version`.
    ///
    /// Fails with [`GitDdlError::NotFound`] if the path does not exist there.
    fn read_blob(&self, version: &SchemaVersion, path: &Path) -> GitDdlResult<Vec<u8>>;
}

impl<V: VersionControl + ?Sized> VersionControl for Box<V> {
    fn latest_commit_touching(&self, path: &Path) -> GitDdlResult<Option<SchemaVersion>> {
        (**self).latest_commit_touching(path)
    }

    fn read_blob(&self, version: &SchemaVersion, path: &Path) -> GitDdlResult<Vec<u8>> {
        (**self).read_blob(version, path)
    }
}

/// A git work tree, driven through the `git` executable.
#[derive(Debug, Clone)]
pub struct GitRepository {
    work_tree: PathBuf,
    git: PathBuf,
}

impl GitRepository {
    /// Open the work tree at `work_tree`.
    ///
    /// Fails if the directory is not inside a git work tree.
    pub fn open(work_tree: impl Into<PathBuf>) -> GitDdlResult<Self> {
        let repo = Self {
            work_tree: work_tree.into(),
            git: PathBuf::from("git"),
        };
        repo.verify()?;
        Ok(repo)
    }

    /// Use a specific git executable.
    pub fn with_git_binary(mut self, git: impl Into<PathBuf>) -> Self {
        self.git = git.into();
        self
    }

    /// The work tree path.
    pub fn work_tree(&self) -> &Path {
        &self.work_tree
    }

    fn verify(&self) -> GitDdlResult<()> {
        let output = self.run(["rev-parse", "--is-inside-work-tree"])?;
        if output.status.success() && String::from_utf8_lossy(&output.stdout).trim() == "true" {
            Ok(())
        } else {
            Err(GitDdlError::vcs(format!(
                "'{}' is not a git work tree: {}",
                self.work_tree.display(),
                stderr(&output)
            )))
        }
    }

    fn run<I, S>(&self, args: I) -> GitDdlResult<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.git);
        cmd.arg("-C").arg(&self.work_tree).args(args);
        trace!(command = ?cmd, "Running git");

        cmd.output().map_err(|e| {
            GitDdlError::vcs(format!("failed to run '{}': {}", self.git.display(), e))
        })
    }
}

impl VersionControl for GitRepository {
    fn latest_commit_touching(&self, path: &Path) -> GitDdlResult<Option<SchemaVersion>> {
        let output = self.run([
            OsStr::new("log"),
            OsStr::new("-n"),
            OsStr::new("1"),
            OsStr::new("--format=%H"),
            OsStr::new("--"),
            path.as_os_str(),
        ])?;

        if !output.status.success() {
            let message = stderr(&output);
            // A repository without commits has no history for any path.
            if message.contains("does not have any commits") {
                return Ok(None);
            }
            return Err(GitDdlError::vcs(message));
        }

        let hash = String::from_utf8_lossy(&output.stdout);
        let hash = hash.trim();
        if hash.is_empty() {
            return Ok(None);
        }

        debug!(path = %path.display(), commit = %hash, "Resolved latest commit");
        SchemaVersion::parse(hash).map(Some)
    }

    fn read_blob(&self, version: &SchemaVersion, path: &Path) -> GitDdlResult<Vec<u8>> {
        // `./` makes the path relative to the work tree rather than the repo root.
        let spec = format!("{}:./{}", version, path_spec(path));
        let resolved = self.run(["rev-parse", "--verify", "--quiet", spec.as_str()])?;
        if !resolved.status.success() {
            return Err(GitDdlError::NotFound {
                version: version.clone(),
                path: path.to_path_buf(),
            });
        }

        let object = String::from_utf8_lossy(&resolved.stdout).trim().to_string();
        let blob = self.run(["cat-file", "blob", object.as_str()])?;
        if !blob.status.success() {
            return Err(GitDdlError::vcs(stderr(&blob)));
        }

        debug!(
            path = %path.display(),
            version = %version.short(),
            bytes = blob.stdout.len(),
            "Read schema snapshot"
        );
        Ok(blob.stdout)
    }
}

/// Render a path with forward slashes, as git revision syntax requires.
fn path_spec(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}
