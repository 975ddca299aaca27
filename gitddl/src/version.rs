//! Schema version identity tokens.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GitDdlError, GitDdlResult};

/// Length of a SHA-1 object id.
pub const SHA1_LEN: usize = 40;

/// Length of a SHA-256 object id.
pub const SHA256_LEN: usize = 64;

/// A content hash identifying one historical state of the schema file.
///
/// Versions can only be compared for equality. There is no ordering between
/// two commits, so `SchemaVersion` does not implement `Ord`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SchemaVersion(String);

impl SchemaVersion {
    /// Parse a version from a full-length hex object id.
    ///
    /// Upper-case input is normalized to lower case so that tokens read back
    /// from the database compare equal to the ones produced by git.
    pub fn parse(s: impl AsRef<str>) -> GitDdlResult<Self> {
        let s = s.as_ref().trim();
        let valid_len = s.len() == SHA1_LEN || s.len() == SHA256_LEN;
        if !valid_len || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(GitDdlError::InvalidVersion(s.to_string()));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    /// Get the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for display (first 7 characters).
    pub fn short(&self) -> &str {
        &self.0[..7]
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SchemaVersion {
    type Err = GitDdlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for SchemaVersion {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SchemaVersion {
    type Error = GitDdlError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<SchemaVersion> for String {
    fn from(version: SchemaVersion) -> Self {
        version.0
    }
}
