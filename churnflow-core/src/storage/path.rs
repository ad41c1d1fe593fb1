//! Logical artifact paths.

use crate::error::{StoreError, StoreResult};
use std::fmt;
use std::path::{Path, PathBuf};

/// A relative, `/`-separated artifact location.
///
/// One logical path resolves to both a file under the store's local root
/// and an object key in the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogicalPath(String);

impl LogicalPath {
    /// Normalize and validate a logical path.
    ///
    /// Backslashes become `/`, `.` and empty segments are dropped. Absolute
    /// paths and `..` segments are rejected so a logical path can never
    /// escape the local root.
    pub fn new(path: impl AsRef<str>) -> StoreResult<Self> {
        let raw = path.as_ref();
        let invalid = |reason: &str| StoreError::InvalidPath {
            path: raw.to_string(),
            reason: reason.to_string(),
        };

        let unified = raw.trim().replace('\\', "/");
        if unified.starts_with('/') || has_drive_prefix(&unified) {
            return Err(invalid("must be relative"));
        }

        let mut segments = Vec::new();
        for segment in unified.split('/') {
            match segment {
                "" | "." => {}
                ".." => return Err(invalid("must not contain '..'")),
                s => segments.push(s),
            }
        }
        if segments.is_empty() {
            return Err(invalid("must name a file"));
        }

        Ok(Self(segments.join("/")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name (last segment).
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Location on the local tier.
    pub fn local_path(&self, root: &Path) -> PathBuf {
        self.0.split('/').fold(root.to_path_buf(), |acc, s| acc.join(s))
    }

    /// Object key on the remote tier.
    pub fn remote_key(&self, prefix: Option<&str>) -> String {
        match prefix.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
            Some(prefix) => format!("{prefix}/{}", self.0),
            None => self.0.clone(),
        }
    }
}

impl fmt::Display for LogicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for LogicalPath {
    type Error = StoreError;

    fn try_from(value: &str) -> StoreResult<Self> {
        Self::new(value)
    }
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
