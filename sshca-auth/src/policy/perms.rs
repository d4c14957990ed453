//! Ownership and mode checks for trust files.
//!
//! A trust file that other users can rewrite is no trust anchor at all, so
//! files failing these checks are dropped from the policy before anything
//! reads them.

use std::io;
use std::path::{Path, PathBuf};

/// Group- and world-writable bits.
pub const DENY_GROUP_OTHER_WRITE: u32 = 0o022;

/// Requirements a trust file must meet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileRule {
    /// Required owner uid, or `None` for any owner.
    pub owner: Option<u32>,
    /// Mode bits that must all be clear.
    pub deny: u32,
}

impl FileRule {
    #[must_use]
    pub const fn any_owner() -> Self {
        Self {
            owner: None,
            deny: DENY_GROUP_OTHER_WRITE,
        }
    }

    #[must_use]
    pub const fn owned_by(uid: u32) -> Self {
        Self {
            owner: Some(uid),
            deny: DENY_GROUP_OTHER_WRITE,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PermissionError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("unsuitable owner {actual}, expected {expected}")]
    Owner { actual: u32, expected: u32 },

    #[error("mode {mode:04o} has denied bits {deny:04o}")]
    Mode { mode: u32, deny: u32 },
}

/// Check one file against `rule`. Symlinks are followed.
#[cfg(unix)]
pub fn check_file(path: &Path, rule: FileRule) -> Result<(), PermissionError> {
    use std::os::unix::fs::MetadataExt;

    let meta = std::fs::metadata(path)?;
    if let Some(expected) = rule.owner {
        let actual = meta.uid();
        if actual != expected {
            return Err(PermissionError::Owner { actual, expected });
        }
    }
    let mode = meta.mode() & 0o7777;
    if mode & rule.deny != 0 {
        return Err(PermissionError::Mode {
            mode,
            deny: rule.deny,
        });
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn check_file(path: &Path, _rule: FileRule) -> Result<(), PermissionError> {
    // No uid or mode bits to inspect; existence is all we can require.
    std::fs::metadata(path)?;
    Ok(())
}

/// Keep the files that pass `rule`, in order.
pub(crate) fn retain_permitted(files: Vec<PathBuf>, rule: FileRule) -> Vec<PathBuf> {
    files
        .into_iter()
        .filter(|file| match check_file(file, rule) {
            Ok(()) => true,
            Err(PermissionError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %file.display(), "file does not exist, skipping");
                false
            }
            Err(e) => {
                tracing::warn!(path = %file.display(), error = %e, "file fails permission check");
                false
            }
        })
        .collect()
}
