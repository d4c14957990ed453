//! Principals a user may authenticate as.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// An authorized-principals file could not be read.
///
/// Principals gathered before the failing file are kept, so callers can
/// warn and carry on with a partial set.
#[derive(Debug, thiserror::Error)]
#[error("cannot read principals file {}: {source}", path.display())]
pub struct PrincipalsFileError {
    path: PathBuf,
    #[source]
    source: std::io::Error,
    collected: BTreeSet<String>,
}

impl PrincipalsFileError {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The principals gathered before the failure.
    #[must_use]
    pub fn collected(&self) -> &BTreeSet<String> {
        &self.collected
    }

    #[must_use]
    pub fn into_collected(self) -> BTreeSet<String> {
        self.collected
    }
}

/// The username, each `prefix + username`, and the last field of every
/// non-blank, non-comment line of each principals file.
///
/// # Errors
///
/// Stops at the first unreadable file.
pub fn authorized_principals<P: AsRef<Path>>(
    username: &str,
    prefixes: &[String],
    files: &[P],
) -> Result<BTreeSet<String>, PrincipalsFileError> {
    let mut principals = BTreeSet::new();
    principals.insert(username.to_string());
    for prefix in prefixes {
        principals.insert(format!("{prefix}{username}"));
    }

    for file in files {
        let path = file.as_ref();
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(source) => {
                return Err(PrincipalsFileError {
                    path: path.to_path_buf(),
                    source,
                    collected: principals,
                })
            }
        };
        for line in String::from_utf8_lossy(&data).lines() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            match (fields.first(), fields.last()) {
                (Some(first), _) if first.starts_with('#') => {}
                (_, Some(last)) => {
                    principals.insert((*last).to_string());
                }
                _ => {}
            }
        }
    }

    tracing::debug!(?principals, "authorized principals");
    Ok(principals)
}
