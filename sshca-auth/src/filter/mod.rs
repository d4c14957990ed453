//! Identity filters.
//!
//! A filter narrows the identity set before validation. Identities go in as
//! authorized-keys lines and whatever lines come back are re-parsed, so a
//! filter can be an external program as easily as an in-process one.

mod command;
mod sudo;

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::identity::{marshal_authorized_keys, parse_authorized_keys, Identity};

pub use command::CommandFilter;
pub use sudo::SudoRegularFilter;

/// Marks a `Filter` directive naming a built-in filter.
pub const EMBEDDED_PREFIX: &str = "embedded:";

/// Name of [`SudoRegularFilter`] in a capability map.
pub const SUDO_FILTER_REGULAR: &str = "sudo-filter-regular";

/// A byte transform over authorized-keys text.
pub trait Filter: Send + Sync {
    /// Return the lines to keep. Output that does not parse is dropped.
    fn filter(&self, input: &[u8]) -> Vec<u8>;
}

/// Where a `Filter` directive points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterSpec {
    /// A filter registered under this name.
    Embedded(String),
    /// An executable reading stdin and writing stdout.
    Command(PathBuf),
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Embedded(name) => write!(f, "{EMBEDDED_PREFIX}{name}"),
            Self::Command(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum FilterError {
    /// No embedded filter has this name.
    #[error("unknown embedded filter {0:?}")]
    UnknownEmbedded(String),

    /// The filter program does not exist.
    #[error("filter {} does not exist", .0.display())]
    NotFound(PathBuf),

    /// The filter program could not be run or talked to.
    #[error("cannot execute filter {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The filter program exited unsuccessfully.
    #[error("filter {} exited with {status}", path.display())]
    Failed {
        path: PathBuf,
        status: std::process::ExitStatus,
    },
}

/// Pass `identities` through `filter` and parse what survives.
#[must_use]
pub fn apply(filter: &dyn Filter, identities: &[Identity]) -> Vec<Identity> {
    let output = filter.filter(&marshal_authorized_keys(identities));
    parse_authorized_keys(&String::from_utf8_lossy(&output))
}
