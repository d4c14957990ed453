use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::{Filter, FilterError};

/// Runs an external program as a filter: input on stdin, kept lines on
/// stdout.
#[derive(Debug, Clone)]
pub struct CommandFilter {
    path: PathBuf,
}

impl CommandFilter {
    /// # Errors
    ///
    /// Returns `FilterError::NotFound` if nothing exists at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, FilterError> {
        let path = path.into();
        if !path.exists() {
            return Err(FilterError::NotFound(path));
        }
        Ok(Self { path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run the program once over `input`.
    ///
    /// # Errors
    ///
    /// Fails if the program cannot be spawned or fed, or exits non-zero.
    pub fn run(&self, input: &[u8]) -> Result<Vec<u8>, FilterError> {
        let io_err = |source: std::io::Error| FilterError::Io {
            path: self.path.clone(),
            source,
        };

        let mut child = Command::new(&self.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(io_err)?;

        let stdin = child.stdin.take();
        // Feed stdin from a second thread so a chatty filter cannot fill its
        // stdout pipe while we are still writing.
        let (output, written) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || match stdin {
                Some(mut stdin) => stdin.write_all(input),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            let written = writer.join().unwrap_or(Ok(()));
            (output, written)
        });

        let output = output.map_err(io_err)?;
        if let Err(e) = written {
            // A filter may exit without reading everything; only its status counts.
            tracing::debug!(path = %self.path.display(), error = %e, "filter closed stdin early");
        }
        if !output.status.success() {
            return Err(FilterError::Failed {
                path: self.path.clone(),
                status: output.status,
            });
        }
        Ok(output.stdout)
    }
}

impl Filter for CommandFilter {
    fn filter(&self, input: &[u8]) -> Vec<u8> {
        match self.run(input) {
            Ok(out) => out,
            Err(e) => {
                tracing::warn!(error = %e, "filter failed, dropping all identities");
                Vec::new()
            }
        }
    }
}
