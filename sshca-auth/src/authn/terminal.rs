//! The interactive text channel to the authenticating user.

use std::io::{self, BufRead, Write};

const PROMPT_PREFIX: &str = ">>>";

/// Displays text to the user and reads their replies.
pub trait Terminal {
    /// Write `text` as-is.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn show(&mut self, text: &str) -> io::Result<()>;

    /// Read one line, trimmed of surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedEof` when the input is closed.
    fn read_line(&mut self) -> io::Result<String>;

    /// Show `message` as a prompt: on its own line, marked `>>>`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn prompt(&mut self, message: &str) -> io::Result<()> {
        self.show(&format!("\n{PROMPT_PREFIX} {message}\n"))
    }
}

/// A [`Terminal`] over any reader/writer pair, e.g. locked stdin and stderr.
#[derive(Debug)]
pub struct IoTerminal<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> IoTerminal<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_parts(self) -> (R, W) {
        (self.input, self.output)
    }
}

impl<R: BufRead, W: Write> Terminal for IoTerminal<R, W> {
    fn show(&mut self, text: &str) -> io::Result<()> {
        self.output.write_all(text.as_bytes())?;
        self.output.flush()
    }

    fn read_line(&mut self) -> io::Result<String> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed before a line was read",
            ));
        }
        Ok(line.trim().to_string())
    }
}
