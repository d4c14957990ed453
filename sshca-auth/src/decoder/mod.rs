//! Decoder for the line-oriented policy format.
//!
//! ```text
//! # comment
//! Key value          # trailing comment
//! Key=value
//! ```
//!
//! Decoding keeps every line, including comments and blank lines, so a
//! document can be written back out with its layout intact. Separators and
//! whitespace around them are normalized to a single space on output.
//!
//! A single `=` between key and value is a separator, as in `sshd_config`:
//! `Key=value` and `Key = value` both read as key `Key`, value `value`, and
//! are written back as `Key value`. Only the first `=` is consumed, so
//! `Key==value` reads value `=value`.
//!
//! # Example
//!
//! ```
//! use sshca_auth::decoder::decode;
//!
//! let doc = decode(b"# CA setup\nAllowCertificate yes\nTrustedUserCAKeys /etc/ca.pub\n").unwrap();
//! assert_eq!(doc.get("allowcertificate"), "yes");
//! assert_eq!(doc.to_string(), "# CA setup\nAllowCertificate yes\nTrustedUserCAKeys /etc/ca.pub\n");
//! ```

mod document;
mod lexer;
mod node;
mod parser;
mod position;

pub use document::Document;
pub use node::{Blank, KeyValue, Node};
pub use position::Position;

/// A structural error in a policy file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{position}: {kind}")]
pub struct DecodeError {
    pub position: Position,
    pub kind: DecodeErrorKind,
}

impl DecodeError {
    pub(crate) fn new(position: Position, kind: DecodeErrorKind) -> Self {
        Self { position, kind }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum DecodeErrorKind {
    #[error("line starts with an empty key")]
    EmptyKey,

    #[error("unexpected token {0}")]
    UnexpectedToken(String),

    #[error("key has no value")]
    MissingValue,
}

/// Decode a policy file. Invalid UTF-8 is replaced, not rejected.
///
/// # Errors
///
/// Returns the position of the first structural error. No partial document
/// is produced.
pub fn decode(bytes: &[u8]) -> Result<Document, DecodeError> {
    let text = String::from_utf8_lossy(bytes);
    let nodes = parser::parse(lexer::Lexer::new(&text))?;
    Ok(Document::new(nodes))
}
