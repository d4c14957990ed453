//! OpenSSH `authorized_keys` text format.
//!
//! Each line is `[options] keytype base64-blob [comment]`. Blank lines and
//! `#` comments are ignored. Lines that fail to parse (unsupported algorithm,
//! corrupt base64, truncated blob) are skipped, matching `sshd`.

use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::keys::KeyError;
use super::Identity;

/// Parse every key or certificate in an authorized-keys document.
#[must_use]
pub fn parse_authorized_keys(text: &str) -> Vec<Identity> {
    let mut identities = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_line(line) {
            Ok(identity) => identities.push(identity),
            Err(e) => tracing::debug!(line = index + 1, error = %e, "skipping authorized key"),
        }
    }
    identities
}

/// Render identities as authorized-keys lines, one per identity.
#[must_use]
pub fn marshal_authorized_keys(identities: &[Identity]) -> Vec<u8> {
    let mut out = Vec::new();
    for identity in identities {
        out.extend_from_slice(identity.to_authorized_key().as_bytes());
        out.push(b'\n');
    }
    out
}

fn parse_line(line: &str) -> Result<Identity, KeyError> {
    match parse_key_fields(line) {
        Ok(identity) => Ok(identity),
        Err(first) => match strip_options(line) {
            Some(rest) => parse_key_fields(rest).map_err(|_| first),
            None => Err(first),
        },
    }
}

fn parse_key_fields(s: &str) -> Result<Identity, KeyError> {
    let mut fields = s.split_whitespace();
    let algorithm = fields.next().ok_or(KeyError::InvalidFormat)?;
    let encoded = fields.next().ok_or(KeyError::InvalidFormat)?;
    let blob = STANDARD
        .decode(encoded)
        .map_err(|_| KeyError::InvalidBase64)?;
    let identity = Identity::from_blob(&blob)?;
    if identity.algorithm() != algorithm {
        return Err(KeyError::UnsupportedAlgorithm(algorithm.to_string()));
    }
    Ok(identity)
}

/// Skip a leading options field (`no-pty,command="a b"`), honoring quotes.
fn strip_options(line: &str) -> Option<&str> {
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ' ' | '\t' if !in_quotes => return Some(line[i..].trim_start()),
            _ => {}
        }
    }
    None
}

impl FromStr for Identity {
    type Err = KeyError;

    /// Parse a single authorized-keys line.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_line(s.trim())
    }
}
