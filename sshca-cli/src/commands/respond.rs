//! Client side of manual authentication.

use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use sshca_auth::challenge;
use sshca_auth::identity::PrivateKey;

/// Read an unencrypted OpenSSH private key, e.g. `~/.ssh/id_ecdsa`.
pub fn load_key(path: &Path) -> Result<PrivateKey> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    PrivateKey::from_openssh(&text)
        .with_context(|| format!("{} is not a usable OpenSSH private key", path.display()))
}

/// Read one challenge request line from `input` and write the signed
/// response to `output`.
pub fn run(key: &PrivateKey, mut input: impl BufRead, mut output: impl Write) -> Result<()> {
    let mut request = String::new();
    if input.read_line(&mut request).context("Failed to read challenge")? == 0 {
        bail!("No challenge on input");
    }
    let response =
        challenge::respond(request.trim(), key).context("Failed to sign challenge")?;
    writeln!(output, "{response}")?;
    Ok(())
}
