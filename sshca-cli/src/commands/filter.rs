//! Embedded filters exposed as stdin-to-stdout programs, so a policy can
//! also run them through `Filter /path/to/sshca-filter`.

use std::io::{Read, Write};

use anyhow::{Context, Result};
use sshca_auth::filter::{Filter, SudoRegularFilter};

pub fn sudo_regular(mut input: impl Read, mut output: impl Write) -> Result<()> {
    let mut data = Vec::new();
    input.read_to_end(&mut data).context("Failed to read identities")?;
    output
        .write_all(&SudoRegularFilter.filter(&data))
        .context("Failed to write identities")?;
    output.flush()?;
    Ok(())
}
