//! Policy inspection commands.

use std::path::Path;

use anyhow::{Context, Result};
use sshca_auth::decoder;
use sshca_auth::policy::{Policy, Resolver};

/// Resolve `config` for `user` the way a login would.
pub fn resolve(config: &Path, user: &str, home: &Path) -> Policy {
    Resolver::new(user, home).load(config)
}

/// The resolved policy as pretty-printed JSON.
pub fn check(config: &Path, user: &str, home: &Path) -> Result<String> {
    let policy = resolve(config, user, home);
    serde_json::to_string_pretty(&policy).context("Failed to serialize policy")
}

/// The policy file re-serialized in canonical form.
pub fn fmt(config: &Path) -> Result<String> {
    let data = std::fs::read(config)
        .with_context(|| format!("Failed to read {}", config.display()))?;
    let document = decoder::decode(&data)
        .with_context(|| format!("Failed to decode {}", config.display()))?;
    Ok(document.to_string())
}
