//! Shared fixtures for the integration tests.
//!
//! A [`Workspace`] is a temporary home directory whose files count as
//! privileged: the resolver it hands out requires trust files to be owned by
//! whoever runs the tests, not root.

#![allow(dead_code)]

use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};

use sshca_auth::authn::Terminal;
use sshca_auth::challenge::respond;
use sshca_auth::identity::{marshal_authorized_keys, Certificate, Identity, PrivateKey};
use sshca_auth::policy::{Policy, Resolver};
use tempfile::TempDir;

/// Fixed clock for certificate validity windows.
pub const NOW: u64 = 1_700_000_000;

pub struct Workspace {
    dir: TempDir,
    uid: u32,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp home");
        let uid = std::fs::metadata(dir.path()).expect("stat temp home").uid();
        Self { dir, uid }
    }

    pub fn home(&self) -> &Path {
        self.dir.path()
    }

    /// Write `name` under the home directory with mode 0644.
    pub fn write(&self, name: &str, contents: impl AsRef<[u8]>) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents).expect("write fixture");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644))
            .expect("chmod fixture");
        path
    }

    pub fn write_keys(&self, name: &str, keys: &[Identity]) -> PathBuf {
        self.write(name, marshal_authorized_keys(keys))
    }

    pub fn resolver(&self, username: &str) -> Resolver {
        Resolver::new(username, self.home()).with_privileged_owner(self.uid)
    }

    /// Write `text` as the policy file and resolve it for `username`.
    pub fn policy(&self, username: &str, text: &str) -> Policy {
        let path = self.write("sshca.conf", text);
        self.resolver(username).load(&path)
    }
}

/// A user certificate valid for an hour around [`NOW`].
pub fn user_cert(ca: &PrivateKey, key: &PrivateKey, principal: &str, key_id: &str) -> Certificate {
    Certificate::builder(key.public_key())
        .key_id(key_id)
        .principal(principal)
        .valid_between(NOW - 3600, NOW + 3600)
        .sign(ca)
        .expect("sign certificate")
}

/// The client side of a manual login: pastes a certificate, then answers
/// the last challenge request shown with `key`.
pub struct PastingClient {
    cert_line: String,
    key: PrivateKey,
    pub shown: String,
    reads: usize,
}

impl PastingClient {
    pub fn new(cert: &Certificate, key: PrivateKey) -> Self {
        Self {
            cert_line: Identity::from(cert.clone()).to_authorized_key(),
            key,
            shown: String::new(),
            reads: 0,
        }
    }

    fn last_request(&self) -> String {
        self.shown
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty() && !line.starts_with(">>>"))
            .unwrap_or_default()
            .to_string()
    }
}

impl Terminal for PastingClient {
    fn show(&mut self, text: &str) -> std::io::Result<()> {
        self.shown.push_str(text);
        Ok(())
    }

    fn read_line(&mut self) -> std::io::Result<String> {
        self.reads += 1;
        if self.reads == 1 {
            return Ok(self.cert_line.clone());
        }
        respond(&self.last_request(), &self.key)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
