//! Typed authentication policy resolved from a decoded policy file.
//!
//! Resolution never fails. Directives that do not parse are logged and fall
//! back to their defaults, and trust files that fail the ownership/mode gate
//! are dropped, so a broken policy narrows what is accepted rather than
//! blocking evaluation.

mod perms;
mod prompt;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::decoder::{self, Document};
use crate::filter::{FilterSpec, EMBEDDED_PREFIX};
use crate::trust::{self, PrincipalsFileError};

pub use perms::{check_file, FileRule, PermissionError, DENY_GROUP_OTHER_WRITE};
pub use prompt::{PromptRule, PromptRuleError};

/// Uid that must own CA key and principal files.
pub const ROOT_UID: u32 = 0;

const DEFAULT_STATIC_KEY_FILES: [&str; 2] = [".ssh/authorized_keys", ".ssh/authorized_keys2"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Policy {
    pub debug: bool,
    pub filters: Vec<FilterSpec>,
    pub allow_static_keys: bool,
    pub static_key_files: Vec<PathBuf>,
    pub allow_certificate: bool,
    pub supported_critical_options: Vec<String>,
    pub ca_key_files: Vec<PathBuf>,
    pub principal_prefixes: Vec<String>,
    pub principal_files: Vec<PathBuf>,
    pub prompts: Vec<PromptRule>,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            debug: false,
            filters: Vec::new(),
            allow_static_keys: true,
            static_key_files: Vec::new(),
            allow_certificate: false,
            supported_critical_options: Vec::new(),
            ca_key_files: Vec::new(),
            principal_prefixes: Vec::new(),
            principal_files: Vec::new(),
            prompts: Vec::new(),
        }
    }
}

impl Policy {
    /// Principals a certificate may name to log in as `username`.
    ///
    /// # Errors
    ///
    /// Fails on the first unreadable principals file; the error still
    /// carries everything collected before it.
    pub fn authorized_principals(
        &self,
        username: &str,
    ) -> Result<BTreeSet<String>, PrincipalsFileError> {
        trust::authorized_principals(username, &self.principal_prefixes, self.principal_files.as_slice())
    }

    /// First prompt rule matching the certificate's key ID.
    #[must_use]
    pub fn prompt_for(&self, key_id: &crate::identity::KeyId) -> Option<&PromptRule> {
        self.prompts.iter().find(|rule| rule.matches(key_id))
    }
}

/// Resolves policy documents for one user.
#[derive(Debug, Clone)]
pub struct Resolver {
    username: String,
    home: PathBuf,
    privileged_owner: u32,
}

impl Resolver {
    pub fn new(username: impl Into<String>, home: impl Into<PathBuf>) -> Self {
        Self {
            username: username.into(),
            home: home.into(),
            privileged_owner: ROOT_UID,
        }
    }

    /// Require CA key and principal files to be owned by `uid` instead of root.
    #[must_use]
    pub fn with_privileged_owner(mut self, uid: u32) -> Self {
        self.privileged_owner = uid;
        self
    }

    /// Read, decode and resolve a policy file.
    ///
    /// An unreadable file yields the default policy. A file that does not
    /// decode is treated as empty.
    pub fn load(&self, path: &Path) -> Policy {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read policy file");
                return Policy::default();
            }
        };
        let document = match decoder::decode(&data) {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to decode policy file");
                Document::default()
            }
        };
        self.resolve(&document)
    }

    /// Resolve a decoded document: read directives, add default static key
    /// files, then drop trust files failing the permission gate.
    pub fn resolve(&self, document: &Document) -> Policy {
        let mut policy = self.read_directives(document);
        self.add_default_static_keys(&mut policy);
        self.gate_files(&mut policy);
        tracing::debug!(?policy, "resolved policy");
        policy
    }

    fn read_directives(&self, doc: &Document) -> Policy {
        let mut policy = Policy::default();

        read_bool(doc, "Debug", &mut policy.debug);
        read_bool(doc, "AllowStaticKeys", &mut policy.allow_static_keys);
        read_bool(doc, "AllowCertificate", &mut policy.allow_certificate);

        policy.filters = doc
            .get_all("Filter")
            .iter()
            .map(|raw| self.filter_spec(raw))
            .collect();
        policy.static_key_files = self.paths(doc, "AuthorizedKeysFile");
        policy.supported_critical_options = doc.get_all("SupportedCriticalOption");
        policy.ca_key_files = self.paths(doc, "TrustedUserCAKeys");
        policy.principal_prefixes = doc.get_all("authorizedPrincipalPrefix");
        policy.principal_files = self.paths(doc, "AuthorizedPrincipalsFile");
        policy.prompts = doc
            .get_all("Prompt")
            .iter()
            .filter_map(|raw| match PromptRule::parse(raw) {
                Ok(rule) => Some(rule),
                Err(e) => {
                    tracing::warn!(prompt = %raw, error = %e, "dropping corrupt prompt");
                    None
                }
            })
            .collect();

        policy
    }

    fn add_default_static_keys(&self, policy: &mut Policy) {
        if !policy.static_key_files.is_empty() {
            return;
        }
        for default in DEFAULT_STATIC_KEY_FILES {
            let path = PathBuf::from(self.extend_path(default));
            if path.exists() {
                tracing::debug!(path = %path.display(), "adding default static key file");
                policy.static_key_files.push(path);
            }
        }
    }

    fn gate_files(&self, policy: &mut Policy) {
        let privileged = FileRule::owned_by(self.privileged_owner);
        policy.static_key_files =
            perms::retain_permitted(std::mem::take(&mut policy.static_key_files), FileRule::any_owner());
        policy.ca_key_files =
            perms::retain_permitted(std::mem::take(&mut policy.ca_key_files), privileged);
        policy.principal_files =
            perms::retain_permitted(std::mem::take(&mut policy.principal_files), privileged);
    }

    fn paths(&self, doc: &Document, key: &str) -> Vec<PathBuf> {
        doc.get_all(key)
            .iter()
            .map(|raw| PathBuf::from(self.extend_path(raw)))
            .collect()
    }

    fn filter_spec(&self, raw: &str) -> FilterSpec {
        match raw.strip_prefix(EMBEDDED_PREFIX) {
            Some(name) => FilterSpec::Embedded(name.to_string()),
            None => FilterSpec::Command(PathBuf::from(self.extend_path(raw))),
        }
    }

    /// Expand a path directive value.
    ///
    /// Embedded names pass through. Relative paths are joined under the home
    /// directory, then the first `%u` is replaced with the username.
    #[must_use]
    pub fn extend_path(&self, raw: &str) -> String {
        if raw.starts_with(EMBEDDED_PREFIX) {
            return raw.to_string();
        }
        let joined = if Path::new(raw).is_absolute() {
            raw.to_string()
        } else {
            self.home.join(raw).to_string_lossy().into_owned()
        };
        joined.replacen("%u", &self.username, 1)
    }
}

/// Extended boolean: `1 t T true TRUE True y Y yes Yes YES` and their negatives.
#[must_use]
pub fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "true" | "TRUE" | "True" | "y" | "Y" | "yes" | "Yes" | "YES" => {
            Some(true)
        }
        "0" | "f" | "F" | "false" | "FALSE" | "False" | "n" | "N" | "no" | "No" | "NO" => {
            Some(false)
        }
        _ => None,
    }
}

fn read_bool(doc: &Document, key: &str, slot: &mut bool) {
    let raw = doc.get(key);
    if raw.is_empty() {
        return;
    }
    match parse_bool(&raw) {
        Some(value) => *slot = value,
        None => tracing::warn!(directive = key, value = %raw, "not a boolean, keeping default"),
    }
}
