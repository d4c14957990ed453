//! Static-key and certificate validation against a resolved policy.

use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};

use super::agent::{challenge_agent, AgentError, CredentialAgent};
use super::terminal::Terminal;
use crate::identity::{CertChecker, Certificate, Identity, KeyId};
use crate::policy::Policy;
use crate::trust::CredentialStore;

/// Seconds since the Unix epoch, or zero if the clock is before it.
pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Picks the credential that satisfies a [`Policy`].
///
/// Both validators walk identities in the order given and stop at the first
/// one that passes every check and its liveness challenge. Problems with a
/// single identity are logged and skipped; only a trust store that fails to
/// load ends a validator early.
#[derive(Debug, Clone)]
pub struct ValidationEngine<'a> {
    policy: &'a Policy,
    now: Option<u64>,
}

impl<'a> ValidationEngine<'a> {
    #[must_use]
    pub fn new(policy: &'a Policy) -> Self {
        Self { policy, now: None }
    }

    /// Evaluate validity windows at `now` instead of the system clock.
    #[must_use]
    pub fn at(mut self, now: u64) -> Self {
        self.now = Some(now);
        self
    }

    fn now(&self) -> u64 {
        self.now.unwrap_or_else(unix_now)
    }

    /// Principals for `username`, keeping whatever was read before a
    /// failing principals file.
    #[must_use]
    pub fn authorized_principals(&self, username: &str) -> BTreeSet<String> {
        match self.policy.authorized_principals(username) {
            Ok(principals) => principals,
            Err(e) => {
                tracing::warn!(error = %e, "failed reading authorized principals");
                e.into_collected()
            }
        }
    }

    /// Raw keys from `identities` that appear in the static key files.
    #[must_use]
    pub fn static_key_candidates(&self, identities: &[Identity]) -> Vec<Identity> {
        let store = match CredentialStore::load(self.policy.static_key_files.as_slice()) {
            Ok(store) => store,
            Err(e) => {
                tracing::debug!(error = %e, "failed to load static keys");
                return Vec::new();
            }
        };
        identities
            .iter()
            .filter(|identity| matches!(identity, Identity::RawKey(_)))
            .filter(|identity| store.contains(identity))
            .cloned()
            .collect()
    }

    /// First static key the agent proves it holds.
    pub fn validate_static_key(
        &self,
        identities: &[Identity],
        agent: &dyn CredentialAgent,
    ) -> Option<Identity> {
        let candidates = self.static_key_candidates(identities);
        tracing::debug!(count = candidates.len(), "found static keys");

        candidates.into_iter().find(|key| {
            tracing::debug!(key = %key.fingerprint(), "challenging static key");
            match challenge_agent(agent, key) {
                Ok(()) => true,
                Err(e) => {
                    tracing::debug!(key = %key.fingerprint(), error = %e, "challenge failed");
                    false
                }
            }
        })
    }

    /// Certificates from `identities` signed by a trusted CA, naming an
    /// authorized principal, and passing the certificate checks.
    #[must_use]
    pub fn certificate_candidates(
        &self,
        identities: &[Identity],
        username: &str,
    ) -> Vec<Certificate> {
        let principals = self.authorized_principals(username);
        let ca_files = self.policy.ca_key_files.as_slice();
        let ca_store = match CredentialStore::load_authorities(ca_files) {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load trusted CA keys");
                return Vec::new();
            }
        };
        let checker = CertChecker::new(&self.policy.supported_critical_options, self.now());

        let mut certs = Vec::new();
        for (index, identity) in identities.iter().enumerate() {
            let Some(cert) = identity.as_certificate() else {
                tracing::debug!(index, "identity is not a certificate");
                continue;
            };
            if !ca_store.contains_key(cert.signature_key()) {
                tracing::debug!(index, "certificate signed by untrusted CA");
                continue;
            }
            if !cert.valid_principals().iter().any(|p| principals.contains(p)) {
                tracing::debug!(
                    index,
                    cert_principals = ?cert.valid_principals(),
                    "certificate names no authorized principal"
                );
                continue;
            }
            let subject = cert.valid_principals().first().map_or("", String::as_str);
            if let Err(e) = checker.check(subject, cert) {
                tracing::debug!(index, error = %e, "certificate is invalid");
                continue;
            }
            certs.push(cert.clone());
        }
        certs
    }

    /// First certificate the agent proves it holds.
    ///
    /// When a prompt rule matches the certificate's key ID, its message is
    /// shown on `terminal` before the challenge and a newline after.
    pub fn validate_certificate(
        &self,
        identities: &[Identity],
        username: &str,
        agent: &dyn CredentialAgent,
        terminal: &mut dyn Terminal,
    ) -> Option<Certificate> {
        let certs = self.certificate_candidates(identities, username);
        tracing::debug!(count = certs.len(), "found valid certificates");
        if certs.is_empty() {
            tracing::warn!("cannot find any valid certificate");
            return None;
        }

        certs.into_iter().find(|cert| {
            let prompt = match KeyId::parse(cert.key_id()) {
                Ok(key_id) => self.policy.prompt_for(&key_id).map(|rule| rule.message.clone()),
                Err(e) => {
                    tracing::debug!(key_id = cert.key_id(), error = %e, "key id is not structured, no prompt");
                    None
                }
            };
            let identity = Identity::from(cert.clone());
            match challenge_with_prompt(agent, &identity, prompt.as_deref(), &mut *terminal) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(key_id = cert.key_id(), error = %e, "challenge failed");
                    false
                }
            }
        })
    }
}

fn challenge_with_prompt(
    agent: &dyn CredentialAgent,
    identity: &Identity,
    prompt: Option<&str>,
    terminal: &mut dyn Terminal,
) -> Result<(), AgentError> {
    let Some(message) = prompt else {
        return challenge_agent(agent, identity);
    };
    if let Err(e) = terminal.show(message) {
        tracing::debug!(error = %e, "cannot show prompt");
    }
    let result = challenge_agent(agent, identity);
    if let Err(e) = terminal.show("\n") {
        tracing::debug!(error = %e, "cannot show prompt");
    }
    result
}
