//! The authentication entry point.

use std::collections::HashMap;
use std::fmt;

use super::agent::CredentialAgent;
use super::engine::ValidationEngine;
use super::terminal::Terminal;
use crate::filter::{self, CommandFilter, Filter, FilterError, FilterSpec, SudoRegularFilter};
use crate::identity::{Fingerprint, Identity};
use crate::policy::Policy;

/// Audit records are emitted on this `tracing` target.
pub const AUDIT_TARGET: &str = "sshca::audit";

/// Authenticates a user when no agent is available.
pub trait Fallback {
    /// # Errors
    ///
    /// Any error denies the attempt.
    fn authenticate(
        &self,
        username: &str,
        terminal: &mut dyn Terminal,
    ) -> Result<Grant, Box<dyn std::error::Error + Send + Sync>>;
}

/// Embedded filters and the fallback available to one [`Authenticator`].
#[derive(Default)]
pub struct Capabilities {
    filters: HashMap<String, Box<dyn Filter>>,
    fallback: Option<Box<dyn Fallback>>,
}

impl Capabilities {
    /// No filters and no fallback.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The filters shipped with this crate.
    #[must_use]
    pub fn with_builtin() -> Self {
        Self::new().with_filter(filter::SUDO_FILTER_REGULAR, SudoRegularFilter)
    }

    /// Register `filter` under `name`, replacing any earlier one.
    #[must_use]
    pub fn with_filter(mut self, name: impl Into<String>, filter: impl Filter + 'static) -> Self {
        self.filters.insert(name.into(), Box::new(filter));
        self
    }

    #[must_use]
    pub fn with_fallback(mut self, fallback: impl Fallback + 'static) -> Self {
        self.fallback = Some(Box::new(fallback));
        self
    }

    #[must_use]
    pub fn filter(&self, name: &str) -> Option<&dyn Filter> {
        self.filters.get(name).map(Box::as_ref)
    }

    #[must_use]
    pub fn fallback(&self) -> Option<&dyn Fallback> {
        self.fallback.as_deref()
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.filters.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("Capabilities")
            .field("filters", &names)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

/// The credential that won an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grant {
    StaticKey { fingerprint: Fingerprint },
    Certificate { key_id: String },
    /// Granted by the [`Fallback`].
    Fallback { key_id: String },
}

impl fmt::Display for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaticKey { fingerprint } => write!(f, "STATIC_KEY={fingerprint}"),
            Self::Certificate { key_id } | Self::Fallback { key_id } => {
                write!(f, "KEYID=({key_id})")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Granted(Grant),
    Denied,
}

impl Decision {
    #[must_use]
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted(_))
    }
}

/// Decides one authentication attempt under a [`Policy`].
///
/// With an agent, identities are listed, narrowed by the policy's filters,
/// then offered to the static-key rule and the certificate rule in that
/// order. Without one, the registered [`Fallback`] decides.
#[derive(Debug)]
pub struct Authenticator<'a> {
    policy: &'a Policy,
    capabilities: &'a Capabilities,
    now: Option<u64>,
    command: Option<String>,
}

impl<'a> Authenticator<'a> {
    #[must_use]
    pub fn new(policy: &'a Policy, capabilities: &'a Capabilities) -> Self {
        Self {
            policy,
            capabilities,
            now: None,
            command: None,
        }
    }

    /// Evaluate certificate validity at `now` instead of the system clock.
    #[must_use]
    pub fn at(mut self, now: u64) -> Self {
        self.now = Some(now);
        self
    }

    /// Command line of the requesting process, recorded in audit records.
    #[must_use]
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn authenticate(
        &self,
        username: &str,
        agent: Option<&dyn CredentialAgent>,
        terminal: &mut dyn Terminal,
    ) -> Decision {
        let decision = match agent {
            Some(agent) => self.with_agent(username, agent, terminal),
            None => self.without_agent(username, terminal),
        };
        self.audit(username, &decision);
        decision
    }

    fn with_agent(
        &self,
        username: &str,
        agent: &dyn CredentialAgent,
        terminal: &mut dyn Terminal,
    ) -> Decision {
        let mut identities = match agent.identities() {
            Ok(identities) => identities,
            Err(e) => {
                tracing::error!(error = %e, "failed to get keys from agent");
                return Decision::Denied;
            }
        };
        tracing::debug!(count = identities.len(), "found identities in agent");

        for spec in &self.policy.filters {
            identities = self.run_filter(spec, &identities);
            tracing::debug!(count = identities.len(), filter = %spec, "identities left after filter");
        }

        let engine = match self.now {
            Some(now) => ValidationEngine::new(self.policy).at(now),
            None => ValidationEngine::new(self.policy),
        };

        if self.policy.allow_static_keys {
            if let Some(key) = engine.validate_static_key(&identities, agent) {
                return Decision::Granted(Grant::StaticKey {
                    fingerprint: key.fingerprint(),
                });
            }
        }

        if self.policy.allow_certificate {
            if let Some(cert) = engine.validate_certificate(&identities, username, agent, terminal) {
                return Decision::Granted(Grant::Certificate {
                    key_id: cert.key_id().to_string(),
                });
            }
        }

        Decision::Denied
    }

    fn without_agent(&self, username: &str, terminal: &mut dyn Terminal) -> Decision {
        let Some(fallback) = self.capabilities.fallback() else {
            tracing::error!("no agent and no fallback authentication available");
            return Decision::Denied;
        };
        match fallback.authenticate(username, terminal) {
            Ok(grant) => Decision::Granted(grant),
            Err(e) => {
                tracing::error!(error = %e, "fallback authentication failed");
                Decision::Denied
            }
        }
    }

    /// Unresolvable filters leave no identities.
    fn run_filter(&self, spec: &FilterSpec, identities: &[Identity]) -> Vec<Identity> {
        let result = match spec {
            FilterSpec::Embedded(name) => self
                .capabilities
                .filter(name)
                .map(|f| filter::apply(f, identities))
                .ok_or_else(|| FilterError::UnknownEmbedded(name.clone())),
            FilterSpec::Command(path) => {
                CommandFilter::new(path).map(|f| filter::apply(&f, identities))
            }
        };
        result.unwrap_or_else(|e| {
            tracing::warn!(filter = %spec, error = %e, "failed to look up filter");
            Vec::new()
        })
    }

    fn audit(&self, username: &str, decision: &Decision) {
        let context = self
            .command
            .as_deref()
            .map(|cmd| format!(", CMD=({cmd})"))
            .unwrap_or_default();
        match decision {
            Decision::Granted(grant) => {
                tracing::info!(target: AUDIT_TARGET, "Grant: USER={username}, {grant}{context}");
            }
            Decision::Denied => {
                tracing::warn!(target: AUDIT_TARGET, "Deny: USER={username}{context}");
            }
        }
    }
}
