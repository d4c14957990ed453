//! The credential-holding agent seam.

use crate::challenge::{Challenge, ChallengeError};
use crate::identity::{Identity, PrivateKey, Signature};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum AgentError {
    /// The agent could not be reached or listed.
    #[error("agent unavailable: {0}")]
    Unavailable(String),

    /// The agent holds no private key for the identity.
    #[error("agent has no key for {0}")]
    UnknownIdentity(String),

    /// The agent declined to sign.
    #[error("agent refused to sign: {0}")]
    Refused(String),

    /// The signature did not answer the challenge.
    #[error(transparent)]
    Challenge(#[from] ChallengeError),
}

/// Holds private keys and signs on request without exposing them.
pub trait CredentialAgent {
    /// Identities the agent can sign for, in the agent's order.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::Unavailable` if the agent cannot be listed.
    fn identities(&self) -> Result<Vec<Identity>, AgentError>;

    /// Sign `data` with the private key behind `identity`.
    ///
    /// # Errors
    ///
    /// Fails if the agent has no such key or refuses.
    fn sign(&self, identity: &Identity, data: &[u8]) -> Result<Signature, AgentError>;
}

/// Prove the agent holds the private half of `identity` by having it sign
/// fresh random bytes.
///
/// # Errors
///
/// Returns the agent's error, or `AgentError::Challenge` when the signature
/// does not verify.
pub fn challenge_agent(
    agent: &dyn CredentialAgent,
    identity: &Identity,
) -> Result<(), AgentError> {
    let mut challenge = Challenge::new(identity.clone());
    challenge.request();
    let signature = agent.sign(identity, challenge.data())?;
    challenge.verify_signature(&signature)?;
    Ok(())
}

/// An agent backed by keys held in memory.
#[derive(Default)]
pub struct MemoryAgent {
    entries: Vec<(Identity, PrivateKey)>,
}

impl MemoryAgent {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer `identity`, signing with `key`. The key is not checked against
    /// the identity, so a mismatched pair fails its challenge.
    pub fn add(&mut self, identity: impl Into<Identity>, key: PrivateKey) {
        self.entries.push((identity.into(), key));
    }

    #[must_use]
    pub fn with(mut self, identity: impl Into<Identity>, key: PrivateKey) -> Self {
        self.add(identity, key);
        self
    }
}

impl CredentialAgent for MemoryAgent {
    fn identities(&self) -> Result<Vec<Identity>, AgentError> {
        Ok(self.entries.iter().map(|(id, _)| id.clone()).collect())
    }

    fn sign(&self, identity: &Identity, data: &[u8]) -> Result<Signature, AgentError> {
        let (_, key) = self
            .entries
            .iter()
            .find(|(id, _)| id == identity)
            .ok_or_else(|| AgentError::UnknownIdentity(identity.fingerprint().to_string()))?;
        key.sign(data).map_err(|e| AgentError::Refused(e.to_string()))
    }
}

impl std::fmt::Debug for MemoryAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryAgent")
            .field("identities", &self.entries.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_challenge_holder() {
        let key = PrivateKey::generate();
        let identity = Identity::from(key.public_key());
        let agent = MemoryAgent::new().with(identity.clone(), key);

        assert!(challenge_agent(&agent, &identity).is_ok());
    }

    #[test]
    fn test_challenge_ecdsa_holder() {
        let key = PrivateKey::random("ecdsa-sha2-nistp256").unwrap();
        let identity = Identity::from(key.public_key());
        let agent = MemoryAgent::new().with(identity.clone(), key);

        assert!(challenge_agent(&agent, &identity).is_ok());
    }

    #[test]
    fn test_challenge_mismatched_key() {
        let identity = Identity::from(PrivateKey::generate().public_key());
        let agent = MemoryAgent::new().with(identity.clone(), PrivateKey::generate());

        assert!(matches!(
            challenge_agent(&agent, &identity),
            Err(AgentError::Challenge(ChallengeError::VerificationFailed))
        ));
    }

    #[test]
    fn test_challenge_unknown_identity() {
        let agent = MemoryAgent::new();
        let identity = Identity::from(PrivateKey::generate().public_key());
        assert!(matches!(
            challenge_agent(&agent, &identity),
            Err(AgentError::UnknownIdentity(_))
        ));
    }
}
