//! Copy-and-paste challenge/response for hosts without an agent.
//!
//! The server issues 64 random bytes as a printable request; the client signs
//! them with the private key behind the presented identity and pastes back
//! the response. Both travel as base64 of a small JSON envelope:
//!
//! ```text
//! base64({"Data": "<base64>", "Signature": {"Format": "ssh-ed25519", "Blob": "<base64>"}})
//! ```
//!
//! `Signature` is omitted in requests. `Format` is the signature algorithm
//! of the responding key, e.g. `ecdsa-sha2-nistp256` or `rsa-sha2-512`.
//!
//! # Example
//!
//! ```
//! use sshca_auth::challenge::{respond, Challenge, ChallengeState};
//! use sshca_auth::identity::{Identity, PrivateKey};
//!
//! let key = PrivateKey::generate();
//! let mut challenge = Challenge::new(Identity::from(key.public_key()));
//!
//! let request = challenge.request();
//! let response = respond(&request, &key).unwrap();
//! challenge.verify_response(&response).unwrap();
//! assert_eq!(challenge.state(), ChallengeState::Verified);
//! ```

mod envelope;

use rand::rngs::OsRng;
use rand::RngCore;

use crate::identity::{Identity, KeyError, PrivateKey, Signature};

pub use envelope::ChallengeData;

/// Random bytes per challenge.
pub const CHALLENGE_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ChallengeError {
    /// The pasted text is not base64.
    #[error("challenge data is not base64")]
    InvalidBase64,

    /// The decoded text is not the expected JSON envelope.
    #[error("malformed challenge data: {0}")]
    Malformed(String),

    /// A response carried no signature.
    #[error("response is not signed")]
    MissingSignature,

    /// The signature is not one this crate can check, or the key could
    /// not produce one.
    #[error("unsupported signature: {0}")]
    UnsupportedSignature(#[from] KeyError),

    /// The signature does not verify under the challenged identity.
    #[error("signature verification failed")]
    VerificationFailed,

    /// `verify_response` was called outside the request-issued state.
    #[error("challenge is {0:?}, not awaiting a response")]
    InvalidState(ChallengeState),
}

/// Lifecycle of a [`Challenge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeState {
    Created,
    RequestIssued,
    Verified,
    Rejected,
}

/// One server-side challenge bound to the identity expected to answer it.
///
/// A challenge verifies at most once: after the first response it is either
/// `Verified` or `Rejected`, and further responses fail with
/// `ChallengeError::InvalidState`.
pub struct Challenge {
    identity: Identity,
    data: [u8; CHALLENGE_LEN],
    state: ChallengeState,
}

impl Challenge {
    /// Draw fresh random bytes from the OS for `identity`.
    #[must_use]
    pub fn new(identity: Identity) -> Self {
        let mut data = [0u8; CHALLENGE_LEN];
        OsRng.fill_bytes(&mut data);
        Self {
            identity,
            data,
            state: ChallengeState::Created,
        }
    }

    #[must_use]
    pub fn state(&self) -> ChallengeState {
        self.state
    }

    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    #[must_use]
    pub fn data(&self) -> &[u8; CHALLENGE_LEN] {
        &self.data
    }

    /// Encode the unsigned request for display. Issuing the request again
    /// returns the same text.
    pub fn request(&mut self) -> String {
        if self.state == ChallengeState::Created {
            self.state = ChallengeState::RequestIssued;
        }
        ChallengeData::unsigned(self.data.to_vec()).encode()
    }

    /// Check a pasted response against the issued bytes.
    ///
    /// Certificates are verified with their embedded subject key.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless a request is outstanding; any other
    /// error also moves the challenge to `Rejected`.
    pub fn verify_response(&mut self, response: &str) -> Result<(), ChallengeError> {
        self.settle(|challenge| {
            let decoded = ChallengeData::decode(response)?;
            let signature = decoded.signature()?.ok_or(ChallengeError::MissingSignature)?;
            // The signature must cover our bytes, whatever the response echoes.
            challenge.check_signature(&signature)
        })
    }

    /// Like [`verify_response`](Self::verify_response) for a signature
    /// obtained directly, e.g. from an agent.
    ///
    /// # Errors
    ///
    /// Same as `verify_response`.
    pub fn verify_signature(&mut self, signature: &Signature) -> Result<(), ChallengeError> {
        self.settle(|challenge| challenge.check_signature(signature))
    }

    fn settle<F>(&mut self, check: F) -> Result<(), ChallengeError>
    where
        F: FnOnce(&Self) -> Result<(), ChallengeError>,
    {
        if self.state != ChallengeState::RequestIssued {
            return Err(ChallengeError::InvalidState(self.state));
        }
        let result = check(self);
        self.state = match result {
            Ok(()) => ChallengeState::Verified,
            Err(_) => ChallengeState::Rejected,
        };
        result
    }

    fn check_signature(&self, signature: &Signature) -> Result<(), ChallengeError> {
        if self.identity.verify(&self.data, signature) {
            Ok(())
        } else {
            Err(ChallengeError::VerificationFailed)
        }
    }
}

impl std::fmt::Debug for Challenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Challenge")
            .field("identity", &self.identity.fingerprint())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Client side: sign a challenge request.
///
/// # Errors
///
/// Fails if `request` does not decode or the key cannot sign.
pub fn respond(request: &str, key: &PrivateKey) -> Result<String, ChallengeError> {
    let decoded = ChallengeData::decode(request)?;
    let signature: Signature = key.sign(decoded.data())?;
    Ok(ChallengeData::signed(decoded.data().to_vec(), &signature).encode())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::identity::Certificate;

    fn issued(key: &PrivateKey) -> (Challenge, String) {
        let mut challenge = Challenge::new(Identity::from(key.public_key()));
        let request = challenge.request();
        (challenge, request)
    }

    #[test]
    fn test_round_trip() {
        let key = PrivateKey::generate();
        let (mut challenge, request) = issued(&key);
        assert_eq!(challenge.state(), ChallengeState::RequestIssued);

        let response = respond(&request, &key).unwrap();
        assert!(challenge.verify_response(&response).is_ok());
        assert_eq!(challenge.state(), ChallengeState::Verified);
    }

    #[test]
    fn test_certificate_verifies_with_subject_key() {
        let user = PrivateKey::generate();
        let cert = Certificate::builder(user.public_key())
            .principal("alice")
            .sign(&PrivateKey::generate())
            .unwrap();
        let mut challenge = Challenge::new(Identity::from(cert));

        let response = respond(&challenge.request(), &user).unwrap();
        assert!(challenge.verify_response(&response).is_ok());
    }

    #[test]
    fn test_ecdsa_certificate_round_trip() {
        let user = PrivateKey::random("ecdsa-sha2-nistp384").unwrap();
        let cert = Certificate::builder(user.public_key())
            .principal("alice")
            .sign(&PrivateKey::random("ecdsa-sha2-nistp256").unwrap())
            .unwrap();
        let mut challenge = Challenge::new(Identity::from(cert));

        let response = respond(&challenge.request(), &user).unwrap();
        assert!(challenge.verify_response(&response).is_ok());
    }

    #[test]
    fn test_other_algorithm_signer_rejected() {
        let key = PrivateKey::random("ecdsa-sha2-nistp256").unwrap();
        let (mut challenge, request) = issued(&key);

        let response = respond(&request, &PrivateKey::generate()).unwrap();
        assert_eq!(
            challenge.verify_response(&response),
            Err(ChallengeError::VerificationFailed)
        );
    }

    #[test]
    fn test_wrong_signer_rejected() {
        let key = PrivateKey::generate();
        let (mut challenge, request) = issued(&key);

        let response = respond(&request, &PrivateKey::generate()).unwrap();
        assert_eq!(
            challenge.verify_response(&response),
            Err(ChallengeError::VerificationFailed)
        );
        assert_eq!(challenge.state(), ChallengeState::Rejected);
    }

    #[test]
    fn test_response_to_other_challenge_rejected() {
        let key = PrivateKey::generate();
        let (mut challenge, _) = issued(&key);
        let (_, other_request) = issued(&key);

        let response = respond(&other_request, &key).unwrap();
        assert_eq!(
            challenge.verify_response(&response),
            Err(ChallengeError::VerificationFailed)
        );
    }

    #[test]
    fn test_unsigned_request_is_not_a_response() {
        let key = PrivateKey::generate();
        let (mut challenge, request) = issued(&key);
        assert_eq!(
            challenge.verify_response(&request),
            Err(ChallengeError::MissingSignature)
        );
    }

    #[test]
    fn test_garbage_response() {
        let key = PrivateKey::generate();
        let (mut challenge, _) = issued(&key);
        assert_eq!(
            challenge.verify_response("%%% not base64 %%%"),
            Err(ChallengeError::InvalidBase64)
        );
        assert_eq!(challenge.state(), ChallengeState::Rejected);
    }

    #[test]
    fn test_verifies_at_most_once() {
        let key = PrivateKey::generate();
        let (mut challenge, request) = issued(&key);
        let response = respond(&request, &key).unwrap();

        assert!(challenge.verify_response(&response).is_ok());
        assert_eq!(
            challenge.verify_response(&response),
            Err(ChallengeError::InvalidState(ChallengeState::Verified))
        );
    }

    #[test]
    fn test_verify_signature_directly() {
        let key = PrivateKey::generate();
        let (mut challenge, _) = issued(&key);
        let signature = key.sign(challenge.data()).unwrap();
        assert!(challenge.verify_signature(&signature).is_ok());
        assert_eq!(
            challenge.verify_signature(&signature),
            Err(ChallengeError::InvalidState(ChallengeState::Verified))
        );
    }

    #[test]
    fn test_tampered_byte_rejected() {
        let key = PrivateKey::generate();
        let (mut challenge, _) = issued(&key);
        let mut data = challenge.data().to_vec();
        data[17] ^= 0x01;
        let signature = key.sign(&data).unwrap();
        assert_eq!(
            challenge.verify_signature(&signature),
            Err(ChallengeError::VerificationFailed)
        );
    }

    #[test]
    fn test_verify_before_request() {
        let key = PrivateKey::generate();
        let mut challenge = Challenge::new(Identity::from(key.public_key()));
        assert_eq!(
            challenge.verify_response("anything"),
            Err(ChallengeError::InvalidState(ChallengeState::Created))
        );
    }

    #[test]
    fn test_fresh_bytes_per_challenge() {
        let identity = Identity::from(PrivateKey::generate().public_key());
        let seen: HashSet<[u8; CHALLENGE_LEN]> = (0..10_000)
            .map(|_| *Challenge::new(identity.clone()).data())
            .collect();
        assert_eq!(seen.len(), 10_000);
    }
}
