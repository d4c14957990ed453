//! Credential types: OpenSSH keys and certificates, and the identity union
//! presented by an agent.
//!
//! Ed25519, ECDSA (P-256, P-384) and RSA keys are supported, both bare and
//! inside certificates.
//!
//! - [`PrivateKey`] - Signing key with automatic zeroization on drop
//! - [`PublicKey`] - Verification key, encodes to the OpenSSH key blob
//! - [`Certificate`] - CA-signed OpenSSH user/host certificate
//! - [`Identity`] - Either of the above, as listed by an agent
//! - [`Fingerprint`] - `SHA256:{base64_no_padding}`, same as `ssh-keygen -l`
//!
//! # Example
//!
//! ```
//! use sshca_auth::identity::{Certificate, Identity, PrivateKey};
//!
//! let ca = PrivateKey::generate();
//! let user = PrivateKey::random("ecdsa-sha2-nistp256").unwrap();
//!
//! let cert = Certificate::builder(user.public_key())
//!     .principal("alice")
//!     .sign(&ca)
//!     .unwrap();
//! let identity = Identity::Certificate(Box::new(cert));
//!
//! let line = identity.to_authorized_key();
//! assert_eq!(line.parse::<Identity>().unwrap(), identity);
//! ```

mod authorized_keys;
mod cert;
mod keyid;
mod keys;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

pub use authorized_keys::{marshal_authorized_keys, parse_authorized_keys};
pub use cert::{
    CertChecker, CertError, CertType, Certificate, CertificateBuilder, CERT_SUFFIX, VALID_FOREVER,
};
pub use keyid::{KeyId, KeyIdError, SSH_ONLY_USAGE};
pub use keys::{Fingerprint, KeyError, PrivateKey, PublicKey, Signature, ED25519};

use keys::blob_type;

/// A credential presented for authentication.
///
/// The set of kinds is closed; match on it rather than probing the algorithm
/// string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    RawKey(PublicKey),
    Certificate(Box<Certificate>),
}

impl Identity {
    /// Decode an OpenSSH key or certificate blob.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::UnsupportedAlgorithm` for algorithms outside the
    /// supported set, bare or certified.
    pub fn from_blob(blob: &[u8]) -> Result<Self, KeyError> {
        if blob_type(blob)?.ends_with(CERT_SUFFIX) {
            Ok(Self::Certificate(Box::new(Certificate::from_blob(blob)?)))
        } else {
            Ok(Self::RawKey(PublicKey::from_blob(blob)?))
        }
    }

    /// The OpenSSH wire blob.
    #[must_use]
    pub fn to_blob(&self) -> Vec<u8> {
        match self {
            Self::RawKey(key) => key.to_blob(),
            Self::Certificate(cert) => cert.to_blob(),
        }
    }

    /// OpenSSH algorithm name, the first field of an authorized-keys line.
    #[must_use]
    pub fn algorithm(&self) -> String {
        match self {
            Self::RawKey(key) => key.algorithm(),
            Self::Certificate(cert) => cert.algorithm().to_string(),
        }
    }

    #[must_use]
    pub fn as_certificate(&self) -> Option<&Certificate> {
        match self {
            Self::RawKey(_) => None,
            Self::Certificate(cert) => Some(cert),
        }
    }

    /// The key that signs on behalf of this identity.
    #[must_use]
    pub fn subject_key(&self) -> &PublicKey {
        match self {
            Self::RawKey(key) => key,
            Self::Certificate(cert) => cert.key(),
        }
    }

    /// Verify a signature made by the holder of this identity.
    #[must_use]
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        self.subject_key().verify(message, signature)
    }

    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::from_blob(&self.to_blob())
    }

    /// `keytype base64-blob`, without comment or newline.
    #[must_use]
    pub fn to_authorized_key(&self) -> String {
        format!("{} {}", self.algorithm(), STANDARD.encode(self.to_blob()))
    }
}

impl From<PublicKey> for Identity {
    fn from(key: PublicKey) -> Self {
        Self::RawKey(key)
    }
}

impl From<Certificate> for Identity {
    fn from(cert: Certificate) -> Self {
        Self::Certificate(Box::new(cert))
    }
}
