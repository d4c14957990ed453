//! OpenSSH user and host certificates (`*-cert-v01@openssh.com`).
//!
//! Parsing, encoding and the CA signature itself are delegated to
//! `ssh-key`; this module adds the login checks run against a certificate
//! and a builder for issuing test and tool certificates.

use rand::rngs::OsRng;
use ssh_key::certificate::{Builder, CertType as SshCertType};
use ssh_key::HashAlg;

use super::keys::{blob_type, KeyError, PrivateKey, PublicKey};

/// Suffix shared by every certificate algorithm name.
pub const CERT_SUFFIX: &str = "-cert-v01@openssh.com";

/// `valid_before` at or beyond this never expires. OpenSSH itself writes
/// `u64::MAX`.
pub const VALID_FOREVER: u64 = i64::MAX as u64;

/// Certificate usage class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertType {
    User,
    Host,
}

impl From<SshCertType> for CertType {
    fn from(cert_type: SshCertType) -> Self {
        match cert_type {
            SshCertType::User => Self::User,
            SshCertType::Host => Self::Host,
        }
    }
}

impl From<CertType> for SshCertType {
    fn from(cert_type: CertType) -> Self {
        match cert_type {
            CertType::User => Self::User,
            CertType::Host => Self::Host,
        }
    }
}

/// Reasons a certificate fails [`CertChecker::check`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum CertError {
    #[error("certificate is not a user certificate")]
    NotUserCertificate,

    #[error("unsupported critical option {0:?} in certificate")]
    UnsupportedCriticalOption(String),

    #[error("principal {0:?} not in the set of valid principals")]
    PrincipalNotListed(String),

    #[error("certificate is not yet valid")]
    NotYetValid,

    #[error("certificate has expired")]
    Expired,

    #[error("certificate signature does not verify")]
    InvalidSignature,

    #[error("certificate signed by unrecognized authority")]
    UnknownAuthority,
}

/// A parsed, CA-signed certificate.
///
/// Construction does not imply validity: run a [`CertChecker`] before
/// trusting any field.
#[derive(Clone)]
pub struct Certificate {
    inner: ssh_key::Certificate,
    key: PublicKey,
    signature_key: PublicKey,
    critical_options: Vec<(String, String)>,
    extensions: Vec<(String, String)>,
    /// Full encoded certificate, exactly as received or signed.
    blob: Vec<u8>,
}

impl Certificate {
    /// Start building a user certificate for `key`.
    #[must_use]
    pub fn builder(key: PublicKey) -> CertificateBuilder {
        CertificateBuilder::new(key)
    }

    /// Parse a certificate blob.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::UnsupportedAlgorithm` for plain keys and for
    /// certificates whose subject or CA key cannot be verified with, and
    /// `KeyError::Malformed` for corrupt blobs.
    pub fn from_blob(blob: &[u8]) -> Result<Self, KeyError> {
        let name = blob_type(blob)?;
        if !name.ends_with(CERT_SUFFIX) {
            return Err(KeyError::UnsupportedAlgorithm(name.to_string()));
        }
        let inner = ssh_key::Certificate::from_bytes(blob)?;
        Self::wrap(inner, blob.to_vec())
    }

    fn wrap(inner: ssh_key::Certificate, blob: Vec<u8>) -> Result<Self, KeyError> {
        let key = PublicKey::from_key_data(inner.public_key().clone())?;
        let signature_key = PublicKey::from_key_data(inner.signature_key().clone())?;
        let critical_options = options(inner.critical_options().iter());
        let extensions = options(inner.extensions().iter());
        Ok(Self {
            inner,
            key,
            signature_key,
            critical_options,
            extensions,
            blob,
        })
    }

    /// The encoded certificate.
    #[must_use]
    pub fn to_blob(&self) -> Vec<u8> {
        self.blob.clone()
    }

    /// Certificate algorithm name, e.g. `ecdsa-sha2-nistp256-cert-v01@openssh.com`.
    #[must_use]
    pub fn algorithm(&self) -> &str {
        blob_type(&self.blob).unwrap_or_default()
    }

    /// The certified subject key.
    #[must_use]
    pub fn key(&self) -> &PublicKey {
        &self.key
    }

    /// The CA key that produced the signature.
    #[must_use]
    pub fn signature_key(&self) -> &PublicKey {
        &self.signature_key
    }

    #[must_use]
    pub fn key_id(&self) -> &str {
        self.inner.key_id()
    }

    #[must_use]
    pub fn serial(&self) -> u64 {
        self.inner.serial()
    }

    #[must_use]
    pub fn cert_type(&self) -> CertType {
        self.inner.cert_type().into()
    }

    #[must_use]
    pub fn nonce(&self) -> &[u8] {
        self.inner.nonce()
    }

    #[must_use]
    pub fn valid_principals(&self) -> &[String] {
        self.inner.valid_principals()
    }

    #[must_use]
    pub fn valid_after(&self) -> u64 {
        self.inner.valid_after()
    }

    #[must_use]
    pub fn valid_before(&self) -> u64 {
        self.inner.valid_before()
    }

    #[must_use]
    pub fn critical_options(&self) -> &[(String, String)] {
        &self.critical_options
    }

    #[must_use]
    pub fn extensions(&self) -> &[(String, String)] {
        &self.extensions
    }

    /// Check the CA signature over the certificate body as of `now`.
    fn signature_valid_at(&self, now: u64) -> bool {
        let ca = self.inner.signature_key().fingerprint(HashAlg::Sha256);
        self.inner.validate_at(now, [&ca]).is_ok()
    }
}

impl std::fmt::Debug for Certificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Certificate")
            .field("key", &self.key)
            .field("serial", &self.serial())
            .field("cert_type", &self.cert_type())
            .field("key_id", &self.key_id())
            .field("valid_principals", &self.valid_principals())
            .field("valid_after", &self.valid_after())
            .field("valid_before", &self.valid_before())
            .field("critical_options", &self.critical_options)
            .field("signature_key", &self.signature_key)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.blob == other.blob
    }
}

impl Eq for Certificate {}

fn options<'a>(entries: impl Iterator<Item = (&'a String, &'a String)>) -> Vec<(String, String)> {
    entries
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// Builds and signs certificates; the issuing side of [`Certificate`].
#[derive(Debug, Clone)]
pub struct CertificateBuilder {
    key: PublicKey,
    serial: u64,
    cert_type: CertType,
    key_id: String,
    valid_principals: Vec<String>,
    valid_after: u64,
    valid_before: u64,
    critical_options: Vec<(String, String)>,
    extensions: Vec<(String, String)>,
}

impl CertificateBuilder {
    fn new(key: PublicKey) -> Self {
        Self {
            key,
            serial: 0,
            cert_type: CertType::User,
            key_id: String::new(),
            valid_principals: Vec::new(),
            valid_after: 0,
            valid_before: VALID_FOREVER,
            critical_options: Vec::new(),
            extensions: Vec::new(),
        }
    }

    #[must_use]
    pub fn serial(mut self, serial: u64) -> Self {
        self.serial = serial;
        self
    }

    #[must_use]
    pub fn cert_type(mut self, cert_type: CertType) -> Self {
        self.cert_type = cert_type;
        self
    }

    #[must_use]
    pub fn key_id(mut self, key_id: impl Into<String>) -> Self {
        self.key_id = key_id.into();
        self
    }

    #[must_use]
    pub fn principal(mut self, principal: impl Into<String>) -> Self {
        self.valid_principals.push(principal.into());
        self
    }

    /// Validity window `[after, before)` in Unix seconds.
    #[must_use]
    pub fn valid_between(mut self, after: u64, before: u64) -> Self {
        self.valid_after = after;
        self.valid_before = before;
        self
    }

    #[must_use]
    pub fn critical_option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.critical_options.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn extension(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extensions.push((name.into(), value.into()));
        self
    }

    /// Sign with the CA key and produce the certificate. The certificate
    /// algorithm follows the subject key, the signature format the CA key.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::Malformed` when `ssh-key` rejects a field, e.g. a
    /// window ending before it starts or a repeated option name.
    pub fn sign(self, ca: &PrivateKey) -> Result<Certificate, KeyError> {
        let mut builder = Builder::new_with_random_nonce(
            &mut OsRng,
            self.key.key_data().clone(),
            self.valid_after,
            self.valid_before,
        )?;
        builder.serial(self.serial)?;
        builder.cert_type(self.cert_type.into())?;
        builder.key_id(self.key_id)?;
        if self.valid_principals.is_empty() {
            builder.all_principals_valid()?;
        }
        for principal in self.valid_principals {
            builder.valid_principal(principal)?;
        }
        for (name, value) in self.critical_options {
            builder.critical_option(name, value)?;
        }
        for (name, value) in self.extensions {
            builder.extension(name, value)?;
        }

        let inner = builder.sign(ca.as_ssh())?;
        let blob = inner.to_bytes()?;
        Certificate::wrap(inner, blob)
    }
}

/// Certificate policy check: type, critical options, principal, validity
/// window, then CA signature.
///
/// Authority membership is checked separately against a trust store.
#[derive(Debug, Clone)]
pub struct CertChecker<'a> {
    supported_critical_options: &'a [String],
    now: u64,
}

impl<'a> CertChecker<'a> {
    #[must_use]
    pub fn new(supported_critical_options: &'a [String], now: u64) -> Self {
        Self {
            supported_critical_options,
            now,
        }
    }

    /// Validate `cert` for `principal`.
    ///
    /// A certificate that lists no principals is valid for any principal.
    ///
    /// # Errors
    ///
    /// Returns the first [`CertError`] the certificate trips.
    pub fn check(&self, principal: &str, cert: &Certificate) -> Result<(), CertError> {
        if cert.cert_type() != CertType::User {
            return Err(CertError::NotUserCertificate);
        }

        for (name, _) in &cert.critical_options {
            if !self.supported_critical_options.iter().any(|s| s == name) {
                return Err(CertError::UnsupportedCriticalOption(name.clone()));
            }
        }

        let principals = cert.valid_principals();
        if !principals.is_empty() && !principals.iter().any(|p| p == principal) {
            return Err(CertError::PrincipalNotListed(principal.to_string()));
        }

        if self.now < cert.valid_after() {
            return Err(CertError::NotYetValid);
        }
        if cert.valid_before() < VALID_FOREVER && self.now >= cert.valid_before() {
            return Err(CertError::Expired);
        }

        if !cert.signature_valid_at(self.now) {
            return Err(CertError::InvalidSignature);
        }
        Ok(())
    }
}
