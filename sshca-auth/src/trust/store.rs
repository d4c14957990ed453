//! Digest-addressed set of keys read from authorized-keys files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::identity::{parse_authorized_keys, Identity, PublicKey};

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    /// A key file could not be read.
    #[error("cannot read key file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Keys and certificates indexed by the SHA-256 of their wire blob.
///
/// Membership checks re-compare the full blob, so a digest collision cannot
/// admit a key that was never loaded.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    entries: HashMap<[u8; 32], Identity>,
}

impl CredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every key from each file, in order.
    ///
    /// Unparseable lines are skipped; an unreadable file fails the whole
    /// load.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Read` for the first file that cannot be read.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Self, StoreError> {
        let mut store = Self::new();
        for path in paths {
            let path = path.as_ref();
            let data = std::fs::read(path).map_err(|source| StoreError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            let identities = parse_authorized_keys(&String::from_utf8_lossy(&data));
            tracing::debug!(path = %path.display(), count = identities.len(), "loaded key file");
            store.extend(identities);
        }
        Ok(store)
    }

    /// Load CA keys. A CA listed as a certificate is trusted by its
    /// subject key, the key that signs user certificates.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load).
    pub fn load_authorities<P: AsRef<Path>>(paths: &[P]) -> Result<Self, StoreError> {
        let loaded = Self::load(paths)?;
        Ok(loaded
            .entries
            .into_values()
            .map(|identity| Identity::from(identity.subject_key().clone()))
            .collect())
    }

    pub fn insert(&mut self, identity: Identity) {
        self.entries.insert(digest(&identity.to_blob()), identity);
    }

    #[must_use]
    pub fn contains(&self, identity: &Identity) -> bool {
        self.contains_blob(&identity.to_blob())
    }

    /// Whether `key` was loaded as a plain public key.
    #[must_use]
    pub fn contains_key(&self, key: &PublicKey) -> bool {
        self.contains_blob(&key.to_blob())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn contains_blob(&self, blob: &[u8]) -> bool {
        match self.entries.get(&digest(blob)) {
            Some(stored) => stored.to_blob().ct_eq(blob).into(),
            None => false,
        }
    }
}

impl Extend<Identity> for CredentialStore {
    fn extend<T: IntoIterator<Item = Identity>>(&mut self, iter: T) {
        for identity in iter {
            self.insert(identity);
        }
    }
}

impl FromIterator<Identity> for CredentialStore {
    fn from_iter<T: IntoIterator<Item = Identity>>(iter: T) -> Self {
        let mut store = Self::new();
        store.extend(iter);
        store
    }
}

fn digest(blob: &[u8]) -> [u8; 32] {
    Sha256::digest(blob).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{marshal_authorized_keys, CertType, Certificate, PrivateKey};

    #[test]
    fn test_contains() {
        let a = PrivateKey::generate().public_key();
        let b = PrivateKey::generate().public_key();
        let store: CredentialStore = [Identity::from(a.clone())].into_iter().collect();

        assert!(store.contains_key(&a));
        assert!(store.contains(&Identity::from(a)));
        assert!(!store.contains_key(&b));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_certificate_is_not_its_subject_key() {
        let user = PrivateKey::generate();
        let cert = Certificate::builder(user.public_key())
            .sign(&PrivateKey::generate())
            .unwrap();
        let store: CredentialStore = [Identity::from(cert.clone())].into_iter().collect();

        assert!(store.contains(&Identity::from(cert)));
        assert!(!store.contains_key(&user.public_key()));
    }

    #[test]
    fn test_duplicates_collapse() {
        let key = Identity::from(PrivateKey::generate().public_key());
        let store: CredentialStore = vec![key.clone(), key].into_iter().collect();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_load_files() {
        let dir = tempfile::tempdir().unwrap();
        let keys: Vec<Identity> = (0..3)
            .map(|_| Identity::from(PrivateKey::generate().public_key()))
            .collect();
        let first = dir.path().join("first");
        let second = dir.path().join("second");
        std::fs::write(&first, marshal_authorized_keys(&keys[..2])).unwrap();
        std::fs::write(&second, marshal_authorized_keys(&keys[2..])).unwrap();

        let store = CredentialStore::load(&[&first, &second]).unwrap();
        assert_eq!(store.len(), 3);
        assert!(keys.iter().all(|k| store.contains(k)));
    }

    #[test]
    fn test_authorities_unwrap_certificates() {
        let dir = tempfile::tempdir().unwrap();
        let (root, ca) = (PrivateKey::generate(), PrivateKey::generate());
        let ca_cert = Certificate::builder(ca.public_key())
            .cert_type(CertType::Host)
            .sign(&root)
            .unwrap();
        let path = dir.path().join("ca.pub");
        std::fs::write(&path, marshal_authorized_keys(&[Identity::from(ca_cert)])).unwrap();

        assert!(!CredentialStore::load(&[&path]).unwrap().contains_key(&ca.public_key()));
        let authorities = CredentialStore::load_authorities(&[&path]).unwrap();
        assert!(authorities.contains_key(&ca.public_key()));
        assert!(!authorities.contains_key(&root.public_key()));
        assert_eq!(authorities.len(), 1);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = CredentialStore::load(&[dir.path().join("absent")]).unwrap_err();
        assert!(matches!(err, StoreError::Read { .. }));
    }

    #[test]
    fn test_load_nothing_is_empty() {
        let store = CredentialStore::load::<PathBuf>(&[]).unwrap();
        assert!(store.is_empty());
    }
}
