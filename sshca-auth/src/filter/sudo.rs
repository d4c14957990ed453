use super::Filter;
use crate::identity::{marshal_authorized_keys, parse_authorized_keys, Identity, KeyId, SSH_ONLY_USAGE};

/// Keeps certificates usable beyond plain SSH login.
///
/// Drops raw keys, certificates whose key ID is not a JSON object, and
/// certificates marked SSH-only.
#[derive(Debug, Clone, Copy, Default)]
pub struct SudoRegularFilter;

impl Filter for SudoRegularFilter {
    fn filter(&self, input: &[u8]) -> Vec<u8> {
        let kept: Vec<Identity> = parse_authorized_keys(&String::from_utf8_lossy(input))
            .into_iter()
            .filter(|identity| {
                let Some(cert) = identity.as_certificate() else {
                    return false;
                };
                match KeyId::parse(cert.key_id()) {
                    Ok(key_id) => key_id.usage() != Some(SSH_ONLY_USAGE),
                    Err(_) => false,
                }
            })
            .collect();
        marshal_authorized_keys(&kept)
    }
}
