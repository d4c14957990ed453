//! Keys and certificates produced by `ssh-keygen`, read back through the
//! public API.
//!
//! The files under `tests/data` were generated with:
//!
//! ```text
//! ssh-keygen -t ed25519 -C ca -f ca
//! ssh-keygen -t ecdsa -b 256 -C alice@laptop -f id_ecdsa
//! ssh-keygen -t rsa -b 2048 -C bob@desk -f id_rsa
//! ssh-keygen -s ca -I forever -n alice id_ecdsa.pub             # forever-cert.pub
//! ssh-keygen -s ca -I alice-laptop -n alice,ops -z 7 \
//!     -V 20230101000000:20330101000000 id_ecdsa.pub
//! ```

#![cfg(unix)]

mod common;

use common::{PastingClient, Workspace, NOW};
use sshca_auth::authn::{Authenticator, Capabilities, Decision, Grant, ManualAuthenticator};
use sshca_auth::challenge::{respond, Challenge, ChallengeData};
use sshca_auth::identity::{parse_authorized_keys, CertChecker, Identity, PrivateKey};

const CA_PUB: &str = include_str!("data/ca.pub");
const ECDSA_PUB: &str = include_str!("data/id_ecdsa.pub");
const ECDSA_KEY: &str = include_str!("data/id_ecdsa");
const ECDSA_CERT: &str = include_str!("data/id_ecdsa-cert.pub");
const FOREVER_CERT: &str = include_str!("data/forever-cert.pub");
const RSA_PUB: &str = include_str!("data/id_rsa.pub");
const RSA_KEY: &str = include_str!("data/id_rsa");

fn certificate(line: &str) -> sshca_auth::Certificate {
    match line.parse::<Identity>().unwrap() {
        Identity::Certificate(cert) => *cert,
        Identity::RawKey(_) => panic!("expected a certificate"),
    }
}

#[test]
fn test_ecdsa_key_and_certificate_lines() {
    let text = format!("{ECDSA_PUB}{ECDSA_CERT}");
    let identities = parse_authorized_keys(&text);
    assert_eq!(identities.len(), 2);

    let Identity::RawKey(key) = &identities[0] else {
        panic!("expected a plain key first");
    };
    assert_eq!(key.algorithm(), "ecdsa-sha2-nistp256");
    assert_eq!(
        key.fingerprint().as_str(),
        "SHA256:3yFXGXbp3mx4sUWzG6wNclXLVfOi7+G38O/hlPYjVzU"
    );

    let cert = identities[1].as_certificate().unwrap();
    assert_eq!(cert.key(), key);
    assert_eq!(
        identities[1].algorithm(),
        "ecdsa-sha2-nistp256-cert-v01@openssh.com"
    );
}

#[test]
fn test_certificate_fields_match_ssh_keygen() {
    let cert = certificate(ECDSA_CERT);
    let ca = CA_PUB.parse::<Identity>().unwrap();

    assert_eq!(cert.key_id(), "alice-laptop");
    assert_eq!(cert.serial(), 7);
    assert_eq!(cert.valid_principals(), ["alice", "ops"]);
    assert_eq!(cert.valid_after(), 1_672_531_200);
    assert_eq!(cert.valid_before(), 1_988_150_400);
    assert!(cert.critical_options().is_empty());
    assert!(cert.extensions().iter().any(|(name, _)| name == "permit-pty"));
    assert_eq!(cert.signature_key(), ca.subject_key());
    assert_eq!(
        cert.signature_key().fingerprint().as_str(),
        "SHA256:HXE7Rs5h8sB3K/EnwwsNu30ZOVESqn4+HxrzG6l7EL4"
    );

    assert!(CertChecker::new(&[], NOW).check("ops", &cert).is_ok());
    assert!(CertChecker::new(&[], 1_988_150_400).check("ops", &cert).is_err());
}

#[test]
fn test_forever_certificate() {
    let cert = certificate(FOREVER_CERT);

    assert_eq!(cert.key_id(), "forever");
    assert_eq!(cert.valid_before(), u64::MAX);
    assert!(CertChecker::new(&[], NOW).check("alice", &cert).is_ok());
}

#[test]
fn test_rsa_key_line() {
    let identity = RSA_PUB.parse::<Identity>().unwrap();

    assert_eq!(identity.algorithm(), "ssh-rsa");
    assert_eq!(
        identity.fingerprint().as_str(),
        "SHA256:NP8GV9kq1iZLb1EvpownKZJMMWQcB8cMzXhzBFVEK0k"
    );
    assert_eq!(identity.to_authorized_key(), RSA_PUB.trim().trim_end_matches(" bob@desk"));
}

#[test]
fn test_rsa_challenge_uses_sha2_signature() {
    let key = PrivateKey::from_openssh(RSA_KEY).unwrap();
    let mut challenge = Challenge::new(RSA_PUB.parse().unwrap());

    let response = respond(&challenge.request(), &key).unwrap();
    let signature = ChallengeData::decode(&response)
        .unwrap()
        .signature()
        .unwrap()
        .unwrap();
    assert!(signature.format().starts_with("rsa-sha2-"));
    assert!(challenge.verify_response(&response).is_ok());
}

#[test]
fn test_ecdsa_certificate_manual_login() {
    let ws = Workspace::new();
    ws.write("ca.pub", CA_PUB);
    let policy = ws.policy(
        "alice",
        "AllowStaticKeys no\nAllowCertificate yes\nTrustedUserCAKeys ca.pub\n",
    );

    let key = PrivateKey::from_openssh(ECDSA_KEY).unwrap();
    let mut client = PastingClient::new(&certificate(ECDSA_CERT), key);
    let caps = Capabilities::new().with_fallback(ManualAuthenticator::new(&policy).at(NOW));

    let decision = Authenticator::new(&policy, &caps).authenticate("alice", None, &mut client);
    assert_eq!(
        decision,
        Decision::Granted(Grant::Fallback {
            key_id: "alice-laptop".into()
        })
    );
}
