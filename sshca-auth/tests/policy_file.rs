//! Policy files read from disk.

#![cfg(unix)]

mod common;

use common::Workspace;
use sshca_auth::decoder;
use sshca_auth::policy::Policy;

const POLICY: &str = "\
# sshca policy
Debug yes
AllowStaticKeys no   # certificates only

AllowCertificate yes
SupportedCriticalOption force-command
SupportedCriticalOption source-address
TrustedUserCAKeys /nonexistent/%u/ca.pub
Prompt touchPolicy=[23] Touch your security key
Prompt broken=( never compiles
";

#[test]
fn test_decode_then_serialize_round_trip() {
    let doc = decoder::decode(POLICY.as_bytes()).unwrap();
    assert_eq!(doc.to_string(), POLICY.replace("no   #", "no #"));
    assert_eq!(
        decoder::decode(doc.to_string().as_bytes()).unwrap().to_string(),
        doc.to_string()
    );
}

#[test]
fn test_resolved_from_disk() {
    let ws = Workspace::new();
    let policy = ws.policy("bob", POLICY);

    assert!(policy.debug);
    assert!(!policy.allow_static_keys);
    assert!(policy.allow_certificate);
    assert_eq!(
        policy.supported_critical_options,
        vec!["force-command".to_string(), "source-address".to_string()]
    );
    // Missing trust files are dropped silently.
    assert!(policy.ca_key_files.is_empty());
    assert_eq!(policy.prompts.len(), 1);
    assert_eq!(policy.prompts[0].property, "touchPolicy");
}

#[test]
fn test_unreadable_file_yields_default() {
    let ws = Workspace::new();
    let policy = ws.resolver("bob").load(&ws.home().join("missing.conf"));
    assert_eq!(policy, Policy::default());
}

#[test]
fn test_path_extension() {
    let ws = Workspace::new();
    let resolver = ws.resolver("bob");
    assert_eq!(resolver.extend_path("embedded:foo"), "embedded:foo");
    assert_eq!(resolver.extend_path("/x/%u/y"), "/x/bob/y");
    assert_eq!(
        resolver.extend_path("a/b"),
        ws.home().join("a/b").to_string_lossy()
    );
}
