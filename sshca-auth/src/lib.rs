//! Login policy and credential validation for SSH certificate authorities.
//!
//! A host reads a line-oriented policy file ([`decoder`]) into a [`Policy`]
//! ([`policy`]), then authenticates a user by challenging the identities an
//! SSH agent offers: static keys listed in trusted key files, or
//! certificates signed by a trusted CA naming an authorized principal
//! ([`authn`]). Hosts without an agent fall back to a copy-and-paste
//! challenge ([`challenge`]).
//!
//! # Example
//!
//! ```
//! use sshca_auth::authn::{Authenticator, Capabilities, IoTerminal, MemoryAgent};
//! use sshca_auth::identity::PrivateKey;
//! use sshca_auth::policy::Policy;
//!
//! // A policy that trusts nothing denies every attempt.
//! let policy = Policy::default();
//! let caps = Capabilities::with_builtin();
//! let key = PrivateKey::generate();
//! let agent = MemoryAgent::new().with(key.public_key(), key);
//! let mut terminal = IoTerminal::new(std::io::empty(), std::io::sink());
//!
//! let decision = Authenticator::new(&policy, &caps).authenticate("alice", Some(&agent), &mut terminal);
//! assert!(!decision.is_granted());
//! ```
//!
//! [`Policy`]: policy::Policy

pub mod authn;
pub mod challenge;
pub mod decoder;
pub mod filter;
pub mod identity;
pub mod policy;
pub mod trust;

pub use authn::{Authenticator, Capabilities, Decision, Grant};
pub use identity::{Certificate, Fingerprint, Identity, KeyError, PrivateKey, PublicKey, Signature};
pub use policy::{Policy, Resolver};
