//! Authentication against a resolved [`Policy`](crate::policy::Policy).
//!
//! [`Authenticator`] is the entry point. It lists identities from a
//! [`CredentialAgent`], filters them, and hands them to the
//! [`ValidationEngine`]; with no agent it defers to a [`Fallback`] such as
//! [`ManualAuthenticator`]. Interaction with the user goes through a
//! [`Terminal`].

mod agent;
mod authenticator;
mod engine;
mod manual;
mod terminal;

pub use agent::{challenge_agent, AgentError, CredentialAgent, MemoryAgent};
pub use authenticator::{Authenticator, Capabilities, Decision, Fallback, Grant, AUDIT_TARGET};
pub use engine::ValidationEngine;
pub use manual::{ManualAuthError, ManualAuthenticator, DEFAULT_CLIENT_COMMAND};
pub use terminal::{IoTerminal, Terminal};
