//! Host side of manual authentication.

use sshca_auth::authn::{Authenticator, Capabilities, Decision, ManualAuthenticator, Terminal};
use sshca_auth::policy::Policy;

/// Authenticate `user` over `terminal` with no agent, through the manual
/// fallback. The decision is audited like any other attempt.
pub fn run(policy: &Policy, user: &str, terminal: &mut dyn Terminal) -> Decision {
    let capabilities = Capabilities::with_builtin().with_fallback(ManualAuthenticator::new(policy));
    Authenticator::new(policy, &capabilities).authenticate(user, None, terminal)
}
