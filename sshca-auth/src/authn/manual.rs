//! Manual certificate authentication over a terminal.
//!
//! Used when no agent is reachable: the user pastes their certificate, the
//! host checks it, and the user proves key possession by signing a
//! challenge on their own machine and pasting the response back.

use std::path::PathBuf;

use super::authenticator::{Fallback, Grant};
use super::engine::unix_now;
use super::terminal::Terminal;
use crate::challenge::{Challenge, ChallengeError};
use crate::identity::{CertChecker, CertError, Certificate, Identity, KeyError};
use crate::policy::Policy;
use crate::trust::{CredentialStore, StoreError};

const CLIENT_COMMAND_PROMPT: &str = "No working ssh-agent connection found. If this is expected, \
please authenticate manually by running the following command in a terminal window on your \
client computer and pasting the resulting output here:";
const CHALLENGE_PROMPT: &str =
    "Please copy the following data and paste it in client's window to start authentication.";
const RESPONSE_PROMPT: &str = "Paste signed response from client: ";

/// Client command shown to the user when none is configured.
pub const DEFAULT_CLIENT_COMMAND: &str = "sshca respond --key <private-key>";

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ManualAuthError {
    /// Reading from or writing to the terminal failed.
    #[error("terminal I/O failed: {0}")]
    Terminal(#[from] std::io::Error),

    /// The policy names no usable CA key.
    #[error("no trusted CA keys configured")]
    NoCaKeys,

    /// The CA key files could not be read.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The pasted line is not a key or certificate.
    #[error("cannot parse pasted certificate: {0}")]
    Unparseable(#[from] KeyError),

    /// The pasted line is a plain key.
    #[error("pasted key is not a certificate")]
    NotCertificate,

    /// The certificate fails a policy check.
    #[error("certificate validation failed: {0}")]
    Certificate(#[from] CertError),

    /// The response does not answer the challenge.
    #[error("failed to verify challenge: {0}")]
    Challenge(#[from] ChallengeError),
}

/// Copy-and-paste certificate authentication.
///
/// CA keys are read at each attempt, so a long-lived authenticator sees
/// trust file changes.
#[derive(Debug, Clone)]
pub struct ManualAuthenticator {
    ca_key_files: Vec<PathBuf>,
    supported_critical_options: Vec<String>,
    client_command: String,
    now: Option<u64>,
}

impl ManualAuthenticator {
    /// Take CA files and supported critical options from `policy`.
    #[must_use]
    pub fn new(policy: &Policy) -> Self {
        Self {
            ca_key_files: policy.ca_key_files.clone(),
            supported_critical_options: policy.supported_critical_options.clone(),
            client_command: DEFAULT_CLIENT_COMMAND.to_string(),
            now: None,
        }
    }

    /// Command line the user is asked to run on their client.
    #[must_use]
    pub fn with_client_command(mut self, command: impl Into<String>) -> Self {
        self.client_command = command.into();
        self
    }

    #[must_use]
    pub fn at(mut self, now: u64) -> Self {
        self.now = Some(now);
        self
    }

    /// Run the full exchange for `principal`, returning the accepted
    /// certificate.
    ///
    /// # Errors
    ///
    /// Any failed step ends the attempt with the matching error.
    pub fn authenticate(
        &self,
        principal: &str,
        terminal: &mut dyn Terminal,
    ) -> Result<Certificate, ManualAuthError> {
        let ca_store = self.load_authorities()?;
        let cert = self.read_certificate(terminal)?;
        self.validate(&cert, principal, &ca_store)?;
        terminal.show("\ncertificate verified\n")?;

        let mut challenge = Challenge::new(Identity::from(cert.clone()));
        let request = challenge.request();
        terminal.prompt(&format!("{CHALLENGE_PROMPT}\n{request}\n"))?;
        terminal.prompt(RESPONSE_PROMPT)?;
        let response = terminal.read_line()?;
        challenge.verify_response(&response)?;

        terminal.show("\nauthentication successful.\n")?;
        Ok(cert)
    }

    fn load_authorities(&self) -> Result<CredentialStore, ManualAuthError> {
        let store = CredentialStore::load_authorities(self.ca_key_files.as_slice())?;
        if store.is_empty() {
            return Err(ManualAuthError::NoCaKeys);
        }
        Ok(store)
    }

    fn read_certificate(&self, terminal: &mut dyn Terminal) -> Result<Certificate, ManualAuthError> {
        terminal.prompt(&format!("{CLIENT_COMMAND_PROMPT}\n\n\t{}\n", self.client_command))?;
        let line = terminal.read_line()?;
        match line.parse::<Identity>()? {
            Identity::Certificate(cert) => Ok(*cert),
            Identity::RawKey(_) => Err(ManualAuthError::NotCertificate),
        }
    }

    fn validate(
        &self,
        cert: &Certificate,
        principal: &str,
        ca_store: &CredentialStore,
    ) -> Result<(), ManualAuthError> {
        let now = self.now.unwrap_or_else(unix_now);
        CertChecker::new(&self.supported_critical_options, now).check(principal, cert)?;
        if !ca_store.contains_key(cert.signature_key()) {
            return Err(CertError::UnknownAuthority.into());
        }
        Ok(())
    }
}

impl Fallback for ManualAuthenticator {
    fn authenticate(
        &self,
        username: &str,
        terminal: &mut dyn Terminal,
    ) -> Result<Grant, Box<dyn std::error::Error + Send + Sync>> {
        let cert = ManualAuthenticator::authenticate(self, username, terminal)?;
        Ok(Grant::Fallback {
            key_id: cert.key_id().to_string(),
        })
    }
}
