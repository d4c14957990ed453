//! Trust material loaded from disk: key stores and authorized principals.

mod principals;
mod store;

pub use principals::{authorized_principals, PrincipalsFileError};
pub use store::{CredentialStore, StoreError};
