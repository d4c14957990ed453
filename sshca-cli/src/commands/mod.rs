//! CLI commands.

pub mod filter;
pub mod manual;
pub mod policy;
pub mod respond;
