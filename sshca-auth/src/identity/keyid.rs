//! Structured certificate key IDs.
//!
//! The issuing CA encodes request metadata as a JSON object in the key ID,
//! e.g. `{"prins":["alice"],"usage":0,"touchPolicy":2,"ver":1}`. Top-level
//! members are addressable as named properties.

use serde_json::{Map, Value};

/// `usage` value marking a certificate valid for SSH login only.
pub const SSH_ONLY_USAGE: u64 = 1;

/// Errors from [`KeyId::parse`].
#[derive(Debug, thiserror::Error)]
pub enum KeyIdError {
    #[error("key id is not JSON: {0}")]
    NotJson(#[from] serde_json::Error),

    #[error("key id is not a JSON object")]
    NotObject,
}

/// A decoded key ID.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyId(Map<String, Value>);

impl KeyId {
    /// Decode a certificate key ID.
    ///
    /// # Errors
    ///
    /// Returns an error unless the key ID is a JSON object.
    pub fn parse(raw: &str) -> Result<Self, KeyIdError> {
        match serde_json::from_str::<Value>(raw)? {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(KeyIdError::NotObject),
        }
    }

    /// String form of a property, or empty if absent.
    ///
    /// Strings are returned unquoted; other values as their JSON text.
    #[must_use]
    pub fn property(&self, name: &str) -> String {
        match self.0.get(name) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    /// The `usage` property, when it is a non-negative integer.
    #[must_use]
    pub fn usage(&self) -> Option<u64> {
        self.0.get("usage").and_then(Value::as_u64)
    }
}
