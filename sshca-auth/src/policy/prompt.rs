use regex::Regex;
use serde::{Serialize, Serializer};

use crate::identity::KeyId;

/// Message shown before a certificate's liveness challenge when a key ID
/// property matches.
///
/// Written in the policy as `Prompt <property>=<regex> <message>`.
#[derive(Debug, Clone, Serialize)]
pub struct PromptRule {
    pub property: String,
    #[serde(serialize_with = "serialize_regex")]
    pub pattern: Regex,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PromptRuleError {
    #[error("prompt has no message")]
    MissingMessage,

    #[error("prompt condition has no '='")]
    MissingCondition,

    #[error("invalid prompt pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl PromptRule {
    /// Parse the value of a `Prompt` directive.
    ///
    /// # Errors
    ///
    /// Fails when the message or the `=` is missing, or the pattern does not
    /// compile.
    pub fn parse(raw: &str) -> Result<Self, PromptRuleError> {
        let (condition, message) = raw.split_once(' ').ok_or(PromptRuleError::MissingMessage)?;
        let (property, pattern) = condition
            .split_once('=')
            .ok_or(PromptRuleError::MissingCondition)?;
        Ok(Self {
            property: property.to_string(),
            pattern: Regex::new(pattern)?,
            message: message.to_string(),
        })
    }

    #[must_use]
    pub fn matches(&self, key_id: &KeyId) -> bool {
        self.pattern.is_match(&key_id.property(&self.property))
    }
}

impl PartialEq for PromptRule {
    fn eq(&self, other: &Self) -> bool {
        self.property == other.property
            && self.pattern.as_str() == other.pattern.as_str()
            && self.message == other.message
    }
}

fn serialize_regex<S: Serializer>(re: &Regex, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(re.as_str())
}
