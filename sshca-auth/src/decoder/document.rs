use std::fmt;

use super::node::{KeyValue, Node};

/// A decoded policy file: every line in file order.
///
/// Key lookups ignore ASCII case. Unknown keys are kept, so re-serializing a
/// document preserves directives this crate does not interpret.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    #[must_use]
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// First entry named `key`.
    #[must_use]
    pub fn key_value(&self, key: &str) -> Option<&KeyValue> {
        self.nodes.iter().find_map(|node| match node {
            Node::KeyValue(kv) if kv.key.eq_ignore_ascii_case(key) => Some(kv),
            _ => None,
        })
    }

    /// Every entry named `key`, in file order.
    pub fn key_values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a KeyValue> + 'a {
        self.nodes.iter().filter_map(move |node| match node {
            Node::KeyValue(kv) if kv.key.eq_ignore_ascii_case(key) => Some(kv),
            _ => None,
        })
    }

    /// Trimmed value of the first entry named `key`, or empty.
    #[must_use]
    pub fn get(&self, key: &str) -> String {
        self.key_value(key)
            .map(|kv| kv.value.trim().to_string())
            .unwrap_or_default()
    }

    /// Trimmed values of every entry named `key`, in file order.
    #[must_use]
    pub fn get_all(&self, key: &str) -> Vec<String> {
        self.key_values(key)
            .map(|kv| kv.value.trim().to_string())
            .collect()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            writeln!(f, "{node}")?;
        }
        Ok(())
    }
}
