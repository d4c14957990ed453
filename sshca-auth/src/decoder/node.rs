use std::fmt;

use super::position::Position;

/// One line of a policy document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    KeyValue(KeyValue),
    Blank(Blank),
}

impl Node {
    #[must_use]
    pub fn position(&self) -> Position {
        match self {
            Self::KeyValue(kv) => kv.position,
            Self::Blank(blank) => blank.position,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyValue(kv) => kv.fmt(f),
            Self::Blank(blank) => blank.fmt(f),
        }
    }
}

/// `key value [# comment]`. The key is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
    /// Trailing comment text without the `#`.
    pub comment: Option<String>,
    pub position: Position,
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let line = format!("{} {}", self.key, self.value);
        f.write_str(line.trim())?;
        if let Some(comment) = &self.comment {
            write!(f, " #{comment}")?;
        }
        Ok(())
    }
}

/// An empty line or a comment-only line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blank {
    /// Comment text without the `#`; `None` for an empty line.
    pub comment: Option<String>,
    pub leading_spaces: usize,
    pub position: Position,
}

impl fmt::Display for Blank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.comment {
            None => Ok(()),
            Some(comment) => write!(f, "{:width$}#{comment}", "", width = self.leading_spaces),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_value_display() {
        let kv = KeyValue {
            key: "Filter".into(),
            value: "/etc/f1 ".into(),
            comment: Some(" first".into()),
            position: Position::default(),
        };
        assert_eq!(kv.to_string(), "Filter /etc/f1 # first");

        let bare = KeyValue {
            key: "Debug".into(),
            value: String::new(),
            comment: None,
            position: Position::default(),
        };
        assert_eq!(bare.to_string(), "Debug");
    }

    #[test]
    fn test_blank_display() {
        let empty = Blank {
            comment: None,
            leading_spaces: 0,
            position: Position::default(),
        };
        assert_eq!(empty.to_string(), "");

        let indented = Blank {
            comment: Some(" note".into()),
            leading_spaces: 2,
            position: Position::default(),
        };
        assert_eq!(indented.to_string(), "  # note");

        let bare_hash = Blank {
            comment: Some(String::new()),
            leading_spaces: 0,
            position: Position::default(),
        };
        assert_eq!(bare_hash.to_string(), "#");
    }
}
