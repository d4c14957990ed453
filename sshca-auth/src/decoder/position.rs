//! Source positions for diagnostics.

/// A 1-indexed `(line, column)` location in the policy text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

impl Position {
    #[must_use]
    pub const fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }

    /// A position with a zero line or column was never attached to real text.
    #[must_use]
    pub fn is_invalid(&self) -> bool {
        self.line == 0 || self.col == 0
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.line, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Position::new(5, 3).to_string(), "(5, 3)");
    }

    #[test]
    fn test_invalid() {
        assert!(Position::new(0, 1).is_invalid());
        assert!(Position::new(1, 0).is_invalid());
        assert!(!Position::default().is_invalid());
    }
}
