//! Tokenizer for the policy grammar.
//!
//! The lexer is a lazy iterator: the parser pulls one token at a time, so
//! tokens arrive in source order and nothing is left running if the parser
//! stops early.

use super::position::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    /// A line with nothing but optional whitespace.
    EmptyLine,
    /// Text after `#`, without the `#`.
    Comment,
    Key,
    Value,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) value: String,
    pub(crate) pos: Position,
}

impl Token {
    fn new(kind: TokenKind, value: String, pos: Position) -> Self {
        Self { kind, value, pos }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "EOF"),
            _ => write!(f, "{:?}", self.value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Start of a line, or between lines.
    Void,
    /// A key was just emitted; the rest of the line is its value.
    Value,
    /// A value was cut short by `#`.
    TrailingComment,
    Done,
}

pub(crate) struct Lexer {
    input: Vec<char>,
    idx: usize,
    line: usize,
    col: usize,
    state: State,
}

impl Lexer {
    pub(crate) fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            idx: 0,
            line: 1,
            col: 1,
            state: State::Void,
        }
    }

    fn pos(&self) -> Position {
        Position::new(self.line, self.col)
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.idx).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.idx += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    /// Length of the line terminator at the cursor: `\n`, `\r\n` or a lone `\r`.
    fn line_break_len(&self) -> Option<usize> {
        match self.peek()? {
            '\n' => Some(1),
            '\r' if self.input.get(self.idx + 1) == Some(&'\n') => Some(2),
            '\r' => Some(1),
            _ => None,
        }
    }

    fn consume_line_break(&mut self) -> bool {
        match self.line_break_len() {
            Some(n) => {
                for _ in 0..n {
                    self.bump();
                }
                // A lone '\r' does not advance the line counter in bump().
                if n == 1 && self.input[self.idx - 1] == '\r' {
                    self.line += 1;
                    self.col = 1;
                }
                true
            }
            None => false,
        }
    }

    fn skip_blanks(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t')) {
            self.bump();
        }
    }

    fn lex_void(&mut self) -> Token {
        loop {
            let pos = self.pos();
            if self.consume_line_break() {
                return Token::new(TokenKind::EmptyLine, String::new(), pos);
            }
            match self.peek() {
                None => {
                    self.state = State::Done;
                    return Token::new(TokenKind::Eof, String::new(), pos);
                }
                Some('#') => {
                    self.bump();
                    return self.lex_comment();
                }
                Some(' ' | '\t') => {
                    self.bump();
                }
                Some(_) => {
                    self.state = State::Value;
                    return self.lex_key();
                }
            }
        }
    }

    /// Cursor is just past `#`. Consumes through the line terminator.
    fn lex_comment(&mut self) -> Token {
        let pos = self.pos();
        let mut text = String::new();
        while self.line_break_len().is_none() {
            match self.bump() {
                Some(c) => text.push(c),
                None => break,
            }
        }
        self.consume_line_break();
        Token::new(TokenKind::Comment, text, pos)
    }

    fn lex_key(&mut self) -> Token {
        let pos = self.pos();
        let mut key = String::new();
        while let Some(c) = self.peek() {
            if matches!(c, ' ' | '\t' | '=' | '\r' | '\n') {
                break;
            }
            key.push(c);
            self.bump();
        }
        Token::new(TokenKind::Key, key, pos)
    }

    fn lex_value(&mut self) -> Token {
        self.skip_blanks();
        if self.peek() == Some('=') {
            self.bump();
            self.skip_blanks();
        }

        let pos = self.pos();
        let mut value = String::new();
        self.state = State::Void;
        loop {
            if self.consume_line_break() {
                break;
            }
            match self.peek() {
                None => break,
                Some('#') => {
                    self.bump();
                    self.state = State::TrailingComment;
                    break;
                }
                Some(c) => {
                    value.push(c);
                    self.bump();
                }
            }
        }
        Token::new(TokenKind::Value, value, pos)
    }
}

impl Iterator for Lexer {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        match self.state {
            State::Void => Some(self.lex_void()),
            State::Value => Some(self.lex_value()),
            State::TrailingComment => {
                self.state = State::Void;
                Some(self.lex_comment())
            }
            State::Done => None,
        }
    }
}
