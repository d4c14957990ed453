use std::iter::Peekable;

use super::lexer::{Token, TokenKind};
use super::node::{Blank, KeyValue, Node};
use super::{DecodeError, DecodeErrorKind};

/// Build nodes from a token stream, stopping at `Eof` or the first error.
pub(crate) fn parse<I>(tokens: I) -> Result<Vec<Node>, DecodeError>
where
    I: Iterator<Item = Token>,
{
    let mut tokens = tokens.peekable();
    let mut nodes = Vec::new();

    while let Some(token) = tokens.next() {
        match token.kind {
            TokenKind::Eof => break,
            TokenKind::EmptyLine => nodes.push(Node::Blank(Blank {
                comment: None,
                leading_spaces: 0,
                position: token.pos,
            })),
            TokenKind::Comment => nodes.push(Node::Blank(Blank {
                // Column of the comment text, minus the '#', minus one for 1-based columns.
                leading_spaces: token.pos.col.saturating_sub(2),
                comment: Some(token.value),
                position: token.pos,
            })),
            TokenKind::Key => nodes.push(Node::KeyValue(parse_key_value(token, &mut tokens)?)),
            TokenKind::Value => {
                return Err(DecodeError::new(
                    token.pos,
                    DecodeErrorKind::UnexpectedToken(token.to_string()),
                ))
            }
        }
    }

    Ok(nodes)
}

fn parse_key_value<I>(key: Token, tokens: &mut Peekable<I>) -> Result<KeyValue, DecodeError>
where
    I: Iterator<Item = Token>,
{
    if key.value.is_empty() {
        return Err(DecodeError::new(key.pos, DecodeErrorKind::EmptyKey));
    }

    let value = match tokens.next() {
        Some(token) if token.kind == TokenKind::Value => token,
        Some(token) => {
            return Err(DecodeError::new(
                token.pos,
                DecodeErrorKind::UnexpectedToken(token.to_string()),
            ))
        }
        None => return Err(DecodeError::new(key.pos, DecodeErrorKind::MissingValue)),
    };

    let comment = match tokens.peek() {
        Some(next) if next.kind == TokenKind::Comment && next.pos.line == value.pos.line => {
            tokens.next().map(|t| t.value)
        }
        _ => None,
    };

    Ok(KeyValue {
        key: key.value,
        value: value.value,
        comment,
        position: key.pos,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::lexer::Lexer;
    use crate::decoder::position::Position;

    fn parse_str(input: &str) -> Result<Vec<Node>, DecodeError> {
        parse(Lexer::new(input))
    }

    #[test]
    fn test_trailing_comment_attaches_to_key_value() {
        let nodes = parse_str("Filter /etc/f1 # first\n# own line\n").unwrap();
        assert_eq!(nodes.len(), 2);
        match &nodes[0] {
            Node::KeyValue(kv) => {
                assert_eq!(kv.key, "Filter");
                assert_eq!(kv.comment.as_deref(), Some(" first"));
            }
            other => panic!("expected key/value, got {other:?}"),
        }
        assert!(matches!(&nodes[1], Node::Blank(b) if b.comment.as_deref() == Some(" own line")));
    }

    #[test]
    fn test_comment_leading_spaces() {
        let nodes = parse_str("   #indented\n").unwrap();
        match &nodes[0] {
            Node::Blank(blank) => {
                assert_eq!(blank.leading_spaces, 3);
                assert_eq!(blank.position, Position::new(1, 5));
            }
            other => panic!("expected blank, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_key_is_rejected() {
        let err = parse_str("Debug yes\n= no\n").unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::EmptyKey);
        assert_eq!(err.position, Position::new(2, 1));
    }

    #[test]
    fn test_key_at_eof_has_empty_value() {
        let nodes = parse_str("Debug").unwrap();
        assert!(matches!(&nodes[0], Node::KeyValue(kv) if kv.value.is_empty()));
    }

    #[test]
    fn test_stray_value_token_is_rejected() {
        let tokens = vec![
            Token {
                kind: TokenKind::Value,
                value: "orphan".into(),
                pos: Position::new(1, 1),
            },
            Token {
                kind: TokenKind::Eof,
                value: String::new(),
                pos: Position::new(1, 7),
            },
        ];
        let err = parse(tokens.into_iter()).unwrap_err();
        assert_eq!(
            err.kind,
            DecodeErrorKind::UnexpectedToken("\"orphan\"".into())
        );
    }

    #[test]
    fn test_key_without_value_token() {
        let tokens = vec![Token {
            kind: TokenKind::Key,
            value: "Debug".into(),
            pos: Position::new(3, 1),
        }];
        let err = parse(tokens.into_iter()).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::MissingValue);
        assert_eq!(err.position, Position::new(3, 1));
    }
}
