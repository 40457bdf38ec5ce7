//! Typed response value tree.
//!
//! One IMAP response value parsed into a tagged sum so consumers pattern
//! match instead of indexing into loosely-typed nests. Used for ID and
//! QUOTA payloads and exposed on the command response bundle for
//! extension data the core parser has no dedicated shape for.

use crate::parser::lexer::{Lexer, Token};
use crate::{Error, Result};

/// A parsed IMAP value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Bare atom.
    Atom(String),
    /// Number.
    Number(u32),
    /// Quoted string.
    String(String),
    /// Literal payload.
    Literal(Vec<u8>),
    /// NIL.
    Nil,
    /// Parenthesised list; nests arbitrarily.
    List(Vec<Value>),
    /// `[bracketed]` section (`[HEADER.FIELDS (...)]` style).
    Bracketed(Vec<Value>),
}

impl Value {
    /// Returns the value as a string when it is an atom, string, or
    /// UTF-8 literal.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Atom(s) | Self::String(s) => Some(s),
            Self::Literal(data) => std::str::from_utf8(data).ok(),
            _ => None,
        }
    }

    /// Returns the value as a number.
    #[must_use]
    pub const fn as_number(&self) -> Option<u32> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the child values of a list or bracketed section.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) | Self::Bracketed(items) => Some(items),
            _ => None,
        }
    }
}

/// Reads a single value at the current lexer position.
///
/// # Errors
///
/// Returns a parse error on unbalanced lists or unexpected tokens.
pub fn read_value(lexer: &mut Lexer<'_>) -> Result<Value> {
    match lexer.next_token()? {
        Token::Atom(s) => Ok(Value::Atom(s.to_string())),
        Token::Number(n) => Ok(Value::Number(n)),
        Token::QuotedString(s) => Ok(Value::String(s)),
        Token::Literal(data) => Ok(Value::Literal(data)),
        Token::Nil => Ok(Value::Nil),
        Token::LParen => read_items(lexer, Token::RParen).map(Value::List),
        Token::LBracket => read_items(lexer, Token::RBracket).map(Value::Bracketed),
        token => Err(Error::Parse {
            position: lexer.position(),
            message: format!("expected value, got {token:?}"),
        }),
    }
}

/// Reads the remaining values on a line (until CRLF or EOF).
///
/// # Errors
///
/// Returns a parse error if a value is malformed.
pub fn read_values(lexer: &mut Lexer<'_>) -> Result<Vec<Value>> {
    let mut values = Vec::new();
    loop {
        match lexer.peek() {
            None | Some(b'\r') => break,
            Some(b' ') => {
                lexer.advance();
            }
            _ => values.push(read_value(lexer)?),
        }
    }
    Ok(values)
}

/// Reads values until the closing delimiter of a list.
fn read_items(lexer: &mut Lexer<'_>, close: Token<'_>) -> Result<Vec<Value>> {
    let closing = match close {
        Token::RParen => b')',
        _ => b']',
    };

    let mut items = Vec::new();
    loop {
        match lexer.peek() {
            Some(b) if b == closing => {
                lexer.advance();
                return Ok(items);
            }
            Some(b' ') => {
                lexer.advance();
            }
            None => {
                return Err(Error::Parse {
                    position: lexer.position(),
                    message: "unterminated list".to_string(),
                });
            }
            _ => items.push(read_value(lexer)?),
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    fn parse(input: &[u8]) -> Value {
        read_value(&mut Lexer::new(input)).unwrap()
    }

    #[test]
    fn test_scalars() {
        assert_eq!(parse(b"ATOM"), Value::Atom("ATOM".to_string()));
        assert_eq!(parse(b"42"), Value::Number(42));
        assert_eq!(parse(b"\"hi\""), Value::String("hi".to_string()));
        assert_eq!(parse(b"NIL"), Value::Nil);
        assert_eq!(parse(b"{2}\r\nok"), Value::Literal(b"ok".to_vec()));
    }

    #[test]
    fn test_flat_list() {
        assert_eq!(
            parse(b"(a 1 \"b\")"),
            Value::List(vec![
                Value::Atom("a".to_string()),
                Value::Number(1),
                Value::String("b".to_string()),
            ])
        );
    }

    #[test]
    fn test_nested_lists() {
        assert_eq!(
            parse(b"(a (b (c)) d)"),
            Value::List(vec![
                Value::Atom("a".to_string()),
                Value::List(vec![
                    Value::Atom("b".to_string()),
                    Value::List(vec![Value::Atom("c".to_string())]),
                ]),
                Value::Atom("d".to_string()),
            ])
        );
    }

    #[test]
    fn test_bracketed_section() {
        assert_eq!(
            parse(b"[HEADER.FIELDS (FROM TO)]"),
            Value::Bracketed(vec![
                Value::Atom("HEADER.FIELDS".to_string()),
                Value::List(vec![
                    Value::Atom("FROM".to_string()),
                    Value::Atom("TO".to_string()),
                ]),
            ])
        );
    }

    #[test]
    fn test_unbalanced_list_is_error() {
        assert!(read_value(&mut Lexer::new(b"(a (b)")).is_err());
    }

    #[test]
    fn test_read_values_stops_at_crlf() {
        let mut lexer = Lexer::new(b"a 1 (b)\r\n");
        let values = read_values(&mut lexer).unwrap();
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn test_accessors() {
        assert_eq!(parse(b"x").as_str(), Some("x"));
        assert_eq!(parse(b"7").as_number(), Some(7));
        assert_eq!(parse(b"(a b)").as_list().unwrap().len(), 2);
    }
}
