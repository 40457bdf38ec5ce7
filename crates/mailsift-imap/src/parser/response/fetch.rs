//! FETCH response parsing.

use crate::parser::lexer::{Lexer, Token};
use crate::types::Uid;
use crate::Result;

use super::parse_flag_list;
use super::types::{BodyStructure, Envelope, EnvelopeAddress, FetchItem};

/// Parses the parenthesised item list of a FETCH response.
pub fn parse_fetch_response(lexer: &mut Lexer<'_>) -> Result<Vec<FetchItem>> {
    lexer.expect(Token::LParen)?;

    let mut items = Vec::new();

    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => {}
            Token::Atom(name) => {
                let upper = name.to_uppercase();
                match upper.as_str() {
                    "FLAGS" => {
                        lexer.expect_space()?;
                        let flags = parse_flag_list(lexer)?;
                        items.push(FetchItem::Flags(flags));
                    }
                    "UID" => {
                        lexer.expect_space()?;
                        let n = lexer.read_number()?;
                        if let Some(uid) = Uid::new(n) {
                            items.push(FetchItem::Uid(uid));
                        }
                    }
                    "RFC822.SIZE" => {
                        lexer.expect_space()?;
                        let size = lexer.read_number()?;
                        items.push(FetchItem::Rfc822Size(size));
                    }
                    "INTERNALDATE" => {
                        lexer.expect_space()?;
                        if let Token::QuotedString(date) = lexer.next_token()? {
                            items.push(FetchItem::InternalDate(date));
                        }
                    }
                    "ENVELOPE" => {
                        lexer.expect_space()?;
                        let envelope = parse_envelope(lexer)?;
                        items.push(FetchItem::Envelope(Box::new(envelope)));
                    }
                    "BODYSTRUCTURE" => {
                        lexer.expect_space()?;
                        let structure = parse_body_structure(lexer)?;
                        items.push(FetchItem::BodyStructure(structure));
                    }
                    "BODY" => {
                        // Either BODY[section]<origin> data or a bare BODY
                        // structure (servers answer BODYSTRUCTURE requests
                        // with either keyword).
                        if lexer.peek() == Some(b' ') {
                            lexer.advance();
                            let structure = parse_body_structure(lexer)?;
                            items.push(FetchItem::BodyStructure(structure));
                        } else {
                            let (section, origin) = parse_body_section_and_origin(lexer)?;
                            lexer.expect_space()?;
                            let data = match lexer.next_token()? {
                                Token::Literal(d) => Some(d),
                                Token::QuotedString(s) => Some(s.into_bytes()),
                                _ => None,
                            };
                            items.push(FetchItem::Body {
                                section,
                                origin,
                                data,
                            });
                        }
                    }
                    "RFC822" | "RFC822.HEADER" | "RFC822.TEXT" => {
                        let section = match upper.as_str() {
                            "RFC822.HEADER" => Some("HEADER".to_string()),
                            "RFC822.TEXT" => Some("TEXT".to_string()),
                            _ => None,
                        };
                        lexer.expect_space()?;
                        let data = match lexer.next_token()? {
                            Token::Literal(d) => Some(d),
                            Token::QuotedString(s) => Some(s.into_bytes()),
                            _ => None,
                        };
                        items.push(FetchItem::Body {
                            section,
                            origin: None,
                            data,
                        });
                    }
                    _ => {
                        skip_fetch_item(lexer)?;
                    }
                }
            }
            _ => {}
        }
    }

    Ok(items)
}

/// Parses the optional `[section]` and `<origin>` suffix of a BODY item.
fn parse_body_section_and_origin(lexer: &mut Lexer<'_>) -> Result<(Option<String>, Option<u32>)> {
    let mut section = None;
    let mut origin = None;

    if lexer.peek() == Some(b'[') {
        lexer.advance();
        let mut buf = String::new();
        loop {
            match lexer.peek() {
                Some(b']') => {
                    lexer.advance();
                    break;
                }
                Some(b) => {
                    buf.push(b as char);
                    lexer.advance();
                }
                None => break,
            }
        }
        if !buf.is_empty() {
            section = Some(buf);
        }
    }

    if lexer.peek() == Some(b'<') {
        lexer.advance();
        let mut buf = String::new();
        loop {
            match lexer.peek() {
                Some(b'>') => {
                    lexer.advance();
                    break;
                }
                Some(b) if b.is_ascii_digit() => {
                    buf.push(b as char);
                    lexer.advance();
                }
                _ => break,
            }
        }
        if !buf.is_empty() {
            origin = buf.parse().ok();
        }
    }

    Ok((section, origin))
}

/// Parses an ENVELOPE structure.
pub fn parse_envelope(lexer: &mut Lexer<'_>) -> Result<Envelope> {
    lexer.expect(Token::LParen)?;

    let date = lexer.read_nstring()?;
    lexer.expect_space()?;
    let subject = lexer.read_nstring()?;
    lexer.expect_space()?;
    let from = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let sender = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let reply_to = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let to = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let cc = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let bcc = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let in_reply_to = lexer.read_nstring()?;
    lexer.expect_space()?;
    let message_id = lexer.read_nstring()?;

    lexer.expect(Token::RParen)?;

    Ok(Envelope {
        date,
        subject,
        from,
        sender,
        reply_to,
        to,
        cc,
        bcc,
        in_reply_to,
        message_id,
    })
}

/// Parses an ENVELOPE address list (NIL or a list of quadruples).
fn parse_address_list(lexer: &mut Lexer<'_>) -> Result<Vec<EnvelopeAddress>> {
    match lexer.next_token()? {
        Token::Nil => Ok(Vec::new()),
        Token::LParen => {
            let mut addresses = Vec::new();
            loop {
                match lexer.peek() {
                    Some(b')') => {
                        lexer.advance();
                        break;
                    }
                    Some(b'(') => addresses.push(parse_address(lexer)?),
                    Some(b' ') => {
                        lexer.advance();
                    }
                    _ => break,
                }
            }
            Ok(addresses)
        }
        token => Err(lexer.error(&format!("expected address list, got {token:?}"))),
    }
}

/// Parses one address quadruple.
fn parse_address(lexer: &mut Lexer<'_>) -> Result<EnvelopeAddress> {
    lexer.expect(Token::LParen)?;

    let name = lexer.read_nstring()?;
    lexer.expect_space()?;
    let adl = lexer.read_nstring()?;
    lexer.expect_space()?;
    let mailbox = lexer.read_nstring()?;
    lexer.expect_space()?;
    let host = lexer.read_nstring()?;

    lexer.expect(Token::RParen)?;

    Ok(EnvelopeAddress {
        name,
        adl,
        mailbox,
        host,
    })
}

/// Parses a BODYSTRUCTURE value.
///
/// A multipart opens with a nested part list; a single part opens with
/// its media type string. Optional extension data after the mandatory
/// fields is skipped.
pub fn parse_body_structure(lexer: &mut Lexer<'_>) -> Result<BodyStructure> {
    lexer.expect(Token::LParen)?;
    let structure = parse_body_structure_inner(lexer)?;
    skip_to_close(lexer)?;
    Ok(structure)
}

fn parse_body_structure_inner(lexer: &mut Lexer<'_>) -> Result<BodyStructure> {
    if lexer.peek() == Some(b'(') {
        // Multipart: one or more nested parts, then the subtype.
        let mut parts = Vec::new();
        while lexer.peek() == Some(b'(') {
            parts.push(parse_body_structure(lexer)?);
        }
        if lexer.peek() == Some(b' ') {
            lexer.advance();
        }
        let subtype = lexer.read_astring()?.to_lowercase();
        return Ok(BodyStructure::Multipart { parts, subtype });
    }

    let media_type = lexer.read_astring()?.to_lowercase();
    lexer.expect_space()?;
    let media_subtype = lexer.read_astring()?.to_lowercase();
    lexer.expect_space()?;

    let params = parse_body_params(lexer)?;
    lexer.expect_space()?;
    let id = lexer.read_nstring()?;
    lexer.expect_space()?;
    let description = lexer.read_nstring()?;
    lexer.expect_space()?;
    let encoding = lexer.read_astring()?;
    lexer.expect_space()?;
    let size = lexer.read_number()?;

    Ok(BodyStructure::Basic {
        media_type,
        media_subtype,
        params,
        id,
        description,
        encoding,
        size,
    })
}

/// Parses a body parameter list: NIL or `("key" "value" ...)`.
fn parse_body_params(lexer: &mut Lexer<'_>) -> Result<Vec<(String, String)>> {
    match lexer.next_token()? {
        Token::Nil => Ok(Vec::new()),
        Token::LParen => {
            let mut params = Vec::new();
            loop {
                match lexer.peek() {
                    Some(b')') => {
                        lexer.advance();
                        break;
                    }
                    Some(b' ') => {
                        lexer.advance();
                    }
                    None => break,
                    _ => {
                        let key = lexer.read_astring()?;
                        lexer.expect_space()?;
                        let value = lexer.read_astring()?;
                        params.push((key.to_lowercase(), value));
                    }
                }
            }
            Ok(params)
        }
        token => Err(lexer.error(&format!("expected body params, got {token:?}"))),
    }
}

/// Skips remaining (extension) fields until the structure's closing paren.
fn skip_to_close(lexer: &mut Lexer<'_>) -> Result<()> {
    let mut depth = 0u32;
    loop {
        match lexer.peek() {
            Some(b'(') => {
                depth += 1;
                lexer.advance();
            }
            Some(b')') => {
                lexer.advance();
                if depth == 0 {
                    return Ok(());
                }
                depth -= 1;
            }
            Some(b'"') => {
                let _ = lexer.next_token()?;
            }
            Some(b'{') => {
                let _ = lexer.next_token()?;
            }
            Some(_) => {
                lexer.advance();
            }
            None => return Ok(()),
        }
    }
}

/// Skips an unknown fetch item value.
fn skip_fetch_item(lexer: &mut Lexer<'_>) -> Result<()> {
    if lexer.peek() == Some(b' ') {
        lexer.advance();
    }

    let mut paren_depth = 0u32;
    loop {
        match lexer.peek() {
            Some(b'(') => {
                paren_depth += 1;
                lexer.advance();
            }
            Some(b')') => {
                if paren_depth == 0 {
                    break;
                }
                paren_depth -= 1;
                lexer.advance();
            }
            Some(b' ') if paren_depth == 0 => break,
            Some(b'{') => {
                let _ = lexer.next_token()?;
            }
            Some(_) => {
                lexer.advance();
            }
            None => break,
        }
    }

    Ok(())
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

    #[test]
    fn test_flags_and_uid() {
        let mut lexer = Lexer::new(b"(FLAGS (\\Seen) UID 12345)");
        let items = parse_fetch_response(&mut lexer).unwrap();

        assert!(items
            .iter()
            .any(|i| matches!(i, FetchItem::Uid(u) if u.get() == 12345)));
        assert!(items
            .iter()
            .any(|i| matches!(i, FetchItem::Flags(f) if f.is_seen())));
    }

    #[test]
    fn test_body_header_literal() {
        let mut lexer = Lexer::new(b"(BODY[HEADER] {14}\r\nSubject: x\r\n\r\n)");
        let items = parse_fetch_response(&mut lexer).unwrap();

        let data = items[0].body_section(Some("HEADER")).unwrap();
        assert_eq!(data, b"Subject: x\r\n\r\n");
    }

    #[test]
    fn test_rfc822_header_keyword_maps_to_section() {
        let mut lexer = Lexer::new(b"(RFC822.HEADER {4}\r\nX: 1)");
        let items = parse_fetch_response(&mut lexer).unwrap();
        assert!(items[0].body_section(Some("HEADER")).is_some());
    }

    #[test]
    fn test_body_nil() {
        let mut lexer = Lexer::new(b"(BODY[TEXT] NIL)");
        let items = parse_fetch_response(&mut lexer).unwrap();
        assert!(matches!(
            &items[0],
            FetchItem::Body { data: None, .. }
        ));
    }

    #[test]
    fn test_envelope() {
        let input = b"(ENVELOPE (\"Tue, 1 Jul 2003 10:52:37 +0200\" \"Hello\" ((\"John\" NIL \"john\" \"example.com\")) NIL NIL ((NIL NIL \"jane\" \"example.org\")) NIL NIL NIL \"<id@x>\"))";
        let mut lexer = Lexer::new(input);
        let items = parse_fetch_response(&mut lexer).unwrap();

        let FetchItem::Envelope(env) = &items[0] else {
            panic!("expected envelope");
        };
        assert_eq!(env.subject.as_deref(), Some("Hello"));
        assert_eq!(env.from[0].email(), Some("john@example.com".to_string()));
        assert_eq!(env.to[0].email(), Some("jane@example.org".to_string()));
        assert_eq!(env.message_id.as_deref(), Some("<id@x>"));
    }

    #[test]
    fn test_bodystructure_single_part() {
        let input = b"(BODYSTRUCTURE (\"text\" \"plain\" (\"charset\" \"utf-8\") NIL NIL \"7bit\" 42 3))";
        let mut lexer = Lexer::new(input);
        let items = parse_fetch_response(&mut lexer).unwrap();

        let FetchItem::BodyStructure(BodyStructure::Basic {
            media_type,
            media_subtype,
            params,
            encoding,
            size,
            ..
        }) = &items[0]
        else {
            panic!("expected basic body structure");
        };
        assert_eq!(media_type, "text");
        assert_eq!(media_subtype, "plain");
        assert_eq!(params[0], ("charset".to_string(), "utf-8".to_string()));
        assert_eq!(encoding, "7bit");
        assert_eq!(*size, 42);
    }

    #[test]
    fn test_bodystructure_multipart() {
        let input = b"(BODYSTRUCTURE ((\"text\" \"plain\" NIL NIL NIL \"7bit\" 10 1)(\"text\" \"html\" NIL NIL NIL \"quoted-printable\" 20 1) \"alternative\"))";
        let mut lexer = Lexer::new(input);
        let items = parse_fetch_response(&mut lexer).unwrap();

        let FetchItem::BodyStructure(BodyStructure::Multipart { parts, subtype }) = &items[0]
        else {
            panic!("expected multipart body structure");
        };
        assert_eq!(subtype, "alternative");
        assert_eq!(parts.len(), 2);
    }

    #[test]
    fn test_unknown_item_skipped() {
        let mut lexer = Lexer::new(b"(X-GM-THRID 1278455344230334865 UID 4)");
        let items = parse_fetch_response(&mut lexer).unwrap();
        assert!(items
            .iter()
            .any(|i| matches!(i, FetchItem::Uid(u) if u.get() == 4)));
    }
}
