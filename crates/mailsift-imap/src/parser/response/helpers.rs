//! Parser helper functions.

use crate::parser::lexer::{Lexer, Token};
use crate::types::{
    Capability, Flag, Flags, ListResponse, Mailbox, MailboxAttribute, Quota, QuotaResource,
    ResponseCode, SeqNum, Uid, UidValidity,
};
use crate::{Error, Result};

use super::types::StatusItem;

/// Parses a `[response code]` section.
pub fn parse_response_code(lexer: &mut Lexer<'_>) -> Result<ResponseCode> {
    lexer.expect(Token::LBracket)?;

    let atom = lexer.read_atom_string()?;
    let upper = atom.to_uppercase();

    let code = match upper.as_str() {
        "ALERT" => ResponseCode::Alert,
        "PARSE" => ResponseCode::Parse,
        "READ-ONLY" => ResponseCode::ReadOnly,
        "READ-WRITE" => ResponseCode::ReadWrite,
        "TRYCREATE" => ResponseCode::TryCreate,
        "UIDNEXT" => {
            lexer.expect_space()?;
            let n = lexer.read_number()?;
            let uid = Uid::new(n).ok_or_else(|| lexer.error("invalid UID 0"))?;
            ResponseCode::UidNext(uid)
        }
        "UIDVALIDITY" => {
            lexer.expect_space()?;
            let n = lexer.read_number()?;
            let validity =
                UidValidity::new(n).ok_or_else(|| lexer.error("invalid UIDVALIDITY 0"))?;
            ResponseCode::UidValidity(validity)
        }
        "UNSEEN" => {
            lexer.expect_space()?;
            let n = lexer.read_number()?;
            let seq = SeqNum::new(n).ok_or_else(|| lexer.error("invalid sequence number 0"))?;
            ResponseCode::Unseen(seq)
        }
        "APPENDUID" => {
            lexer.expect_space()?;
            let validity = UidValidity::new(lexer.read_number()?)
                .ok_or_else(|| lexer.error("invalid UIDVALIDITY 0"))?;
            lexer.expect_space()?;
            let uid =
                Uid::new(lexer.read_number()?).ok_or_else(|| lexer.error("invalid UID 0"))?;
            ResponseCode::AppendUid {
                uidvalidity: validity,
                uid,
            }
        }
        "COPYUID" => {
            lexer.expect_space()?;
            let validity = UidValidity::new(lexer.read_number()?)
                .ok_or_else(|| lexer.error("invalid UIDVALIDITY 0"))?;
            lexer.expect_space()?;
            let source = read_until(lexer, b' ');
            lexer.expect_space()?;
            let destination = read_until(lexer, b']');
            ResponseCode::CopyUid {
                uidvalidity: validity,
                source,
                destination,
            }
        }
        "CAPABILITY" => {
            let caps = parse_capability_data(lexer)?;
            ResponseCode::Capability(caps)
        }
        "PERMANENTFLAGS" => {
            lexer.expect_space()?;
            let flags = parse_flag_list(lexer)?;
            ResponseCode::PermanentFlags(flags.into_iter().collect())
        }
        _ => {
            // Unknown code: skip its arguments.
            while lexer.peek() != Some(b']') && !lexer.is_eof() {
                lexer.advance();
            }
            ResponseCode::Unknown(atom.to_string())
        }
    };

    // Skip anything left before the closing bracket.
    while lexer.peek() != Some(b']') && !lexer.is_eof() {
        lexer.advance();
    }
    lexer.expect(Token::RBracket)?;

    Ok(code)
}

/// Parses space-separated capability atoms.
pub fn parse_capability_data(lexer: &mut Lexer<'_>) -> Result<Vec<Capability>> {
    let mut caps = Vec::new();
    while lexer.peek() == Some(b' ') {
        lexer.advance();
        if let Token::Atom(s) = lexer.next_token()? {
            caps.push(Capability::parse(s));
        }
    }
    Ok(caps)
}

/// Parses a parenthesised flag list.
pub fn parse_flag_list(lexer: &mut Lexer<'_>) -> Result<Flags> {
    lexer.expect(Token::LParen)?;

    let mut flags = Flags::new();
    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Atom(s) => flags.insert(Flag::parse(s)),
            Token::Space => {}
            token => {
                return Err(lexer.error(&format!("unexpected token in flag list: {token:?}")));
            }
        }
    }
    Ok(flags)
}

/// Parses a LIST/LSUB row: attributes, delimiter, name.
pub fn parse_list_response(lexer: &mut Lexer<'_>) -> Result<ListResponse> {
    lexer.expect(Token::LParen)?;
    let mut attributes = Vec::new();

    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Atom(s) => attributes.push(MailboxAttribute::parse(s)),
            Token::Space => {}
            token => {
                return Err(lexer.error(&format!("unexpected token in LIST attributes: {token:?}")));
            }
        }
    }

    lexer.expect_space()?;

    let delimiter = match lexer.next_token()? {
        Token::Nil => None,
        Token::QuotedString(s) => s.chars().next(),
        token => {
            return Err(lexer.error(&format!("expected delimiter, got {token:?}")));
        }
    };

    lexer.expect_space()?;
    let mailbox_name = lexer.read_astring()?;

    Ok(ListResponse {
        attributes,
        delimiter,
        mailbox: Mailbox::new(mailbox_name),
    })
}

/// Parses the identifier list of a SEARCH response.
pub fn parse_search_response(lexer: &mut Lexer<'_>) -> Result<Vec<u32>> {
    let mut numbers = Vec::new();
    while lexer.peek() == Some(b' ') {
        lexer.advance();
        if let Token::Number(n) = lexer.next_token()? {
            numbers.push(n);
        }
    }
    Ok(numbers)
}

/// Parses a STATUS row: mailbox name plus an item list.
pub fn parse_status_response(lexer: &mut Lexer<'_>) -> Result<(Mailbox, Vec<StatusItem>)> {
    let mailbox_name = lexer.read_astring()?;
    lexer.expect_space()?;
    lexer.expect(Token::LParen)?;

    let mut items = Vec::new();
    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => {}
            Token::Atom(name) => {
                lexer.expect_space()?;
                let value = lexer.read_number()?;

                let item = match name.to_uppercase().as_str() {
                    "MESSAGES" => StatusItem::Messages(value),
                    "RECENT" => StatusItem::Recent(value),
                    "UIDNEXT" => match Uid::new(value) {
                        Some(uid) => StatusItem::UidNext(uid),
                        None => continue,
                    },
                    "UIDVALIDITY" => match UidValidity::new(value) {
                        Some(v) => StatusItem::UidValidity(v),
                        None => continue,
                    },
                    "UNSEEN" => StatusItem::Unseen(value),
                    _ => continue,
                };
                items.push(item);
            }
            _ => {}
        }
    }

    Ok((Mailbox::new(mailbox_name), items))
}

/// Parses a QUOTA row: root name plus resource triplets.
pub fn parse_quota_response(lexer: &mut Lexer<'_>) -> Result<Quota> {
    let root = lexer.read_astring()?;
    lexer.expect_space()?;
    lexer.expect(Token::LParen)?;

    let mut resources = Vec::new();
    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => {}
            Token::Atom(name) => {
                lexer.expect_space()?;
                let usage = u64::from(lexer.read_number()?);
                lexer.expect_space()?;
                let limit = u64::from(lexer.read_number()?);
                resources.push(QuotaResource {
                    name: name.to_string(),
                    usage,
                    limit,
                });
            }
            token => {
                return Err(lexer.error(&format!("unexpected token in QUOTA: {token:?}")));
            }
        }
    }

    Ok(Quota { root, resources })
}

/// Parses a QUOTAROOT row: mailbox name plus zero or more root names.
pub fn parse_quota_root_response(lexer: &mut Lexer<'_>) -> Result<(Mailbox, Vec<String>)> {
    let mailbox_name = lexer.read_astring()?;

    let mut roots = Vec::new();
    while lexer.peek() == Some(b' ') {
        lexer.advance();
        roots.push(lexer.read_astring()?);
    }

    Ok((Mailbox::new(mailbox_name), roots))
}

/// Parses an ID response: a parameter list or NIL.
pub fn parse_id_response(lexer: &mut Lexer<'_>) -> Result<Option<Vec<(String, String)>>> {
    match lexer.next_token()? {
        Token::Nil => Ok(None),
        Token::LParen => {
            let mut params = Vec::new();
            loop {
                match lexer.next_token()? {
                    Token::RParen => break,
                    Token::Space => {}
                    Token::QuotedString(key) => {
                        lexer.expect_space()?;
                        let value = match lexer.next_token()? {
                            Token::QuotedString(v) => v,
                            Token::Nil => String::new(),
                            token => {
                                return Err(
                                    lexer.error(&format!("expected ID value, got {token:?}"))
                                );
                            }
                        };
                        params.push((key, value));
                    }
                    token => {
                        return Err(lexer.error(&format!("expected ID field, got {token:?}")));
                    }
                }
            }
            Ok(Some(params))
        }
        token => Err(Error::Parse {
            position: lexer.position(),
            message: format!("expected ID data, got {token:?}"),
        }),
    }
}

/// Reads text until CRLF, consuming the terminator when present.
pub fn read_text_until_crlf(lexer: &mut Lexer<'_>) -> String {
    let remaining = lexer.remaining();
    let end = remaining
        .windows(2)
        .position(|w| w == b"\r\n")
        .unwrap_or(remaining.len());

    lexer.skip(end);
    if lexer.peek() == Some(b'\r') {
        lexer.skip(2);
    }

    String::from_utf8_lossy(&remaining[..end]).to_string()
}

/// Reads raw bytes up to (not including) the given delimiter.
fn read_until(lexer: &mut Lexer<'_>, delimiter: u8) -> String {
    let remaining = lexer.remaining();
    let end = remaining
        .iter()
        .position(|&b| b == delimiter)
        .unwrap_or(remaining.len());
    lexer.skip(end);
    String::from_utf8_lossy(&remaining[..end]).to_string()
}
