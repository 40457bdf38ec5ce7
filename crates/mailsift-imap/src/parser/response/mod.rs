//! IMAP response parser.
//!
//! Dispatches complete response lines (tagged, untagged, continuation)
//! into typed data per the RFC 3501 grammar.

#![allow(clippy::missing_errors_doc)]

mod fetch;
mod helpers;
mod types;

pub use types::{BodyStructure, Envelope, EnvelopeAddress, FetchItem, StatusItem, UntaggedResponse};

use crate::parser::lexer::{Lexer, Token};
use crate::parser::value::read_values;
use crate::types::{ResponseCode, SeqNum, Status, Tag};
use crate::{Error, Result};

use helpers::{
    parse_capability_data, parse_id_response, parse_list_response, parse_quota_response,
    parse_quota_root_response, parse_search_response, parse_status_response, read_text_until_crlf,
};

pub(crate) use helpers::parse_flag_list;

/// A parsed IMAP response.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Tagged response (command completion).
    Tagged {
        /// The command tag.
        tag: Tag,
        /// Completion status.
        status: Status,
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// Untagged response (server data).
    Untagged(UntaggedResponse),
    /// Continuation request (`+`).
    Continuation {
        /// Optional text after the `+`.
        text: Option<String>,
    },
}

/// Response parser.
pub struct ResponseParser;

impl ResponseParser {
    /// Parses one complete response.
    pub fn parse(input: &[u8]) -> Result<Response> {
        let mut lexer = Lexer::new(input);

        match lexer.next_token()? {
            Token::Asterisk => Self::parse_untagged(&mut lexer),
            Token::Plus => Self::parse_continuation(&mut lexer),
            Token::Atom(tag) => Self::parse_tagged(&mut lexer, tag),
            token => Err(Error::Parse {
                position: 0,
                message: format!("expected *, +, or tag, got {token:?}"),
            }),
        }
    }

    /// Parses a tagged completion line.
    fn parse_tagged(lexer: &mut Lexer<'_>, tag_str: &str) -> Result<Response> {
        lexer.expect_space()?;

        let status = Self::parse_status(lexer)?;
        lexer.expect_space()?;

        let (code, text) = Self::parse_resp_text(lexer)?;

        Ok(Response::Tagged {
            tag: Tag::new(tag_str),
            status,
            code,
            text,
        })
    }

    /// Parses an untagged data line.
    #[allow(clippy::too_many_lines)]
    fn parse_untagged(lexer: &mut Lexer<'_>) -> Result<Response> {
        lexer.expect_space()?;

        match lexer.next_token()? {
            Token::Atom(s) => {
                let upper = s.to_uppercase();
                match upper.as_str() {
                    "OK" => {
                        lexer.expect_space()?;
                        let (code, text) = Self::parse_resp_text(lexer)?;
                        Ok(Response::Untagged(UntaggedResponse::Ok { code, text }))
                    }
                    "NO" => {
                        lexer.expect_space()?;
                        let (code, text) = Self::parse_resp_text(lexer)?;
                        Ok(Response::Untagged(UntaggedResponse::No { code, text }))
                    }
                    "BAD" => {
                        lexer.expect_space()?;
                        let (code, text) = Self::parse_resp_text(lexer)?;
                        Ok(Response::Untagged(UntaggedResponse::Bad { code, text }))
                    }
                    "PREAUTH" => {
                        lexer.expect_space()?;
                        let (code, text) = Self::parse_resp_text(lexer)?;
                        Ok(Response::Untagged(UntaggedResponse::PreAuth { code, text }))
                    }
                    "BYE" => {
                        lexer.expect_space()?;
                        let (code, text) = Self::parse_resp_text(lexer)?;
                        Ok(Response::Untagged(UntaggedResponse::Bye { code, text }))
                    }
                    "CAPABILITY" => {
                        let caps = parse_capability_data(lexer)?;
                        Ok(Response::Untagged(UntaggedResponse::Capability(caps)))
                    }
                    "FLAGS" => {
                        lexer.expect_space()?;
                        let flags = parse_flag_list(lexer)?;
                        Ok(Response::Untagged(UntaggedResponse::Flags(flags)))
                    }
                    "LIST" => {
                        lexer.expect_space()?;
                        let list = parse_list_response(lexer)?;
                        Ok(Response::Untagged(UntaggedResponse::List(list)))
                    }
                    "LSUB" => {
                        lexer.expect_space()?;
                        let list = parse_list_response(lexer)?;
                        Ok(Response::Untagged(UntaggedResponse::Lsub(list)))
                    }
                    "SEARCH" => {
                        let ids = parse_search_response(lexer)?;
                        Ok(Response::Untagged(UntaggedResponse::Search(ids)))
                    }
                    "STATUS" => {
                        lexer.expect_space()?;
                        let (mailbox, items) = parse_status_response(lexer)?;
                        Ok(Response::Untagged(UntaggedResponse::Status {
                            mailbox,
                            items,
                        }))
                    }
                    "QUOTA" => {
                        lexer.expect_space()?;
                        let quota = parse_quota_response(lexer)?;
                        Ok(Response::Untagged(UntaggedResponse::Quota(quota)))
                    }
                    "QUOTAROOT" => {
                        lexer.expect_space()?;
                        let (mailbox, roots) = parse_quota_root_response(lexer)?;
                        Ok(Response::Untagged(UntaggedResponse::QuotaRoot {
                            mailbox,
                            roots,
                        }))
                    }
                    "ID" => {
                        lexer.expect_space()?;
                        let params = parse_id_response(lexer)?;
                        Ok(Response::Untagged(UntaggedResponse::Id(params)))
                    }
                    _ => {
                        // Unknown untagged row: keep the payload as a
                        // typed value tree for extension consumers.
                        let values = read_values(lexer)?;
                        Ok(Response::Untagged(UntaggedResponse::Other {
                            keyword: s.to_string(),
                            values,
                        }))
                    }
                }
            }
            Token::Number(n) => {
                lexer.expect_space()?;
                let keyword = lexer.read_atom_string()?;
                let upper = keyword.to_uppercase();

                match upper.as_str() {
                    "EXISTS" => Ok(Response::Untagged(UntaggedResponse::Exists(n))),
                    "RECENT" => Ok(Response::Untagged(UntaggedResponse::Recent(n))),
                    "EXPUNGE" => {
                        let seq = SeqNum::new(n)
                            .ok_or_else(|| lexer.error("invalid sequence number 0"))?;
                        Ok(Response::Untagged(UntaggedResponse::Expunge(seq)))
                    }
                    "FETCH" => {
                        let seq = SeqNum::new(n)
                            .ok_or_else(|| lexer.error("invalid sequence number 0"))?;
                        lexer.expect_space()?;
                        let items = fetch::parse_fetch_response(lexer)?;
                        Ok(Response::Untagged(UntaggedResponse::Fetch { seq, items }))
                    }
                    _ => Err(Error::Parse {
                        position: lexer.position(),
                        message: format!("unknown message data: {keyword}"),
                    }),
                }
            }
            token => Err(Error::Parse {
                position: lexer.position(),
                message: format!("unexpected token in untagged response: {token:?}"),
            }),
        }
    }

    /// Parses a continuation line.
    fn parse_continuation(lexer: &mut Lexer<'_>) -> Result<Response> {
        if lexer.peek() == Some(b' ') {
            lexer.advance();
        }
        let text = read_text_until_crlf(lexer);
        Ok(Response::Continuation {
            text: if text.is_empty() { None } else { Some(text) },
        })
    }

    /// Parses a status keyword.
    fn parse_status(lexer: &mut Lexer<'_>) -> Result<Status> {
        let s = lexer.read_atom_string()?;
        match s.to_uppercase().as_str() {
            "OK" => Ok(Status::Ok),
            "NO" => Ok(Status::No),
            "BAD" => Ok(Status::Bad),
            "PREAUTH" => Ok(Status::PreAuth),
            "BYE" => Ok(Status::Bye),
            _ => Err(lexer.error(&format!("invalid status: {s}"))),
        }
    }

    /// Parses response text with its optional `[code]`.
    fn parse_resp_text(lexer: &mut Lexer<'_>) -> Result<(Option<ResponseCode>, String)> {
        let code = if lexer.peek() == Some(b'[') {
            Some(helpers::parse_response_code(lexer)?)
        } else {
            None
        };

        if lexer.peek() == Some(b' ') {
            lexer.advance();
        }

        let text = read_text_until_crlf(lexer);
        Ok((code, text))
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
    use crate::parser::value::Value;
    use crate::types::{Capability, Flag, MailboxAttribute, ResponseCode};

    use super::*;

    #[test]
    fn test_untagged_ok() {
        let response = ResponseParser::parse(b"* OK IMAP4rev1 server ready\r\n").unwrap();
        match response {
            Response::Untagged(UntaggedResponse::Ok { code, text }) => {
                assert!(code.is_none());
                assert_eq!(text, "IMAP4rev1 server ready");
            }
            _ => panic!("expected untagged OK"),
        }
    }

    #[test]
    fn test_tagged_ok() {
        let response = ResponseParser::parse(b"A001 OK LOGIN completed\r\n").unwrap();
        match response {
            Response::Tagged {
                tag, status, text, ..
            } => {
                assert_eq!(tag.as_str(), "A001");
                assert_eq!(status, Status::Ok);
                assert_eq!(text, "LOGIN completed");
            }
            _ => panic!("expected tagged response"),
        }
    }

    #[test]
    fn test_tagged_no() {
        let response = ResponseParser::parse(b"A002 NO [TRYCREATE] no such mailbox\r\n").unwrap();
        match response {
            Response::Tagged { status, code, .. } => {
                assert_eq!(status, Status::No);
                assert_eq!(code, Some(ResponseCode::TryCreate));
            }
            _ => panic!("expected tagged response"),
        }
    }

    #[test]
    fn test_capability() {
        let response = ResponseParser::parse(b"* CAPABILITY IMAP4rev1 IDLE QUOTA\r\n").unwrap();
        match response {
            Response::Untagged(UntaggedResponse::Capability(caps)) => {
                assert!(caps.contains(&Capability::Imap4Rev1));
                assert!(caps.contains(&Capability::Idle));
                assert!(caps.contains(&Capability::Quota));
            }
            _ => panic!("expected capability"),
        }
    }

    #[test]
    fn test_exists_and_expunge() {
        match ResponseParser::parse(b"* 23 EXISTS\r\n").unwrap() {
            Response::Untagged(UntaggedResponse::Exists(n)) => assert_eq!(n, 23),
            _ => panic!("expected EXISTS"),
        }
        match ResponseParser::parse(b"* 3 EXPUNGE\r\n").unwrap() {
            Response::Untagged(UntaggedResponse::Expunge(seq)) => assert_eq!(seq.get(), 3),
            _ => panic!("expected EXPUNGE"),
        }
    }

    #[test]
    fn test_flags() {
        let response = ResponseParser::parse(b"* FLAGS (\\Seen \\Answered)\r\n").unwrap();
        match response {
            Response::Untagged(UntaggedResponse::Flags(flags)) => {
                assert!(flags.contains(&Flag::Seen));
                assert!(flags.contains(&Flag::Answered));
            }
            _ => panic!("expected FLAGS"),
        }
    }

    #[test]
    fn test_list_row() {
        let response =
            ResponseParser::parse(b"* LIST (\\HasChildren) \"/\" \"INBOX\"\r\n").unwrap();
        match response {
            Response::Untagged(UntaggedResponse::List(list)) => {
                assert!(list.attributes.contains(&MailboxAttribute::HasChildren));
                assert_eq!(list.delimiter, Some('/'));
                assert_eq!(list.mailbox.as_str(), "INBOX");
            }
            _ => panic!("expected LIST"),
        }
    }

    #[test]
    fn test_lsub_row() {
        let response =
            ResponseParser::parse(b"* LSUB (\\HasNoChildren) \"/\" \"Sent\"\r\n").unwrap();
        assert!(matches!(
            response,
            Response::Untagged(UntaggedResponse::Lsub(list)) if list.mailbox.as_str() == "Sent"
        ));
    }

    #[test]
    fn test_search_row() {
        let response = ResponseParser::parse(b"* SEARCH 1 2 3 5 8 13\r\n").unwrap();
        match response {
            Response::Untagged(UntaggedResponse::Search(ids)) => {
                assert_eq!(ids, vec![1, 2, 3, 5, 8, 13]);
            }
            _ => panic!("expected SEARCH"),
        }
    }

    #[test]
    fn test_empty_search_row() {
        let response = ResponseParser::parse(b"* SEARCH\r\n").unwrap();
        assert!(matches!(
            response,
            Response::Untagged(UntaggedResponse::Search(ids)) if ids.is_empty()
        ));
    }

    #[test]
    fn test_continuation() {
        let response = ResponseParser::parse(b"+ idling\r\n").unwrap();
        assert!(matches!(
            response,
            Response::Continuation { text: Some(t) } if t == "idling"
        ));

        let response = ResponseParser::parse(b"+\r\n").unwrap();
        assert!(matches!(response, Response::Continuation { text: None }));
    }

    #[test]
    fn test_uidvalidity_code() {
        let response =
            ResponseParser::parse(b"* OK [UIDVALIDITY 1234567890] UIDs valid\r\n").unwrap();
        match response {
            Response::Untagged(UntaggedResponse::Ok { code, .. }) => match code {
                Some(ResponseCode::UidValidity(v)) => assert_eq!(v.get(), 1234567890),
                _ => panic!("expected UIDVALIDITY code"),
            },
            _ => panic!("expected untagged OK"),
        }
    }

    #[test]
    fn test_appenduid_code() {
        let response =
            ResponseParser::parse(b"A003 OK [APPENDUID 38505 3955] APPEND completed\r\n").unwrap();
        match response {
            Response::Tagged { code, .. } => match code {
                Some(ResponseCode::AppendUid { uidvalidity, uid }) => {
                    assert_eq!(uidvalidity.get(), 38505);
                    assert_eq!(uid.get(), 3955);
                }
                _ => panic!("expected APPENDUID"),
            },
            _ => panic!("expected tagged"),
        }
    }

    #[test]
    fn test_fetch_row() {
        let response =
            ResponseParser::parse(b"* 1 FETCH (FLAGS (\\Seen) UID 12345)\r\n").unwrap();
        match response {
            Response::Untagged(UntaggedResponse::Fetch { seq, items }) => {
                assert_eq!(seq.get(), 1);
                assert!(items
                    .iter()
                    .any(|i| matches!(i, FetchItem::Uid(u) if u.get() == 12345)));
            }
            _ => panic!("expected FETCH"),
        }
    }

    #[test]
    fn test_quota_row() {
        let response = ResponseParser::parse(b"* QUOTA \"\" (STORAGE 10 512)\r\n").unwrap();
        match response {
            Response::Untagged(UntaggedResponse::Quota(quota)) => {
                assert_eq!(quota.root, "");
                assert_eq!(quota.resources[0].name, "STORAGE");
                assert_eq!(quota.resources[0].usage, 10);
                assert_eq!(quota.resources[0].limit, 512);
            }
            _ => panic!("expected QUOTA"),
        }
    }

    #[test]
    fn test_quotaroot_row() {
        let response = ResponseParser::parse(b"* QUOTAROOT INBOX \"\"\r\n").unwrap();
        match response {
            Response::Untagged(UntaggedResponse::QuotaRoot { mailbox, roots }) => {
                assert_eq!(mailbox.as_str(), "INBOX");
                assert_eq!(roots, vec![String::new()]);
            }
            _ => panic!("expected QUOTAROOT"),
        }
    }

    #[test]
    fn test_id_row() {
        let response =
            ResponseParser::parse(b"* ID (\"name\" \"Dovecot\" \"version\" \"2.3\")\r\n").unwrap();
        match response {
            Response::Untagged(UntaggedResponse::Id(Some(params))) => {
                assert_eq!(params[0], ("name".to_string(), "Dovecot".to_string()));
                assert_eq!(params[1], ("version".to_string(), "2.3".to_string()));
            }
            _ => panic!("expected ID"),
        }

        let response = ResponseParser::parse(b"* ID NIL\r\n").unwrap();
        assert!(matches!(
            response,
            Response::Untagged(UntaggedResponse::Id(None))
        ));
    }

    #[test]
    fn test_unknown_untagged_kept_as_values() {
        let response = ResponseParser::parse(b"* XLIST (\\Inbox) \"/\" \"INBOX\"\r\n").unwrap();
        match response {
            Response::Untagged(UntaggedResponse::Other { keyword, values }) => {
                assert_eq!(keyword, "XLIST");
                assert_eq!(values.len(), 3);
                assert!(matches!(&values[0], Value::List(items) if items.len() == 1));
            }
            _ => panic!("expected Other"),
        }
    }

    #[test]
    fn test_bye() {
        let response = ResponseParser::parse(b"* BYE shutting down\r\n").unwrap();
        assert!(matches!(
            response,
            Response::Untagged(UntaggedResponse::Bye { text, .. }) if text == "shutting down"
        ));
    }
}
