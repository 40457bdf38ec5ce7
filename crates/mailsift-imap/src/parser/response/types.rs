//! Response data types.

use crate::parser::value::Value;
use crate::types::{Flags, Mailbox, Quota, SeqNum, Uid, UidValidity};

/// FETCH response item.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchItem {
    /// Message flags.
    Flags(Flags),
    /// Internal date.
    InternalDate(String),
    /// RFC822.SIZE.
    Rfc822Size(u32),
    /// ENVELOPE.
    Envelope(Box<Envelope>),
    /// UID.
    Uid(Uid),
    /// BODY[section] data (also carries RFC822 / RFC822.HEADER /
    /// RFC822.TEXT responses).
    Body {
        /// Section specifier, if present.
        section: Option<String>,
        /// Origin offset from a partial fetch.
        origin: Option<u32>,
        /// Body data; `None` when the server returned NIL.
        data: Option<Vec<u8>>,
    },
    /// BODYSTRUCTURE.
    BodyStructure(BodyStructure),
}

impl FetchItem {
    /// Returns body data for the given section kind, matching
    /// case-insensitively (`HEADER`, `TEXT`, or `None` for the whole
    /// message).
    #[must_use]
    pub fn body_section(&self, wanted: Option<&str>) -> Option<&[u8]> {
        match self {
            Self::Body { section, data, .. } => {
                let matches = match (section.as_deref(), wanted) {
                    (None, None) => true,
                    (Some(s), Some(w)) => s.eq_ignore_ascii_case(w),
                    _ => false,
                };
                if matches {
                    data.as_deref()
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

/// Message envelope from an ENVELOPE response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Envelope {
    /// Date header, verbatim.
    pub date: Option<String>,
    /// Subject header, verbatim (possibly RFC 2047-encoded).
    pub subject: Option<String>,
    /// From addresses.
    pub from: Vec<EnvelopeAddress>,
    /// Sender addresses.
    pub sender: Vec<EnvelopeAddress>,
    /// Reply-To addresses.
    pub reply_to: Vec<EnvelopeAddress>,
    /// To addresses.
    pub to: Vec<EnvelopeAddress>,
    /// Cc addresses.
    pub cc: Vec<EnvelopeAddress>,
    /// Bcc addresses.
    pub bcc: Vec<EnvelopeAddress>,
    /// In-Reply-To header.
    pub in_reply_to: Option<String>,
    /// Message-ID header.
    pub message_id: Option<String>,
}

/// Address quadruple from an ENVELOPE response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeAddress {
    /// Display name.
    pub name: Option<String>,
    /// Source route (obsolete).
    pub adl: Option<String>,
    /// Local part.
    pub mailbox: Option<String>,
    /// Domain part.
    pub host: Option<String>,
}

impl EnvelopeAddress {
    /// Returns the `mailbox@host` form when both halves are present.
    #[must_use]
    pub fn email(&self) -> Option<String> {
        match (&self.mailbox, &self.host) {
            (Some(m), Some(h)) => Some(format!("{m}@{h}")),
            _ => None,
        }
    }
}

/// Server-computed MIME structure from a BODYSTRUCTURE response.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyStructure {
    /// Single-part body.
    Basic {
        /// MIME type.
        media_type: String,
        /// MIME subtype.
        media_subtype: String,
        /// Body parameters (charset, name, ...).
        params: Vec<(String, String)>,
        /// Content-ID.
        id: Option<String>,
        /// Content-Description.
        description: Option<String>,
        /// Content-Transfer-Encoding.
        encoding: String,
        /// Size in bytes.
        size: u32,
    },
    /// Multipart container.
    Multipart {
        /// Child parts.
        parts: Vec<Self>,
        /// Multipart subtype (`mixed`, `alternative`, `related`, ...).
        subtype: String,
    },
}

/// STATUS response item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusItem {
    /// Total message count.
    Messages(u32),
    /// Recent message count.
    Recent(u32),
    /// Next UID.
    UidNext(Uid),
    /// UIDVALIDITY.
    UidValidity(UidValidity),
    /// Unseen count.
    Unseen(u32),
}

/// Untagged response data.
#[derive(Debug, Clone, PartialEq)]
pub enum UntaggedResponse {
    /// OK with optional response code.
    Ok {
        /// Optional response code.
        code: Option<crate::types::ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// NO with optional response code.
    No {
        /// Optional response code.
        code: Option<crate::types::ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// BAD with optional response code.
    Bad {
        /// Optional response code.
        code: Option<crate::types::ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// PREAUTH greeting.
    PreAuth {
        /// Optional response code.
        code: Option<crate::types::ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// BYE.
    Bye {
        /// Optional response code.
        code: Option<crate::types::ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// CAPABILITY listing.
    Capability(Vec<crate::types::Capability>),
    /// LIST row.
    List(crate::types::ListResponse),
    /// LSUB row.
    Lsub(crate::types::ListResponse),
    /// FLAGS declaration.
    Flags(Flags),
    /// EXISTS (message count).
    Exists(u32),
    /// RECENT count.
    Recent(u32),
    /// EXPUNGE (message removed).
    Expunge(SeqNum),
    /// FETCH data (solicited or pushed).
    Fetch {
        /// Message sequence number.
        seq: SeqNum,
        /// Fetch data items.
        items: Vec<FetchItem>,
    },
    /// SEARCH result identifiers.
    Search(Vec<u32>),
    /// STATUS row.
    Status {
        /// Mailbox name.
        mailbox: Mailbox,
        /// Status items.
        items: Vec<StatusItem>,
    },
    /// QUOTA row.
    Quota(Quota),
    /// QUOTAROOT row.
    QuotaRoot {
        /// Mailbox the roots apply to.
        mailbox: Mailbox,
        /// Quota root names.
        roots: Vec<String>,
    },
    /// ID response; `None` when the server sent NIL.
    Id(Option<Vec<(String, String)>>),
    /// Untagged row the core parser has no dedicated shape for; the
    /// payload is kept as a typed value tree.
    Other {
        /// Leading keyword.
        keyword: String,
        /// Remaining values on the line.
        values: Vec<Value>,
    },
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
    fn test_envelope_address_email() {
        let addr = EnvelopeAddress {
            name: Some("John".to_string()),
            adl: None,
            mailbox: Some("john".to_string()),
            host: Some("example.com".to_string()),
        };
        assert_eq!(addr.email(), Some("john@example.com".to_string()));

        let incomplete = EnvelopeAddress {
            name: None,
            adl: None,
            mailbox: None,
            host: Some("example.com".to_string()),
        };
        assert_eq!(incomplete.email(), None);
    }

    #[test]
    fn test_body_section_matching() {
        let item = FetchItem::Body {
            section: Some("HEADER".to_string()),
            origin: None,
            data: Some(b"Subject: x\r\n\r\n".to_vec()),
        };
        assert!(item.body_section(Some("header")).is_some());
        assert!(item.body_section(Some("TEXT")).is_none());
        assert!(item.body_section(None).is_none());
    }
}
