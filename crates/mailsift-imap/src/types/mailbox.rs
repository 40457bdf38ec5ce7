//! Mailbox types.

use super::{Flags, SeqNum, Uid, UidValidity};

/// Wire-level mailbox name.
///
/// Holds the name exactly as it crosses the wire (modified UTF-7 for
/// non-ASCII folders); the UTF-8 boundary lives in the folder layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mailbox(pub String);

impl Mailbox {
    /// Creates a new mailbox name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The INBOX mailbox (case-insensitive per RFC 3501).
    #[must_use]
    pub fn inbox() -> Self {
        Self("INBOX".to_string())
    }

    /// Returns the mailbox name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mailbox status information from SELECT/EXAMINE.
#[derive(Debug, Clone, Default)]
pub struct MailboxStatus {
    /// Number of messages in the mailbox.
    pub exists: u32,
    /// Number of recent messages.
    pub recent: u32,
    /// First unseen message sequence number.
    pub unseen: Option<SeqNum>,
    /// Next UID to be assigned.
    pub uid_next: Option<Uid>,
    /// UIDVALIDITY value.
    pub uid_validity: Option<UidValidity>,
    /// Flags defined for this mailbox.
    pub flags: Flags,
    /// Flags that can be stored permanently.
    pub permanent_flags: Flags,
    /// Whether the mailbox was opened read-only.
    pub read_only: bool,
}

/// One LIST or LSUB response row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListResponse {
    /// Mailbox attributes.
    pub attributes: Vec<MailboxAttribute>,
    /// Hierarchy delimiter.
    pub delimiter: Option<char>,
    /// Wire-level mailbox name.
    pub mailbox: Mailbox,
}

/// Mailbox attributes from LIST responses.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MailboxAttribute {
    /// Mailbox cannot be selected.
    NoSelect,
    /// Mailbox has no children.
    HasNoChildren,
    /// Mailbox has children.
    HasChildren,
    /// Mailbox is marked for attention.
    Marked,
    /// Mailbox is not marked.
    Unmarked,
    /// No inferior hierarchy names exist or can be created.
    NoInferiors,
    /// Special-use: drafts.
    Drafts,
    /// Special-use: sent mail.
    Sent,
    /// Special-use: junk.
    Junk,
    /// Special-use: trash.
    Trash,
    /// Special-use: archive.
    Archive,
    /// Special-use: virtual all-mail.
    All,
    /// Special-use: flagged.
    Flagged,
    /// Unrecognised attribute, kept verbatim.
    Other(String),
}

impl MailboxAttribute {
    /// Parses a mailbox attribute atom.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "\\NOSELECT" => Self::NoSelect,
            "\\HASNOCHILDREN" => Self::HasNoChildren,
            "\\HASCHILDREN" => Self::HasChildren,
            "\\MARKED" => Self::Marked,
            "\\UNMARKED" => Self::Unmarked,
            "\\NOINFERIORS" => Self::NoInferiors,
            "\\DRAFTS" => Self::Drafts,
            "\\SENT" => Self::Sent,
            "\\JUNK" => Self::Junk,
            "\\TRASH" => Self::Trash,
            "\\ARCHIVE" => Self::Archive,
            "\\ALL" => Self::All,
            "\\FLAGGED" => Self::Flagged,
            _ => Self::Other(s.to_string()),
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

    #[test]
    fn test_inbox() {
        assert_eq!(Mailbox::inbox().as_str(), "INBOX");
    }

    #[test]
    fn test_attribute_parse() {
        assert_eq!(
            MailboxAttribute::parse("\\NoSelect"),
            MailboxAttribute::NoSelect
        );
        assert_eq!(
            MailboxAttribute::parse("\\HASCHILDREN"),
            MailboxAttribute::HasChildren
        );
        assert_eq!(
            MailboxAttribute::parse("\\X-Custom"),
            MailboxAttribute::Other("\\X-Custom".to_string())
        );
    }
}
