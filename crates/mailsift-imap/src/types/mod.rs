//! Core IMAP types.
//!
//! Fundamental protocol types used throughout the library, following
//! RFC 3501 (`IMAP4rev1`) and the extensions this crate speaks (IDLE, ID,
//! QUOTA, UIDPLUS).

#![allow(clippy::missing_const_for_fn)]

mod capability;
mod flags;
mod identifiers;
mod mailbox;
mod quota;
mod response_code;
mod sequence;

pub use capability::{Capability, Status};
pub use flags::{Flag, Flags};
pub use identifiers::{SeqNum, Tag, Uid, UidValidity};
pub use mailbox::{ListResponse, Mailbox, MailboxAttribute, MailboxStatus};
pub use quota::{Quota, QuotaResource};
pub use response_code::ResponseCode;
pub use sequence::SequenceSet;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifiers_reject_zero() {
        assert!(SeqNum::new(0).is_none());
        assert!(Uid::new(0).is_none());
        assert!(UidValidity::new(0).is_none());
        assert_eq!(SeqNum::new(42).unwrap().get(), 42);
    }

    #[test]
    fn test_capability_parse() {
        assert_eq!(Capability::parse("IMAP4rev1"), Capability::Imap4Rev1);
        assert_eq!(Capability::parse("idle"), Capability::Idle);
        assert_eq!(Capability::parse("QUOTA"), Capability::Quota);
        assert_eq!(
            Capability::parse("AUTH=XOAUTH2"),
            Capability::Auth("XOAUTH2".to_string())
        );
    }

    #[test]
    fn test_flag_parse_case_insensitive_standard() {
        assert_eq!(Flag::parse("\\SEEN"), Flag::Seen);
        assert_eq!(Flag::parse("\\seen"), Flag::Seen);
        assert_eq!(Flag::parse("Junk"), Flag::Keyword("Junk".to_string()));
    }

    #[test]
    fn test_sequence_set_display() {
        assert_eq!(SequenceSet::single(1).unwrap().to_string(), "1");
        assert_eq!(SequenceSet::range(1, 10).unwrap().to_string(), "1:10");
        assert_eq!(SequenceSet::All.to_string(), "*");
    }
}
