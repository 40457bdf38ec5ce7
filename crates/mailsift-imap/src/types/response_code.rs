//! Response codes carried in `[bracketed]` sections of status lines.

use super::{Capability, Flag, SeqNum, Uid, UidValidity};

/// Response code from an OK/NO/BAD line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseCode {
    /// ALERT: human-readable message that must be shown to the user.
    Alert,
    /// CAPABILITY listing embedded in a status line.
    Capability(Vec<Capability>),
    /// PARSE: error parsing a message on the server.
    Parse,
    /// PERMANENTFLAGS: flags that can be changed permanently.
    PermanentFlags(Vec<Flag>),
    /// READ-ONLY: mailbox selected read-only.
    ReadOnly,
    /// READ-WRITE: mailbox selected read-write.
    ReadWrite,
    /// TRYCREATE: target mailbox does not exist but could be created.
    TryCreate,
    /// UIDNEXT: next UID to be assigned.
    UidNext(Uid),
    /// UIDVALIDITY: mailbox epoch.
    UidValidity(UidValidity),
    /// UNSEEN: first unseen message sequence number.
    Unseen(SeqNum),
    /// APPENDUID: UID assigned to an appended message (UIDPLUS).
    AppendUid {
        /// UIDVALIDITY of the mailbox.
        uidvalidity: UidValidity,
        /// UID of the appended message.
        uid: Uid,
    },
    /// COPYUID: UID mapping for copied messages (UIDPLUS).
    CopyUid {
        /// UIDVALIDITY of the destination mailbox.
        uidvalidity: UidValidity,
        /// Source UID set, verbatim.
        source: String,
        /// Destination UID set, verbatim.
        destination: String,
    },
    /// Unknown response code, keyword kept verbatim.
    Unknown(String),
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
    fn test_append_uid() {
        let code = ResponseCode::AppendUid {
            uidvalidity: UidValidity::new(38505).unwrap(),
            uid: Uid::new(3955).unwrap(),
        };
        if let ResponseCode::AppendUid { uidvalidity, uid } = code {
            assert_eq!(uidvalidity.get(), 38505);
            assert_eq!(uid.get(), 3955);
        } else {
            panic!("expected AppendUid");
        }
    }

    #[test]
    fn test_unknown_keyword_preserved() {
        let code = ResponseCode::Unknown("NONEXISTENT".to_string());
        assert!(matches!(code, ResponseCode::Unknown(k) if k == "NONEXISTENT"));
    }
}
