//! IMAP command builder.
//!
//! Typed commands and their wire serialization. A command serializes into
//! [`CommandPart`]s so the connection layer can interleave literal
//! payloads with the server's `+` continuations.

mod serialize;
mod tag_generator;

use crate::types::{Flag, Mailbox, SequenceSet};

pub use serialize::{CommandPart, CommandWriter};
pub use tag_generator::TagGenerator;

/// Items to request in a FETCH command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchItems {
    /// The `ALL` macro.
    All,
    /// The `FULL` macro.
    Full,
    /// The `FAST` macro.
    Fast,
    /// An explicit attribute list.
    Items(Vec<FetchAttribute>),
}

/// A single FETCH attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchAttribute {
    /// Message flags.
    Flags,
    /// Internal date.
    InternalDate,
    /// RFC822.SIZE.
    Rfc822Size,
    /// ENVELOPE.
    Envelope,
    /// BODYSTRUCTURE.
    BodyStructure,
    /// UID.
    Uid,
    /// Whole message (RFC822).
    Rfc822,
    /// Header block (RFC822.HEADER).
    Rfc822Header,
    /// Body text (RFC822.TEXT).
    Rfc822Text,
    /// BODY[section] / BODY.PEEK[section], optionally partial.
    Body {
        /// Section specifier (`HEADER`, `TEXT`, `1.2`, ...); `None` for
        /// the whole message.
        section: Option<String>,
        /// Use BODY.PEEK (does not set \Seen).
        peek: bool,
        /// Partial fetch `<start.length>`.
        partial: Option<(u32, u32)>,
    },
    /// Extension attribute sent verbatim (e.g. `X-GM-THRID`).
    Extension(String),
}

/// STORE action on message flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreAction {
    /// Replace the flag set (FLAGS).
    SetFlags(Vec<Flag>),
    /// Add flags (+FLAGS).
    AddFlags(Vec<Flag>),
    /// Remove flags (-FLAGS).
    RemoveFlags(Vec<Flag>),
}

/// STATUS attributes to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAttribute {
    /// Total message count.
    Messages,
    /// Recent message count.
    Recent,
    /// Next UID.
    UidNext,
    /// UIDVALIDITY.
    UidValidity,
    /// Unseen count.
    Unseen,
}

impl StatusAttribute {
    /// Returns the wire atom.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Messages => "MESSAGES",
            Self::Recent => "RECENT",
            Self::UidNext => "UIDNEXT",
            Self::UidValidity => "UIDVALIDITY",
            Self::Unseen => "UNSEEN",
        }
    }
}

/// One element of a SEARCH program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchPart {
    /// Search keyword (`UNSEEN`, `NOT`, `OR`, ...), sent uppercased.
    Keyword(String),
    /// Bare number (LARGER/SMALLER sizes, UID sets).
    Number(u64),
    /// Raw sequence-set text (`1:5,8`).
    Sequence(String),
    /// IMAP date, already formatted `DD-Mon-YYYY`.
    Date(String),
    /// String argument; always quoted, literal when it cannot be quoted.
    Text(String),
}

/// IMAP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // Any state
    /// CAPABILITY command.
    Capability,
    /// NOOP command.
    Noop,
    /// LOGOUT command.
    Logout,
    /// ID command (RFC 2971); `None` sends `ID NIL`.
    Id {
        /// Client identification field/value pairs.
        parameters: Option<Vec<(String, String)>>,
    },

    // Not authenticated
    /// STARTTLS command.
    StartTls,
    /// LOGIN command.
    Login {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },
    /// AUTHENTICATE command.
    Authenticate {
        /// SASL mechanism name.
        mechanism: String,
        /// Base64 initial response, if the mechanism sends one.
        initial_response: Option<String>,
    },

    // Authenticated
    /// SELECT command.
    Select {
        /// Mailbox to select.
        mailbox: Mailbox,
    },
    /// EXAMINE command (read-only SELECT).
    Examine {
        /// Mailbox to examine.
        mailbox: Mailbox,
    },
    /// CREATE command.
    Create {
        /// Mailbox to create.
        mailbox: Mailbox,
    },
    /// DELETE command.
    Delete {
        /// Mailbox to delete.
        mailbox: Mailbox,
    },
    /// RENAME command.
    Rename {
        /// Current name.
        from: Mailbox,
        /// New name.
        to: Mailbox,
    },
    /// SUBSCRIBE command.
    Subscribe {
        /// Mailbox to subscribe.
        mailbox: Mailbox,
    },
    /// UNSUBSCRIBE command.
    Unsubscribe {
        /// Mailbox to unsubscribe.
        mailbox: Mailbox,
    },
    /// LIST command.
    List {
        /// Reference name.
        reference: String,
        /// Mailbox pattern.
        pattern: String,
    },
    /// LSUB command.
    Lsub {
        /// Reference name.
        reference: String,
        /// Mailbox pattern.
        pattern: String,
    },
    /// STATUS command.
    Status {
        /// Mailbox name.
        mailbox: Mailbox,
        /// Attributes to request.
        items: Vec<StatusAttribute>,
    },
    /// APPEND command; the message travels as a literal.
    Append {
        /// Target mailbox.
        mailbox: Mailbox,
        /// Flags to set on the appended message.
        flags: Option<Vec<Flag>>,
        /// Complete RFC 822 message.
        message: Vec<u8>,
    },
    /// GETQUOTA command (RFC 2087).
    GetQuota {
        /// Quota root.
        root: String,
    },
    /// GETQUOTAROOT command (RFC 2087).
    GetQuotaRoot {
        /// Mailbox name.
        mailbox: Mailbox,
    },

    // Selected
    /// CHECK command.
    Check,
    /// CLOSE command.
    Close,
    /// EXPUNGE command.
    Expunge,
    /// SEARCH command.
    Search {
        /// Optional CHARSET argument.
        charset: Option<String>,
        /// Search program.
        program: Vec<SearchPart>,
        /// Use UID SEARCH.
        uid: bool,
    },
    /// FETCH command.
    Fetch {
        /// Sequence set.
        sequence: SequenceSet,
        /// Items to fetch.
        items: FetchItems,
        /// Use UID FETCH.
        uid: bool,
    },
    /// STORE command.
    Store {
        /// Sequence set.
        sequence: SequenceSet,
        /// Flag action.
        action: StoreAction,
        /// Use UID STORE.
        uid: bool,
        /// `.SILENT` (suppress the FETCH echo).
        silent: bool,
    },
    /// COPY command.
    Copy {
        /// Sequence set.
        sequence: SequenceSet,
        /// Target mailbox.
        mailbox: Mailbox,
        /// Use UID COPY.
        uid: bool,
    },
    /// MOVE command (RFC 6851).
    Move {
        /// Sequence set.
        sequence: SequenceSet,
        /// Target mailbox.
        mailbox: Mailbox,
        /// Use UID MOVE.
        uid: bool,
    },
    /// IDLE command (RFC 2177).
    Idle,
    /// DONE (ends IDLE; sent without a tag).
    Done,
}

impl Command {
    /// Returns the command name for logging and error context.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Capability => "CAPABILITY",
            Self::Noop => "NOOP",
            Self::Logout => "LOGOUT",
            Self::Id { .. } => "ID",
            Self::StartTls => "STARTTLS",
            Self::Login { .. } => "LOGIN",
            Self::Authenticate { .. } => "AUTHENTICATE",
            Self::Select { .. } => "SELECT",
            Self::Examine { .. } => "EXAMINE",
            Self::Create { .. } => "CREATE",
            Self::Delete { .. } => "DELETE",
            Self::Rename { .. } => "RENAME",
            Self::Subscribe { .. } => "SUBSCRIBE",
            Self::Unsubscribe { .. } => "UNSUBSCRIBE",
            Self::List { .. } => "LIST",
            Self::Lsub { .. } => "LSUB",
            Self::Status { .. } => "STATUS",
            Self::Append { .. } => "APPEND",
            Self::GetQuota { .. } => "GETQUOTA",
            Self::GetQuotaRoot { .. } => "GETQUOTAROOT",
            Self::Check => "CHECK",
            Self::Close => "CLOSE",
            Self::Expunge => "EXPUNGE",
            Self::Search { .. } => "SEARCH",
            Self::Fetch { .. } => "FETCH",
            Self::Store { .. } => "STORE",
            Self::Copy { .. } => "COPY",
            Self::Move { .. } => "MOVE",
            Self::Idle => "IDLE",
            Self::Done => "DONE",
        }
    }

    /// Serializes the command under the given tag.
    #[must_use]
    #[allow(clippy::too_many_lines)]
    pub fn serialize(&self, tag: &str) -> Vec<CommandPart> {
        // DONE is the one command sent without a tag.
        let mut w = if matches!(self, Self::Done) {
            CommandWriter::new("")
        } else {
            CommandWriter::new(tag)
        };

        match self {
            Self::Capability | Self::Noop | Self::Logout | Self::StartTls | Self::Check
            | Self::Close | Self::Expunge | Self::Idle | Self::Done => {
                w.raw(self.name());
            }

            Self::Id { parameters } => {
                w.raw("ID ");
                match parameters {
                    Some(params) => {
                        w.raw("(");
                        for (i, (key, value)) in params.iter().enumerate() {
                            if i > 0 {
                                w.space();
                            }
                            w.quoted(key);
                            w.space();
                            w.quoted(value);
                        }
                        w.raw(")");
                    }
                    None => w.raw("NIL"),
                }
            }

            Self::Login { username, password } => {
                w.raw("LOGIN ");
                w.astring(username);
                w.space();
                w.astring(password);
            }

            Self::Authenticate {
                mechanism,
                initial_response,
            } => {
                w.raw("AUTHENTICATE ");
                w.raw(mechanism);
                if let Some(resp) = initial_response {
                    w.space();
                    w.raw(resp);
                }
            }

            Self::Select { mailbox } => {
                w.raw("SELECT ");
                w.astring(mailbox.as_str());
            }
            Self::Examine { mailbox } => {
                w.raw("EXAMINE ");
                w.astring(mailbox.as_str());
            }
            Self::Create { mailbox } => {
                w.raw("CREATE ");
                w.astring(mailbox.as_str());
            }
            Self::Delete { mailbox } => {
                w.raw("DELETE ");
                w.astring(mailbox.as_str());
            }
            Self::Rename { from, to } => {
                w.raw("RENAME ");
                w.astring(from.as_str());
                w.space();
                w.astring(to.as_str());
            }
            Self::Subscribe { mailbox } => {
                w.raw("SUBSCRIBE ");
                w.astring(mailbox.as_str());
            }
            Self::Unsubscribe { mailbox } => {
                w.raw("UNSUBSCRIBE ");
                w.astring(mailbox.as_str());
            }

            Self::List { reference, pattern } | Self::Lsub { reference, pattern } => {
                w.raw(self.name());
                w.space();
                w.astring(reference);
                w.space();
                w.astring(pattern);
            }

            Self::Status { mailbox, items } => {
                w.raw("STATUS ");
                w.astring(mailbox.as_str());
                w.raw(" (");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        w.space();
                    }
                    w.raw(item.as_str());
                }
                w.raw(")");
            }

            Self::Append {
                mailbox,
                flags,
                message,
            } => {
                w.raw("APPEND ");
                w.astring(mailbox.as_str());
                if let Some(flags) = flags {
                    w.raw(" (");
                    for (i, flag) in flags.iter().enumerate() {
                        if i > 0 {
                            w.space();
                        }
                        w.raw(flag.as_str());
                    }
                    w.raw(")");
                }
                w.space();
                w.literal(message);
            }

            Self::GetQuota { root } => {
                w.raw("GETQUOTA ");
                w.astring(root);
            }
            Self::GetQuotaRoot { mailbox } => {
                w.raw("GETQUOTAROOT ");
                w.astring(mailbox.as_str());
            }

            Self::Search {
                charset,
                program,
                uid,
            } => {
                if *uid {
                    w.raw("UID ");
                }
                w.raw("SEARCH");
                if let Some(cs) = charset {
                    w.raw(" CHARSET ");
                    w.raw(cs);
                }
                for part in program {
                    w.space();
                    write_search_part(&mut w, part);
                }
            }

            Self::Fetch {
                sequence,
                items,
                uid,
            } => {
                if *uid {
                    w.raw("UID ");
                }
                w.raw("FETCH ");
                w.raw(&sequence.to_string());
                w.space();
                write_fetch_items(&mut w, items);
            }

            Self::Store {
                sequence,
                action,
                uid,
                silent,
            } => {
                if *uid {
                    w.raw("UID ");
                }
                w.raw("STORE ");
                w.raw(&sequence.to_string());
                w.space();
                write_store_action(&mut w, action, *silent);
            }

            Self::Copy {
                sequence,
                mailbox,
                uid,
            }
            | Self::Move {
                sequence,
                mailbox,
                uid,
            } => {
                if *uid {
                    w.raw("UID ");
                }
                w.raw(self.name());
                w.space();
                w.raw(&sequence.to_string());
                w.space();
                w.astring(mailbox.as_str());
            }
        }

        w.finish()
    }
}

/// Writes FETCH items.
fn write_fetch_items(w: &mut CommandWriter, items: &FetchItems) {
    match items {
        FetchItems::All => w.raw("ALL"),
        FetchItems::Full => w.raw("FULL"),
        FetchItems::Fast => w.raw("FAST"),
        FetchItems::Items(attrs) => {
            if attrs.len() == 1 {
                write_fetch_attribute(w, &attrs[0]);
            } else {
                w.raw("(");
                for (i, attr) in attrs.iter().enumerate() {
                    if i > 0 {
                        w.space();
                    }
                    write_fetch_attribute(w, attr);
                }
                w.raw(")");
            }
        }
    }
}

/// Writes a single FETCH attribute.
fn write_fetch_attribute(w: &mut CommandWriter, attr: &FetchAttribute) {
    match attr {
        FetchAttribute::Flags => w.raw("FLAGS"),
        FetchAttribute::InternalDate => w.raw("INTERNALDATE"),
        FetchAttribute::Rfc822Size => w.raw("RFC822.SIZE"),
        FetchAttribute::Envelope => w.raw("ENVELOPE"),
        FetchAttribute::BodyStructure => w.raw("BODYSTRUCTURE"),
        FetchAttribute::Uid => w.raw("UID"),
        FetchAttribute::Rfc822 => w.raw("RFC822"),
        FetchAttribute::Rfc822Header => w.raw("RFC822.HEADER"),
        FetchAttribute::Rfc822Text => w.raw("RFC822.TEXT"),
        FetchAttribute::Body {
            section,
            peek,
            partial,
        } => {
            w.raw(if *peek { "BODY.PEEK[" } else { "BODY[" });
            if let Some(s) = section {
                w.raw(s);
            }
            w.raw("]");
            if let Some((start, len)) = partial {
                w.raw(&format!("<{start}.{len}>"));
            }
        }
        FetchAttribute::Extension(name) => w.raw(name),
    }
}

/// Writes a STORE action.
fn write_store_action(w: &mut CommandWriter, action: &StoreAction, silent: bool) {
    let (prefix, flags) = match action {
        StoreAction::SetFlags(f) => ("FLAGS", f),
        StoreAction::AddFlags(f) => ("+FLAGS", f),
        StoreAction::RemoveFlags(f) => ("-FLAGS", f),
    };
    w.raw(prefix);
    if silent {
        w.raw(".SILENT");
    }
    w.raw(" (");
    for (i, flag) in flags.iter().enumerate() {
        if i > 0 {
            w.space();
        }
        w.raw(flag.as_str());
    }
    w.raw(")");
}

/// Writes one SEARCH program element.
fn write_search_part(w: &mut CommandWriter, part: &SearchPart) {
    match part {
        SearchPart::Keyword(k) => w.raw(&k.to_uppercase()),
        SearchPart::Number(n) => w.number(*n),
        SearchPart::Sequence(s) | SearchPart::Date(s) => w.raw(s),
        SearchPart::Text(s) => w.quoted(s),
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

    fn line(cmd: &Command, tag: &str) -> Vec<u8> {
        let parts = cmd.serialize(tag);
        assert_eq!(parts.len(), 1, "expected single-line command");
        match parts.into_iter().next().unwrap() {
            CommandPart::Line(data) => data,
            CommandPart::Literal(_) => panic!("expected line"),
        }
    }

    #[test]
    fn test_capability() {
        assert_eq!(line(&Command::Capability, "A001"), b"A001 CAPABILITY\r\n");
    }

    #[test]
    fn test_login_plain_atoms() {
        let cmd = Command::Login {
            username: "user".to_string(),
            password: "pass".to_string(),
        };
        assert_eq!(line(&cmd, "A001"), b"A001 LOGIN user pass\r\n");
    }

    #[test]
    fn test_login_quoted_password() {
        let cmd = Command::Login {
            username: "user@example.com".to_string(),
            password: "pass word".to_string(),
        };
        assert_eq!(
            line(&cmd, "A001"),
            b"A001 LOGIN user@example.com \"pass word\"\r\n"
        );
    }

    #[test]
    fn test_login_eight_bit_password_uses_literal() {
        let cmd = Command::Login {
            username: "user".to_string(),
            password: "pässword".to_string(),
        };
        let parts = cmd.serialize("A001");
        assert_eq!(parts.len(), 3);
        assert!(matches!(&parts[0], CommandPart::Line(l) if l.ends_with(b"}\r\n")));
        assert!(matches!(&parts[1], CommandPart::Literal(d) if d == "pässword".as_bytes()));
    }

    #[test]
    fn test_select() {
        let cmd = Command::Select {
            mailbox: Mailbox::inbox(),
        };
        assert_eq!(line(&cmd, "A001"), b"A001 SELECT INBOX\r\n");
    }

    #[test]
    fn test_list() {
        let cmd = Command::List {
            reference: String::new(),
            pattern: "*".to_string(),
        };
        assert_eq!(line(&cmd, "A001"), b"A001 LIST \"\" \"*\"\r\n");
    }

    #[test]
    fn test_lsub() {
        let cmd = Command::Lsub {
            reference: String::new(),
            pattern: "%".to_string(),
        };
        assert_eq!(line(&cmd, "A001"), b"A001 LSUB \"\" \"%\"\r\n");
    }

    #[test]
    fn test_status() {
        let cmd = Command::Status {
            mailbox: Mailbox::inbox(),
            items: vec![StatusAttribute::Messages, StatusAttribute::Unseen],
        };
        assert_eq!(
            line(&cmd, "A001"),
            b"A001 STATUS INBOX (MESSAGES UNSEEN)\r\n"
        );
    }

    #[test]
    fn test_fetch() {
        let cmd = Command::Fetch {
            sequence: SequenceSet::range(1, 10).unwrap(),
            items: FetchItems::Items(vec![FetchAttribute::Flags, FetchAttribute::Uid]),
            uid: false,
        };
        assert_eq!(line(&cmd, "A001"), b"A001 FETCH 1:10 (FLAGS UID)\r\n");
    }

    #[test]
    fn test_uid_fetch_body_peek() {
        let cmd = Command::Fetch {
            sequence: SequenceSet::single(7).unwrap(),
            items: FetchItems::Items(vec![FetchAttribute::Body {
                section: Some("HEADER".to_string()),
                peek: true,
                partial: None,
            }]),
            uid: true,
        };
        assert_eq!(line(&cmd, "A001"), b"A001 UID FETCH 7 BODY.PEEK[HEADER]\r\n");
    }

    #[test]
    fn test_store_silent() {
        let cmd = Command::Store {
            sequence: SequenceSet::single(1).unwrap(),
            action: StoreAction::AddFlags(vec![Flag::Seen]),
            uid: false,
            silent: true,
        };
        assert_eq!(
            line(&cmd, "A001"),
            b"A001 STORE 1 +FLAGS.SILENT (\\Seen)\r\n"
        );
    }

    #[test]
    fn test_uid_store() {
        let cmd = Command::Store {
            sequence: SequenceSet::single(5).unwrap(),
            action: StoreAction::AddFlags(vec![Flag::Seen]),
            uid: true,
            silent: false,
        };
        assert_eq!(line(&cmd, "A001"), b"A001 UID STORE 5 +FLAGS (\\Seen)\r\n");
    }

    #[test]
    fn test_search_program() {
        let cmd = Command::Search {
            charset: None,
            program: vec![
                SearchPart::Keyword("since".to_string()),
                SearchPart::Date("01-Jan-2024".to_string()),
                SearchPart::Keyword("SUBJECT".to_string()),
                SearchPart::Text("hi".to_string()),
            ],
            uid: false,
        };
        assert_eq!(
            line(&cmd, "A001"),
            b"A001 SEARCH SINCE 01-Jan-2024 SUBJECT \"hi\"\r\n"
        );
    }

    #[test]
    fn test_uid_search_with_charset_literal() {
        let cmd = Command::Search {
            charset: Some("UTF-8".to_string()),
            program: vec![
                SearchPart::Keyword("SUBJECT".to_string()),
                SearchPart::Text("héllo".to_string()),
            ],
            uid: true,
        };
        let parts = cmd.serialize("A001");
        assert_eq!(parts.len(), 3);
        assert!(
            matches!(&parts[0], CommandPart::Line(l) if l.starts_with(b"A001 UID SEARCH CHARSET UTF-8 SUBJECT {"))
        );
        assert!(matches!(&parts[1], CommandPart::Literal(d) if d == "héllo".as_bytes()));
    }

    #[test]
    fn test_append_literal() {
        let cmd = Command::Append {
            mailbox: Mailbox::inbox(),
            flags: Some(vec![Flag::Seen]),
            message: b"From: a@b\r\n\r\nhi".to_vec(),
        };
        let parts = cmd.serialize("A001");
        assert_eq!(parts.len(), 3);
        assert_eq!(
            parts[0],
            CommandPart::Line(b"A001 APPEND INBOX (\\Seen) {15}\r\n".to_vec())
        );
        assert_eq!(
            parts[1],
            CommandPart::Literal(b"From: a@b\r\n\r\nhi".to_vec())
        );
        assert_eq!(parts[2], CommandPart::Line(b"\r\n".to_vec()));
    }

    #[test]
    fn test_move() {
        let cmd = Command::Move {
            sequence: SequenceSet::single(3).unwrap(),
            mailbox: Mailbox::new("Archive"),
            uid: true,
        };
        assert_eq!(line(&cmd, "A001"), b"A001 UID MOVE 3 Archive\r\n");
    }

    #[test]
    fn test_id_nil() {
        let cmd = Command::Id { parameters: None };
        assert_eq!(line(&cmd, "A001"), b"A001 ID NIL\r\n");
    }

    #[test]
    fn test_id_params() {
        let cmd = Command::Id {
            parameters: Some(vec![("name".to_string(), "mailsift".to_string())]),
        };
        assert_eq!(line(&cmd, "A001"), b"A001 ID (\"name\" \"mailsift\")\r\n");
    }

    #[test]
    fn test_quota_commands() {
        let cmd = Command::GetQuota {
            root: String::new(),
        };
        assert_eq!(line(&cmd, "A001"), b"A001 GETQUOTA \"\"\r\n");

        let cmd = Command::GetQuotaRoot {
            mailbox: Mailbox::inbox(),
        };
        assert_eq!(line(&cmd, "A001"), b"A001 GETQUOTAROOT INBOX\r\n");
    }

    #[test]
    fn test_idle_and_done() {
        assert_eq!(line(&Command::Idle, "A001"), b"A001 IDLE\r\n");
        assert_eq!(line(&Command::Done, "ignored"), b"DONE\r\n");
    }
}
