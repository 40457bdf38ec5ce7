//! # mailsift-imap
//!
//! An IMAP4rev1 client library (RFC 3501 with the IDLE, ID, QUOTA, and
//! UIDPLUS extensions): authenticated sessions over TLS, folder
//! enumeration and manipulation, a fluent search/fetch query layer that
//! materialises messages through [`mailsift_mime`], and long-lived push
//! notification via IDLE.
//!
//! ## Layers
//!
//! - [`connection`]: transport (TCP/TLS/proxy), response framing, and a
//!   type-state [`Client`] that enforces protocol states at compile time
//! - [`Session`]: runtime state machine with auto-reconnect, the UID
//!   cache, and event hooks
//! - [`Query`]: SEARCH criterion builder plus the fetch-and-populate
//!   pipeline
//! - [`IdleLoop`]: keepalive-renewing push loop on a cloned session
//!
//! ## Quick start
//!
//! ```ignore
//! use mailsift_imap::{AccountConfig, ClientManager, Options};
//!
//! #[tokio::main]
//! async fn main() -> mailsift_imap::Result<()> {
//!     let manager = ClientManager::new().account(
//!         "main",
//!         AccountConfig::new("imap.example.com").credentials("user", "password"),
//!     );
//!
//!     let mut session = manager.session(None)?;
//!     session.connect().await?;
//!     session.authenticate().await?;
//!
//!     for folder in session.folders(true, None).await? {
//!         println!("{}", folder.path);
//!     }
//!
//!     session.open_folder("INBOX", false).await?;
//!     let messages = session
//!         .messages("INBOX")
//!         .unseen()
//!         .limit(10, 1)
//!         .get()
//!         .await?;
//!     for (key, message) in messages {
//!         println!("{key}: {:?}", message.subject());
//!     }
//!
//!     session.disconnect().await
//! }
//! ```
//!
//! ## Connection states
//!
//! ```text
//! Disconnected ── connect() ──→ Connected ── authenticate() ──→ Authenticated
//!                                                                    │
//!        LoggedOut ←── disconnect() ──┐           open_folder() ─────┘
//!                                     │                 │
//!                                     └──────────── Selected ──→ (IDLE)
//! ```
//!
//! Commands issued from the wrong state fail with
//! [`Error::InvalidState`]; at the wire level the type-state [`Client`]
//! makes most such misuse unrepresentable.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod config;
pub mod connection;
pub mod events;
pub mod folder;
pub mod parser;
pub mod query;
pub mod types;

mod error;
mod session;

pub use command::{
    Command, CommandPart, FetchAttribute, FetchItems, SearchPart, StatusAttribute, StoreAction,
    TagGenerator,
};
pub use config::{
    AccountConfig, AuthMethod, ClientManager, Encryption, FetchFlavour, FetchOrder, MessageKey,
    Options, Proxy, SequenceKind,
};
pub use connection::{
    Authenticated, Client, CommandResponse, FramedStream, IdleEvent, IdleHandle, IdleLoop,
    IdleStopHandle, ImapStream, NotAuthenticated, Selected,
};
pub use error::{Error, Result};
pub use events::{Event, Events};
pub use folder::Folder;
pub use parser::{Response, ResponseParser, UntaggedResponse, Value};
pub use query::{Message, MessageCollection, Query};
pub use session::Session;
pub use types::{
    Capability, Flag, Flags, ListResponse, Mailbox, MailboxAttribute, MailboxStatus, Quota,
    QuotaResource, ResponseCode, SeqNum, SequenceSet, Status, Tag, Uid, UidValidity,
};

/// IMAP protocol version supported.
pub const IMAP_VERSION: &str = "IMAP4rev1";
