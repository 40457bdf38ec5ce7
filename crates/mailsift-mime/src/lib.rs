//! # mailsift-mime
//!
//! RFC 822 / MIME message materialiser for the mailsift IMAP client.
//!
//! Takes the raw bytes of a message (or of individual BODY sections) and
//! produces a structured object graph: decoded headers, address lists,
//! dates, a body-part tree with dotted part numbers, text/html bodies,
//! and attachments.
//!
//! ## Features
//!
//! - **Header decoding**: unfolding, RFC 2047 encoded-words (B and Q),
//!   charset resolution through a canonical alias table
//! - **Address parsing**: RFC 5322 mailboxes and groups
//! - **Date parsing**: RFC 2822 plus the common non-conforming variants
//! - **Multipart walking**: nested multiparts with dotted part numbers
//! - **Transfer decoding**: 7bit, 8bit, binary, quoted-printable, base64
//! - **Classification**: displayable text parts become bodies, everything
//!   else becomes an attachment
//!
//! ## Quick start
//!
//! ```ignore
//! use mailsift_mime::Message;
//!
//! let raw = b"From: sender@example.com\r\n\
//!             To: recipient@example.com\r\n\
//!             Subject: =?UTF-8?B?SMOpbGxv?=\r\n\
//!             Content-Type: text/plain\r\n\
//!             \r\n\
//!             Hello, World!";
//!
//! let message = Message::parse(raw)?;
//! assert_eq!(message.subject().as_deref(), Some("Héllo"));
//! assert_eq!(message.text_body(), Some("Hello, World!"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod attachment;
mod content_type;
mod date;
mod error;
mod header;
mod message;

pub mod charset;
pub mod encoding;

pub use address::Address;
pub use attachment::Attachment;
pub use content_type::ContentType;
pub use date::parse_date;
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{Message, Part};

pub use encoding::TransferEncoding;
