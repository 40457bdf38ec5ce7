//! Error types for MIME parsing.

use thiserror::Error;

/// Errors that can occur while materialising a message.
#[derive(Debug, Error)]
pub enum Error {
    /// A transfer or header encoding could not be decoded.
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    /// A Content-Type value could not be parsed.
    #[error("invalid content type: {0}")]
    InvalidContentType(String),

    /// A date header could not be parsed in strict mode.
    #[error("invalid date: {0}")]
    InvalidDate(String),

    /// Base64 payload was malformed.
    #[error("base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Decoded bytes were not valid UTF-8 where UTF-8 was required.
    #[error("invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
