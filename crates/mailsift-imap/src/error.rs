//! Error types for the IMAP library.
//!
//! Transport failures, protocol violations, command rejections, and
//! higher-level aggregation failures each get their own kind so callers
//! can match on what actually went wrong.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during IMAP operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Transport setup or handshake failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The connection dropped mid-session.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// A read, write, or handshake exceeded its timeout.
    #[error("operation timed out after {0:?}")]
    ConnectionTimedOut(Duration),

    /// Authentication was rejected. Never carries credentials.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested protocol feature is unavailable on this server.
    #[error("protocol not supported: {0}")]
    ProtocolNotSupported(String),

    /// I/O error during network operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS handshake or encryption error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Invalid DNS name for TLS.
    #[error("invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// Response parsing error.
    #[error("parse error at position {position}: {message}")]
    Parse {
        /// Byte position where the error occurred.
        position: usize,
        /// Description of what went wrong.
        message: String,
    },

    /// Server returned NO; carries the server text.
    #[error("server returned NO: {0}")]
    No(String),

    /// Server returned BAD; carries the server text.
    #[error("server returned BAD: {0}")]
    Bad(String),

    /// Server sent BYE (disconnecting).
    #[error("server sent BYE: {0}")]
    Bye(String),

    /// Operation issued in a session state that does not allow it.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Protocol violation or unexpected data.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Configuration error (unknown account, missing credentials).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Folder enumeration failed.
    #[error("folder fetching failed: {0}")]
    FolderFetching(String),

    /// A search program could not be built or validated.
    #[error("search validation failed: {0}")]
    SearchValidation(String),

    /// Message population aborted (hard-fail mode).
    #[error("failed to materialise {failed} message(s)")]
    GetMessages {
        /// How many identifiers failed.
        failed: usize,
    },

    /// Per-message materialisation error.
    #[error("message error: {0}")]
    Mime(#[from] mailsift_mime::Error),
}

impl Error {
    /// Returns true if this error is recoverable by reconnecting.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Io(_)
                | Self::ConnectionTimedOut(_)
                | Self::ConnectionClosed(_)
                | Self::ConnectionFailed(_)
        )
    }

    /// Returns true if this error indicates the connection is dead.
    #[must_use]
    pub const fn is_connection_dead(&self) -> bool {
        matches!(
            self,
            Self::Io(_)
                | Self::Bye(_)
                | Self::ConnectionClosed(_)
                | Self::ConnectionTimedOut(_)
                | Self::Tls(_)
        )
    }

    /// Returns true for command-level NO/BAD rejections.
    #[must_use]
    pub const fn is_runtime(&self) -> bool {
        matches!(self, Self::No(_) | Self::Bad(_))
    }

    /// Returns true if this is an authentication error.
    #[must_use]
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::AuthFailed(_))
            || matches!(self, Self::No(text) if text.to_lowercase().contains("auth"))
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

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
    fn test_recoverable() {
        assert!(Error::ConnectionClosed("eof".into()).is_recoverable());
        assert!(Error::ConnectionTimedOut(Duration::from_secs(1)).is_recoverable());
        assert!(!Error::Bad("syntax".into()).is_recoverable());
    }

    #[test]
    fn test_runtime() {
        assert!(Error::No("denied".into()).is_runtime());
        assert!(Error::Bad("syntax".into()).is_runtime());
        assert!(!Error::Bye("bye".into()).is_runtime());
    }

    #[test]
    fn test_auth_error() {
        assert!(Error::AuthFailed("nope".into()).is_auth_error());
        assert!(Error::No("AUTHENTICATIONFAILED".into()).is_auth_error());
        assert!(!Error::No("quota exceeded".into()).is_auth_error());
    }

    #[test]
    fn test_display_never_leaks_credentials() {
        let err = Error::AuthFailed("login rejected".into());
        assert_eq!(err.to_string(), "authentication failed: login rejected");
    }
}
