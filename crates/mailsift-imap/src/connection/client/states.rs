//! Type-state markers and per-state data for the client connection.

use crate::types::MailboxStatus;

/// Marker type for the not-authenticated state.
#[derive(Debug, Clone, Copy)]
pub struct NotAuthenticated;

/// States in which mailbox-management commands (LIST, CREATE, STATUS,
/// APPEND, ...) are valid: authenticated, with or without a selection.
pub trait AuthState: sealed::Sealed {}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Authenticated {}
    impl Sealed for super::Selected {}
}

impl AuthState for Authenticated {}
impl AuthState for Selected {}

/// Marker type for the authenticated state.
#[derive(Debug, Clone, Copy)]
pub struct Authenticated;

/// State data for the selected state.
#[derive(Debug, Clone)]
pub struct Selected {
    mailbox: String,
    read_only: bool,
    status: MailboxStatus,
}

impl Selected {
    /// Creates selected-state data.
    #[must_use]
    pub fn new(mailbox: impl Into<String>, read_only: bool, status: MailboxStatus) -> Self {
        Self {
            mailbox: mailbox.into(),
            read_only,
            status,
        }
    }

    /// The selected mailbox's wire name.
    #[must_use]
    pub fn mailbox(&self) -> &str {
        &self.mailbox
    }

    /// True when the mailbox was opened via EXAMINE.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Status snapshot from SELECT/EXAMINE.
    #[must_use]
    pub const fn status(&self) -> &MailboxStatus {
        &self.status
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

    fn _assert_send<T: Send>() {}
    fn _assert_sync<T: Sync>() {}

    #[test]
    fn test_state_markers_are_send_sync() {
        _assert_send::<NotAuthenticated>();
        _assert_sync::<NotAuthenticated>();
        _assert_send::<Authenticated>();
        _assert_sync::<Authenticated>();
        _assert_send::<Selected>();
        _assert_sync::<Selected>();
    }

    #[test]
    fn test_selected_accessors() {
        let state = Selected::new("INBOX", true, MailboxStatus::default());
        assert_eq!(state.mailbox(), "INBOX");
        assert!(state.is_read_only());
    }
}
