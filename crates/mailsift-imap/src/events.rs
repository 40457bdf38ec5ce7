//! Lifecycle event hooks.
//!
//! Handlers register under a section and event name (`message.moved`,
//! `folder.new`, `flag.deleted`) and run synchronously, in registration
//! order, when the session performs the matching operation. Handlers are
//! infallible closures, so a handler can never fail the command that
//! triggered it. The registry is per-client; sessions never share one.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::folder::Folder;
use crate::types::Flag;

/// Payload delivered to event handlers.
#[derive(Debug)]
pub enum Event<'a> {
    /// A message-level event; `destination` is set for moved/copied.
    Message {
        /// Identifier of the affected message (UID or MSN per the
        /// session's numbering scheme).
        id: u32,
        /// Folder the operation ran in.
        folder: &'a str,
        /// Destination folder for moved/copied.
        destination: Option<&'a str>,
    },
    /// A folder-level event; `destination` is set for moved.
    Folder {
        /// The affected folder.
        folder: &'a Folder,
        /// New path for moved.
        destination: Option<&'a str>,
    },
    /// A flag added to or removed from a message.
    Flag {
        /// Identifier of the affected message.
        id: u32,
        /// The flag atom.
        flag: &'a Flag,
    },
}

type Handler = Box<dyn Fn(&Event<'_>) + Send + Sync>;

/// Per-client event handler registry.
#[derive(Default)]
pub struct Events {
    handlers: Mutex<HashMap<(String, String), Vec<Handler>>>,
}

impl Events {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for `section.name`.
    pub fn on<F>(&self, section: &str, name: &str, handler: F)
    where
        F: Fn(&Event<'_>) + Send + Sync + 'static,
    {
        let mut handlers = self.handlers.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        handlers
            .entry((section.to_lowercase(), name.to_lowercase()))
            .or_default()
            .push(Box::new(handler));
    }

    /// Dispatches an event to its handlers, in registration order.
    pub(crate) fn emit(&self, section: &str, name: &str, event: &Event<'_>) {
        let handlers = self.handlers.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(list) = handlers.get(&(section.to_lowercase(), name.to_lowercase())) {
            for handler in list {
                handler(event);
            }
        }
    }
}

impl std::fmt::Debug for Events {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self
            .handlers
            .lock()
            .map(|h| h.values().map(Vec::len).sum::<usize>())
            .unwrap_or(0);
        f.debug_struct("Events").field("handlers", &count).finish()
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
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn test_dispatch_in_registration_order() {
        let events = Events::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let seen = Arc::clone(&seen);
            events.on("message", "moved", move |_| {
                seen.lock().unwrap().push(i);
            });
        }

        events.emit(
            "message",
            "moved",
            &Event::Message {
                id: 1,
                folder: "INBOX",
                destination: Some("Archive"),
            },
        );

        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_section_and_name_isolation() {
        let events = Events::new();
        let count = Arc::new(AtomicU32::new(0));

        let c = Arc::clone(&count);
        events.on("flag", "new", move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        let flag = Flag::Seen;
        events.emit("flag", "deleted", &Event::Flag { id: 1, flag: &flag });
        assert_eq!(count.load(Ordering::SeqCst), 0);

        events.emit("flag", "new", &Event::Flag { id: 1, flag: &flag });
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_names_match_case_insensitively() {
        let events = Events::new();
        let count = Arc::new(AtomicU32::new(0));

        let c = Arc::clone(&count);
        events.on("Message", "New", move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        events.emit(
            "message",
            "new",
            &Event::Message {
                id: 9,
                folder: "INBOX",
                destination: None,
            },
        );
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_emit_without_handlers_is_noop() {
        let events = Events::new();
        events.emit(
            "folder",
            "deleted",
            &Event::Folder {
                folder: &Folder::new("Trash", '/'),
                destination: None,
            },
        );
    }
}
