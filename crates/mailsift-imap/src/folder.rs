//! Folder model.
//!
//! Folder names cross the API boundary as UTF-8; the wire carries
//! modified UTF-7 (RFC 3501 §5.1.3) and the conversion happens here and
//! in the session layer, never in user code.

use crate::types::{ListResponse, MailboxAttribute};

/// A mailbox as enumerated via LIST/LSUB.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    /// Full UTF-8 path (`Work/Projects/2024`).
    pub path: String,
    /// Display name: the last path segment.
    pub name: String,
    /// Hierarchy delimiter.
    pub delimiter: char,
    /// Attributes from the listing.
    pub attributes: Vec<MailboxAttribute>,
    /// Child folders when enumerated hierarchically.
    pub children: Vec<Folder>,
}

impl Folder {
    /// Creates a folder object for a UTF-8 path without listing it.
    #[must_use]
    pub fn new(path: impl Into<String>, delimiter: char) -> Self {
        let path = path.into();
        let name = display_name(&path, delimiter);
        Self {
            path,
            name,
            delimiter,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builds a folder from a LIST row, decoding modified UTF-7.
    #[must_use]
    pub fn from_list(row: &ListResponse, default_delimiter: char) -> Self {
        let delimiter = row.delimiter.unwrap_or(default_delimiter);
        let path = utf7_imap::decode_utf7_imap(row.mailbox.as_str().to_string());
        let name = display_name(&path, delimiter);
        Self {
            path,
            name,
            delimiter,
            attributes: row.attributes.clone(),
            children: Vec::new(),
        }
    }

    /// The wire-level (modified UTF-7) name of this folder.
    #[must_use]
    pub fn wire_name(&self) -> String {
        utf7_imap::encode_utf7_imap(self.path.clone())
    }

    /// Returns true if the listing marked children, or children were
    /// attached.
    #[must_use]
    pub fn has_children(&self) -> bool {
        !self.children.is_empty() || self.attributes.contains(&MailboxAttribute::HasChildren)
    }

    /// Replaces the child list.
    pub fn set_children(&mut self, children: Vec<Folder>) {
        self.children = children;
    }

    /// Returns true unless the listing marked the folder `\Noselect`.
    #[must_use]
    pub fn is_selectable(&self) -> bool {
        !self.attributes.contains(&MailboxAttribute::NoSelect)
    }

    /// The parent path, if this folder is not top-level.
    #[must_use]
    pub fn parent_path(&self) -> Option<&str> {
        self.path
            .rfind(self.delimiter)
            .map(|pos| &self.path[..pos])
    }
}

fn display_name(path: &str, delimiter: char) -> String {
    path.rsplit(delimiter)
        .next()
        .unwrap_or(path)
        .to_string()
}

/// Assembles a flat listing into a tree using each folder's path.
///
/// Rows arrive in server order; parents that were not listed (common
/// with `\Noselect` intermediates filtered out server-side) leave their
/// orphans at the top level.
#[must_use]
pub fn build_tree(mut folders: Vec<Folder>) -> Vec<Folder> {
    folders.sort_by(|a, b| a.path.cmp(&b.path));

    let mut roots: Vec<Folder> = Vec::new();
    for folder in folders {
        if !attach(&mut roots, folder.parent_path().map(str::to_string), &folder) {
            roots.push(folder);
        }
    }
    roots
}

/// Attaches `folder` under its parent in the partial tree; returns false
/// when the parent is absent.
fn attach(nodes: &mut [Folder], parent: Option<String>, folder: &Folder) -> bool {
    let Some(parent_path) = parent else {
        return false;
    };
    for node in nodes {
        if node.path == parent_path {
            node.children.push(folder.clone());
            return true;
        }
        if parent_path.starts_with(&format!("{}{}", node.path, node.delimiter))
            && attach(&mut node.children, Some(parent_path.clone()), folder)
        {
            return true;
        }
    }
    false
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
    use crate::types::Mailbox;

    fn row(name: &str, attrs: Vec<MailboxAttribute>) -> ListResponse {
        ListResponse {
            attributes: attrs,
            delimiter: Some('/'),
            mailbox: Mailbox::new(name),
        }
    }

    #[test]
    fn test_display_name() {
        let folder = Folder::new("Work/Projects/2024", '/');
        assert_eq!(folder.name, "2024");
        assert_eq!(folder.parent_path(), Some("Work/Projects"));

        let top = Folder::new("INBOX", '/');
        assert_eq!(top.name, "INBOX");
        assert_eq!(top.parent_path(), None);
    }

    #[test]
    fn test_utf7_round_trip() {
        // "Entwürfe" in modified UTF-7 on the wire.
        let listing = row("Entw&APw-rfe", vec![]);
        let folder = Folder::from_list(&listing, '/');
        assert_eq!(folder.path, "Entwürfe");
        assert_eq!(folder.wire_name(), "Entw&APw-rfe");
    }

    #[test]
    fn test_selectability_and_children_flags() {
        let folder = Folder::from_list(
            &row("Work", vec![MailboxAttribute::NoSelect, MailboxAttribute::HasChildren]),
            '/',
        );
        assert!(!folder.is_selectable());
        assert!(folder.has_children());
    }

    #[test]
    fn test_build_tree() {
        let folders = vec![
            Folder::from_list(&row("Work/Projects", vec![]), '/'),
            Folder::from_list(&row("INBOX", vec![]), '/'),
            Folder::from_list(&row("Work", vec![MailboxAttribute::HasChildren]), '/'),
            Folder::from_list(&row("Work/Projects/2024", vec![]), '/'),
        ];

        let tree = build_tree(folders);
        assert_eq!(tree.len(), 2);

        let work = tree.iter().find(|f| f.path == "Work").unwrap();
        assert_eq!(work.children.len(), 1);
        assert_eq!(work.children[0].path, "Work/Projects");
        assert_eq!(work.children[0].children[0].path, "Work/Projects/2024");

        let inbox = tree.iter().find(|f| f.path == "INBOX").unwrap();
        assert!(inbox.children.is_empty());
    }

    #[test]
    fn test_orphan_stays_top_level() {
        let folders = vec![Folder::from_list(&row("Missing/Child", vec![]), '/')];
        let tree = build_tree(folders);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].path, "Missing/Child");
    }
}
