//! Address header parsing.
//!
//! Accepts the RFC 5322 forms seen in real mail: `addr@host`,
//! `Name <addr@host>`, `"Quoted Name" <addr@host>`, comment-style names
//! `addr@host (Name)`, and group syntax `Team: a@x, b@y;`. List order is
//! preserved as delivered.

use crate::encoding::decode_rfc2047;

/// A single parsed address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    /// Display name, RFC 2047-decoded, if present.
    pub name: Option<String>,
    /// Local part (before `@`).
    pub mailbox: String,
    /// Domain part (after `@`); empty for local-only addresses.
    pub host: String,
}

impl Address {
    /// Returns the bare `mailbox@host` form.
    #[must_use]
    pub fn email(&self) -> String {
        if self.host.is_empty() {
            self.mailbox.clone()
        } else {
            format!("{}@{}", self.mailbox, self.host)
        }
    }

    /// Returns the full string form, `Name <mailbox@host>` when a display
    /// name is present.
    #[must_use]
    pub fn full(&self) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => format!("{} <{}>", name, self.email()),
            _ => self.email(),
        }
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full())
    }
}

/// Parses an address-list header value.
///
/// Group display names are dropped and the group's members are flattened
/// into the result. Unparseable fragments are skipped rather than failing
/// the list.
#[must_use]
pub fn parse_address_list(value: &str) -> Vec<Address> {
    split_addresses(value)
        .iter()
        .filter_map(|item| parse_one(item))
        .collect()
}

/// Splits on commas that are not inside quotes, angle brackets, or
/// comments. Group prefixes (`name:`) and terminators (`;`) are stripped.
fn split_addresses(value: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut angle_depth = 0u32;
    let mut comment_depth = 0u32;
    let mut escaped = false;

    for c in value.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => {
                current.push(c);
                escaped = true;
            }
            '"' if comment_depth == 0 => {
                current.push(c);
                in_quotes = !in_quotes;
            }
            '(' if !in_quotes => {
                current.push(c);
                comment_depth += 1;
            }
            ')' if !in_quotes && comment_depth > 0 => {
                current.push(c);
                comment_depth -= 1;
            }
            '<' if !in_quotes && comment_depth == 0 => {
                current.push(c);
                angle_depth += 1;
            }
            '>' if !in_quotes && comment_depth == 0 && angle_depth > 0 => {
                current.push(c);
                angle_depth -= 1;
            }
            // Group prefix: everything before the colon is the group name.
            ':' if !in_quotes && comment_depth == 0 && angle_depth == 0 => {
                current.clear();
            }
            ';' if !in_quotes && comment_depth == 0 && angle_depth == 0 => {
                if !current.trim().is_empty() {
                    items.push(current.trim().to_string());
                }
                current.clear();
            }
            ',' if !in_quotes && comment_depth == 0 && angle_depth == 0 => {
                if !current.trim().is_empty() {
                    items.push(current.trim().to_string());
                }
                current.clear();
            }
            _ => current.push(c),
        }
    }

    if !current.trim().is_empty() {
        items.push(current.trim().to_string());
    }

    items
}

/// Parses one mailbox specification.
fn parse_one(item: &str) -> Option<Address> {
    let item = item.trim();
    if item.is_empty() {
        return None;
    }

    // Name <addr@host> form.
    if let Some(open) = find_unquoted(item, '<') {
        let close = item[open..].find('>').map(|i| open + i)?;
        let addr = item[open + 1..close].trim();
        let raw_name = item[..open].trim();
        let name = clean_name(raw_name);
        let (mailbox, host) = split_at_sign(addr);
        return Some(Address {
            name,
            mailbox,
            host,
        });
    }

    // addr@host (Name) form.
    if let Some(open) = item.find('(') {
        let close = item[open..].find(')').map(|i| open + i).unwrap_or(item.len());
        let name = clean_name(item[open + 1..close].trim());
        let addr = item[..open].trim();
        let (mailbox, host) = split_at_sign(addr);
        if mailbox.is_empty() {
            return None;
        }
        return Some(Address {
            name,
            mailbox,
            host,
        });
    }

    // Bare addr@host.
    let (mailbox, host) = split_at_sign(item);
    if mailbox.is_empty() {
        return None;
    }
    Some(Address {
        name: None,
        mailbox,
        host,
    })
}

/// Finds a character outside double quotes.
fn find_unquoted(s: &str, target: char) -> Option<usize> {
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            _ if c == target && !in_quotes => return Some(i),
            _ => {}
        }
    }
    None
}

/// Unquotes and RFC 2047-decodes a display name.
fn clean_name(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let unquoted = if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        raw[1..raw.len() - 1].replace("\\\"", "\"").replace("\\\\", "\\")
    } else {
        raw.to_string()
    };
    let decoded = decode_rfc2047(&unquoted);
    let decoded = decoded.trim();
    if decoded.is_empty() {
        None
    } else {
        Some(decoded.to_string())
    }
}

/// Splits `local@domain` on the last `@`.
fn split_at_sign(addr: &str) -> (String, String) {
    match addr.rfind('@') {
        Some(at) => (addr[..at].to_string(), addr[at + 1..].to_string()),
        None => (addr.to_string(), String::new()),
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

    #[test]
    fn test_bare_address() {
        let addrs = parse_address_list("from@here.com");
        assert_eq!(addrs.len(), 1);
        assert_eq!(addrs[0].name, None);
        assert_eq!(addrs[0].mailbox, "from");
        assert_eq!(addrs[0].host, "here.com");
        assert_eq!(addrs[0].email(), "from@here.com");
    }

    #[test]
    fn test_named_address() {
        let addrs = parse_address_list("John Doe <john@example.com>");
        assert_eq!(addrs[0].name.as_deref(), Some("John Doe"));
        assert_eq!(addrs[0].email(), "john@example.com");
        assert_eq!(addrs[0].full(), "John Doe <john@example.com>");
    }

    #[test]
    fn test_quoted_name() {
        let addrs = parse_address_list("\"Doe, John\" <john@example.com>");
        assert_eq!(addrs.len(), 1);
        assert_eq!(addrs[0].name.as_deref(), Some("Doe, John"));
        assert_eq!(addrs[0].email(), "john@example.com");
    }

    #[test]
    fn test_comment_name() {
        let addrs = parse_address_list("john@example.com (John Doe)");
        assert_eq!(addrs[0].name.as_deref(), Some("John Doe"));
        assert_eq!(addrs[0].email(), "john@example.com");
    }

    #[test]
    fn test_encoded_name() {
        let addrs = parse_address_list("=?utf-8?B?SsO8cmdlbg==?= <j@example.de>");
        assert_eq!(addrs[0].name.as_deref(), Some("Jürgen"));
    }

    #[test]
    fn test_list_order_preserved() {
        let addrs = parse_address_list("a@x.com, b@y.com, c@z.com");
        let emails: Vec<String> = addrs.iter().map(Address::email).collect();
        assert_eq!(emails, vec!["a@x.com", "b@y.com", "c@z.com"]);
    }

    #[test]
    fn test_group_flattened() {
        let addrs = parse_address_list("Team: a@x.com, b@y.com;, solo@z.com");
        let emails: Vec<String> = addrs.iter().map(Address::email).collect();
        assert_eq!(emails, vec!["a@x.com", "b@y.com", "solo@z.com"]);
    }

    #[test]
    fn test_empty_group() {
        let addrs = parse_address_list("undisclosed-recipients:;");
        assert!(addrs.is_empty());
    }

    #[test]
    fn test_address_without_host() {
        let addrs = parse_address_list("postmaster");
        assert_eq!(addrs[0].mailbox, "postmaster");
        assert_eq!(addrs[0].host, "");
        assert_eq!(addrs[0].email(), "postmaster");
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_address_list("").is_empty());
        assert!(parse_address_list("   ").is_empty());
    }
}
