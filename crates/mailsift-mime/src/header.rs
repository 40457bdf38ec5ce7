//! Message header handling.
//!
//! Headers are kept as an ordered name/value multimap: the order the server
//! delivered them in is the order callers see. Lookup is case-insensitive,
//! raw values are kept verbatim, and RFC 2047 decoding happens on read.

use crate::encoding::decode_rfc2047;

/// Ordered collection of message headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Creates an empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header, preserving insertion order.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Returns the first raw value for a header (case-insensitive name).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the first value for a header with RFC 2047 encoded-words
    /// decoded to UTF-8.
    #[must_use]
    pub fn get_decoded(&self, name: &str) -> Option<String> {
        self.get(name).map(decode_rfc2047)
    }

    /// Returns all raw values for a header in delivery order.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Returns true if the header is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterates over `(name, raw value)` pairs in delivery order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Returns the number of header fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parses a raw header block.
    ///
    /// Folded continuation lines (leading space or tab) are joined onto the
    /// preceding field with a single space. Parsing stops at the first
    /// empty line. Bytes outside UTF-8 are replaced; 8-bit headers are a
    /// protocol violation but do occur in the wild.
    #[must_use]
    pub fn parse(raw: &[u8]) -> Self {
        let text = String::from_utf8_lossy(raw);
        let mut headers = Self::new();
        let mut current: Option<(String, String)> = None;

        for line in text.lines() {
            if line.is_empty() {
                break;
            }

            if line.starts_with(' ') || line.starts_with('\t') {
                if let Some((_, value)) = current.as_mut() {
                    value.push(' ');
                    value.push_str(line.trim());
                }
                continue;
            }

            if let Some((name, value)) = current.take() {
                headers.add(name, value);
            }

            if let Some((name, value)) = line.split_once(':') {
                current = Some((name.trim().to_string(), value.trim().to_string()));
            }
        }

        if let Some((name, value)) = current {
            headers.add(name, value);
        }

        headers
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = (&'a str, &'a str);
    type IntoIter = std::vec::IntoIter<(&'a str, &'a str)>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter().collect::<Vec<_>>().into_iter()
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
    fn test_parse_simple() {
        let raw = b"From: sender@example.com\r\nTo: recipient@example.com\r\nSubject: Test\r\n\r\n";
        let headers = Headers::parse(raw);

        assert_eq!(headers.get("From"), Some("sender@example.com"));
        assert_eq!(headers.get("to"), Some("recipient@example.com"));
        assert_eq!(headers.get("SUBJECT"), Some("Test"));
        assert_eq!(headers.len(), 3);
    }

    #[test]
    fn test_parse_unfolds_continuations() {
        let raw = b"Content-Type: text/plain;\r\n charset=utf-8\r\n\r\n";
        let headers = Headers::parse(raw);

        assert_eq!(
            headers.get("Content-Type"),
            Some("text/plain; charset=utf-8")
        );
    }

    #[test]
    fn test_parse_preserves_order_and_duplicates() {
        let raw = b"Received: one\r\nReceived: two\r\nReceived: three\r\n\r\n";
        let headers = Headers::parse(raw);

        assert_eq!(headers.get_all("Received"), vec!["one", "two", "three"]);
        assert_eq!(headers.get("Received"), Some("one"));
    }

    #[test]
    fn test_parse_stops_at_blank_line() {
        let raw = b"Subject: hi\r\n\r\nNot-A-Header: body\r\n";
        let headers = Headers::parse(raw);

        assert_eq!(headers.len(), 1);
        assert!(!headers.contains("Not-A-Header"));
    }

    #[test]
    fn test_parse_without_final_crlf() {
        let headers = Headers::parse(b"Subject: trailing");
        assert_eq!(headers.get("Subject"), Some("trailing"));
    }

    #[test]
    fn test_get_decoded() {
        let raw = b"Subject: =?utf-8?B?SMOpbGxv?=\r\n\r\n";
        let headers = Headers::parse(raw);

        assert_eq!(headers.get_decoded("Subject").unwrap(), "Héllo");
    }

    #[test]
    fn test_split_on_first_colon_only() {
        let headers = Headers::parse(b"Subject: re: re: hi\r\n\r\n");
        assert_eq!(headers.get("Subject"), Some("re: re: hi"));
    }

    #[test]
    fn test_iter_order() {
        let raw = b"A: 1\r\nB: 2\r\nC: 3\r\n\r\n";
        let headers = Headers::parse(raw);

        let names: Vec<&str> = headers.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }
}
