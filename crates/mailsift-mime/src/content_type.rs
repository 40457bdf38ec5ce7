//! Content-Type handling.

use std::collections::HashMap;
use std::fmt;

use crate::encoding::decode_rfc2047;

/// MIME content type with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type (e.g. "text", "image", "multipart").
    pub main_type: String,
    /// Subtype (e.g. "plain", "html", "jpeg").
    pub sub_type: String,
    /// Parameters with lowercased keys (charset, boundary, name, ...).
    pub parameters: HashMap<String, String>,
}

impl ContentType {
    /// Creates a new content type without parameters.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: HashMap::new(),
        }
    }

    /// The default content type for a message with no Content-Type header.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain")
    }

    /// Returns the charset parameter, if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameters.get("charset").map(String::as_str)
    }

    /// Returns the boundary parameter, if present.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameters.get("boundary").map(String::as_str)
    }

    /// Returns the `name` parameter, RFC 2047-decoded, if present.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.parameters.get("name").map(|n| decode_rfc2047(n))
    }

    /// Returns true for `multipart/*`.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type.eq_ignore_ascii_case("multipart")
    }

    /// Returns true for `text/*`.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.main_type.eq_ignore_ascii_case("text")
    }

    /// Returns true if this is exactly `type/subtype` (case-insensitive).
    #[must_use]
    pub fn is(&self, main_type: &str, sub_type: &str) -> bool {
        self.main_type.eq_ignore_ascii_case(main_type)
            && self.sub_type.eq_ignore_ascii_case(sub_type)
    }

    /// Returns the `type/subtype` string without parameters.
    #[must_use]
    pub fn essence(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }

    /// Parses a Content-Type header value.
    ///
    /// Quoted parameter values may contain `;` and `=`; a missing subtype
    /// defaults sensibly (`text` → `text/plain`). Unparseable input falls
    /// back to `text/plain` rather than failing the message.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let mut segments = split_params(value);
        if segments.is_empty() {
            return Self::text_plain();
        }

        let type_str = segments.remove(0);
        let (main_type, sub_type) = match type_str.split_once('/') {
            Some((m, s)) => (m.trim().to_lowercase(), s.trim().to_lowercase()),
            None => {
                let m = type_str.trim().to_lowercase();
                if m.is_empty() {
                    return Self::text_plain();
                }
                let s = if m == "text" { "plain" } else { "octet-stream" };
                (m, s.to_string())
            }
        };

        let mut ct = Self::new(main_type, sub_type);
        for seg in segments {
            if let Some((key, val)) = seg.split_once('=') {
                let key = key.trim().to_lowercase();
                let val = unquote(val.trim());
                ct.parameters.insert(key, val);
            }
        }
        ct
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.main_type, self.sub_type)?;
        let mut params: Vec<_> = self.parameters.iter().collect();
        params.sort_by(|(a, _), (b, _)| a.cmp(b));
        for (key, value) in params {
            if value.contains(|c: char| c.is_whitespace() || "()<>@,;:\\\"/[]?=".contains(c)) {
                write!(f, "; {key}=\"{value}\"")?;
            } else {
                write!(f, "; {key}={value}")?;
            }
        }
        Ok(())
    }
}

impl Default for ContentType {
    fn default() -> Self {
        Self::text_plain()
    }
}

/// Splits on `;` outside double quotes.
fn split_params(value: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
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
            '"' => {
                current.push(c);
                in_quotes = !in_quotes;
            }
            ';' if !in_quotes => {
                if !current.trim().is_empty() {
                    parts.push(current.trim().to_string());
                }
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

/// Removes surrounding double quotes and unescapes the content.
fn unquote(value: &str) -> String {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        value[1..value.len() - 1]
            .replace("\\\"", "\"")
            .replace("\\\\", "\\")
    } else {
        value.to_string()
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
    fn test_parse_basic() {
        let ct = ContentType::parse("text/plain; charset=utf-8");
        assert_eq!(ct.main_type, "text");
        assert_eq!(ct.sub_type, "plain");
        assert_eq!(ct.charset(), Some("utf-8"));
    }

    #[test]
    fn test_parse_quoted_boundary() {
        let ct = ContentType::parse("multipart/mixed; boundary=\"----=_Part;1=2\"");
        assert!(ct.is_multipart());
        assert_eq!(ct.boundary(), Some("----=_Part;1=2"));
    }

    #[test]
    fn test_parse_case_normalised() {
        let ct = ContentType::parse("Text/HTML; Charset=UTF-8");
        assert!(ct.is("text", "html"));
        assert_eq!(ct.charset(), Some("UTF-8"));
    }

    #[test]
    fn test_parse_missing_subtype() {
        let ct = ContentType::parse("text");
        assert!(ct.is("text", "plain"));
    }

    #[test]
    fn test_parse_empty_defaults() {
        let ct = ContentType::parse("");
        assert!(ct.is("text", "plain"));
    }

    #[test]
    fn test_encoded_name_parameter() {
        let ct = ContentType::parse(
            "application/vnd.ms-excel; name=\"=?UTF-8?B?dGVzdC54bHM=?=\"",
        );
        assert_eq!(ct.name().as_deref(), Some("test.xls"));
    }

    #[test]
    fn test_essence() {
        let ct = ContentType::parse("image/png; name=x.png");
        assert_eq!(ct.essence(), "image/png");
    }

    #[test]
    fn test_display_round_trip() {
        let ct = ContentType::parse("text/plain; charset=utf-8");
        let s = ct.to_string();
        assert!(s.starts_with("text/plain"));
        assert!(s.contains("charset=utf-8"));
    }
}
