//! Message parsing and multipart walking.
//!
//! A [`Message`] is built from raw RFC 822 bytes. The MIME tree is walked
//! recursively; every leaf becomes a [`Part`] with a dotted part number
//! (`1`, `1.2`, `1.2.1`, ...). Displayable text parts are collected into
//! the bodies map, everything else becomes an [`Attachment`]. A part never
//! appears in both.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};

use crate::address::{Address, parse_address_list};
use crate::attachment::Attachment;
use crate::charset;
use crate::content_type::ContentType;
use crate::date::parse_date;
use crate::encoding::TransferEncoding;
use crate::header::Headers;

/// A leaf node of the MIME tree.
#[derive(Debug, Clone)]
pub struct Part {
    /// Dotted MIME part number (`1`, `1.2.1`, ...).
    pub number: String,
    /// Content type with parameters.
    pub content_type: ContentType,
    /// Transfer encoding declared on the part.
    pub encoding: TransferEncoding,
    /// Disposition type, lowercased (`attachment`, `inline`), if declared.
    pub disposition: Option<String>,
    /// Filename from the disposition `filename` or type `name` parameter,
    /// RFC 2047-decoded.
    pub filename: Option<String>,
    /// Content-ID as delivered (angle brackets kept).
    pub content_id: Option<String>,
    /// Content-Description, decoded.
    pub description: Option<String>,
    /// Raw (not transfer-decoded) content bytes.
    pub raw: Vec<u8>,
}

impl Part {
    /// Returns the transfer-decoded content bytes.
    ///
    /// A malformed base64 payload falls back to the raw bytes; one bad
    /// part must not take the message down.
    #[must_use]
    pub fn decoded(&self) -> Vec<u8> {
        self.encoding
            .decode(&self.raw)
            .unwrap_or_else(|_| self.raw.clone())
    }

    /// Returns the content as UTF-8 text, resolving the declared charset.
    #[must_use]
    pub fn text(&self) -> String {
        let bytes = self.decoded();
        let label = self.content_type.charset().unwrap_or("utf-8");
        charset::decode(&bytes, label)
    }

    /// A part is a displayable body when it is `text/plain` or `text/html`
    /// with no attachment disposition and no filename.
    #[must_use]
    pub fn is_body(&self) -> bool {
        (self.content_type.is("text", "plain") || self.content_type.is("text", "html"))
            && self.disposition.as_deref() != Some("attachment")
            && self.filename.is_none()
    }
}

/// A materialised RFC 822 message.
#[derive(Debug, Clone, Default)]
pub struct Message {
    /// Decoded-on-read header multimap, in delivery order.
    pub headers: Headers,
    /// All leaf parts of the MIME tree, in walk order.
    pub parts: Vec<Part>,
    /// Displayable bodies keyed by `text` / `html`.
    pub bodies: BTreeMap<String, String>,
    /// Non-body parts.
    pub attachments: Vec<Attachment>,
}

impl Message {
    /// Parses raw message bytes into the structured graph.
    ///
    /// Parsing is total: malformed pieces degrade (absent bodies, raw
    /// bytes, `None` dates) instead of failing the message.
    #[must_use]
    pub fn parse(raw: &[u8]) -> Self {
        let (header_bytes, body) = split_entity(raw);
        let headers = Headers::parse(header_bytes);

        let mut message = Self {
            headers: headers.clone(),
            ..Self::default()
        };

        let mut path = Vec::new();
        message.walk(&headers, body, &mut path);
        message
    }

    /// Recursively walks one MIME entity.
    fn walk(&mut self, entity_headers: &Headers, body: &[u8], path: &mut Vec<u32>) {
        let content_type = entity_headers
            .get("Content-Type")
            .map_or_else(ContentType::text_plain, ContentType::parse);

        if content_type.is_multipart() {
            if let Some(boundary) = content_type.boundary() {
                let sections = split_multipart(body, boundary);
                if !sections.is_empty() {
                    for (index, section) in sections.iter().enumerate() {
                        let (child_headers, child_body) = split_entity(section);
                        let child_headers = Headers::parse(child_headers);
                        path.push(u32::try_from(index + 1).unwrap_or(u32::MAX));
                        self.walk(&child_headers, child_body, path);
                        path.pop();
                    }
                    return;
                }
            }
            // Multipart without a usable boundary degrades to a single
            // opaque part.
        }

        let number = if path.is_empty() {
            "1".to_string()
        } else {
            path.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(".")
        };

        let part = Part {
            number,
            encoding: entity_headers
                .get("Content-Transfer-Encoding")
                .map(TransferEncoding::parse)
                .unwrap_or_default(),
            disposition: entity_headers
                .get("Content-Disposition")
                .map(disposition_type),
            filename: part_filename(entity_headers, &content_type),
            content_id: entity_headers.get("Content-ID").map(str::to_string),
            description: entity_headers.get_decoded("Content-Description"),
            content_type,
            raw: body.to_vec(),
        };

        if part.is_body() {
            let kind = if part.content_type.is("text", "html") {
                "html"
            } else {
                "text"
            };
            let text = part.text();
            self.bodies
                .entry(kind.to_string())
                .and_modify(|existing| {
                    existing.push('\n');
                    existing.push_str(&text);
                })
                .or_insert(text);
        } else {
            self.attachments.push(Attachment::from_part(&part));
        }
        self.parts.push(part);
    }

    /// Decoded Subject header.
    #[must_use]
    pub fn subject(&self) -> Option<String> {
        self.headers.get_decoded("Subject")
    }

    /// Parsed Date header; `None` when absent or unparseable.
    #[must_use]
    pub fn date(&self) -> Option<DateTime<FixedOffset>> {
        self.headers.get("Date").and_then(parse_date)
    }

    /// From addresses.
    #[must_use]
    pub fn from(&self) -> Vec<Address> {
        self.address_header("From")
    }

    /// Sender addresses.
    #[must_use]
    pub fn sender(&self) -> Vec<Address> {
        self.address_header("Sender")
    }

    /// Reply-To addresses.
    #[must_use]
    pub fn reply_to(&self) -> Vec<Address> {
        self.address_header("Reply-To")
    }

    /// To addresses.
    #[must_use]
    pub fn to(&self) -> Vec<Address> {
        self.address_header("To")
    }

    /// Cc addresses.
    #[must_use]
    pub fn cc(&self) -> Vec<Address> {
        self.address_header("Cc")
    }

    /// Bcc addresses.
    #[must_use]
    pub fn bcc(&self) -> Vec<Address> {
        self.address_header("Bcc")
    }

    /// Message-ID with angle brackets stripped.
    #[must_use]
    pub fn message_id(&self) -> Option<String> {
        self.headers
            .get("Message-ID")
            .map(|v| v.trim().trim_start_matches('<').trim_end_matches('>').to_string())
    }

    /// In-Reply-To header, verbatim.
    #[must_use]
    pub fn in_reply_to(&self) -> Option<String> {
        self.headers.get("In-Reply-To").map(str::to_string)
    }

    /// The plain-text body, if any.
    #[must_use]
    pub fn text_body(&self) -> Option<&str> {
        self.bodies.get("text").map(String::as_str)
    }

    /// The HTML body, if any.
    #[must_use]
    pub fn html_body(&self) -> Option<&str> {
        self.bodies.get("html").map(String::as_str)
    }

    /// Returns true if an HTML body is present.
    #[must_use]
    pub fn has_html_body(&self) -> bool {
        self.bodies.contains_key("html")
    }

    /// Returns true if a plain-text body is present.
    #[must_use]
    pub fn has_text_body(&self) -> bool {
        self.bodies.contains_key("text")
    }

    /// The richest displayable body: HTML when present, plain text
    /// otherwise.
    #[must_use]
    pub fn primary_body(&self) -> Option<&str> {
        self.html_body().or_else(|| self.text_body())
    }

    /// The HTML body with `cid:` references resolved into base64 data
    /// URIs from related attachments.
    #[must_use]
    pub fn inline_html(&self) -> Option<String> {
        let html = self.html_body()?;
        let mut out = html.to_string();
        for attachment in &self.attachments {
            let Some(cid) = attachment.content_id.as_deref() else {
                continue;
            };
            let needle = format!("cid:{cid}");
            if out.contains(&needle) {
                let uri = format!(
                    "data:{};base64,{}",
                    attachment.mime_type,
                    crate::encoding::encode_base64(attachment.content())
                );
                out = out.replace(&needle, &uri);
            }
        }
        Some(out)
    }

    fn address_header(&self, name: &str) -> Vec<Address> {
        self.headers
            .get_all(name)
            .iter()
            .flat_map(|v| parse_address_list(v))
            .collect()
    }
}

/// Splits an entity into its header block and body at the first blank line.
fn split_entity(raw: &[u8]) -> (&[u8], &[u8]) {
    if let Some(pos) = find(raw, b"\r\n\r\n") {
        (&raw[..pos + 2], &raw[pos + 4..])
    } else if let Some(pos) = find(raw, b"\n\n") {
        (&raw[..pos + 1], &raw[pos + 2..])
    } else {
        (raw, &[])
    }
}

/// Splits a multipart body into its sections.
///
/// Content before the first `--boundary` (the preamble) and after
/// `--boundary--` (the epilogue) is discarded. The CRLF preceding each
/// delimiter belongs to the delimiter, not the section.
fn split_multipart<'a>(body: &'a [u8], boundary: &str) -> Vec<&'a [u8]> {
    let delimiter = format!("--{boundary}");
    let closing = format!("--{boundary}--");

    let mut sections = Vec::new();
    let mut section_start: Option<usize> = None;
    let mut line_start = 0;

    while line_start <= body.len() {
        let line_end = find_from(body, b"\n", line_start).unwrap_or(body.len());
        let line = trim_line(&body[line_start..line_end]);

        if line == closing.as_bytes() || line == delimiter.as_bytes() {
            if let Some(start) = section_start {
                let mut end = line_start;
                // Drop the line break that precedes the delimiter.
                if end >= 1 && body[end - 1] == b'\n' {
                    end -= 1;
                    if end >= 1 && body[end - 1] == b'\r' {
                        end -= 1;
                    }
                }
                sections.push(&body[start..end]);
            }
            if line == closing.as_bytes() {
                return sections;
            }
            section_start = Some(line_end + 1);
        }

        if line_end >= body.len() {
            break;
        }
        line_start = line_end + 1;
    }

    // Unterminated multipart: take what we have up to the end.
    if let Some(start) = section_start {
        if start <= body.len() {
            sections.push(&body[start..]);
        }
    }
    sections
}

/// Extracts the disposition type, lowercased, from a Content-Disposition
/// value.
fn disposition_type(value: &str) -> String {
    value
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase()
}

/// Resolves a part's filename from `Content-Disposition: ...; filename=`
/// first, the Content-Type `name` parameter second.
fn part_filename(headers: &Headers, content_type: &ContentType) -> Option<String> {
    if let Some(disposition) = headers.get("Content-Disposition") {
        for segment in disposition.split(';').skip(1) {
            if let Some((key, value)) = segment.split_once('=') {
                if key.trim().eq_ignore_ascii_case("filename") {
                    let value = value.trim().trim_matches('"');
                    if !value.is_empty() {
                        return Some(crate::encoding::decode_rfc2047(value));
                    }
                }
            }
        }
    }
    content_type.name().filter(|n| !n.is_empty())
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn find_from(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| from + i)
}

fn trim_line(line: &[u8]) -> &[u8] {
    let mut line = line;
    while let Some((&last, rest)) = line.split_last() {
        if last == b'\r' || last == b' ' || last == b'\t' {
            line = rest;
        } else {
            break;
        }
    }
    line
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
    fn test_plain_text_message() {
        let raw = b"Subject: Nuu\r\nFrom: from@here.com\r\nTo: to@here.com\r\n\r\nHi";
        let message = Message::parse(raw);

        assert_eq!(message.subject().as_deref(), Some("Nuu"));
        assert_eq!(message.text_body(), Some("Hi"));
        assert!(!message.has_html_body());
        assert!(message.date().is_none());
        assert_eq!(message.from()[0].email(), "from@here.com");
        assert_eq!(message.to()[0].email(), "to@here.com");
        assert!(message.attachments.is_empty());
        assert_eq!(message.parts[0].number, "1");
    }

    #[test]
    fn test_multipart_alternative() {
        let raw = b"Content-Type: multipart/alternative; boundary=XYZ\r\n\r\n\
            --XYZ\r\n\
            Content-Type: text/plain\r\n\r\n\
            plain version\r\n\
            --XYZ\r\n\
            Content-Type: text/html\r\n\r\n\
            <p>html version</p>\r\n\
            --XYZ--\r\n";
        let message = Message::parse(raw);

        assert_eq!(message.text_body(), Some("plain version"));
        assert_eq!(message.html_body(), Some("<p>html version</p>"));
        assert_eq!(message.primary_body(), Some("<p>html version</p>"));
        assert_eq!(message.parts[0].number, "1");
        assert_eq!(message.parts[1].number, "2");
        assert!(message.attachments.is_empty());
    }

    #[test]
    fn test_nested_multipart_numbers() {
        let raw = b"Content-Type: multipart/mixed; boundary=OUTER\r\n\r\n\
            --OUTER\r\n\
            Content-Type: multipart/alternative; boundary=INNER\r\n\r\n\
            --INNER\r\n\
            Content-Type: text/plain\r\n\r\n\
            plain\r\n\
            --INNER\r\n\
            Content-Type: text/html\r\n\r\n\
            <b>html</b>\r\n\
            --INNER--\r\n\
            --OUTER\r\n\
            Content-Type: application/pdf; name=doc.pdf\r\n\r\n\
            %PDF\r\n\
            --OUTER--\r\n";
        let message = Message::parse(raw);

        let numbers: Vec<&str> = message.parts.iter().map(|p| p.number.as_str()).collect();
        assert_eq!(numbers, vec!["1.1", "1.2", "2"]);
        assert_eq!(message.attachments.len(), 1);
        assert_eq!(message.attachments[0].part_number, "2");
    }

    #[test]
    fn test_attachment_without_disposition() {
        // A filename alone is enough to classify as attachment.
        let raw = b"Content-Type: multipart/mixed; boundary=B\r\n\r\n\
            --B\r\n\
            Content-Type: text/plain\r\n\r\n\
            see attached\r\n\
            --B\r\n\
            Content-Type: application/vnd.ms-excel; name=\"report.xls\"\r\n\
            Content-Transfer-Encoding: base64\r\n\r\n\
            AAEC\r\n\
            --B--\r\n";
        let message = Message::parse(raw);

        assert_eq!(message.attachments.len(), 1);
        let attachment = &message.attachments[0];
        assert_eq!(attachment.filename.as_deref(), Some("report.xls"));
        assert!(attachment.disposition.is_none());
        assert_eq!(attachment.content(), &[0u8, 1, 2]);
    }

    #[test]
    fn test_no_part_in_both_bodies_and_attachments() {
        let raw = b"Content-Type: multipart/mixed; boundary=B\r\n\r\n\
            --B\r\n\
            Content-Type: text/plain\r\n\r\n\
            body\r\n\
            --B\r\n\
            Content-Type: image/png; name=x.png\r\n\r\n\
            PNG\r\n\
            --B--\r\n";
        let message = Message::parse(raw);

        let attachment_numbers: Vec<&str> = message
            .attachments
            .iter()
            .map(|a| a.part_number.as_str())
            .collect();
        let body_numbers: Vec<&str> = message
            .parts
            .iter()
            .filter(|p| p.is_body())
            .map(|p| p.number.as_str())
            .collect();
        assert!(attachment_numbers.iter().all(|n| !body_numbers.contains(n)));
    }

    #[test]
    fn test_inline_text_with_filename_is_attachment() {
        let raw = b"Content-Type: text/plain; name=\"notes.txt\"\r\n\
            Content-Disposition: inline; filename=\"notes.txt\"\r\n\r\n\
            some notes";
        let message = Message::parse(raw);

        assert!(message.bodies.is_empty());
        assert_eq!(message.attachments.len(), 1);
    }

    #[test]
    fn test_quoted_printable_body() {
        let raw = b"Content-Type: text/plain; charset=utf-8\r\n\
            Content-Transfer-Encoding: quoted-printable\r\n\r\n\
            caf=C3=A9";
        let message = Message::parse(raw);

        assert_eq!(message.text_body(), Some("café"));
    }

    #[test]
    fn test_latin1_body() {
        let mut raw = Vec::new();
        raw.extend_from_slice(b"Content-Type: text/plain; charset=iso-8859-1\r\n\r\ncaf\xE9");
        let message = Message::parse(&raw);

        assert_eq!(message.text_body(), Some("café"));
    }

    #[test]
    fn test_inline_html_resolves_cid() {
        let raw = b"Content-Type: multipart/related; boundary=R\r\n\r\n\
            --R\r\n\
            Content-Type: text/html\r\n\r\n\
            <img src=\"cid:img1\">\r\n\
            --R\r\n\
            Content-Type: image/png\r\n\
            Content-ID: <img1>\r\n\
            Content-Disposition: inline; filename=\"pixel.png\"\r\n\r\n\
            PNG\r\n\
            --R--\r\n";
        let message = Message::parse(raw);

        let html = message.inline_html().unwrap();
        assert!(html.contains("data:image/png;base64,"));
        assert!(!html.contains("cid:img1"));
    }

    #[test]
    fn test_date_parsing() {
        let raw = b"Date: Tue, 1 Jul 2003 10:52:37 +0200\r\n\r\nbody";
        let message = Message::parse(raw);
        assert!(message.date().is_some());

        let raw = b"Date: garbage\r\n\r\nbody";
        let message = Message::parse(raw);
        assert!(message.date().is_none());
    }

    #[test]
    fn test_message_id_brackets_stripped() {
        let raw = b"Message-ID: <abc@def>\r\n\r\nbody";
        let message = Message::parse(raw);
        assert_eq!(message.message_id().as_deref(), Some("abc@def"));
    }

    #[test]
    fn test_headers_only_message() {
        let message = Message::parse(b"Subject: bare\r\n\r\n");
        assert_eq!(message.subject().as_deref(), Some("bare"));
        assert_eq!(message.text_body(), Some(""));
    }

    #[test]
    fn test_multipart_without_terminator() {
        let raw = b"Content-Type: multipart/mixed; boundary=B\r\n\r\n\
            --B\r\n\
            Content-Type: text/plain\r\n\r\n\
            unterminated";
        let message = Message::parse(raw);
        assert_eq!(message.text_body(), Some("unterminated"));
    }
}
