//! Attachment model.
//!
//! An attachment wraps a non-body MIME part and exposes its content
//! lazily: transfer decoding happens on first access, and the identity of
//! an attachment is its Content-ID when present, otherwise a sha256 over
//! the decoded content.

use std::sync::OnceLock;

use sha2::{Digest, Sha256};

use crate::encoding::TransferEncoding;
use crate::message::Part;

/// Well-known MIME types for extension inference when the filename has
/// none.
const EXTENSION_MAP: &[(&str, &str)] = &[
    ("application/pdf", "pdf"),
    ("application/zip", "zip"),
    ("application/msword", "doc"),
    ("application/vnd.ms-excel", "xls"),
    ("application/vnd.openxmlformats-officedocument.wordprocessingml.document", "docx"),
    ("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet", "xlsx"),
    ("application/json", "json"),
    ("application/xml", "xml"),
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
    ("image/svg+xml", "svg"),
    ("text/plain", "txt"),
    ("text/html", "html"),
    ("text/csv", "csv"),
    ("text/calendar", "ics"),
    ("message/rfc822", "eml"),
];

/// A message attachment.
#[derive(Debug, Clone)]
pub struct Attachment {
    /// Dotted MIME part number of the source part.
    pub part_number: String,
    /// MIME type without parameters (`application/pdf`).
    pub mime_type: String,
    /// Disposition type (`attachment`, `inline`), if declared.
    pub disposition: Option<String>,
    /// Sanitised, decoded filename.
    pub filename: Option<String>,
    /// The Content-Type `name` parameter, decoded.
    pub name: Option<String>,
    /// Content-ID with angle brackets stripped.
    pub content_id: Option<String>,
    /// Declared charset, if any.
    pub charset: Option<String>,
    raw: Vec<u8>,
    encoding: TransferEncoding,
    decoded: OnceLock<Vec<u8>>,
    id: OnceLock<String>,
}

impl Attachment {
    /// Builds an attachment from a MIME part.
    #[must_use]
    pub fn from_part(part: &Part) -> Self {
        Self {
            part_number: part.number.clone(),
            mime_type: part.content_type.essence(),
            disposition: part.disposition.clone(),
            filename: part.filename.as_deref().map(sanitise_filename),
            name: part.content_type.name(),
            content_id: part
                .content_id
                .as_deref()
                .map(|id| id.trim().trim_start_matches('<').trim_end_matches('>').to_string()),
            charset: part.content_type.charset().map(str::to_string),
            raw: part.raw.clone(),
            encoding: part.encoding,
            decoded: OnceLock::new(),
            id: OnceLock::new(),
        }
    }

    /// Returns the decoded content bytes, decoding on first access.
    #[must_use]
    pub fn content(&self) -> &[u8] {
        self.decoded
            .get_or_init(|| {
                self.encoding
                    .decode(&self.raw)
                    .unwrap_or_else(|_| self.raw.clone())
            })
            .as_slice()
    }

    /// Returns the decoded content size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.content().len()
    }

    /// Stable identity: the Content-ID when present, otherwise the sha256
    /// of the decoded content in hex.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.get_or_init(|| match &self.content_id {
            Some(cid) if !cid.is_empty() => cid.clone(),
            _ => {
                let digest = Sha256::digest(self.content());
                digest.iter().map(|b| format!("{b:02x}")).collect()
            }
        })
    }

    /// File extension inferred from the filename, falling back to the MIME
    /// type.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        if let Some(filename) = &self.filename {
            if let Some((_, ext)) = filename.rsplit_once('.') {
                if !ext.is_empty() && ext.len() <= 10 {
                    return Some(ext.to_ascii_lowercase());
                }
            }
        }
        EXTENSION_MAP
            .iter()
            .find(|(mime, _)| mime.eq_ignore_ascii_case(&self.mime_type))
            .map(|(_, ext)| (*ext).to_string())
    }
}

impl PartialEq for Attachment {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Attachment {}

/// Strips path components and control characters from a filename.
fn sanitise_filename(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name);
    base.chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
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
    use crate::message::Message;

    fn excel_message() -> Message {
        // RFC 2047-encoded Czech filename, base64 payload, no disposition.
        let raw = b"Content-Type: multipart/mixed; boundary=B\r\n\r\n\
            --B\r\n\
            Content-Type: application/vnd.ms-excel; name=\"=?UTF-8?B?UHJvc3Ryzr5lbm8ueGxz?=\"\r\n\
            Content-Transfer-Encoding: base64\r\n\r\n\
            AAECAwQ=\r\n\
            --B--\r\n";
        Message::parse(raw)
    }

    #[test]
    fn test_decoded_filename_and_extension() {
        let message = excel_message();
        let attachment = &message.attachments[0];

        assert_eq!(attachment.extension().as_deref(), Some("xls"));
        assert!(attachment.filename.as_deref().unwrap().ends_with(".xls"));
        assert!(attachment.disposition.is_none());
    }

    #[test]
    fn test_content_decoded_lazily_and_stable() {
        let message = excel_message();
        let attachment = &message.attachments[0];

        assert_eq!(attachment.content(), &[0u8, 1, 2, 3, 4]);
        assert_eq!(attachment.size(), 5);
        // Identity is the content hash (no Content-ID present) and does
        // not change across calls.
        let id1 = attachment.id().to_string();
        let id2 = attachment.id().to_string();
        assert_eq!(id1, id2);
        assert_eq!(id1.len(), 64);
        assert!(attachment.content_id.is_none());
    }

    #[test]
    fn test_content_id_identity() {
        let raw = b"Content-Type: image/png\r\n\
            Content-ID: <logo@example>\r\n\
            Content-Disposition: attachment; filename=\"logo.png\"\r\n\r\n\
            PNG";
        let message = Message::parse(raw);
        let attachment = &message.attachments[0];

        assert_eq!(attachment.content_id.as_deref(), Some("logo@example"));
        assert_eq!(attachment.id(), "logo@example");
    }

    #[test]
    fn test_equality_by_id() {
        let raw = b"Content-Type: image/png\r\n\
            Content-ID: <same@id>\r\n\
            Content-Disposition: attachment; filename=\"a.png\"\r\n\r\n\
            AAA";
        let a = Message::parse(raw).attachments.remove(0);
        let raw = b"Content-Type: image/jpeg\r\n\
            Content-ID: <same@id>\r\n\
            Content-Disposition: attachment; filename=\"b.jpg\"\r\n\r\n\
            BBB";
        let b = Message::parse(raw).attachments.remove(0);

        assert_eq!(a, b);
    }

    #[test]
    fn test_sanitise_filename() {
        assert_eq!(sanitise_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitise_filename("C:\\temp\\report.xls"), "report.xls");
        assert_eq!(sanitise_filename("name\twith\u{0}controls.txt"), "namewithcontrols.txt");
    }

    #[test]
    fn test_extension_from_mime_type() {
        let raw = b"Content-Type: application/pdf\r\n\
            Content-Disposition: attachment\r\n\r\n\
            %PDF";
        let message = Message::parse(raw);
        assert_eq!(message.attachments[0].extension().as_deref(), Some("pdf"));
    }
}
