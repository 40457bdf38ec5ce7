//! MIME encoding and decoding.
//!
//! Base64 and quoted-printable transfer decoding, plus RFC 2047
//! encoded-word decoding for header values.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::charset;
use crate::error::{Error, Result};

/// Content-Transfer-Encoding of a body part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferEncoding {
    /// 7bit (identity).
    #[default]
    SevenBit,
    /// 8bit (identity).
    EightBit,
    /// binary (identity).
    Binary,
    /// quoted-printable (RFC 2045).
    QuotedPrintable,
    /// base64 (RFC 2045).
    Base64,
}

impl TransferEncoding {
    /// Parses a Content-Transfer-Encoding header value.
    ///
    /// Unknown encodings are treated as identity, which matches what mail
    /// readers do in practice.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "quoted-printable" => Self::QuotedPrintable,
            "base64" => Self::Base64,
            "8bit" => Self::EightBit,
            "binary" => Self::Binary,
            _ => Self::SevenBit,
        }
    }

    /// Decodes body bytes under this transfer encoding.
    ///
    /// # Errors
    ///
    /// Returns an error only for base64 payloads that stay malformed after
    /// whitespace stripping; quoted-printable decoding is lenient.
    pub fn decode(self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::SevenBit | Self::EightBit | Self::Binary => Ok(data.to_vec()),
            Self::QuotedPrintable => Ok(decode_quoted_printable(data)),
            Self::Base64 => decode_base64(&String::from_utf8_lossy(data)),
        }
    }
}

/// Encodes data as base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decodes base64 data, ignoring embedded whitespace and line breaks.
///
/// # Errors
///
/// Returns an error if the input is not valid base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD.decode(compact).map_err(Into::into)
}

/// Decodes quoted-printable bytes (RFC 2045).
///
/// Soft line breaks (`=\r\n`) are removed. Malformed escape sequences are
/// passed through literally rather than failing the part, so a sloppy
/// sender cannot take the whole message down with it.
#[must_use]
pub fn decode_quoted_printable(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        let b = data[i];
        if b != b'=' {
            out.push(b);
            i += 1;
            continue;
        }

        // Soft line break: =\r\n or =\n
        if data.get(i + 1) == Some(&b'\r') && data.get(i + 2) == Some(&b'\n') {
            i += 3;
            continue;
        }
        if data.get(i + 1) == Some(&b'\n') {
            i += 2;
            continue;
        }

        match (data.get(i + 1), data.get(i + 2)) {
            (Some(&hi), Some(&lo)) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => {
                let hex = [hi, lo];
                // Both bytes are hex digits, parsing cannot fail
                if let Ok(byte) =
                    u8::from_str_radix(std::str::from_utf8(&hex).unwrap_or("00"), 16)
                {
                    out.push(byte);
                }
                i += 3;
            }
            _ => {
                out.push(b'=');
                i += 1;
            }
        }
    }

    out
}

/// Decodes RFC 2047 encoded-words in a header value.
///
/// Handles `=?charset?B?base64?=` and `=?charset?Q?quoted-printable?=`
/// (`_` decodes to space in Q). Whitespace between two adjacent
/// encoded-words of the same charset is dropped so split words concatenate
/// seamlessly. Text that is not a valid encoded-word passes through
/// unchanged.
#[must_use]
pub fn decode_rfc2047(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = String::with_capacity(value.len());
    let mut pos = 0;
    // Charset of the last decoded word, when only whitespace has been seen
    // since. Used to drop the separator between adjacent encoded-words.
    let mut pending: Option<(String, usize)> = None;

    while pos < bytes.len() {
        let Some(start) = find_subsequence(bytes, b"=?", pos) else {
            out.push_str(&value[pos..]);
            break;
        };

        if let Some((decoded, charset, end)) = decode_encoded_word(value, start) {
            let gap = &value[pos..start];
            let same_charset = pending
                .as_ref()
                .is_some_and(|(c, p)| *p == pos && c.eq_ignore_ascii_case(&charset));
            let keep_gap = !(same_charset && gap.chars().all(char::is_whitespace));
            if keep_gap {
                out.push_str(gap);
            }
            out.push_str(&decoded);
            pending = Some((charset, end));
            pos = end;
        } else {
            // Not a valid encoded-word; emit up to and including "=?" and
            // keep scanning after it.
            out.push_str(&value[pos..start + 2]);
            pos = start + 2;
        }
    }

    out
}

/// Decodes one encoded-word starting at `start` (which points at `=?`).
///
/// Returns the decoded text, the charset label, and the index just past the
/// closing `?=`.
fn decode_encoded_word(value: &str, start: usize) -> Option<(String, String, usize)> {
    let rest = &value[start + 2..];

    let q1 = rest.find('?')?;
    let charset = &rest[..q1];
    // Strip an RFC 2231 language suffix: =?utf-8*en?...
    let charset = charset.split('*').next().unwrap_or(charset);
    if charset.is_empty() {
        return None;
    }

    let after_charset = &rest[q1 + 1..];
    let mut chars = after_charset.chars();
    let enc = chars.next()?;
    if !enc.is_ascii() || chars.next() != Some('?') {
        return None;
    }

    let payload_area = &after_charset[2..];
    let end_rel = payload_area.find("?=")?;
    let payload = &payload_area[..end_rel];

    let decoded_bytes = match enc.to_ascii_lowercase() {
        'b' => decode_base64(payload).ok()?,
        'q' => decode_quoted_printable(payload.replace('_', " ").as_bytes()),
        _ => return None,
    };

    let decoded = charset::decode(&decoded_bytes, charset);
    let end = start + 2 + q1 + 1 + 2 + end_rel + 2;
    Some((decoded, charset.to_string(), end))
}

/// Encodes a header value as an RFC 2047 B-encoded word when it contains
/// non-ASCII characters; ASCII-clean values pass through unchanged.
///
/// # Errors
///
/// Infallible in practice; the `Result` mirrors the decoding direction.
pub fn encode_rfc2047(text: &str, charset: &str) -> Result<String> {
    if text
        .chars()
        .all(|c| c.is_ascii() && c != '=' && c != '?' && !c.is_ascii_control())
    {
        return Ok(text.to_string());
    }
    if !charset.eq_ignore_ascii_case("utf-8") {
        return Err(Error::InvalidEncoding(format!(
            "can only encode utf-8, got {charset}"
        )));
    }
    Ok(format!("=?{charset}?B?{}?=", encode_base64(text.as_bytes())))
}

fn find_subsequence(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| from + i)
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
    fn test_base64_round_trip() {
        let data = b"Hello, World!";
        let encoded = encode_base64(data);
        assert_eq!(encoded, "SGVsbG8sIFdvcmxkIQ==");
        assert_eq!(decode_base64(&encoded).unwrap(), data);
    }

    #[test]
    fn test_base64_with_line_breaks() {
        let decoded = decode_base64("SGVs\r\nbG8s\r\nIFdvcmxkIQ==").unwrap();
        assert_eq!(decoded, b"Hello, World!");
    }

    #[test]
    fn test_quoted_printable_plain() {
        assert_eq!(decode_quoted_printable(b"Hello, World!"), b"Hello, World!");
    }

    #[test]
    fn test_quoted_printable_escapes() {
        assert_eq!(decode_quoted_printable(b"H=C3=A9llo"), "Héllo".as_bytes());
    }

    #[test]
    fn test_quoted_printable_soft_break() {
        assert_eq!(decode_quoted_printable(b"Hello=\r\nWorld"), b"HelloWorld");
        assert_eq!(decode_quoted_printable(b"Hello=\nWorld"), b"HelloWorld");
    }

    #[test]
    fn test_quoted_printable_malformed_passthrough() {
        assert_eq!(decode_quoted_printable(b"100=ZZ"), b"100=ZZ");
        assert_eq!(decode_quoted_printable(b"trailing="), b"trailing=");
    }

    #[test]
    fn test_rfc2047_b_encoded() {
        assert_eq!(decode_rfc2047("=?utf-8?B?SMOpbGxv?="), "Héllo");
    }

    #[test]
    fn test_rfc2047_q_encoded() {
        assert_eq!(decode_rfc2047("=?utf-8?Q?H=C3=A9llo?="), "Héllo");
        assert_eq!(decode_rfc2047("=?utf-8?q?a_b?="), "a b");
    }

    #[test]
    fn test_rfc2047_latin1() {
        assert_eq!(decode_rfc2047("=?iso-8859-1?Q?caf=E9?="), "café");
    }

    #[test]
    fn test_rfc2047_mixed_text() {
        assert_eq!(
            decode_rfc2047("Re: =?utf-8?B?SMOpbGxv?= again"),
            "Re: Héllo again"
        );
    }

    #[test]
    fn test_rfc2047_adjacent_words_drop_whitespace() {
        // Two words of the same charset separated by whitespace join
        // without the separator.
        assert_eq!(
            decode_rfc2047("=?utf-8?Q?Hello?= =?utf-8?Q?World?="),
            "HelloWorld"
        );
        assert_eq!(
            decode_rfc2047("=?utf-8?Q?Hello?=\r\n =?utf-8?Q?World?="),
            "HelloWorld"
        );
    }

    #[test]
    fn test_rfc2047_adjacent_words_different_charset_keep_space() {
        assert_eq!(
            decode_rfc2047("=?utf-8?Q?Hello?= =?iso-8859-1?Q?World?="),
            "Hello World"
        );
    }

    #[test]
    fn test_rfc2047_invalid_word_passthrough() {
        assert_eq!(decode_rfc2047("=?broken"), "=?broken");
        assert_eq!(decode_rfc2047("x =? y"), "x =? y");
    }

    #[test]
    fn test_rfc2047_round_trip() {
        let original = "Prostřeno 2014";
        let encoded = encode_rfc2047(original, "utf-8").unwrap();
        assert_eq!(decode_rfc2047(&encoded), original);
    }

    #[test]
    fn test_encode_ascii_unchanged() {
        assert_eq!(encode_rfc2047("plain", "utf-8").unwrap(), "plain");
    }

    #[test]
    fn test_transfer_encoding_parse() {
        assert_eq!(
            TransferEncoding::parse("quoted-printable"),
            TransferEncoding::QuotedPrintable
        );
        assert_eq!(TransferEncoding::parse("BASE64"), TransferEncoding::Base64);
        assert_eq!(TransferEncoding::parse("7bit"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::parse("8bit"), TransferEncoding::EightBit);
        assert_eq!(
            TransferEncoding::parse("binary"),
            TransferEncoding::Binary
        );
        assert_eq!(
            TransferEncoding::parse("x-custom"),
            TransferEncoding::SevenBit
        );
    }

    #[test]
    fn test_transfer_decode_base64() {
        let decoded = TransferEncoding::Base64.decode(b"SGVsbG8=").unwrap();
        assert_eq!(decoded, b"Hello");
    }

    #[test]
    fn test_transfer_decode_identity() {
        let decoded = TransferEncoding::EightBit.decode(b"raw bytes").unwrap();
        assert_eq!(decoded, b"raw bytes");
    }
}
