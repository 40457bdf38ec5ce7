//! Character set resolution.
//!
//! Header values and text bodies name their charset in whatever form the
//! sending software happened to emit. This module maps those labels onto
//! an [`encoding_rs::Encoding`] through a canonical alias table and decodes
//! bytes to UTF-8, replacing unmappable sequences rather than failing.

use encoding_rs::Encoding;

/// Resolves a charset label to an encoding.
///
/// Labels are trimmed, unquoted, and matched case-insensitively. Labels the
/// WHATWG table does not know (`cp1252`, `unknown-8bit`, ...) are mapped via
/// a small alias list; anything still unresolved falls back to UTF-8.
#[must_use]
pub fn lookup(label: &str) -> &'static Encoding {
    let label = label.trim().trim_matches('"').trim_matches('\'');

    if let Some(enc) = Encoding::for_label(label.as_bytes()) {
        return enc;
    }

    match normalise(label).as_str() {
        "cp1250" => encoding_rs::WINDOWS_1250,
        "cp1251" => encoding_rs::WINDOWS_1251,
        "cp1252" | "ansi" | "unknown8bit" | "xunknown" | "default" => encoding_rs::WINDOWS_1252,
        "cp1253" => encoding_rs::WINDOWS_1253,
        "cp1254" => encoding_rs::WINDOWS_1254,
        "cp1255" => encoding_rs::WINDOWS_1255,
        "cp1256" => encoding_rs::WINDOWS_1256,
        "cp1257" => encoding_rs::WINDOWS_1257,
        "cp1258" => encoding_rs::WINDOWS_1258,
        "cp932" | "ms932" => encoding_rs::SHIFT_JIS,
        "cp949" | "ksc56011987" | "ksc5601" => encoding_rs::EUC_KR,
        "cp936" => encoding_rs::GBK,
        _ => encoding_rs::UTF_8,
    }
}

/// Decodes bytes under the given charset label, lossily, to UTF-8.
#[must_use]
pub fn decode(bytes: &[u8], label: &str) -> String {
    let (text, _, _) = lookup(label).decode(bytes);
    text.into_owned()
}

/// Strips separators and lowercases so `KS_C_5601-1987` and `ks_c_5601.1987`
/// compare equal.
fn normalise(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
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
    fn test_lookup_common_labels() {
        assert_eq!(lookup("utf-8"), encoding_rs::UTF_8);
        assert_eq!(lookup("UTF-8"), encoding_rs::UTF_8);
        assert_eq!(lookup("iso-8859-1"), encoding_rs::WINDOWS_1252);
        assert_eq!(lookup("latin1"), encoding_rs::WINDOWS_1252);
        assert_eq!(lookup("us-ascii"), encoding_rs::WINDOWS_1252);
    }

    #[test]
    fn test_lookup_aliases() {
        assert_eq!(lookup("cp1252"), encoding_rs::WINDOWS_1252);
        assert_eq!(lookup("CP932"), encoding_rs::SHIFT_JIS);
        assert_eq!(lookup("ks_c_5601-1987"), encoding_rs::EUC_KR);
    }

    #[test]
    fn test_lookup_quoted_label() {
        assert_eq!(lookup("\"utf-8\""), encoding_rs::UTF_8);
    }

    #[test]
    fn test_lookup_unknown_falls_back_to_utf8() {
        assert_eq!(lookup("no-such-charset"), encoding_rs::UTF_8);
    }

    #[test]
    fn test_decode_latin1() {
        // 0xE9 is é in latin-1
        assert_eq!(decode(b"caf\xE9", "iso-8859-1"), "café");
    }

    #[test]
    fn test_decode_utf8() {
        assert_eq!(decode("café".as_bytes(), "utf-8"), "café");
    }

    #[test]
    fn test_decode_invalid_bytes_are_replaced() {
        let out = decode(b"\xFF\xFE", "utf-8");
        assert!(out.contains('\u{FFFD}'));
    }
}
