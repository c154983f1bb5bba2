//! Filesystem-safe encoding of session identifiers.
//!
//! Session identifiers are opaque caller strings, so they may contain path
//! separators, dots or non-ASCII text. Everything outside `[A-Za-z0-9_-]` is
//! written as `%XX` per UTF-8 byte, which keeps distinct identifiers in
//! distinct directories and makes `.`/`..` impossible.

use std::fmt::Write as _;

pub fn encode_session_dir(session_id: &str) -> String {
    let mut encoded = String::with_capacity(session_id.len());
    for byte in session_id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            encoded.push(byte as char);
        } else {
            let _ = write!(encoded, "%{byte:02X}");
        }
    }
    encoded
}

/// Reverses [`encode_session_dir`]; `None` for names it could not have produced.
pub fn decode_session_dir(name: &str) -> Option<String> {
    let bytes = name.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = name.get(i + 1..i + 3)?;
                decoded.push(u8::from_str_radix(hex, 16).ok()?);
                i += 3;
            }
            b if b.is_ascii_alphanumeric() || b == b'_' || b == b'-' => {
                decoded.push(b);
                i += 1;
            }
            _ => return None,
        }
    }
    String::from_utf8(decoded).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_identifiers_are_unchanged() {
        assert_eq!(encode_session_dir("chat-42_a"), "chat-42_a");
    }

    #[test]
    fn test_unsafe_characters_are_escaped() {
        assert_eq!(encode_session_dir("../etc"), "%2E%2E%2Fetc");
        assert_eq!(encode_session_dir("a b"), "a%20b");
        assert_eq!(decode_session_dir("%2E%2E%2Fetc").as_deref(), Some("../etc"));
    }

    #[test]
    fn test_unicode_survives() {
        let id = "セッション/1";
        assert_eq!(decode_session_dir(&encode_session_dir(id)).as_deref(), Some(id));
    }

    #[test]
    fn test_foreign_names_are_rejected() {
        assert_eq!(decode_session_dir(".hidden"), None);
        assert_eq!(decode_session_dir("%G1"), None);
        assert_eq!(decode_session_dir("%4"), None);
    }
}
