//! Decoding and cleanup of raw song files.

use std::borrow::Cow;
use unicode_normalization::UnicodeNormalization;

/// Decode raw file bytes as UTF-8, falling back to Latin-1.
///
/// A leading UTF-8 byte order mark is dropped.
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(e) => {
            log::debug!(
                "Input is not valid UTF-8 (at byte {}), decoding as Latin-1",
                e.valid_up_to()
            );
            // Latin-1 maps every byte to the code point of the same value.
            bytes.iter().map(|&b| b as char).collect()
        }
    }
}

/// Normalize `\r\n` and lone `\r` line endings to `\n`.
pub fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

/// Compose a line to Unicode NFC so visually equal lyrics compare equal.
pub fn to_nfc(line: &str) -> String {
    line.nfc().collect()
}
