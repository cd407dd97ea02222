//! Small XML helpers shared by the package readers and slide writers.

use quick_xml::events::attributes::Attribute;
use quick_xml::events::BytesStart;
use songdeck_core::{Error, Result};

/// Extract the local name from a potentially namespaced XML element name.
pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Prefix of a namespaced element name (`"p"` for `p:sld`), if any.
pub(crate) fn prefix(name: &[u8]) -> Option<&[u8]> {
    name.iter().position(|&b| b == b':').map(|pos| &name[..pos])
}

/// Read an attribute by its full (possibly prefixed) name.
pub(crate) fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| attr_value(&a))
}

/// Unescaped attribute value, falling back to the raw bytes.
fn attr_value(a: &Attribute<'_>) -> String {
    a.unescape_value()
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| String::from_utf8_lossy(&a.value).to_string())
}

/// Escape text for element content or attribute values.
///
/// Control characters that XML 1.0 cannot represent are dropped.
pub(crate) fn escape(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|&c| c == '\t' || c == '\n' || c == '\r' || c >= ' ')
        .collect();
    quick_xml::escape::escape(cleaned.as_str()).into_owned()
}

/// Wrap a quick-xml error with the part it came from.
pub(crate) fn xml_error(part: &str, err: impl std::fmt::Display) -> Error {
    Error::Xml(format!("'{}': {}", part, err))
}

/// Decode a part's bytes as UTF-8.
pub(crate) fn part_text(part: &str, bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| Error::Xml(format!("'{}' is not valid UTF-8: {}", part, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_name() {
        assert_eq!(local_name(b"p:sp"), b"sp");
        assert_eq!(local_name(b"a:t"), b"t");
        assert_eq!(local_name(b"sp"), b"sp");
    }

    #[test]
    fn test_prefix() {
        assert_eq!(prefix(b"p:sldIdLst"), Some(&b"p"[..]));
        assert_eq!(prefix(b"Relationship"), None);
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("Rock & Roll <live>"), "Rock &amp; Roll &lt;live&gt;");
        assert_eq!(escape("\"quoted\" 'single'"), "&quot;quoted&quot; &apos;single&apos;");
        assert_eq!(escape("bell\u{7}less"), "bellless");
        assert_eq!(escape("tab\tkept"), "tab\tkept");
    }
}
