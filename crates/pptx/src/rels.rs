//! Relationship parts (`*.rels`).

use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use songdeck_core::Result;
use std::fmt::Write as FmtWrite;
use std::sync::LazyLock;

use crate::xml::{attr, escape, local_name, xml_error};

/// Relationship type URIs used by this crate.
pub mod rel_type {
    pub const OFFICE_DOCUMENT: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
    pub const SLIDE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
    pub const SLIDE_LAYOUT: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
    pub const SLIDE_MASTER: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
    pub const NOTES_SLIDE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesSlide";
}

const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// Matches relationship ids of the form `rId12`.
static RID_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^rId(\d+)$").unwrap());

/// A single relationship entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    /// `External` for links outside the package.
    pub target_mode: Option<String>,
}

impl Relationship {
    /// Whether the target lives outside the package.
    pub fn is_external(&self) -> bool {
        self.target_mode.as_deref() == Some("External")
    }
}

/// The relationships of one part, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relationships {
    items: Vec<Relationship>,
}

impl Relationships {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `.rels` part. `part` names it in error messages.
    pub fn parse(part: &str, xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);
        let mut items = Vec::new();

        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                    if local_name(e.name().as_ref()) == b"Relationship" =>
                {
                    items.push(Relationship {
                        id: attr(e, b"Id").unwrap_or_default(),
                        rel_type: attr(e, b"Type").unwrap_or_default(),
                        target: attr(e, b"Target").unwrap_or_default(),
                        target_mode: attr(e, b"TargetMode"),
                    });
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(xml_error(part, e)),
                _ => {}
            }
        }

        Ok(Self { items })
    }

    /// All relationships.
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.items.iter()
    }

    /// Number of relationships.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there are no relationships.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up a relationship by id.
    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.items.iter().find(|r| r.id == id)
    }

    /// Relationships of a given type, in document order.
    pub fn of_type<'a>(&'a self, rel_type: &'a str) -> impl Iterator<Item = &'a Relationship> + 'a {
        self.items.iter().filter(move |r| r.rel_type == rel_type)
    }

    /// Keep only the relationships matching `keep`.
    pub fn retain(&mut self, keep: impl FnMut(&Relationship) -> bool) {
        self.items.retain(keep);
    }

    /// The next unused `rIdN` identifier.
    pub fn next_id(&self) -> String {
        let max = self
            .items
            .iter()
            .filter_map(|r| rid_number(&r.id))
            .max()
            .unwrap_or(0);
        format!("rId{}", max + 1)
    }

    /// Add an internal relationship and return its id.
    pub fn add(&mut self, rel_type: &str, target: impl Into<String>) -> String {
        let id = self.next_id();
        self.items.push(Relationship {
            id: id.clone(),
            rel_type: rel_type.to_string(),
            target: target.into(),
            target_mode: None,
        });
        id
    }

    /// Serialize to a `.rels` part.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(256 + self.items.len() * 160);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        let _ = write!(xml, r#"<Relationships xmlns="{}">"#, RELATIONSHIPS_NS);
        for rel in &self.items {
            let _ = write!(
                xml,
                r#"<Relationship Id="{}" Type="{}" Target="{}""#,
                escape(&rel.id),
                escape(&rel.rel_type),
                escape(&rel.target)
            );
            if let Some(mode) = &rel.target_mode {
                let _ = write!(xml, r#" TargetMode="{}""#, escape(mode));
            }
            xml.push_str("/>");
        }
        xml.push_str("</Relationships>");
        xml
    }
}

/// Numeric part of an `rIdN` identifier.
pub(crate) fn rid_number(id: &str) -> Option<u32> {
    RID_REGEX
        .captures(id)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRESENTATION_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="slideMasters/slideMaster1.xml"/>
  <Relationship Id="rId7" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide1.xml"/>
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com/?a=1&amp;b=2" TargetMode="External"/>
</Relationships>"#;

    #[test]
    fn test_parse() {
        let rels = Relationships::parse("test.rels", PRESENTATION_RELS).unwrap();
        assert_eq!(rels.len(), 3);
        assert_eq!(rels.get("rId7").unwrap().target, "slides/slide1.xml");
        assert_eq!(rels.of_type(rel_type::SLIDE).count(), 1);
        assert!(rels.get("rId3").unwrap().is_external());
        assert_eq!(rels.get("rId3").unwrap().target, "https://example.com/?a=1&b=2");
    }

    #[test]
    fn test_next_id_skips_used() {
        let rels = Relationships::parse("test.rels", PRESENTATION_RELS).unwrap();
        assert_eq!(rels.next_id(), "rId8");
        assert_eq!(Relationships::new().next_id(), "rId1");
    }

    #[test]
    fn test_add_and_serialize() {
        let mut rels = Relationships::new();
        let layout = rels.add(rel_type::SLIDE_LAYOUT, "../slideLayouts/slideLayout1.xml");
        let link = rels.add(rel_type::SLIDE, "slide3.xml");
        assert_eq!(layout, "rId1");
        assert_eq!(link, "rId2");

        let reparsed = Relationships::parse("round.rels", &rels.to_xml()).unwrap();
        assert_eq!(reparsed, rels);
    }

    #[test]
    fn test_serialize_escapes_and_keeps_target_mode() {
        let rels = Relationships::parse("test.rels", PRESENTATION_RELS).unwrap();
        let xml = rels.to_xml();
        assert!(xml.contains(r#"Target="https://example.com/?a=1&amp;b=2" TargetMode="External""#));
    }

    #[test]
    fn test_retain() {
        let mut rels = Relationships::parse("test.rels", PRESENTATION_RELS).unwrap();
        rels.retain(|r| r.rel_type != rel_type::SLIDE);
        assert_eq!(rels.len(), 2);
        assert!(rels.get("rId7").is_none());
    }

    #[test]
    fn test_rid_number() {
        assert_eq!(rid_number("rId1"), Some(1));
        assert_eq!(rid_number("rId12"), Some(12));
        assert_eq!(rid_number("rIdX"), None);
        assert_eq!(rid_number("Rel5"), None);
    }
}
