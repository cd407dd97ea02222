//! The `[Content_Types].xml` part.

use quick_xml::events::Event;
use quick_xml::Reader;
use songdeck_core::Result;
use std::fmt::Write as FmtWrite;

use crate::xml::{attr, escape, local_name, xml_error};

/// Content type of a slide part.
pub const SLIDE_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";

const CONTENT_TYPES_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

/// Extension defaults and per-part overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTypes {
    /// `(extension, content type)` pairs.
    defaults: Vec<(String, String)>,
    /// `(part name with leading slash, content type)` pairs.
    overrides: Vec<(String, String)>,
}

impl ContentTypes {
    /// Parse `[Content_Types].xml`.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);
        let mut types = Self::default();

        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    let name = e.name();
                    match local_name(name.as_ref()) {
                        b"Default" => {
                            if let (Some(ext), Some(ct)) =
                                (attr(e, b"Extension"), attr(e, b"ContentType"))
                            {
                                types.defaults.push((ext, ct));
                            }
                        }
                        b"Override" => {
                            if let (Some(part), Some(ct)) =
                                (attr(e, b"PartName"), attr(e, b"ContentType"))
                            {
                                types.overrides.push((part, ct));
                            }
                        }
                        _ => {}
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(xml_error(crate::package::CONTENT_TYPES_PART, e)),
                _ => {}
            }
        }

        Ok(types)
    }

    /// Content type registered for a part (override first, then extension default).
    pub fn content_type(&self, part: &str) -> Option<&str> {
        let key = format!("/{}", part);
        if let Some((_, ct)) = self
            .overrides
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(&key))
        {
            return Some(ct);
        }

        let ext = part.rsplit_once('.').map(|(_, ext)| ext)?;
        self.defaults
            .iter()
            .find(|(e, _)| e.eq_ignore_ascii_case(ext))
            .map(|(_, ct)| ct.as_str())
    }

    /// Register (or replace) the override for a part.
    pub fn set_override(&mut self, part: &str, content_type: &str) {
        let key = format!("/{}", part);
        self.overrides.retain(|(name, _)| !name.eq_ignore_ascii_case(&key));
        self.overrides.push((key, content_type.to_string()));
    }

    /// Drop the override for a part, if any.
    pub fn remove_override(&mut self, part: &str) {
        let key = format!("/{}", part);
        self.overrides.retain(|(name, _)| !name.eq_ignore_ascii_case(&key));
    }

    /// Serialize back to `[Content_Types].xml`.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(512 + self.overrides.len() * 140);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        let _ = write!(xml, r#"<Types xmlns="{}">"#, CONTENT_TYPES_NS);
        for (ext, ct) in &self.defaults {
            let _ = write!(
                xml,
                r#"<Default Extension="{}" ContentType="{}"/>"#,
                escape(ext),
                escape(ct)
            );
        }
        for (part, ct) in &self.overrides {
            let _ = write!(
                xml,
                r#"<Override PartName="{}" ContentType="{}"/>"#,
                escape(part),
                escape(ct)
            );
        }
        xml.push_str("</Types>");
        xml
    }
}
