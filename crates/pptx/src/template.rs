//! Deck templates: the package generated slides are inserted into.
//!
//! A template is either the built-in blank deck or an existing `.pptx` whose
//! masters, layouts and theme are reused.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use songdeck_core::{Error, Result};
use std::io::{Read, Seek};
use std::path::Path;

use crate::package::{
    rels_path_for, resolve_target, Package, CONTENT_TYPES_PART, PACKAGE_RELS_PART,
};
use crate::rels::{rel_type, Relationships};
use crate::style::SlideSize;
use crate::xml::{attr, local_name, xml_error};

/// Position of the blank layout in the standard Office layout set.
const BLANK_LAYOUT_INDEX: usize = 6;

/// Built-in template parts, as `(part name, content)`.
const DEFAULT_PARTS: &[(&str, &str)] = &[
    (
        CONTENT_TYPES_PART,
        include_str!("../resources/[Content_Types].xml"),
    ),
    (PACKAGE_RELS_PART, include_str!("../resources/_rels/.rels")),
    ("docProps/core.xml", include_str!("../resources/docProps/core.xml")),
    ("docProps/app.xml", include_str!("../resources/docProps/app.xml")),
    (
        "ppt/presentation.xml",
        include_str!("../resources/ppt/presentation.xml"),
    ),
    (
        "ppt/_rels/presentation.xml.rels",
        include_str!("../resources/ppt/_rels/presentation.xml.rels"),
    ),
    ("ppt/presProps.xml", include_str!("../resources/ppt/presProps.xml")),
    ("ppt/viewProps.xml", include_str!("../resources/ppt/viewProps.xml")),
    (
        "ppt/tableStyles.xml",
        include_str!("../resources/ppt/tableStyles.xml"),
    ),
    (
        "ppt/theme/theme1.xml",
        include_str!("../resources/ppt/theme/theme1.xml"),
    ),
    (
        "ppt/slideMasters/slideMaster1.xml",
        include_str!("../resources/ppt/slideMasters/slideMaster1.xml"),
    ),
    (
        "ppt/slideMasters/_rels/slideMaster1.xml.rels",
        include_str!("../resources/ppt/slideMasters/_rels/slideMaster1.xml.rels"),
    ),
    (
        "ppt/slideLayouts/slideLayout1.xml",
        include_str!("../resources/ppt/slideLayouts/slideLayout1.xml"),
    ),
    (
        "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
        include_str!("../resources/ppt/slideLayouts/_rels/slideLayout1.xml.rels"),
    ),
];

/// A slide the template already contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingSlide {
    /// `sldId/@id` in `presentation.xml`.
    pub id: u32,
    /// Relationship id from the presentation part.
    pub rel_id: String,
    /// Slide part name.
    pub part: String,
}

/// A loaded template package and what was discovered about it.
#[derive(Debug, Clone)]
pub struct DeckTemplate {
    package: Package,
    presentation_part: String,
    slide_size: SlideSize,
    layouts: Vec<String>,
    slides: Vec<ExistingSlide>,
}

/// Facts read from `presentation.xml`.
#[derive(Debug, Default)]
struct PresentationInfo {
    slide_size: Option<SlideSize>,
    master_rel_ids: Vec<String>,
    slide_ids: Vec<(u32, String)>,
}

impl DeckTemplate {
    /// The built-in blank 4:3 deck.
    pub fn default_template() -> Result<Self> {
        let mut package = Package::new();
        for (name, content) in DEFAULT_PARTS {
            package.set_part(*name, content.as_bytes());
        }
        Self::from_package(package)
    }

    /// Load a `.pptx` file to use as the template.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("Loading template {}", path.display());
        let package = Package::open(path)?;
        Self::from_package(package)
    }

    /// Load a template from any seekable reader.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        Self::from_package(Package::from_reader(reader)?)
    }

    /// Inspect a package and build the template description.
    pub fn from_package(package: Package) -> Result<Self> {
        let presentation_part = find_presentation_part(&package)?;
        let info = scan_presentation(&presentation_part, &package.part_str(&presentation_part)?)?;
        let pres_rels = load_rels(&package, &presentation_part)?;

        let mut layouts = Vec::new();
        for master_rid in &info.master_rel_ids {
            let Some(rel) = pres_rels.get(master_rid) else {
                log::warn!("Slide master relationship '{}' is missing", master_rid);
                continue;
            };
            let master_part = resolve_target(&presentation_part, &rel.target);
            for layout in master_layouts(&package, &master_part)? {
                if !layouts.contains(&layout) {
                    layouts.push(layout);
                }
            }
        }

        if layouts.is_empty() {
            layouts = layouts_by_name(&package);
        }
        if layouts.is_empty() {
            return Err(Error::Template("template has no slide layouts".to_string()));
        }

        let slides = info
            .slide_ids
            .iter()
            .filter_map(|(id, rid)| {
                let rel = pres_rels.get(rid)?;
                Some(ExistingSlide {
                    id: *id,
                    rel_id: rid.clone(),
                    part: resolve_target(&presentation_part, &rel.target),
                })
            })
            .collect::<Vec<_>>();

        log::debug!(
            "Template: {} layouts, {} existing slides",
            layouts.len(),
            slides.len()
        );

        Ok(Self {
            package,
            presentation_part,
            slide_size: info.slide_size.unwrap_or_default(),
            layouts,
            slides,
        })
    }

    /// Underlying package.
    pub fn package(&self) -> &Package {
        &self.package
    }

    /// Take the package out of the template.
    pub fn into_package(self) -> Package {
        self.package
    }

    /// Name of the main presentation part (usually `ppt/presentation.xml`).
    pub fn presentation_part(&self) -> &str {
        &self.presentation_part
    }

    /// Slide size declared by the template.
    pub fn slide_size(&self) -> SlideSize {
        self.slide_size
    }

    /// Slide layout parts in master order.
    pub fn layouts(&self) -> &[String] {
        &self.layouts
    }

    /// Slides the template ships with, in deck order.
    pub fn existing_slides(&self) -> &[ExistingSlide] {
        &self.slides
    }

    /// Layout used for generated slides: the blank layout of a standard
    /// template (7th), otherwise the last layout.
    pub fn layout_for_slides(&self) -> &str {
        self.layouts
            .get(BLANK_LAYOUT_INDEX)
            .or_else(|| self.layouts.last())
            .map(|s| s.as_str())
            .unwrap_or_default()
    }
}

/// Locate the main presentation part through the package relationships.
fn find_presentation_part(package: &Package) -> Result<String> {
    if package.contains(PACKAGE_RELS_PART) {
        let rels = Relationships::parse(PACKAGE_RELS_PART, &package.part_str(PACKAGE_RELS_PART)?)?;
        let office = rels
            .of_type(rel_type::OFFICE_DOCUMENT)
            .next()
            .map(|rel| resolve_target("", &rel.target));
        if let Some(part) = office {
            if package.contains(&part) {
                return Ok(part);
            }
        }
    }

    if package.contains("ppt/presentation.xml") {
        return Ok("ppt/presentation.xml".to_string());
    }

    Err(Error::Template(
        "file is not a PowerPoint presentation (no presentation part)".to_string(),
    ))
}

/// Relationships of `part`, or an empty set if it has none.
pub(crate) fn load_rels(package: &Package, part: &str) -> Result<Relationships> {
    let rels_part = rels_path_for(part);
    if package.contains(&rels_part) {
        Relationships::parse(&rels_part, &package.part_str(&rels_part)?)
    } else {
        Ok(Relationships::new())
    }
}

fn scan_presentation(part: &str, xml: &str) -> Result<PresentationInfo> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut info = PresentationInfo::default();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"sldSz" => {
                        let cx = attr(e, b"cx").and_then(|v| v.parse().ok());
                        let cy = attr(e, b"cy").and_then(|v| v.parse().ok());
                        if let (Some(width), Some(height)) = (cx, cy) {
                            info.slide_size = Some(SlideSize { width, height });
                        }
                    }
                    b"sldMasterId" => {
                        if let Some(rid) = rel_id_attr(e) {
                            info.master_rel_ids.push(rid);
                        }
                    }
                    b"sldId" => {
                        let id = attr(e, b"id").and_then(|v| v.parse().ok());
                        let rid = rel_id_attr(e);
                        if let (Some(id), Some(rid)) = (id, rid) {
                            info.slide_ids.push((id, rid));
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(part, e)),
            _ => {}
        }
    }

    Ok(info)
}

/// Value of the prefixed `id` attribute (`r:id`), ignoring the plain `id`.
///
/// `sldMasterId` and `sldId` carry both.
pub(crate) fn rel_id_attr(e: &BytesStart<'_>) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| {
            let key = a.key.as_ref();
            key != b"id" && local_name(key) == b"id"
        })
        .map(|a| String::from_utf8_lossy(&a.value).to_string())
}

/// Layout parts of a slide master, in `sldLayoutIdLst` order.
fn master_layouts(package: &Package, master_part: &str) -> Result<Vec<String>> {
    if !package.contains(master_part) {
        log::warn!("Slide master '{}' is missing from the template", master_part);
        return Ok(Vec::new());
    }

    let xml = package.part_str(master_part)?;
    let rels = load_rels(package, master_part)?;
    let mut reader = Reader::from_str(&xml);
    reader.trim_text(true);
    let mut layouts = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"sldLayoutId" =>
            {
                if let Some(rel) = rel_id_attr(e).and_then(|rid| rels.get(&rid)) {
                    let part = resolve_target(master_part, &rel.target);
                    if package.contains(&part) {
                        layouts.push(part);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(master_part, e)),
            _ => {}
        }
    }

    Ok(layouts)
}

/// Fallback discovery: every `slideLayoutN.xml` part, ordered by N.
fn layouts_by_name(package: &Package) -> Vec<String> {
    let mut layouts: Vec<(Option<usize>, String)> = package
        .part_names()
        .filter(|name| name.contains("slideLayouts/") && !name.contains("/_rels/") && name.ends_with(".xml"))
        .map(|name| (extract_part_number(name), name.to_string()))
        .collect();

    layouts.sort_by(|a, b| match (a.0, b.0) {
        (Some(na), Some(nb)) => na.cmp(&nb),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.1.cmp(&b.1),
    });

    layouts.into_iter().map(|(_, name)| name).collect()
}

/// Extract a trailing number from a part name like "slide3.xml".
pub(crate) fn extract_part_number(s: &str) -> Option<usize> {
    let file = s.rsplit('/').next().unwrap_or(s);
    let stem = file.trim_end_matches(".rels").trim_end_matches(".xml");

    let digits: String = stem.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_template() {
        let template = DeckTemplate::default_template().unwrap();
        assert_eq!(template.presentation_part(), "ppt/presentation.xml");
        assert_eq!(template.slide_size(), SlideSize::default());
        assert_eq!(template.layouts(), ["ppt/slideLayouts/slideLayout1.xml"]);
        assert_eq!(template.layout_for_slides(), "ppt/slideLayouts/slideLayout1.xml");
        assert!(template.existing_slides().is_empty());
    }

    #[test]
    fn test_layout_selection_prefers_seventh() {
        let mut template = DeckTemplate::default_template().unwrap();
        template.layouts = (1..=11)
            .map(|n| format!("ppt/slideLayouts/slideLayout{}.xml", n))
            .collect();
        assert_eq!(template.layout_for_slides(), "ppt/slideLayouts/slideLayout7.xml");

        template.layouts.truncate(6);
        assert_eq!(template.layout_for_slides(), "ppt/slideLayouts/slideLayout6.xml");
    }

    #[test]
    fn test_scan_presentation() {
        let xml = r#"<p:presentation xmlns:p="p" xmlns:r="r">
            <p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>
            <p:sldIdLst><p:sldId id="256" r:id="rId7"/><p:sldId id="260" r:id="rId8"/></p:sldIdLst>
            <p:sldSz cx="12192000" cy="6858000"/>
        </p:presentation>"#;
        let info = scan_presentation("ppt/presentation.xml", xml).unwrap();

        assert_eq!(info.master_rel_ids, vec!["rId1"]);
        assert_eq!(
            info.slide_ids,
            vec![(256, "rId7".to_string()), (260, "rId8".to_string())]
        );
        assert_eq!(
            info.slide_size,
            Some(SlideSize {
                width: 12_192_000,
                height: 6_858_000
            })
        );
    }

    #[test]
    fn test_presentation_part_from_package_rels() {
        let mut rels = Relationships::new();
        rels.add(rel_type::OFFICE_DOCUMENT, "deck/main.xml");
        let mut package = Package::new();
        package.set_part(PACKAGE_RELS_PART, rels.to_xml());
        package.set_part("deck/main.xml", "<p:presentation/>");
        package.set_part("ppt/presentation.xml", "<p:presentation/>");
        assert_eq!(find_presentation_part(&package).unwrap(), "deck/main.xml");

        package.remove_part("deck/main.xml");
        assert_eq!(find_presentation_part(&package).unwrap(), "ppt/presentation.xml");
    }

    #[test]
    fn test_not_a_presentation() {
        let mut package = Package::new();
        package.set_part("word/document.xml", "<w:document/>");
        let err = DeckTemplate::from_package(package).unwrap_err();
        assert!(matches!(err, Error::Template(_)));
    }

    #[test]
    fn test_layouts_by_name_orders_numerically() {
        let mut package = Package::new();
        for n in [10, 2, 1] {
            package.set_part(format!("ppt/slideLayouts/slideLayout{}.xml", n), "<x/>");
        }
        package.set_part("ppt/slideLayouts/_rels/slideLayout1.xml.rels", "<x/>");

        assert_eq!(
            layouts_by_name(&package),
            vec![
                "ppt/slideLayouts/slideLayout1.xml",
                "ppt/slideLayouts/slideLayout2.xml",
                "ppt/slideLayouts/slideLayout10.xml",
            ]
        );
    }

    #[test]
    fn test_extract_part_number() {
        assert_eq!(extract_part_number("ppt/slides/slide1.xml"), Some(1));
        assert_eq!(extract_part_number("slide123.xml"), Some(123));
        assert_eq!(extract_part_number("ppt/slides/_rels/slide4.xml.rels"), Some(4));
        assert_eq!(extract_part_number("presentation.xml"), None);
    }
}
