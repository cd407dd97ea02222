//! Assemble a deck plan into a template package.

use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use songdeck_core::{DeckPlan, Error, PlannedSlide, Result};
use std::fmt::Write as FmtWrite;

use crate::content_types::{ContentTypes, SLIDE_CONTENT_TYPE};
use crate::package::{
    part_dir, rels_path_for, relative_target, resolve_target, Package, CONTENT_TYPES_PART,
};
use crate::rels::rel_type;
use crate::slide::{render_index_slide, render_song_slide};
use crate::style::SlideStyle;
use crate::template::{extract_part_number, load_rels, DeckTemplate};
use crate::xml::{attr, escape, local_name, prefix, xml_error};

const OFFICE_RELATIONSHIPS_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Lowest slide id PowerPoint accepts.
const MIN_SLIDE_ID: u32 = 256;

/// Extension that carries the PowerPoint 2010 section list.
const SECTION_LIST_EXT_URI: &str = "{521415D9-36F7-43E2-AB2F-B90AF26B5E84}";

/// Lists that must precede `sldIdLst` in `presentation.xml`.
const LEADING_LISTS: [&[u8]; 3] = [b"sldMasterIdLst", b"notesMasterIdLst", b"handoutMasterIdLst"];

/// Writes planned slides into a template.
#[derive(Debug, Clone, Default)]
pub struct DeckWriter {
    style: SlideStyle,
}

impl DeckWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_style(style: SlideStyle) -> Self {
        Self { style }
    }

    /// Render every planned slide into the template and return the finished
    /// package.
    ///
    /// With `keep_existing` the template's own slides stay in front of the
    /// generated ones; otherwise they are removed along with their notes.
    pub fn write(
        &self,
        template: DeckTemplate,
        plan: &DeckPlan,
        keep_existing: bool,
    ) -> Result<Package> {
        let pres_part = template.presentation_part().to_string();
        let size = template.slide_size();
        let layout = template.layout_for_slides().to_string();
        let existing = template.existing_slides().to_vec();
        if layout.is_empty() {
            return Err(Error::Generation(
                "template has no layout for generated slides".to_string(),
            ));
        }
        let mut package = template.into_package();

        let mut types = ContentTypes::parse(&package.part_str(CONTENT_TYPES_PART)?)?;
        let mut pres_rels = load_rels(&package, &pres_part)?;

        let mut slide_ids: Vec<(u32, String)> = Vec::with_capacity(existing.len() + plan.slides.len());
        if keep_existing {
            slide_ids.extend(existing.iter().map(|s| (s.id, s.rel_id.clone())));
        } else {
            for slide in &existing {
                remove_slide(&mut package, &mut types, &slide.part)?;
            }
            pres_rels.retain(|r| r.rel_type != rel_type::SLIDE);
            if !existing.is_empty() {
                log::info!("Removed {} template slides", existing.len());
            }
        }

        let slides_dir = format!("{}slides/", part_dir(&pres_part));
        let first = next_slide_number(&package, &slides_dir);
        let parts: Vec<String> = (0..plan.slides.len())
            .map(|i| format!("{}slide{}.xml", slides_dir, first + i))
            .collect();

        let mut next_id = slide_ids
            .iter()
            .map(|(id, _)| *id)
            .max()
            .unwrap_or(0)
            .max(MIN_SLIDE_ID - 1)
            + 1;

        for (planned, part) in plan.slides.iter().zip(&parts) {
            let layout_target = relative_target(part, &layout);
            let rendered = match planned {
                PlannedSlide::Song(slide) => {
                    render_song_slide(&self.style, size, slide, &layout_target)
                }
                PlannedSlide::Index(page) => {
                    render_index_slide(&self.style, size, page, &layout_target, |entry| {
                        parts
                            .get(entry.target().checked_sub(1)?)
                            .map(|target| relative_target(part, target))
                    })
                }
            };

            package.set_part(part.clone(), rendered.xml);
            package.set_part(rels_path_for(part), rendered.rels.to_xml());
            types.set_override(part, SLIDE_CONTENT_TYPE);

            let rid = pres_rels.add(rel_type::SLIDE, relative_target(&pres_part, part));
            slide_ids.push((next_id, rid));
            next_id += 1;
        }

        let pres_xml = package.part_str(&pres_part)?;
        let rewritten = rewrite_presentation(&pres_part, &pres_xml, &slide_ids, !keep_existing)?;
        package.set_part(pres_part.clone(), rewritten);
        package.set_part(rels_path_for(&pres_part), pres_rels.to_xml());
        package.set_part(CONTENT_TYPES_PART, types.to_xml());

        log::debug!(
            "Wrote {} slides ({} in deck)",
            plan.slides.len(),
            slide_ids.len()
        );
        Ok(package)
    }
}

/// Drop a slide part with its relationships and notes.
fn remove_slide(package: &mut Package, types: &mut ContentTypes, part: &str) -> Result<()> {
    let rels = load_rels(package, part)?;
    for rel in rels.of_type(rel_type::NOTES_SLIDE) {
        let notes = resolve_target(part, &rel.target);
        package.remove_part(&rels_path_for(&notes));
        package.remove_part(&notes);
        types.remove_override(&notes);
    }

    package.remove_part(&rels_path_for(part));
    package.remove_part(part);
    types.remove_override(part);
    log::debug!("Removed template slide {}", part);
    Ok(())
}

/// First free `slideN.xml` number in `slides_dir`.
fn next_slide_number(package: &Package, slides_dir: &str) -> usize {
    package
        .part_names()
        .filter_map(|name| name.strip_prefix(slides_dir))
        .filter(|file| !file.contains('/') && file.ends_with(".xml"))
        .filter_map(extract_part_number)
        .max()
        .unwrap_or(0)
        + 1
}

fn qualified(prefix: &str, local: &str) -> String {
    if prefix.is_empty() {
        local.to_string()
    } else {
        format!("{}:{}", prefix, local)
    }
}

/// Namespace prefix bound to the office relationships namespace on `root`.
fn relationships_prefix(root: &BytesStart<'_>) -> Option<String> {
    root.attributes().flatten().find_map(|a| {
        let key = a.key.as_ref();
        let bound = key.strip_prefix(b"xmlns:")?;
        (a.value.as_ref() == OFFICE_RELATIONSHIPS_NS.as_bytes())
            .then(|| String::from_utf8_lossy(bound).to_string())
    })
}

fn slide_id_list(p: &str, r: &str, slide_ids: &[(u32, String)]) -> String {
    let mut xml = String::with_capacity(32 + slide_ids.len() * 48);
    if slide_ids.is_empty() {
        return xml;
    }
    let _ = write!(xml, "<{}>", qualified(p, "sldIdLst"));
    for (id, rid) in slide_ids {
        let _ = write!(
            xml,
            r#"<{} id="{}" {}:id="{}"/>"#,
            qualified(p, "sldId"),
            id,
            r,
            escape(rid)
        );
    }
    let _ = write!(xml, "</{}>", qualified(p, "sldIdLst"));
    xml
}

/// Stream `presentation.xml` through, replacing the slide id list.
///
/// Section lists are always dropped since they name slide ids. Custom shows
/// are dropped too when the template slides were removed.
fn rewrite_presentation(
    part: &str,
    xml: &str,
    slide_ids: &[(u32, String)],
    slides_removed: bool,
) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + slide_ids.len() * 48));

    let mut depth = 0usize;
    let mut skip_from: Option<usize> = None;
    let mut list: Option<String> = None;
    let mut inserted = false;

    loop {
        let event = reader.read_event().map_err(|e| xml_error(part, e))?;

        if let Some(start) = skip_from {
            match event {
                Event::Start(_) => depth += 1,
                Event::End(_) => {
                    depth -= 1;
                    if depth == start {
                        skip_from = None;
                    }
                }
                Event::Eof => return Err(xml_error(part, "unexpected end of document")),
                _ => {}
            }
            continue;
        }

        match &event {
            Event::Eof => break,
            Event::Start(e) | Event::Empty(e) => {
                let is_start = matches!(event, Event::Start(_));
                let name = e.name();
                let local = local_name(name.as_ref());

                if depth == 0 {
                    let p = prefix(name.as_ref())
                        .map(|p| String::from_utf8_lossy(p).to_string())
                        .unwrap_or_default();
                    let r = relationships_prefix(e);
                    list = Some(slide_id_list(
                        &p,
                        r.as_deref().unwrap_or("r"),
                        slide_ids,
                    ));

                    if r.is_none() {
                        let mut root = e.clone().into_owned();
                        root.push_attribute(("xmlns:r", OFFICE_RELATIONSHIPS_NS));
                        let root = if is_start {
                            Event::Start(root)
                        } else {
                            Event::Empty(root)
                        };
                        writer.write_event(root).map_err(|e| xml_error(part, e))?;
                        if is_start {
                            depth += 1;
                        }
                        continue;
                    }
                } else {
                    let dropped = (depth == 1 && local == b"sldIdLst")
                        || (depth == 1 && slides_removed && local == b"custShowLst")
                        || (local == b"ext"
                            && attr(e, b"uri").as_deref() == Some(SECTION_LIST_EXT_URI));
                    if dropped {
                        if is_start {
                            skip_from = Some(depth);
                            depth += 1;
                        }
                        continue;
                    }

                    if depth == 1 && !inserted && !LEADING_LISTS.contains(&local) {
                        if let Some(list) = &list {
                            writer.get_mut().extend_from_slice(list.as_bytes());
                        }
                        inserted = true;
                    }
                }

                if is_start {
                    depth += 1;
                }
            }
            Event::End(_) => {
                if depth == 1 && !inserted {
                    if let Some(list) = &list {
                        writer.get_mut().extend_from_slice(list.as_bytes());
                    }
                    inserted = true;
                }
                depth = depth.saturating_sub(1);
            }
            _ => {}
        }

        writer.write_event(event).map_err(|e| xml_error(part, e))?;
    }

    String::from_utf8(writer.into_inner())
        .map_err(|e| Error::Xml(format!("'{}' is not valid UTF-8: {}", part, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rels::Relationships;
    use songdeck_core::{IndexLayout, SongParser};

    const SONGS: &str = "# Amazing Grace\nAmazing grace\nHow sweet the sound\n\nI once was lost\n\n# Be Thou My Vision\nBe thou my vision\n";

    fn plan(with_index: bool) -> DeckPlan {
        let songs = SongParser::new().parse(SONGS);
        DeckPlan::build(&songs, with_index, &IndexLayout::new())
    }

    #[test]
    fn test_write_into_default_template() {
        let template = DeckTemplate::default_template().unwrap();
        let package = DeckWriter::new().write(template, &plan(false), true).unwrap();

        for n in 1..=3 {
            assert!(package.contains(&format!("ppt/slides/slide{}.xml", n)));
            assert!(package.contains(&format!("ppt/slides/_rels/slide{}.xml.rels", n)));
        }
        assert!(!package.contains("ppt/slides/slide4.xml"));

        let pres = package.part_str("ppt/presentation.xml").unwrap();
        assert_eq!(pres.matches("<p:sldId ").count(), 3);
        assert!(pres.contains(r#"<p:sldId id="256" r:id="rId6"/>"#));
        let list = pres.find("<p:sldIdLst>").unwrap();
        assert!(pres.find("</p:sldMasterIdLst>").unwrap() < list);
        assert!(list < pres.find("<p:sldSz").unwrap());

        let types = ContentTypes::parse(&package.part_str(CONTENT_TYPES_PART).unwrap()).unwrap();
        assert_eq!(types.content_type("ppt/slides/slide3.xml"), Some(SLIDE_CONTENT_TYPE));

        let rels = Relationships::parse(
            "ppt/_rels/presentation.xml.rels",
            &package.part_str("ppt/_rels/presentation.xml.rels").unwrap(),
        )
        .unwrap();
        assert_eq!(rels.of_type(rel_type::SLIDE).count(), 3);
        assert_eq!(rels.get("rId6").unwrap().target, "slides/slide1.xml");
    }

    #[test]
    fn test_index_slide_links_to_song_slides() {
        let template = DeckTemplate::default_template().unwrap();
        let package = DeckWriter::new().write(template, &plan(true), false).unwrap();

        // One index page, then Amazing Grace on slides 2-3 and Be Thou My Vision on 4.
        let rels = Relationships::parse(
            "ppt/slides/_rels/slide1.xml.rels",
            &package.part_str("ppt/slides/_rels/slide1.xml.rels").unwrap(),
        )
        .unwrap();
        let targets: Vec<&str> = rels
            .of_type(rel_type::SLIDE)
            .map(|r| r.target.as_str())
            .collect();
        assert_eq!(targets, vec!["slide2.xml", "slide4.xml"]);

        let index = package.part_str("ppt/slides/slide1.xml").unwrap();
        assert!(index.contains("<a:t>Table of Contents</a:t>"));
        assert!(!index.contains("(1/1)"));
        assert!(index.contains("ppaction://hlinksldjump"));
    }

    #[test]
    fn test_song_slides_use_layout() {
        let template = DeckTemplate::default_template().unwrap();
        let package = DeckWriter::new().write(template, &plan(false), true).unwrap();
        let rels = package.part_str("ppt/slides/_rels/slide1.xml.rels").unwrap();
        assert!(rels.contains("../slideLayouts/slideLayout1.xml"));
    }

    #[test]
    fn test_rewrite_replaces_existing_list_and_sections() {
        let xml = concat!(
            r#"<p:presentation xmlns:p="p" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
            r#"<p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>"#,
            r#"<p:sldIdLst><p:sldId id="256" r:id="rId2"/></p:sldIdLst>"#,
            r#"<p:sldSz cx="9144000" cy="6858000"/>"#,
            r#"<p:custShowLst><p:custShow name="a" id="0"/></p:custShowLst>"#,
            r#"<p:extLst><p:ext uri="{521415D9-36F7-43E2-AB2F-B90AF26B5E84}"><p14:sectionLst xmlns:p14="x"><p14:section name="s"/></p14:sectionLst></p:ext></p:extLst>"#,
            r#"</p:presentation>"#
        );
        let ids = vec![(257, "rId9".to_string())];
        let out = rewrite_presentation("ppt/presentation.xml", xml, &ids, true).unwrap();

        assert!(out.contains(r#"<p:sldIdLst><p:sldId id="257" r:id="rId9"/></p:sldIdLst><p:sldSz"#));
        assert!(!out.contains("rId2"));
        assert!(!out.contains("custShow"));
        assert!(!out.contains("sectionLst"));
        assert!(out.contains("<p:extLst></p:extLst>"));
    }

    #[test]
    fn test_rewrite_keeps_custom_shows_when_slides_kept() {
        let xml = concat!(
            r#"<p:presentation xmlns:p="p" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
            r#"<p:sldSz cx="1" cy="1"/><p:custShowLst/>"#,
            r#"</p:presentation>"#
        );
        let ids = vec![(256, "rId3".to_string())];
        let out = rewrite_presentation("ppt/presentation.xml", xml, &ids, false).unwrap();
        assert!(out.contains("<p:custShowLst/>"));
        assert!(out.starts_with(r#"<p:presentation"#));
        assert!(out.contains(r#"><p:sldIdLst><p:sldId id="256" r:id="rId3"/></p:sldIdLst><p:sldSz"#));
    }

    #[test]
    fn test_rewrite_adds_relationships_namespace() {
        let xml = r#"<presentation xmlns="p"><sldSz cx="1" cy="1"/></presentation>"#;
        let ids = vec![(256, "rId2".to_string())];
        let out = rewrite_presentation("ppt/presentation.xml", xml, &ids, false).unwrap();
        assert!(out.contains(r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships""#));
        assert!(out.contains(r#"<sldIdLst><sldId id="256" r:id="rId2"/></sldIdLst><sldSz"#));
    }

    #[test]
    fn test_rewrite_appends_list_before_root_end() {
        let xml = r#"<p:presentation xmlns:p="p" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><p:sldMasterIdLst/></p:presentation>"#;
        let ids = vec![(300, "rId4".to_string())];
        let out = rewrite_presentation("ppt/presentation.xml", xml, &ids, false).unwrap();
        assert!(out.ends_with(r#"<p:sldMasterIdLst/><p:sldIdLst><p:sldId id="300" r:id="rId4"/></p:sldIdLst></p:presentation>"#));
    }

    #[test]
    fn test_next_slide_number() {
        let mut package = Package::new();
        assert_eq!(next_slide_number(&package, "ppt/slides/"), 1);
        package.set_part("ppt/slides/slide3.xml", "<x/>");
        package.set_part("ppt/slides/_rels/slide9.xml.rels", "<x/>");
        assert_eq!(next_slide_number(&package, "ppt/slides/"), 4);
    }
}
