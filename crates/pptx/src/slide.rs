//! Slide XML rendering for song and index slides.

use songdeck_core::{IndexEntry, IndexPage, SongSlide};
use std::fmt::Write as FmtWrite;

use crate::rels::{rel_type, Relationships};
use crate::style::{self as geometry, inches, Align, Rect, Rgb, SlideSize, SlideStyle};
use crate::xml::escape;

const SLIDE_NAMESPACES: &str = concat!(
    r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#
);

/// Action that makes a hyperlink jump to another slide of the deck.
const SLIDE_JUMP_ACTION: &str = "ppaction://hlinksldjump";

/// A slide part and its relationships, ready to be stored in a package.
#[derive(Debug, Clone)]
pub struct RenderedSlide {
    pub xml: String,
    pub rels: Relationships,
}

/// Text box frame settings.
#[derive(Debug, Clone, Copy)]
struct Frame {
    inset: i64,
    wrap: bool,
}

/// One single-run paragraph.
#[derive(Debug, Clone)]
struct Paragraph<'a> {
    text: &'a str,
    size: u32,
    bold: bool,
    color: Rgb,
    align: Align,
    space_after: Option<u32>,
    link: Option<String>,
}

/// Accumulates shapes and relationships for one slide.
struct SlideXmlBuilder<'s> {
    style: &'s SlideStyle,
    shapes: String,
    next_shape_id: u32,
    rels: Relationships,
}

impl<'s> SlideXmlBuilder<'s> {
    fn new(style: &'s SlideStyle, layout_target: &str) -> Self {
        let mut rels = Relationships::new();
        rels.add(rel_type::SLIDE_LAYOUT, layout_target);
        Self {
            style,
            shapes: String::with_capacity(2048),
            // id 1 is the shape tree itself
            next_shape_id: 2,
            rels,
        }
    }

    /// Register a jump to another slide part and return the relationship id.
    fn add_slide_link(&mut self, target: &str) -> String {
        self.rels.add(rel_type::SLIDE, target)
    }

    fn add_text_box(&mut self, rect: Rect, frame: Frame, paragraphs: &[Paragraph<'_>]) {
        let id = self.next_shape_id;
        self.next_shape_id += 1;

        let xml = &mut self.shapes;
        let _ = write!(
            xml,
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="TextBox {}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr>"#,
            id,
            id - 1
        );
        let _ = write!(
            xml,
            r#"<p:spPr><a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/></p:spPr>"#,
            rect.x, rect.y, rect.cx, rect.cy
        );
        let _ = write!(
            xml,
            r#"<p:txBody><a:bodyPr wrap="{}" lIns="{}" rIns="{}" anchor="t"><a:noAutofit/></a:bodyPr><a:lstStyle/>"#,
            if frame.wrap { "square" } else { "none" },
            frame.inset,
            frame.inset
        );

        for paragraph in paragraphs {
            write_paragraph(xml, &self.style.font, paragraph);
        }
        if paragraphs.is_empty() {
            xml.push_str("<a:p/>");
        }

        xml.push_str("</p:txBody></p:sp>");
    }

    fn finish(self) -> RenderedSlide {
        let mut xml = String::with_capacity(self.shapes.len() + 512);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        let _ = write!(xml, "<p:sld {}>", SLIDE_NAMESPACES);
        xml.push_str(r#"<p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#);
        xml.push_str(r#"<p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#);
        xml.push_str(&self.shapes);
        xml.push_str("</p:spTree></p:cSld>");
        xml.push_str("<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>");
        xml.push_str("</p:sld>");

        RenderedSlide {
            xml,
            rels: self.rels,
        }
    }
}

fn write_paragraph(xml: &mut String, font: &str, p: &Paragraph<'_>) {
    let _ = write!(xml, r#"<a:p><a:pPr algn="{}">"#, p.align.as_attr());
    if let Some(points) = p.space_after {
        let _ = write!(xml, r#"<a:spcAft><a:spcPts val="{}"/></a:spcAft>"#, points * 100);
    }
    xml.push_str("</a:pPr>");

    let _ = write!(
        xml,
        r#"<a:r><a:rPr lang="en-US" sz="{}" b="{}" dirty="0"><a:solidFill><a:srgbClr val="{}"/></a:solidFill><a:latin typeface="{}"/>"#,
        p.size * 100,
        if p.bold { 1 } else { 0 },
        p.color.hex(),
        escape(font)
    );
    if let Some(rid) = &p.link {
        let _ = write!(
            xml,
            r#"<a:hlinkClick r:id="{}" action="{}"/>"#,
            rid, SLIDE_JUMP_ACTION
        );
    }
    let _ = write!(xml, "</a:rPr><a:t>{}</a:t></a:r></a:p>", escape(p.text));
}

/// Render a lyric slide: title, "k/n" counter, and the slide's lines.
pub fn render_song_slide(
    style: &SlideStyle,
    size: SlideSize,
    slide: &SongSlide,
    layout_target: &str,
) -> RenderedSlide {
    let mut builder = SlideXmlBuilder::new(style, layout_target);

    builder.add_text_box(
        geometry::song_title_box(size),
        Frame {
            inset: inches(0.2),
            wrap: true,
        },
        &[Paragraph {
            text: &slide.title,
            size: style.title_size,
            bold: true,
            color: style.text_color,
            align: Align::Left,
            space_after: None,
            link: None,
        }],
    );

    let counter = slide.counter();
    builder.add_text_box(
        geometry::counter_box(size),
        Frame {
            inset: inches(0.1),
            wrap: false,
        },
        &[Paragraph {
            text: &counter,
            size: style.counter_size,
            bold: true,
            color: style.counter_color,
            align: Align::Right,
            space_after: None,
            link: None,
        }],
    );

    if !slide.lines.is_empty() {
        let lines: Vec<Paragraph<'_>> = slide
            .lines
            .iter()
            .map(|line| Paragraph {
                text: line,
                size: style.lyric_size,
                bold: false,
                color: style.text_color,
                align: Align::Left,
                space_after: Some(style.lyric_space_after),
                link: None,
            })
            .collect();
        builder.add_text_box(
            geometry::lyrics_box(size),
            Frame {
                inset: inches(0.2),
                wrap: true,
            },
            &lines,
        );
    }

    builder.finish()
}

/// Render a table-of-contents page.
///
/// `link_target` maps an entry to the relationship target of the slide it
/// should jump to, or `None` when that slide does not exist.
pub fn render_index_slide<F>(
    style: &SlideStyle,
    size: SlideSize,
    page: &IndexPage,
    layout_target: &str,
    link_target: F,
) -> RenderedSlide
where
    F: Fn(&IndexEntry) -> Option<String>,
{
    let mut builder = SlideXmlBuilder::new(style, layout_target);
    let frame = Frame {
        inset: inches(0.2),
        wrap: true,
    };

    let heading = page.heading();
    builder.add_text_box(
        geometry::index_heading_box(size),
        frame,
        &[Paragraph {
            text: &heading,
            size: style.title_size,
            bold: true,
            color: style.text_color,
            align: Align::Left,
            space_after: None,
            link: None,
        }],
    );

    let columns = [
        (geometry::index_left_box(size), &page.left),
        (geometry::index_right_box(size), &page.right),
    ];
    for (rect, entries) in columns {
        if entries.is_empty() {
            continue;
        }

        let labels: Vec<String> = entries.iter().map(|e| e.label()).collect();
        let mut paragraphs = Vec::with_capacity(entries.len());
        for (entry, label) in entries.iter().zip(&labels) {
            let link = match link_target(entry) {
                Some(target) => Some(builder.add_slide_link(&target)),
                None => {
                    log::warn!(
                        "Index entry '{}' points past the end of the deck (slide {}), leaving it unlinked",
                        entry.title,
                        entry.target()
                    );
                    None
                }
            };
            paragraphs.push(Paragraph {
                text: label,
                size: style.index_entry_size,
                bold: false,
                color: style.link_color,
                align: Align::Left,
                space_after: Some(style.index_entry_space_after),
                link,
            });
        }

        builder.add_text_box(rect, frame, &paragraphs);
    }

    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYOUT: &str = "../slideLayouts/slideLayout1.xml";

    fn song_slide(lines: &[&str]) -> SongSlide {
        SongSlide {
            title: "Amazing Grace".to_string(),
            lines: lines.iter().map(|s| s.to_string()).collect(),
            position: 1,
            total: 4,
        }
    }

    fn page(count: usize) -> IndexPage {
        let entries: Vec<IndexEntry> = (0..count)
            .map(|i| IndexEntry::new(i + 1, format!("Song {}", i + 1), i * 2 + 1))
            .collect();
        songdeck_core::IndexLayout::new().paginate(&entries).remove(0)
    }

    #[test]
    fn test_song_slide_contents() {
        let rendered = render_song_slide(
            &SlideStyle::default(),
            SlideSize::default(),
            &song_slide(&["Amazing grace how sweet the sound", "That saved a wretch like me"]),
            LAYOUT,
        );

        assert!(rendered.xml.starts_with("<?xml"));
        assert!(rendered.xml.contains("<a:t>Amazing Grace</a:t>"));
        assert!(rendered.xml.contains("<a:t>1/4</a:t>"));
        assert!(rendered.xml.contains("<a:t>That saved a wretch like me</a:t>"));
        assert_eq!(rendered.xml.matches("<p:sp>").count(), 3);
        assert!(rendered.xml.contains(r#"sz="3200" b="1""#));
        assert!(rendered.xml.contains(r#"<a:srgbClr val="646464"/>"#));
        assert!(rendered.xml.contains(r#"<a:spcPts val="1600"/>"#));

        assert_eq!(rendered.rels.len(), 1);
        assert_eq!(rendered.rels.get("rId1").unwrap().target, LAYOUT);
    }

    #[test]
    fn test_song_slide_without_lines_has_no_lyrics_box() {
        let rendered = render_song_slide(
            &SlideStyle::default(),
            SlideSize::default(),
            &song_slide(&[]),
            LAYOUT,
        );
        assert_eq!(rendered.xml.matches("<p:sp>").count(), 2);
    }

    #[test]
    fn test_song_slide_escapes_text() {
        let mut slide = song_slide(&["Rock & <Roll>"]);
        slide.title = "Praise \"Him\"".to_string();
        let rendered = render_song_slide(&SlideStyle::default(), SlideSize::default(), &slide, LAYOUT);

        assert!(rendered.xml.contains("<a:t>Rock &amp; &lt;Roll&gt;</a:t>"));
        assert!(rendered.xml.contains("<a:t>Praise &quot;Him&quot;</a:t>"));
    }

    #[test]
    fn test_shape_ids_are_unique() {
        let rendered = render_song_slide(
            &SlideStyle::default(),
            SlideSize::default(),
            &song_slide(&["line"]),
            LAYOUT,
        );
        for id in 1..=4 {
            assert_eq!(rendered.xml.matches(&format!(r#"<p:cNvPr id="{}""#, id)).count(), 1);
        }
    }

    #[test]
    fn test_index_slide_links() {
        let page = page(14);
        let rendered = render_index_slide(
            &SlideStyle::default(),
            SlideSize::default(),
            &page,
            LAYOUT,
            |entry| Some(format!("slide{}.xml", entry.target())),
        );

        assert!(rendered.xml.contains("<a:t>Table of Contents</a:t>"));
        assert!(rendered.xml.contains("<a:t> 1. Song 1</a:t>"));
        assert!(rendered.xml.contains("<a:t>14. Song 14</a:t>"));
        // heading + two columns
        assert_eq!(rendered.xml.matches("<p:sp>").count(), 3);
        assert_eq!(rendered.xml.matches(SLIDE_JUMP_ACTION).count(), 14);

        // layout + one link per entry
        assert_eq!(rendered.rels.len(), 15);
        let first = rendered.rels.get("rId2").unwrap();
        assert_eq!(first.rel_type, rel_type::SLIDE);
        assert_eq!(first.target, "slide2.xml");
    }

    #[test]
    fn test_index_slide_single_column() {
        let rendered = render_index_slide(
            &SlideStyle::default(),
            SlideSize::default(),
            &page(4),
            LAYOUT,
            |entry| Some(format!("slide{}.xml", entry.target())),
        );
        assert_eq!(rendered.xml.matches("<p:sp>").count(), 2);
    }

    #[test]
    fn test_index_slide_unresolved_entries_are_unlinked() {
        let rendered = render_index_slide(
            &SlideStyle::default(),
            SlideSize::default(),
            &page(3),
            LAYOUT,
            |entry| (entry.number != 2).then(|| format!("slide{}.xml", entry.target())),
        );
        assert_eq!(rendered.xml.matches(SLIDE_JUMP_ACTION).count(), 2);
        assert_eq!(rendered.rels.len(), 3);
        assert!(rendered.xml.contains("<a:t> 2. Song 2</a:t>"));
    }
}
