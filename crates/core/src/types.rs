//! Domain types for song collections and the decks built from them.

use serde::{Deserialize, Serialize};

/// One paragraph of lyrics, shown on a single slide.
pub type SlideGroup = Vec<String>;

/// A song parsed from one marker-delimited section of the source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongRecord {
    /// Title with marker characters stripped and whitespace trimmed.
    pub title: String,

    /// Lyric lines in source order. Interior blank lines are kept.
    pub lyric_lines: Vec<String>,
}

impl SongRecord {
    /// Create a new song record.
    pub fn new(title: impl Into<String>, lyric_lines: Vec<String>) -> Self {
        Self {
            title: title.into(),
            lyric_lines,
        }
    }

    /// Split the lyrics into per-slide groups at blank lines.
    pub fn slide_groups(&self) -> Vec<SlideGroup> {
        crate::segment::split_into_slides(&self.lyric_lines)
    }
}

/// A table-of-contents line pointing at a song's first slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// 1-based song number, continuous across index pages.
    pub number: usize,

    /// Song title.
    pub title: String,

    /// 0-based deck position of the song's first slide.
    pub starting_slide_index: usize,
}

impl IndexEntry {
    /// Create a new entry.
    pub fn new(number: usize, title: impl Into<String>, starting_slide_index: usize) -> Self {
        Self {
            number,
            title: title.into(),
            starting_slide_index,
        }
    }

    /// 1-based slide number the rendered link jumps to.
    pub fn target(&self) -> usize {
        self.starting_slide_index + 1
    }

    /// Text shown for this entry, e.g. `" 3. Amazing Grace"`.
    pub fn label(&self) -> String {
        format!("{:2}. {}", self.number, self.title)
    }
}

/// One page of the table of contents, split into two columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexPage {
    /// 0-based page number.
    pub page: usize,

    /// Total number of index pages in the deck.
    pub page_count: usize,

    /// Left column entries.
    pub left: Vec<IndexEntry>,

    /// Right column entries (may be empty).
    pub right: Vec<IndexEntry>,
}

impl IndexPage {
    /// Heading shown at the top of the page.
    pub fn heading(&self) -> String {
        if self.page_count > 1 {
            format!("Table of Contents ({}/{})", self.page + 1, self.page_count)
        } else {
            "Table of Contents".to_string()
        }
    }

    /// Number of entries on this page.
    pub fn len(&self) -> usize {
        self.left.len() + self.right.len()
    }

    /// Whether this page holds no entries.
    pub fn is_empty(&self) -> bool {
        self.left.is_empty() && self.right.is_empty()
    }
}

/// A lyric slide belonging to one song.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongSlide {
    /// Song title, repeated on every slide of the song.
    pub title: String,

    /// Lines shown on this slide.
    pub lines: SlideGroup,

    /// 1-based position of this slide within its song.
    pub position: usize,

    /// Number of slides the song has.
    pub total: usize,
}

impl SongSlide {
    /// Counter text shown in the corner, e.g. `"2/5"`.
    pub fn counter(&self) -> String {
        format!("{}/{}", self.position, self.total)
    }
}

/// A slide in the final deck, in deck order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlannedSlide {
    /// A table-of-contents page.
    Index(IndexPage),
    /// A lyric slide.
    Song(SongSlide),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_target_is_one_based() {
        let entry = IndexEntry::new(1, "Amazing Grace", 0);
        assert_eq!(entry.target(), 1);

        let entry = IndexEntry::new(4, "Holy Holy Holy", 12);
        assert_eq!(entry.target(), 13);
    }

    #[test]
    fn test_entry_label_pads_number() {
        assert_eq!(IndexEntry::new(3, "Amazing Grace", 0).label(), " 3. Amazing Grace");
        assert_eq!(IndexEntry::new(42, "Be Thou My Vision", 0).label(), "42. Be Thou My Vision");
    }

    #[test]
    fn test_index_page_heading() {
        let single = IndexPage {
            page: 0,
            page_count: 1,
            left: Vec::new(),
            right: Vec::new(),
        };
        assert_eq!(single.heading(), "Table of Contents");
        assert!(single.is_empty());

        let second = IndexPage {
            page: 1,
            page_count: 3,
            ..single
        };
        assert_eq!(second.heading(), "Table of Contents (2/3)");
    }

    #[test]
    fn test_song_slide_counter() {
        let slide = SongSlide {
            title: "It Is Well".to_string(),
            lines: vec!["When peace like a river".to_string()],
            position: 2,
            total: 5,
        };
        assert_eq!(slide.counter(), "2/5");
    }
}
