//! Deck planning.
//!
//! Builds the complete slide order before anything is rendered. Index pages
//! must be counted before song slides are placed, because every song's
//! starting position includes the index-page offset.

use serde::Serialize;

use crate::index::IndexLayout;
use crate::segment::split_into_slides;
use crate::types::{IndexEntry, PlannedSlide, SongRecord, SongSlide};

/// The ordered contents of a deck: index pages first, then song slides.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeckPlan {
    /// Every slide in deck order.
    pub slides: Vec<PlannedSlide>,

    /// One entry per song, with its starting slide index.
    pub entries: Vec<IndexEntry>,

    /// Number of index pages at the front of the deck.
    pub index_page_count: usize,

    /// Number of songs the plan was built from.
    pub song_count: usize,
}

impl DeckPlan {
    /// Plan a deck for `songs`, optionally preceded by a table of contents.
    pub fn build(songs: &[SongRecord], with_index: bool, layout: &IndexLayout) -> Self {
        let index_page_count = if with_index {
            layout.page_count(songs.len())
        } else {
            0
        };

        let mut entries = Vec::with_capacity(songs.len());
        let mut song_slides = Vec::new();

        for (i, song) in songs.iter().enumerate() {
            let groups = split_into_slides(&song.lyric_lines);
            let total = groups.len();

            entries.push(IndexEntry::new(
                i + 1,
                song.title.clone(),
                index_page_count + song_slides.len(),
            ));

            if total == 0 {
                log::debug!("Song '{}' has no lyrics and produces no slides", song.title);
            }

            song_slides.extend(groups.into_iter().enumerate().map(|(k, lines)| {
                PlannedSlide::Song(SongSlide {
                    title: song.title.clone(),
                    lines,
                    position: k + 1,
                    total,
                })
            }));
        }

        let mut slides = Vec::with_capacity(index_page_count + song_slides.len());
        if with_index {
            slides.extend(layout.paginate(&entries).into_iter().map(PlannedSlide::Index));
        }
        slides.extend(song_slides);

        Self {
            slides,
            entries,
            index_page_count,
            song_count: songs.len(),
        }
    }

    /// Total slides in the deck, index pages included.
    pub fn total_slides(&self) -> usize {
        self.slides.len()
    }

    /// Number of lyric slides.
    pub fn song_slide_count(&self) -> usize {
        self.slides.len() - self.index_page_count
    }

    /// Whether the plan contains no slides at all.
    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    /// Human-readable summary, e.g. `"Generated 12 slides from 3 songs + 1 TOC slides"`.
    pub fn summary(&self) -> String {
        let mut message = format!(
            "Generated {} slides from {} songs",
            self.total_slides(),
            self.song_count
        );
        if self.index_page_count > 0 {
            message.push_str(&format!(" + {} TOC slides", self.index_page_count));
        }
        message
    }
}
