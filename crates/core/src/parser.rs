//! Song collection parser.
//!
//! A song collection is plain text where a line starting with the marker
//! character (`#` by default) begins a new song:
//!
//! ```text
//! #Amazing Grace
//! Amazing grace how sweet the sound
//! That saved a wretch like me
//!
//! I once was lost but now am found
//!
//! #It Is Well
//! When peace like a river attendeth my way
//! ```

use crate::segment::is_blank;
use crate::text::{normalize_line_endings, to_nfc};
use crate::types::SongRecord;

/// Default character that starts a song title line.
pub const DEFAULT_MARKER: char = '#';

/// Parser that splits a song collection into titled records.
#[derive(Debug, Clone)]
pub struct SongParser {
    /// Character that starts a title line.
    marker: char,
}

impl Default for SongParser {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER,
        }
    }
}

impl SongParser {
    /// Create a parser using the default `#` marker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different marker character.
    pub fn with_marker(mut self, marker: char) -> Self {
        self.marker = marker;
        self
    }

    /// The marker character this parser splits on.
    pub fn marker(&self) -> char {
        self.marker
    }

    /// Parse raw text into songs, in source order.
    ///
    /// Text before the first marker line is ignored, as is any section whose
    /// title is empty once the marker characters are removed.
    pub fn parse(&self, text: &str) -> Vec<SongRecord> {
        let text = normalize_line_endings(text);
        let mut songs = Vec::new();
        let mut current: Option<(String, Vec<String>)> = None;

        for line in text.split('\n') {
            if line.starts_with(self.marker) {
                if let Some((title, lines)) = current.take() {
                    self.push_record(&mut songs, title, lines);
                }
                current = Some((self.extract_title(line), Vec::new()));
            } else if let Some((_, lines)) = current.as_mut() {
                lines.push(to_nfc(line));
            }
        }

        if let Some((title, lines)) = current {
            self.push_record(&mut songs, title, lines);
        }

        log::debug!("Parsed {} songs", songs.len());
        songs
    }

    /// Title text of a marker line: every marker character removed, then trimmed.
    fn extract_title(&self, line: &str) -> String {
        let stripped: String = line.chars().filter(|&c| c != self.marker).collect();
        to_nfc(stripped.trim())
    }

    fn push_record(&self, songs: &mut Vec<SongRecord>, title: String, mut lines: Vec<String>) {
        if title.is_empty() {
            log::debug!("Skipping section with empty title ({} lines)", lines.len());
            return;
        }

        while lines.last().is_some_and(|l| is_blank(l)) {
            lines.pop();
        }

        songs.push(SongRecord::new(title, lines));
    }
}
