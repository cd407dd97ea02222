//! Slide segmentation.
//!
//! Lyrics are split into slides at paragraph breaks: every run of non-blank
//! lines becomes one slide, and blank lines only separate runs.

use crate::types::SlideGroup;

/// Whether a line counts as a paragraph break.
pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Split lyric lines into slides at blank-line boundaries.
///
/// # Example
/// ```text
/// Amazing grace how sweet the sound      -> slide 1
/// That saved a wretch like me            -> slide 1
///
/// I once was lost but now am found       -> slide 2
/// ```
pub fn split_into_slides<S: AsRef<str>>(lines: &[S]) -> Vec<SlideGroup> {
    let mut slides = Vec::new();
    let mut current: SlideGroup = Vec::new();

    for line in lines {
        let line = line.as_ref();
        if is_blank(line) {
            if !current.is_empty() {
                slides.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line.to_string());
        }
    }

    if !current.is_empty() {
        slides.push(current);
    }

    slides
}
