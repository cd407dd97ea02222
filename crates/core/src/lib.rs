//! Core domain types, song parsing, slide segmentation, and
//! table-of-contents planning for song decks.

pub mod error;
pub mod index;
pub mod parser;
pub mod plan;
pub mod segment;
pub mod text;
pub mod types;

pub use error::{Error, Result};
pub use index::IndexLayout;
pub use parser::{SongParser, DEFAULT_MARKER};
pub use plan::DeckPlan;
pub use segment::split_into_slides;
pub use text::decode_text;
pub use types::{IndexEntry, IndexPage, PlannedSlide, SlideGroup, SongRecord, SongSlide};
