//! PPTX (Office Open XML) writer for song decks.
//!
//! A `.pptx` file is a ZIP archive of XML parts. This crate loads a template
//! package, renders the slides of a [`songdeck_core::DeckPlan`] into it and
//! writes the result back out.

pub mod content_types;
pub mod generate;
pub mod package;
pub mod rels;
pub mod slide;
pub mod style;
pub mod template;
pub mod writer;
mod xml;

pub use generate::{
    ensure_pptx_extension, generate, generate_presentation, GenerateOptions, GenerationOutcome,
    GenerationReport, DEFAULT_OUTPUT,
};
pub use package::Package;
pub use style::{SlideSize, SlideStyle};
pub use template::{DeckTemplate, ExistingSlide};
pub use writer::DeckWriter;
