//! One-call generation: text file in, `.pptx` file out.

use serde::Serialize;
use songdeck_core::{
    decode_text, DeckPlan, Error, IndexLayout, Result, SongParser, DEFAULT_MARKER,
};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::style::SlideStyle;
use crate::template::DeckTemplate;
use crate::writer::DeckWriter;

/// Output file name used when the caller does not choose one.
pub const DEFAULT_OUTPUT: &str = "songs_presentation.pptx";

/// Options for a generation run.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Song collection text file.
    pub input: PathBuf,
    /// Destination; `.pptx` is appended when missing.
    pub output: PathBuf,
    /// Existing presentation to reuse masters and layouts from.
    pub template: Option<PathBuf>,
    /// Put a table of contents in front of the songs.
    pub with_index: bool,
    pub index_layout: IndexLayout,
    /// Character that starts a song title line.
    pub marker: char,
    pub style: SlideStyle,
}

impl GenerateOptions {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            template: None,
            with_index: false,
            index_layout: IndexLayout::default(),
            marker: DEFAULT_MARKER,
            style: SlideStyle::default(),
        }
    }

    pub fn with_template(mut self, template: impl Into<PathBuf>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn with_index(mut self, with_index: bool) -> Self {
        self.with_index = with_index;
        self
    }

    pub fn with_index_layout(mut self, layout: IndexLayout) -> Self {
        self.index_layout = layout;
        self
    }

    pub fn with_marker(mut self, marker: char) -> Self {
        self.marker = marker;
        self
    }

    pub fn with_style(mut self, style: SlideStyle) -> Self {
        self.style = style;
        self
    }
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    /// Path actually written (with the `.pptx` extension enforced).
    pub output: PathBuf,
    pub song_count: usize,
    /// Generated slides, index pages included.
    pub slide_count: usize,
    pub index_page_count: usize,
    /// Slides carried over from the template ahead of the generated ones.
    pub template_slides_kept: usize,
    pub message: String,
}

/// Flattened result of a run, for callers that only report status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationOutcome {
    pub success: bool,
    pub message: String,
    pub slide_count: usize,
}

impl GenerationOutcome {
    fn failure(err: &Error) -> Self {
        let message = match err {
            Error::FileNotFound { .. } | Error::NoSongs { .. } => err.to_string(),
            other => format!("Error generating presentation: {}", other),
        };
        Self {
            success: false,
            message,
            slide_count: 0,
        }
    }
}

impl From<GenerationReport> for GenerationOutcome {
    fn from(report: GenerationReport) -> Self {
        Self {
            success: true,
            message: report.message,
            slide_count: report.slide_count,
        }
    }
}

/// Append `.pptx` to `path` unless it already ends with it.
pub fn ensure_pptx_extension(path: &Path) -> PathBuf {
    let has_extension = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("pptx"))
        .unwrap_or(false);
    if has_extension {
        return path.to_path_buf();
    }

    let mut name = OsString::from(path.as_os_str());
    name.push(".pptx");
    PathBuf::from(name)
}

/// Parse the input, plan the deck and write it into the template.
///
/// The package is assembled in memory and written with a single call, so a
/// failed run leaves no output file behind.
pub fn generate_presentation(options: &GenerateOptions) -> Result<GenerationReport> {
    let output = ensure_pptx_extension(&options.output);

    let bytes =
        std::fs::read(&options.input).map_err(|e| Error::from_io(&options.input, e))?;
    let text = decode_text(&bytes);
    let songs = SongParser::new().with_marker(options.marker).parse(&text);
    if songs.is_empty() {
        return Err(Error::NoSongs {
            marker: options.marker,
        });
    }
    log::info!("Found {} songs in {}", songs.len(), options.input.display());

    let plan = DeckPlan::build(&songs, options.with_index, &options.index_layout);

    let template = match &options.template {
        Some(path) => DeckTemplate::open(path)?,
        None => DeckTemplate::default_template()?,
    };

    // Template slides only survive when no index is placed in front.
    let keep_existing = !options.with_index;
    let template_slides_kept = if keep_existing {
        template.existing_slides().len()
    } else {
        0
    };

    let package = DeckWriter::with_style(options.style.clone()).write(template, &plan, keep_existing)?;
    package.save(&output)?;

    let message = plan.summary();
    log::info!("{} -> {}", message, output.display());

    Ok(GenerationReport {
        output,
        song_count: plan.song_count,
        slide_count: plan.total_slides(),
        index_page_count: plan.index_page_count,
        template_slides_kept,
        message,
    })
}

/// Run [`generate_presentation`] and fold any error into the outcome.
pub fn generate(options: &GenerateOptions) -> GenerationOutcome {
    match generate_presentation(options) {
        Ok(report) => report.into(),
        Err(err) => {
            log::error!("Generation failed: {}", err);
            GenerationOutcome::failure(&err)
        }
    }
}
