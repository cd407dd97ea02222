//! CLI tool for turning a song collection text file into a PowerPoint deck.

use anyhow::{Context, Result};
use clap::Parser;
use songdeck_core::{IndexLayout, DEFAULT_MARKER};
use songdeck_pptx::{ensure_pptx_extension, generate_presentation, GenerateOptions, DEFAULT_OUTPUT};
use std::path::PathBuf;

/// Generate a PowerPoint deck with one slide per lyric block.
///
/// Songs start with a line beginning with `#`; blank lines split a song
/// into slides.
#[derive(Parser, Debug)]
#[command(name = "songdeck")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input text file containing songs
    input: PathBuf,

    /// Output PowerPoint file
    #[arg(default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Output PowerPoint file (overrides the positional OUTPUT)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output_flag: Option<PathBuf>,

    /// Existing presentation whose masters and layouts are reused
    #[arg(short = 'm', long = "master", visible_alias = "template", value_name = "TEMPLATE")]
    master: Option<PathBuf>,

    /// Put a table of contents with clickable links in front of the songs
    #[arg(long, visible_alias = "index")]
    toc: bool,

    /// Table of contents entries per page
    #[arg(long, default_value = "20", value_name = "N")]
    per_page: usize,

    /// Character that starts a song title line
    #[arg(long, default_value_t = DEFAULT_MARKER)]
    marker: char,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let output = ensure_pptx_extension(args.output_flag.as_ref().unwrap_or(&args.output));

    let mut options = GenerateOptions::new(&args.input, &output)
        .with_index(args.toc)
        .with_index_layout(IndexLayout::with_capacity(args.per_page))
        .with_marker(args.marker);

    println!("Reading songs from {}...", args.input.display());
    match &args.master {
        Some(master) => {
            println!("Using template: {}", master.display());
            options = options.with_template(master);
        }
        None => println!("Using the built-in blank template"),
    }
    if args.toc {
        println!("Generating table of contents...");
    }

    let report = generate_presentation(&options)
        .with_context(|| format!("Failed to generate {}", output.display()))?;

    if args.verbose {
        eprintln!(
            "  {} songs, {} index pages, {} template slides kept",
            report.song_count, report.index_page_count, report.template_slides_kept
        );
    }

    println!("Created {}", report.output.display());
    println!("{}", report.message);

    Ok(())
}
