//! Lethe - EXIF inspection and removal for JPEG files.
//!
//! Two subcommands over the scanning core: `inspect` reports metadata
//! presence, `strip` rewrites files without it.

mod batch;
mod inspect;
mod report;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "lethe")]
#[command(author, version, about = "Detect and strip EXIF metadata from JPEG files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report whether files carry EXIF metadata and how large it is
    Inspect {
        /// JPEG files to inspect
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Emit one JSON record per file instead of text
        #[arg(long)]
        json: bool,

        /// Also print the full marker segment walk
        #[arg(long)]
        segments: bool,
    },

    /// Rewrite files with their EXIF metadata removed
    Strip {
        /// JPEG files to clean
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Directory to write cleaned files into
        #[arg(short, long, conflicts_with = "in_place")]
        output: Option<PathBuf>,

        /// Replace the originals atomically
        #[arg(long)]
        in_place: bool,

        /// Worker threads (defaults to the number of CPUs)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Write a .receipt.json sidecar next to every cleaned file
        #[arg(long)]
        receipt: bool,

        /// Skip the in-place confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    match cli.command {
        Command::Inspect {
            files,
            json,
            segments,
        } => inspect::run(&files, json, segments),
        Command::Strip {
            files,
            output,
            in_place,
            jobs,
            receipt,
            yes,
        } => {
            if in_place && !yes && !confirm_in_place(files.len())? {
                println!("Aborted.");
                return Ok(());
            }
            let options = batch::StripOptions {
                output_dir: output,
                in_place,
                jobs: jobs.unwrap_or_else(num_cpus::get),
                receipt,
            };
            batch::run_strip(&files, &options, running)
        }
    }
}

fn confirm_in_place(count: usize) -> Result<bool> {
    use dialoguer::{theme::ColorfulTheme, Confirm};

    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(format!(
            "Replace {count} file(s) in place? Originals will be overwritten"
        ))
        .default(false)
        .interact()
        .context("Failed to show confirmation prompt")
}
