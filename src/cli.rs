use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use crate::inspect;

#[derive(Parser, Debug)]
#[command(name = "metadata-reader", about = "Image metadata reader")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Folder to scan when the window opens
    pub folder: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan a folder without opening a window and print the metadata tree
    Scan {
        folder: PathBuf,
        /// Print JSON instead of indented text
        #[arg(long)]
        json: bool,
        /// Longest value printed in text mode, 0 prints everything
        #[arg(long, default_value_t = 0)]
        max_value_chars: usize,
    },
}

pub fn scan(folder: &Path, json: bool, max_value_chars: usize) -> anyhow::Result<()> {
    write_scan(&mut io::stdout().lock(), folder, json, max_value_chars)
}

/// Headless scan of `folder`, printed as indented text or pretty JSON.
pub fn write_scan<W: Write>(
    out: &mut W,
    folder: &Path,
    json: bool,
    max_value_chars: usize,
) -> anyhow::Result<()> {
    if !folder.is_dir() {
        bail!("{} is not a folder", folder.display());
    }

    let summary = inspect::scan_folder(folder);

    if json {
        serde_json::to_writer_pretty(&mut *out, &summary).context("Failure writing JSON")?;
        writeln!(out)?;
    } else {
        write!(out, "{}", summary.to_text(max_value_chars))?;
        writeln!(out, "{}", summary.timing_line())?;
    }

    Ok(())
}
