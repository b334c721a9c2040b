//! Command-line arguments

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use sketchd_app::config;

/// sketchd - compile, upload and export sketches through the toolchain
#[derive(Parser, Debug)]
#[command(name = "sketchd", version)]
#[command(about = "Drive the sketch toolchain headlessly (NDJSON output)", long_about = None)]
pub struct Cli {
    /// Sketchbook directory (defaults to ~/Documents/sketchd)
    #[arg(long, global = true, value_name = "PATH")]
    pub sketchbook: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Compile and upload a textual sketch
    Run {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Target device id, e.g. cm:esp8266:nibble
        #[arg(long)]
        device: String,
    },

    /// Compile a textual sketch to a binary
    Export {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(value_name = "DEST")]
        dest: PathBuf,

        #[arg(long)]
        device: String,
    },

    /// Check a Save-As name against existing titles
    Validate {
        name: String,

        /// Comma-separated titles already in the sketchbook
        #[arg(long, value_delimiter = ',')]
        existing: Vec<String>,
    },
}

impl Cli {
    pub fn sketchbook(&self) -> PathBuf {
        self.sketchbook
            .clone()
            .unwrap_or_else(config::default_sketchbook)
    }
}
