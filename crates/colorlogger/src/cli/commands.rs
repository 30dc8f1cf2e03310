//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::sample::ColorSample;

/// Run command arguments.
#[derive(Debug, Args)]
pub struct RunCommand {
    /// Stop after this many seconds instead of waiting for `q`
    #[arg(short, long, value_name = "SECS")]
    pub duration: Option<u64>,

    /// Logical drive to mount (overrides config)
    #[arg(long)]
    pub drive: Option<String>,

    /// Directory standing in for the card (overrides config)
    #[arg(long, value_name = "DIR")]
    pub volume_root: Option<PathBuf>,

    /// Reads each demo colour is held for
    #[arg(long, default_value = "10")]
    pub hold: u32,
}

/// Classify command arguments.
#[derive(Debug, Args)]
pub struct ClassifyCommand {
    /// Clear channel reading
    pub clear: u16,

    /// Red channel reading
    pub red: u16,

    /// Green channel reading
    pub green: u16,

    /// Blue channel reading
    pub blue: u16,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

impl ClassifyCommand {
    /// The reading described by the arguments.
    #[must_use]
    pub fn sample(&self) -> ColorSample {
        ColorSample::new(self.clear, self.red, self.green, self.blue)
    }
}

/// Summary command arguments.
#[derive(Debug, Args)]
pub struct SummaryCommand {
    /// Log file to summarise
    pub file: PathBuf,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
