//! Command-line argument definitions for the CSB processor
//!
//! This module defines the CLI interface using the clap derive API.

use crate::constants::MAX_PARALLEL_WORKERS;
use crate::{Error, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// CLI arguments for the CSB logger processor
///
/// Converts raw marine logger recordings into geo-referenced depth
/// observations ready for submission to a crowd-sourced bathymetry archive.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "csb-processor",
    version,
    about = "Convert marine logger recordings into geo-referenced CSB depth observations",
    long_about = "Decodes YDVR, WIBL, TeamSurv and generic ASCII logger files, extracts depth \
                  soundings from a selected NMEA message kind, places them against the logger's \
                  own position fixes and writes DCDB-ready GeoJSON or CSV with merged \
                  submission metadata."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands for the CSB processor
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Process a folder of logger files (main command)
    Process(ProcessArgs),
    /// List the registered loaders, writers and depth message kinds
    List,
    /// Check a metadata file for mandatory submission fields
    CheckMetadata(CheckMetadataArgs),
}

/// Arguments for the process command
#[derive(Debug, Clone, Parser)]
pub struct ProcessArgs {
    /// Folder holding the raw logger files
    ///
    /// Only files ending in the loader's suffix are picked up. Defaults to
    /// the configured input path.
    #[arg(
        short = 'i',
        long = "input",
        value_name = "DIR",
        help = "Folder of logger files to process"
    )]
    pub input_path: Option<PathBuf>,

    /// Folder receiving the converted outputs
    ///
    /// Created if it doesn't exist. Each input produces outputs named after
    /// its file stem.
    #[arg(
        short = 'o',
        long = "output",
        value_name = "DIR",
        help = "Folder for converted outputs"
    )]
    pub output_path: Option<PathBuf>,

    /// Logger format, by label or identifier
    #[arg(
        short = 'l',
        long = "loader",
        value_name = "LOADER",
        help = "Logger format (ydvr, wibl, teamsurv, generic-ascii)"
    )]
    pub loader: Option<String>,

    /// Output format, by label or identifier
    #[arg(
        short = 'w',
        long = "writer",
        value_name = "WRITER",
        help = "Output format (geojson, dcdb-csv, csv)"
    )]
    pub writer: Option<String>,

    /// Message kind depths are taken from
    #[arg(
        short = 'd',
        long = "depth",
        value_name = "KIND",
        help = "Depth message kind (DBT, DPT, Depth)"
    )]
    pub depth_source: Option<String>,

    /// Submission metadata applied to every file
    ///
    /// A JSON document in the archive's GeoJSON header layout. Required for
    /// the DCDB writers unless the logger embeds its own.
    #[arg(
        short = 'm',
        long = "metadata",
        value_name = "FILE",
        help = "Submission metadata JSON file"
    )]
    pub metadata_file: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// TOML configuration file for advanced settings. If not specified,
    /// looks for <config dir>/csb-processor/config.toml
    #[arg(
        short = 'c',
        long = "config",
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    pub config_file: Option<PathBuf>,

    /// Number of files processed concurrently
    #[arg(
        short = 'j',
        long = "workers",
        value_name = "COUNT",
        help = "Number of parallel workers (defaults to the CPU count)"
    )]
    pub workers: Option<usize>,

    /// Largest allowed time separation between a depth and its fix
    #[arg(
        long = "max-gap",
        value_name = "SECONDS",
        help = "Maximum seconds between a depth and the fix used for it"
    )]
    pub max_gap_seconds: Option<f64>,

    /// Per-file processing budget
    #[arg(
        long = "file-timeout",
        value_name = "SECONDS",
        help = "Abandon a file that takes longer than this"
    )]
    pub file_timeout_seconds: Option<f64>,

    /// Descend into sub-folders of the input path
    #[arg(short = 'r', long = "recursive", help = "Scan sub-folders for inputs")]
    pub recursive: bool,

    /// Show what would be processed without writing anything
    #[arg(
        long = "dry-run",
        help = "Show what would be processed without creating output files"
    )]
    pub dry_run: bool,

    /// Reprocess inputs whose outputs already exist
    ///
    /// By default, inputs with a complete set of outputs are skipped.
    #[arg(long = "force", help = "Reprocess inputs whose outputs already exist")]
    pub force_overwrite: bool,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Only show errors and the final summary
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,

    /// Format of the end-of-run report
    #[arg(
        long = "output-format",
        value_enum,
        default_value = "human",
        help = "Output format for the run report"
    )]
    pub output_format: OutputFormat,
}

/// Arguments for the check-metadata command
#[derive(Debug, Clone, Parser)]
pub struct CheckMetadataArgs {
    /// Metadata JSON file to check
    #[arg(value_name = "FILE")]
    pub metadata_file: PathBuf,
}

/// Output format options for the run report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON format for scripting
    Json,
}

impl Args {
    /// Get the command if one was specified
    pub fn get_command(&self) -> Option<Commands> {
        self.command.clone()
    }
}

impl ProcessArgs {
    /// Validate the process command arguments for consistency
    pub fn validate(&self) -> Result<()> {
        if let Some(input_path) = &self.input_path {
            if !input_path.is_dir() {
                return Err(Error::configuration(format!(
                    "Input path is not a directory: {}",
                    input_path.display()
                )));
            }
        }

        if let Some(workers) = self.workers {
            if workers == 0 || workers > MAX_PARALLEL_WORKERS {
                return Err(Error::configuration(format!(
                    "Number of workers must be between 1 and {}",
                    MAX_PARALLEL_WORKERS
                )));
            }
        }

        if let Some(config_file) = &self.config_file {
            if !config_file.exists() {
                return Err(Error::configuration(format!(
                    "Config file does not exist: {}",
                    config_file.display()
                )));
            }
        }

        if let Some(metadata_file) = &self.metadata_file {
            if !metadata_file.is_file() {
                return Err(Error::configuration(format!(
                    "Metadata file does not exist: {}",
                    metadata_file.display()
                )));
            }
        }

        Ok(())
    }

    /// Determine the appropriate log level based on verbosity flags
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// Check if we should show progress bars (not in quiet mode)
    pub fn show_progress(&self) -> bool {
        !self.quiet && self.output_format == OutputFormat::Human
    }
}
