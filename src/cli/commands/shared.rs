//! Shared components for CLI commands
//!
//! This module contains common types, utilities, and functions used across
//! multiple CLI command implementations.

use crate::app::services::workflow::BatchReport;
use crate::cli::args::ProcessArgs;
use crate::config::Config;
use crate::{Error, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::{debug, info};

/// Processing statistics for reporting across all commands
#[derive(Debug, Clone, Default)]
pub struct ProcessingStats {
    /// Inputs found in the input folder
    pub files_discovered: usize,
    /// Inputs skipped because their outputs already existed
    pub files_skipped: usize,
    pub files_succeeded: usize,
    pub files_failed: usize,
    /// Inputs never started because the run was cancelled
    pub files_not_attempted: usize,
    pub observations_written: usize,
    /// Total processing time
    pub processing_time: Duration,
}

impl ProcessingStats {
    /// Fold a batch report into command statistics
    pub fn from_report(report: &BatchReport, files_discovered: usize, files_skipped: usize) -> Self {
        Self {
            files_discovered,
            files_skipped,
            files_succeeded: report.succeeded,
            files_failed: report.failed,
            files_not_attempted: report.not_attempted.len(),
            observations_written: report.observations_written(),
            processing_time: report.elapsed,
        }
    }

    /// True when no file failed and none was left unattempted
    pub fn all_succeeded(&self) -> bool {
        self.files_failed == 0 && self.files_not_attempted == 0
    }
}

/// Set up structured logging on stderr
pub fn setup_logging(log_level: &str, quiet: bool) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("csb_processor={}", log_level)));

    let initialised = if quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };
    initialised
        .map_err(|e| Error::configuration(format!("Failed to initialise logging: {}", e)))?;

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

/// Load configuration using layered approach (file -> env -> args)
pub fn load_configuration(args: &ProcessArgs) -> Result<Config> {
    info!("Loading configuration");

    let default_config_path = if args.config_file.is_none() {
        Config::default_config_path().ok()
    } else {
        None
    };

    let config_file = match &args.config_file {
        Some(path) => Some(path.as_path()),
        None => default_config_path
            .as_ref()
            .filter(|path| path.exists())
            .map(|path| path.as_path()),
    };

    if let Some(config_path) = config_file {
        info!("Using config file: {}", config_path.display());
    } else {
        info!("No config file found, using defaults and environment variables");
    }

    let mut config = Config::load_layered(
        args.input_path.clone(),
        args.output_path.clone(),
        config_file,
    )?;

    apply_cli_overrides(&mut config, args);

    config.validate()?;

    Ok(config)
}

/// Apply CLI argument overrides to configuration
pub fn apply_cli_overrides(config: &mut Config, args: &ProcessArgs) {
    if let Some(loader) = &args.loader {
        config.processing.loader = loader.clone();
    }
    if let Some(writer) = &args.writer {
        config.processing.writer = writer.clone();
    }
    if let Some(depth_source) = &args.depth_source {
        config.processing.depth_source = depth_source.clone();
    }
    if let Some(metadata_file) = &args.metadata_file {
        config.processing.metadata_file = Some(metadata_file.clone());
    }

    // Flags only ever switch these on
    config.processing.recursive |= args.recursive;
    config.processing.dry_run |= args.dry_run;
    config.processing.force_overwrite |= args.force_overwrite;

    if let Some(seconds) = args.max_gap_seconds {
        config.georeference.max_gap_seconds = seconds;
    }
    if let Some(workers) = args.workers {
        config.performance.parallel_workers = workers;
    }
    if let Some(seconds) = args.file_timeout_seconds {
        config.performance.file_timeout_seconds = Some(seconds);
    }
}

/// Create a progress bar with appropriate styling
pub fn create_progress_bar(total: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg} ETA: {eta}")
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb
}
