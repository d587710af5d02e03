//! Process command implementation for the CSB processor CLI
//!
//! Discovers logger files, skips those already converted, runs the rest
//! through the batch runner and reports the outcome.

use super::shared::{ProcessingStats, create_progress_bar, load_configuration, setup_logging};
use crate::app::services::workflow::{
    BatchReport, BatchRunner, Stage, StageEvent, StageObserver, StageStatus, Workflow,
    discover_inputs,
};
use crate::cli::args::{OutputFormat, ProcessArgs};
use crate::config::Config;
use crate::Result;
use colored::*;
use indicatif::{HumanDuration, ProgressBar};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Drives a progress bar from stage notifications
struct ProgressObserver {
    bar: ProgressBar,
}

impl StageObserver for ProgressObserver {
    fn on_stage(&self, event: &StageEvent) {
        match event.status {
            StageStatus::Started => {
                self.bar
                    .set_message(format!("{} ({})", event.file_id, event.stage));
            }
            StageStatus::Succeeded if event.stage == Stage::Write => self.bar.inc(1),
            StageStatus::Succeeded => {}
            StageStatus::Failed => {
                self.bar.println(format!(
                    "{} {} failed at {}: {}",
                    "✗".red(),
                    event.file_id,
                    event.stage,
                    event.message.as_deref().unwrap_or("no detail")
                ));
                self.bar.inc(1);
            }
        }
    }
}

/// Process command runner
///
/// 1. Set up logging and configuration
/// 2. Discover inputs and skip those already converted
/// 3. Run the batch with progress reporting
/// 4. Print the summary
pub async fn run_process(args: ProcessArgs, cancel: CancellationToken) -> Result<ProcessingStats> {
    setup_logging(args.get_log_level(), args.quiet)?;

    info!("Starting CSB processor");
    debug!("Command line arguments: {:?}", args);

    args.validate()?;

    let config = load_configuration(&args)?;
    debug!("Loaded configuration: {:?}", config);

    let workflow = Workflow::from_config(&config)?;
    let suffix = config.input_suffix()?;
    let discovered = discover_inputs(
        &config.processing.input_path,
        &suffix,
        config.processing.recursive,
    )?;
    let output_dir = config.processing.output_path.clone();

    let (pending, skipped): (Vec<PathBuf>, Vec<PathBuf>) = if config.processing.force_overwrite {
        (discovered.clone(), Vec::new())
    } else {
        discovered
            .iter()
            .cloned()
            .partition(|input| !workflow.outputs_exist(input, &output_dir))
    };
    for input in &skipped {
        info!("Skipping {}: outputs already exist", input.display());
    }

    info!(
        "{} '{}' files found, {} to process",
        discovered.len(),
        suffix,
        pending.len()
    );

    if config.processing.dry_run {
        return Ok(run_dry_run(&workflow, &config, &pending, discovered.len(), skipped.len()));
    }

    config.ensure_output_directory()?;

    let bar = if args.show_progress() && !pending.is_empty() {
        create_progress_bar(pending.len() as u64, "Processing logger files")
    } else {
        ProgressBar::hidden()
    };
    let observer: Arc<dyn StageObserver> = Arc::new(ProgressObserver { bar: bar.clone() });

    let runner = BatchRunner::from_config(Arc::new(workflow), &config);
    let report = runner.run(pending, &output_dir, observer, cancel).await;
    bar.finish_and_clear();

    for result in &report.results {
        for line in &result.summary.fault_report {
            debug!("{}: {}", result.file_id, line);
        }
    }

    let stats = ProcessingStats::from_report(&report, discovered.len(), skipped.len());
    match args.output_format {
        OutputFormat::Human => generate_human_report(&report, &stats),
        OutputFormat::Json => generate_json_report(&report, &stats)?,
    }

    Ok(stats)
}

/// List what a run would do without writing anything
fn run_dry_run(
    workflow: &Workflow,
    config: &Config,
    pending: &[PathBuf],
    discovered: usize,
    skipped: usize,
) -> ProcessingStats {
    info!("Performing dry run - no files will be created");

    println!(
        "{} {} -> {}",
        "Dry run:".bold(),
        config.processing.loader,
        workflow.writer_kind()
    );
    for input in pending {
        let outputs: Vec<String> = workflow
            .output_paths(input, &config.processing.output_path)
            .iter()
            .map(|path| path.display().to_string())
            .collect();
        println!("   • {} -> {}", input.display(), outputs.join(", "));
    }
    if skipped > 0 {
        println!("   {} inputs skipped, outputs already exist", skipped);
    }

    ProcessingStats {
        files_discovered: discovered,
        files_skipped: skipped,
        ..Default::default()
    }
}

/// Generate human-readable report
fn generate_human_report(report: &BatchReport, stats: &ProcessingStats) {
    let title = if stats.all_succeeded() {
        "CSB Processing Complete".green().bold()
    } else {
        "CSB Processing Finished With Problems".yellow().bold()
    };

    println!("\n{}", title);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("   • Files discovered: {}", stats.files_discovered);
    if stats.files_skipped > 0 {
        println!("   • Skipped (outputs exist): {}", stats.files_skipped);
    }
    println!(
        "   • Succeeded: {}",
        stats.files_succeeded.to_string().green()
    );
    if stats.files_failed > 0 {
        println!("   • Failed: {}", stats.files_failed.to_string().red());
    }
    if stats.files_not_attempted > 0 {
        println!(
            "   • Not attempted (cancelled): {}",
            stats.files_not_attempted.to_string().yellow()
        );
    }
    println!("   • Observations written: {}", stats.observations_written);
    println!(
        "   • Processing time: {}",
        HumanDuration(stats.processing_time)
    );

    let failures: Vec<_> = report.failures().collect();
    if !failures.is_empty() {
        println!("\n{}", "Failed files:".red().bold());
        for result in failures {
            if let Some(detail) = &result.error {
                println!(
                    "   {} {}: {} during {}",
                    "✗".red(),
                    result.file_id,
                    detail.kind,
                    detail.stage
                );
                for message in &detail.messages {
                    println!("       {}", message);
                }
            }
        }
    }

    if !report.not_attempted.is_empty() {
        warn!("{} files were not attempted", report.not_attempted.len());
    }
    println!();
}

/// Generate JSON report for machine consumption
fn generate_json_report(report: &BatchReport, stats: &ProcessingStats) -> Result<()> {
    let json_report = serde_json::json!({
        "files_discovered": stats.files_discovered,
        "files_skipped": stats.files_skipped,
        "succeeded": stats.files_succeeded,
        "failed": stats.files_failed,
        "not_attempted": report.not_attempted,
        "observations_written": stats.observations_written,
        "processing_time_seconds": stats.processing_time.as_secs_f64(),
        "results": report.results,
    });

    println!("{}", serde_json::to_string_pretty(&json_report)?);
    Ok(())
}
