//! Per-file workflow orchestration
//!
//! [`Workflow::process_file`] drives one logger file through the pipeline
//!
//! ```text
//! Load -> ExtractDepth -> GeoReference -> MergeMetadata -> Write
//! ```
//!
//! reporting each stage to a [`StageObserver`] and folding every outcome,
//! including errors, into a [`ProcessingResult`]. A workflow is read-only
//! once built and is shared between workers by the [`batch`] runner.
//!
//! ```rust,no_run
//! use csb_processor::app::services::workflow::{LoggingObserver, Workflow};
//! use csb_processor::Config;
//! use std::path::Path;
//!
//! # fn example() -> csb_processor::Result<()> {
//! let workflow = Workflow::from_config(&Config::default())?;
//! let result = workflow.process_file(
//!     Path::new("logs/00001.wibl"),
//!     Path::new("output"),
//!     &LoggingObserver,
//! );
//! println!("{}: success={}", result.file_id, result.success);
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod events;

#[cfg(test)]
pub mod tests;

pub use batch::{BatchReport, BatchRunner, discover_inputs};
pub use events::{LoggingObserver, NoopObserver, Stage, StageEvent, StageObserver, StageStatus};

use crate::app::models::metadata::CoreMetadata;
use crate::app::models::{DepthMessageKind, FailureKind};
use crate::app::services::depth_extractor::{ExtractionOptions, extract_depths};
use crate::app::services::georeferencer::{PositionTrack, georeference};
use crate::app::services::loaders::{Loader, LoaderKind, file_id};
use crate::app::services::metadata_merger::{auxiliary_readings, merge};
use crate::app::services::writers::{OutputWriter, WriterKind, base_name};
use crate::config::{Config, GeoreferenceConfig};
use crate::{Error, Result};
use serde::Serialize;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span};

/// Why a file failed, and where
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureDetail {
    pub kind: FailureKind,
    pub stage: Stage,
    /// Error message followed by its causes
    pub messages: Vec<String>,
}

/// Counts gathered while a file moved through the pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FileSummary {
    pub records: usize,
    pub faults: usize,
    pub time_source: Option<String>,
    pub depths: usize,
    pub rejected_depths: usize,
    pub dropped_depths: usize,
    pub observations: usize,
    /// Per-message fault lines from the loader
    pub fault_report: Vec<String>,
}

/// Outcome of processing one file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingResult {
    pub file_id: String,
    pub input: PathBuf,
    pub success: bool,
    /// Last stage attempted, if any
    pub stage: Option<Stage>,
    pub outputs: Vec<PathBuf>,
    pub error: Option<FailureDetail>,
    pub summary: FileSummary,
}

impl ProcessingResult {
    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.error.as_ref().map(|detail| detail.kind)
    }

    /// Turn this result into a budget expiry, removing anything it wrote
    pub fn into_timeout(mut self, reason: &str) -> Self {
        crate::app::services::writers::atomic::remove_outputs(&self.outputs);
        self.outputs.clear();
        self.success = false;

        let stage = self
            .error
            .as_ref()
            .map(|detail| detail.stage)
            .or(self.stage)
            .unwrap_or(Stage::Load);
        let mut messages = vec![Error::external_timeout(reason).to_string()];
        if let Some(detail) = self.error.take() {
            if detail.kind != FailureKind::ExternalTimeout {
                messages.extend(detail.messages);
            }
        }
        self.error = Some(FailureDetail {
            kind: FailureKind::ExternalTimeout,
            stage,
            messages,
        });
        self
    }
}

/// Failure kind reported when a stage fails with a crate-level error
fn stage_failure_kind(stage: Stage) -> FailureKind {
    match stage {
        Stage::Load => FailureKind::DecodeError,
        Stage::ExtractDepth => FailureKind::NoMatchingDepthSource,
        Stage::GeoReference => FailureKind::InsufficientPositionCoverage,
        Stage::MergeMetadata => FailureKind::MissingRequiredMetadata,
        Stage::Write => FailureKind::WriteFailed,
    }
}

/// Stage bookkeeping for one file
struct FileRun<'a> {
    file_id: &'a str,
    observer: &'a dyn StageObserver,
    cancel: &'a CancellationToken,
    reached: Option<Stage>,
    /// Outputs absent when the write stage started
    fresh_outputs: Vec<PathBuf>,
}

impl FileRun<'_> {
    fn notify(&self, stage: Stage, status: StageStatus, message: Option<String>) {
        self.observer.on_stage(&StageEvent {
            file_id: self.file_id.to_string(),
            stage,
            status,
            message,
        });
    }

    /// Run one stage, reporting it; `describe` summarises a success
    fn stage<T>(
        &mut self,
        stage: Stage,
        run: impl FnOnce() -> Result<T>,
        describe: impl FnOnce(&T) -> String,
    ) -> std::result::Result<T, FailureDetail> {
        if self.cancel.is_cancelled() {
            return Err(FailureDetail {
                kind: FailureKind::ExternalTimeout,
                stage,
                messages: vec![
                    Error::external_timeout(format!("cancelled before {}", stage)).to_string(),
                ],
            });
        }

        self.reached = Some(stage);
        let _span = info_span!("stage", name = stage.name()).entered();
        self.notify(stage, StageStatus::Started, None);

        match run() {
            Ok(value) => {
                self.notify(stage, StageStatus::Succeeded, Some(describe(&value)));
                Ok(value)
            }
            Err(error) => {
                let detail = FailureDetail {
                    kind: error
                        .failure_kind()
                        .unwrap_or_else(|| stage_failure_kind(stage)),
                    stage,
                    messages: error.messages(),
                };
                self.notify(stage, StageStatus::Failed, Some(error.to_string()));
                Err(detail)
            }
        }
    }
}

/// Resolved processing chain for a run
pub struct Workflow {
    loader: Box<dyn Loader>,
    writer_kind: WriterKind,
    writer: Box<dyn OutputWriter>,
    depth_kind: DepthMessageKind,
    georeference: GeoreferenceConfig,
    core: Option<CoreMetadata>,
}

impl Workflow {
    /// Build from configuration with explicit core metadata
    pub fn new(config: &Config, core: Option<CoreMetadata>) -> Result<Self> {
        let loader_kind: LoaderKind = config.loader_kind()?;
        let writer_kind = config.writer_kind()?;
        let depth_kind = config.depth_kind()?;

        info!(
            "Workflow: {} -> {} using {} depths{}",
            loader_kind,
            writer_kind,
            depth_kind.label(),
            if core.is_some() { ", with core metadata" } else { "" }
        );

        Ok(Self {
            loader: loader_kind.loader(&config.decoding),
            writer_kind,
            writer: writer_kind.writer(),
            depth_kind,
            georeference: config.georeference.clone(),
            core,
        })
    }

    /// Build from configuration, reading the metadata file if one is set
    pub fn from_config(config: &Config) -> Result<Self> {
        let core = match &config.processing.metadata_file {
            Some(path) => Some(CoreMetadata::from_file(path)?),
            None => None,
        };
        Self::new(config, core)
    }

    pub fn writer_kind(&self) -> WriterKind {
        self.writer_kind
    }

    /// Files the writer would produce for an input
    pub fn output_paths(&self, input: &Path, output_dir: &Path) -> Vec<PathBuf> {
        self.writer.output_paths(output_dir, &base_name(input))
    }

    /// Whether every output for an input is already present
    pub fn outputs_exist(&self, input: &Path, output_dir: &Path) -> bool {
        self.output_paths(input, output_dir)
            .iter()
            .all(|path| path.exists())
    }

    /// Process one file to completion
    pub fn process_file(
        &self,
        input: &Path,
        output_dir: &Path,
        observer: &dyn StageObserver,
    ) -> ProcessingResult {
        self.process_file_cancellable(input, output_dir, observer, &CancellationToken::new())
    }

    /// Process one file, stopping at the next stage boundary once `cancel`
    /// fires
    pub fn process_file_cancellable(
        &self,
        input: &Path,
        output_dir: &Path,
        observer: &dyn StageObserver,
        cancel: &CancellationToken,
    ) -> ProcessingResult {
        let file_id = file_id(input);
        let _span = info_span!("file", id = %file_id).entered();

        let mut result = ProcessingResult {
            file_id: file_id.clone(),
            input: input.to_path_buf(),
            success: false,
            stage: None,
            outputs: Vec::new(),
            error: None,
            summary: FileSummary::default(),
        };
        let mut run = FileRun {
            file_id: &file_id,
            observer,
            cancel,
            reached: None,
            fresh_outputs: Vec::new(),
        };

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.run_pipeline(input, output_dir, &mut run, &mut result.summary)
        }));
        result.stage = run.reached;

        match outcome {
            Ok(Ok(outputs)) => {
                result.success = true;
                result.outputs = outputs;
                info!(
                    "{}: {} observations written",
                    file_id, result.summary.observations
                );
            }
            Ok(Err(detail)) => {
                info!("{}: failed at {} ({})", file_id, detail.stage, detail.kind);
                result.error = Some(detail);
            }
            Err(_) => {
                let stage = run.reached.unwrap_or(Stage::Load);
                let message = format!("internal error during {}", stage);
                error!("{}: {}", file_id, message);
                run.notify(stage, StageStatus::Failed, Some(message.clone()));
                // Outputs from earlier runs stay; a half-finished write goes
                if stage == Stage::Write {
                    crate::app::services::writers::atomic::remove_outputs(&run.fresh_outputs);
                }
                result.error = Some(FailureDetail {
                    kind: stage_failure_kind(stage),
                    stage,
                    messages: vec![message],
                });
            }
        }
        result
    }

    fn run_pipeline(
        &self,
        input: &Path,
        output_dir: &Path,
        run: &mut FileRun<'_>,
        summary: &mut FileSummary,
    ) -> std::result::Result<Vec<PathBuf>, FailureDetail> {
        let decoded = run.stage(
            Stage::Load,
            || self.loader.decode(input),
            |decoded| {
                format!(
                    "{} records, time from {}",
                    decoded.records.len(),
                    decoded.timebase.source()
                )
            },
        )?;
        summary.records = decoded.records.len();
        summary.faults = decoded.stats.total_faults();
        summary.time_source = Some(decoded.timebase.source().to_string());
        summary.fault_report = decoded.stats.summary_lines();

        let options = ExtractionOptions {
            apply_transducer_offset: self.georeference.apply_transducer_offset,
        };
        let extraction = run.stage(
            Stage::ExtractDepth,
            || extract_depths(&decoded, self.depth_kind, options),
            |extraction| format!("{} {} depths", extraction.len(), self.depth_kind.name()),
        )?;
        summary.depths = extraction.len();
        summary.rejected_depths = extraction.rejected;

        let outcome = run.stage(
            Stage::GeoReference,
            || {
                let track = PositionTrack::from_decoded(&decoded);
                georeference(&extraction.observations, &track, &self.georeference)
            },
            |outcome| {
                format!(
                    "{} of {} depths placed",
                    outcome.observations.len(),
                    outcome.total
                )
            },
        )?;
        summary.dropped_depths = outcome.dropped;

        let dataset = run.stage(
            Stage::MergeMetadata,
            || {
                merge(
                    outcome.observations,
                    &auxiliary_readings(&decoded),
                    &decoded,
                    self.core.as_ref(),
                    self.writer_kind.requirement(),
                    self.georeference.max_gap_seconds,
                )
            },
            |dataset| format!("{} observations", dataset.len()),
        )?;
        summary.observations = dataset.len();

        run.fresh_outputs = self
            .output_paths(input, output_dir)
            .into_iter()
            .filter(|path| !path.exists())
            .collect();
        let written = run.stage(
            Stage::Write,
            || {
                self.writer
                    .write(&dataset, output_dir, &base_name(input))
            },
            |written| {
                written
                    .paths
                    .iter()
                    .map(|path| path.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            },
        )?;
        Ok(written.paths)
    }
}
