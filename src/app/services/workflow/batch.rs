//! Folder-level batch processing
//!
//! Files are independent, so the runner hands each one to a blocking worker
//! and keeps up to `parallel_workers` in flight. Results come back in input
//! order. Cancelling the run token stops new submissions; files already
//! running finish normally. An optional per-file budget cancels a file's own
//! token, lets it stop at the next stage boundary and discards its outputs.

use super::{
    FailureDetail, FileSummary, ProcessingResult, Stage, StageEvent, StageObserver, StageStatus,
    Workflow, stage_failure_kind,
};
use crate::app::models::FailureKind;
use crate::app::services::loaders::file_id;
use crate::app::services::writers::base_name;
use crate::config::Config;
use crate::{Error, Result};
use futures::stream::{self, StreamExt};
use glob::{MatchOptions, Pattern};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

fn has_suffix(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .map(|name| {
            name.to_string_lossy()
                .to_lowercase()
                .ends_with(&suffix.to_lowercase())
        })
        .unwrap_or(false)
}

/// For each input, the earlier input whose outputs it would overwrite
fn output_collisions(inputs: &[PathBuf]) -> Vec<Option<PathBuf>> {
    let mut claimed: HashMap<String, &PathBuf> = HashMap::new();
    inputs
        .iter()
        .map(|input| match claimed.entry(base_name(input)) {
            Entry::Occupied(first) => Some(first.get().to_path_buf()),
            Entry::Vacant(slot) => {
                slot.insert(input);
                None
            }
        })
        .collect()
}

/// Input files in `dir` whose names end in `suffix` (case-insensitive),
/// sorted by path.
///
/// Outputs are named after the input's file stem, so two inputs sharing a
/// stem (possible with `recursive`) are rejected.
pub fn discover_inputs(dir: &Path, suffix: &str, recursive: bool) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::configuration(format!(
            "Input path {} is not a directory",
            dir.display()
        )));
    }

    let mut files: Vec<PathBuf> = if recursive {
        WalkDir::new(dir)
            .follow_links(false)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file() && has_suffix(entry.path(), suffix))
            .map(|entry| entry.into_path())
            .collect()
    } else {
        let pattern = format!(
            "{}/*{}",
            Pattern::escape(&dir.to_string_lossy()),
            Pattern::escape(suffix)
        );
        let options = MatchOptions {
            case_sensitive: false,
            require_literal_separator: true,
            require_literal_leading_dot: true,
        };
        glob::glob_with(&pattern, options)
            .map_err(|e| Error::configuration(format!("Invalid input pattern {}: {}", pattern, e)))?
            .filter_map(|entry| entry.ok())
            .filter(|path| path.is_file())
            .collect()
    };

    files.sort();
    files.dedup();

    if let Some((input, first)) = files
        .iter()
        .zip(output_collisions(&files))
        .find_map(|(input, first)| first.map(|first| (input, first)))
    {
        return Err(Error::configuration(format!(
            "{} and {} would both write outputs named '{}'",
            first.display(),
            input.display(),
            base_name(input)
        )));
    }
    debug!(
        "Found {} '{}' files in {}{}",
        files.len(),
        suffix,
        dir.display(),
        if recursive { " (recursive)" } else { "" }
    );
    Ok(files)
}

/// Outcome of a batch run
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// One result per attempted file, in input order
    pub results: Vec<ProcessingResult>,
    pub succeeded: usize,
    pub failed: usize,
    /// Inputs never submitted because the run was cancelled
    pub not_attempted: Vec<PathBuf>,
    pub elapsed: Duration,
}

impl BatchReport {
    fn new(results: Vec<ProcessingResult>, not_attempted: Vec<PathBuf>, elapsed: Duration) -> Self {
        let succeeded = results.iter().filter(|result| result.success).count();
        Self {
            failed: results.len() - succeeded,
            succeeded,
            results,
            not_attempted,
            elapsed,
        }
    }

    pub fn total(&self) -> usize {
        self.results.len() + self.not_attempted.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && self.not_attempted.is_empty()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ProcessingResult> {
        self.results.iter().filter(|result| !result.success)
    }

    /// Observations written across every successful file
    pub fn observations_written(&self) -> usize {
        self.results
            .iter()
            .filter(|result| result.success)
            .map(|result| result.summary.observations)
            .sum()
    }
}

/// Runs a workflow over many files concurrently
pub struct BatchRunner {
    workflow: Arc<Workflow>,
    workers: usize,
    file_timeout: Option<Duration>,
}

impl BatchRunner {
    pub fn new(workflow: Arc<Workflow>, workers: usize) -> Self {
        Self {
            workflow,
            workers: workers.max(1),
            file_timeout: None,
        }
    }

    /// Runner with the worker count and file budget from configuration
    pub fn from_config(workflow: Arc<Workflow>, config: &Config) -> Self {
        Self::new(workflow, config.performance.parallel_workers)
            .with_file_timeout(config.file_timeout())
    }

    pub fn with_file_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.file_timeout = timeout;
        self
    }

    /// Process `inputs`, writing into `output_dir`
    pub async fn run(
        &self,
        inputs: Vec<PathBuf>,
        output_dir: &Path,
        observer: Arc<dyn StageObserver>,
        cancel: CancellationToken,
    ) -> BatchReport {
        let start = Instant::now();
        info!(
            "Processing {} files with {} workers",
            inputs.len(),
            self.workers
        );

        let collisions = output_collisions(&inputs);
        let mut pending = inputs.into_iter().enumerate();
        // The input that met a cancelled token is consumed by the check
        let mut refused: Option<PathBuf> = None;
        let results: Vec<ProcessingResult> = stream::iter(pending.by_ref())
            .take_while(|(_, input)| {
                let open = !cancel.is_cancelled();
                if !open {
                    refused = Some(input.clone());
                }
                async move { open }
            })
            .map(|(index, input)| {
                self.run_one(
                    input,
                    output_dir.to_path_buf(),
                    Arc::clone(&observer),
                    collisions[index].clone(),
                )
            })
            .buffered(self.workers)
            .collect()
            .await;

        let not_attempted: Vec<PathBuf> = refused
            .into_iter()
            .chain(pending.map(|(_, input)| input))
            .collect();
        if !not_attempted.is_empty() {
            warn!(
                "Run cancelled, {} files not attempted",
                not_attempted.len()
            );
        }

        let report = BatchReport::new(results, not_attempted, start.elapsed());
        info!(
            "Batch finished in {:.1}s: {} succeeded, {} failed",
            report.elapsed.as_secs_f64(),
            report.succeeded,
            report.failed
        );
        report
    }

    async fn run_one(
        &self,
        input: PathBuf,
        output_dir: PathBuf,
        observer: Arc<dyn StageObserver>,
        claimed_by: Option<PathBuf>,
    ) -> ProcessingResult {
        if let Some(first) = claimed_by {
            return output_collision(&input, &first, observer.as_ref());
        }

        let tracker = Arc::new(StageTracker {
            inner: observer,
            last: Mutex::new(None),
        });
        let file_token = CancellationToken::new();
        let workflow = Arc::clone(&self.workflow);
        let token = file_token.clone();
        let task_input = input.clone();
        let task_tracker = Arc::clone(&tracker);
        let mut handle = tokio::task::spawn_blocking(move || {
            workflow.process_file_cancellable(
                &task_input,
                &output_dir,
                task_tracker.as_ref(),
                &token,
            )
        });

        let Some(budget) = self.file_timeout else {
            return handle
                .await
                .unwrap_or_else(|e| lost_worker(&input, tracker.last_stage(), e));
        };

        match tokio::time::timeout(budget, &mut handle).await {
            Ok(joined) => {
                joined.unwrap_or_else(|e| lost_worker(&input, tracker.last_stage(), e))
            }
            Err(_) => {
                warn!(
                    "{}: exceeded {:.1}s budget, cancelling",
                    input.display(),
                    budget.as_secs_f64()
                );
                file_token.cancel();
                let reason = format!("exceeded {:.1}s per-file budget", budget.as_secs_f64());
                handle
                    .await
                    .unwrap_or_else(|e| lost_worker(&input, tracker.last_stage(), e))
                    .into_timeout(&reason)
            }
        }
    }
}

/// Remembers the last stage a file reached before passing events on
struct StageTracker {
    inner: Arc<dyn StageObserver>,
    last: Mutex<Option<Stage>>,
}

impl StageTracker {
    fn last_stage(&self) -> Option<Stage> {
        self.last.lock().ok().and_then(|last| *last)
    }
}

impl StageObserver for StageTracker {
    fn on_stage(&self, event: &StageEvent) {
        if let Ok(mut last) = self.last.lock() {
            *last = Some(event.stage);
        }
        self.inner.on_stage(event);
    }
}

fn failed_result(input: &Path, detail: FailureDetail) -> ProcessingResult {
    ProcessingResult {
        file_id: file_id(input),
        input: input.to_path_buf(),
        success: false,
        stage: Some(detail.stage),
        outputs: Vec::new(),
        error: Some(detail),
        summary: FileSummary::default(),
    }
}

/// Result for a file whose worker died outside the pipeline's own recovery,
/// attributed to the last stage it reported
fn lost_worker(input: &Path, last_stage: Option<Stage>, error: JoinError) -> ProcessingResult {
    let stage = last_stage.unwrap_or(Stage::Load);
    warn!("{}: worker lost during {}: {}", input.display(), stage, error);
    failed_result(
        input,
        FailureDetail {
            kind: stage_failure_kind(stage),
            stage,
            messages: vec![Error::processing_interrupted(error.to_string()).to_string()],
        },
    )
}

/// Result for an input whose outputs an earlier input already claimed
fn output_collision(
    input: &Path,
    first: &Path,
    observer: &dyn StageObserver,
) -> ProcessingResult {
    let id = file_id(input);
    let message = Error::write_failed(
        base_name(input),
        format!("outputs already claimed by {}", first.display()),
        None,
    )
    .to_string();
    warn!("{}: {}", id, message);

    for status in [StageStatus::Started, StageStatus::Failed] {
        observer.on_stage(&StageEvent {
            file_id: id.clone(),
            stage: Stage::Write,
            status,
            message: (status == StageStatus::Failed).then(|| message.clone()),
        });
    }

    failed_result(
        input,
        FailureDetail {
            kind: FailureKind::WriteFailed,
            stage: Stage::Write,
            messages: vec![message],
        },
    )
}
