//! Stage notifications
//!
//! The orchestrator reports each stage it attempts to a [`StageObserver`]:
//! once when the stage starts and once when it finishes. Observers are shared
//! across worker threads, so they must be `Send + Sync`; any
//! `Fn(&StageEvent) + Send + Sync` closure qualifies.

use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Stage {
    Load,
    ExtractDepth,
    GeoReference,
    MergeMetadata,
    Write,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Load,
        Stage::ExtractDepth,
        Stage::GeoReference,
        Stage::MergeMetadata,
        Stage::Write,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Load => "load",
            Stage::ExtractDepth => "extract depth",
            Stage::GeoReference => "georeference",
            Stage::MergeMetadata => "merge metadata",
            Stage::Write => "write",
        }
    }

    /// Position in the pipeline, starting at 1
    pub fn number(&self) -> usize {
        *self as usize + 1
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StageStatus {
    Started,
    Succeeded,
    Failed,
}

/// One stage transition for one file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageEvent {
    pub file_id: String,
    pub stage: Stage,
    pub status: StageStatus,
    /// Outcome detail for finished stages
    pub message: Option<String>,
}

/// Receives stage transitions from the orchestrator
pub trait StageObserver: Send + Sync {
    fn on_stage(&self, event: &StageEvent);
}

impl<F> StageObserver for F
where
    F: Fn(&StageEvent) + Send + Sync,
{
    fn on_stage(&self, event: &StageEvent) {
        self(event)
    }
}

/// Ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl StageObserver for NoopObserver {
    fn on_stage(&self, _event: &StageEvent) {}
}

/// Reports events through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingObserver;

impl StageObserver for LoggingObserver {
    fn on_stage(&self, event: &StageEvent) {
        let message = event.message.as_deref().unwrap_or("");
        match event.status {
            StageStatus::Started => debug!("{}: {} started", event.file_id, event.stage),
            StageStatus::Succeeded => {
                info!("{}: {} done {}", event.file_id, event.stage, message)
            }
            StageStatus::Failed => {
                warn!("{}: {} failed: {}", event.file_id, event.stage, message)
            }
        }
    }
}
