//! CSB Processor Library
//!
//! A Rust library for converting raw marine logger recordings into
//! geo-referenced, metadata-annotated depth observations suitable for
//! submission to a crowd-sourced bathymetry archive.
//!
//! This library provides tools for:
//! - Decoding logger files (YDVR, WIBL, TeamSurv, generic ASCII) into a
//!   common stream of timed NMEA0183/NMEA2000 records
//! - Extracting depth observations from an operator-selected message kind
//! - Geo-referencing depths against the logger's position fixes
//! - Merging submission metadata and writing DCDB GeoJSON/CSV outputs
//! - Running the whole pipeline per file, in parallel across a folder,
//!   with per-stage progress notifications

pub mod config;
pub mod constants;

// Core application modules
pub mod app {
    pub mod models;
    pub mod services {
        pub mod depth_extractor;
        pub mod georeferencer;
        pub mod loaders;
        pub mod metadata_merger;
        pub mod workflow;
        pub mod writers;
    }
}

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use app::models::{
    DepthMessageKind, DepthObservation, FailureKind, GeoReferencedObservation, RawRecord,
    RecordPayload,
};
pub use app::services::workflow::{ProcessingResult, Stage, StageEvent, StageStatus, Workflow};
pub use config::Config;

/// Result type alias for the CSB processor
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for CSB processing operations
///
/// The first six variants are the file-scoped failures a workflow run can
/// report; the remainder are crate-level problems (configuration, I/O outside
/// a single file, lookups in the registries).
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Input could not be decoded by the selected loader
    #[error("Decode error in file '{file}': {reason}")]
    Decode { file: String, reason: String },

    /// The selected depth message kind does not occur in the file
    #[error(
        "Selected depth message kind {selected} not present in file; found {}",
        describe_found(.found)
    )]
    NoMatchingDepthSource { selected: String, found: Vec<String> },

    /// Too many depths lacked a position fix within the allowed gap
    #[error(
        "Insufficient position coverage: {dropped} of {total} depth observations had no fix within {max_gap_seconds}s (allowed fraction {max_drop_fraction})"
    )]
    InsufficientPositionCoverage {
        dropped: usize,
        total: usize,
        max_gap_seconds: f64,
        max_drop_fraction: f64,
    },

    /// The writer needs metadata and none was supplied
    #[error("Writer '{writer}' requires metadata but none was supplied or embedded in the file")]
    MissingRequiredMetadata { writer: String },

    /// Output could not be written; nothing was left behind
    #[error("Failed to write output '{path}': {message}")]
    WriteFailed {
        path: String,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// The file exceeded its processing budget
    #[error("Processing budget exceeded: {reason}")]
    ExternalTimeout { reason: String },

    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Loader label not present in the registry
    #[error("Unknown loader '{name}'. Available loaders: {available}")]
    UnknownLoader { name: String, available: String },

    /// Writer label not present in the registry
    #[error("Unknown writer '{name}'. Available writers: {available}")]
    UnknownWriter { name: String, available: String },

    /// Depth message label not recognised
    #[error("Unknown depth message kind '{name}'. Available kinds: {available}")]
    UnknownDepthSource { name: String, available: String },

    /// Metadata document is not usable
    #[error("Metadata format error: {message}")]
    MetadataFormat { message: String },

    /// JSON (de)serialisation failed
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// CSV serialisation failed
    #[error("CSV error: {message}")]
    Csv {
        message: String,
        #[source]
        source: csv::Error,
    },

    /// Processing interrupted
    #[error("Processing interrupted: {reason}")]
    ProcessingInterrupted { reason: String },
}

fn describe_found(found: &[String]) -> String {
    if found.is_empty() {
        "no depth messages".to_string()
    } else {
        found.join(", ")
    }
}

impl Error {
    /// Create a decode error for a file
    pub fn decode(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            file: file.into(),
            reason: reason.into(),
        }
    }

    /// Create a missing depth source error
    pub fn no_matching_depth_source(selected: impl Into<String>, found: Vec<String>) -> Self {
        Self::NoMatchingDepthSource {
            selected: selected.into(),
            found,
        }
    }

    /// Create a position coverage error
    pub fn insufficient_position_coverage(
        dropped: usize,
        total: usize,
        max_gap_seconds: f64,
        max_drop_fraction: f64,
    ) -> Self {
        Self::InsufficientPositionCoverage {
            dropped,
            total,
            max_gap_seconds,
            max_drop_fraction,
        }
    }

    /// Create a missing metadata error
    pub fn missing_required_metadata(writer: impl Into<String>) -> Self {
        Self::MissingRequiredMetadata {
            writer: writer.into(),
        }
    }

    /// Create a write failure with an optional underlying I/O error
    pub fn write_failed(
        path: impl Into<String>,
        message: impl Into<String>,
        source: Option<std::io::Error>,
    ) -> Self {
        Self::WriteFailed {
            path: path.into(),
            message: message.into(),
            source,
        }
    }

    /// Create a timeout error
    pub fn external_timeout(reason: impl Into<String>) -> Self {
        Self::ExternalTimeout {
            reason: reason.into(),
        }
    }

    /// Create an I/O error with context
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an unknown loader error
    pub fn unknown_loader(name: impl Into<String>, available: &[&str]) -> Self {
        Self::UnknownLoader {
            name: name.into(),
            available: available.join(", "),
        }
    }

    /// Create an unknown writer error
    pub fn unknown_writer(name: impl Into<String>, available: &[&str]) -> Self {
        Self::UnknownWriter {
            name: name.into(),
            available: available.join(", "),
        }
    }

    /// Create an unknown depth source error
    pub fn unknown_depth_source(name: impl Into<String>, available: &[&str]) -> Self {
        Self::UnknownDepthSource {
            name: name.into(),
            available: available.join(", "),
        }
    }

    /// Create a metadata format error
    pub fn metadata_format(message: impl Into<String>) -> Self {
        Self::MetadataFormat {
            message: message.into(),
        }
    }

    /// Create a JSON error with context
    pub fn json(message: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            message: message.into(),
            source,
        }
    }

    /// Create a CSV error with context
    pub fn csv(message: impl Into<String>, source: csv::Error) -> Self {
        Self::Csv {
            message: message.into(),
            source,
        }
    }

    /// Create a processing interrupted error
    pub fn processing_interrupted(reason: impl Into<String>) -> Self {
        Self::ProcessingInterrupted {
            reason: reason.into(),
        }
    }

    /// File-scoped failure kind for this error, if it is one
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Decode { .. } => Some(FailureKind::DecodeError),
            Self::NoMatchingDepthSource { .. } => Some(FailureKind::NoMatchingDepthSource),
            Self::InsufficientPositionCoverage { .. } => {
                Some(FailureKind::InsufficientPositionCoverage)
            }
            Self::MissingRequiredMetadata { .. } => Some(FailureKind::MissingRequiredMetadata),
            Self::WriteFailed { .. } => Some(FailureKind::WriteFailed),
            Self::ExternalTimeout { .. } => Some(FailureKind::ExternalTimeout),
            _ => None,
        }
    }

    /// Human-readable messages for this error and its source chain
    pub fn messages(&self) -> Vec<String> {
        let mut messages = vec![self.to_string()];
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            messages.push(cause.to_string());
            source = cause.source();
        }
        messages
    }
}

// Automatic conversions from common error types
impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: "I/O operation failed".to_string(),
            source: error,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::Json {
            message: "JSON processing failed".to_string(),
            source: error,
        }
    }
}

impl From<csv::Error> for Error {
    fn from(error: csv::Error) -> Self {
        Self::Csv {
            message: "CSV writing failed".to_string(),
            source: error,
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Self::Configuration {
            message: format!("Invalid configuration file: {}", error),
        }
    }
}
