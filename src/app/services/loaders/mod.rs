//! Loader registry and logger file decoders
//!
//! Each supported logger format has a [`Loader`] that turns a file into a
//! [`DecodedFile`]: the ordered stream of [`RawRecord`]s, the time base that
//! maps the logger's elapsed clock to real time, packet statistics and any
//! identity or metadata the logger embedded in the file.
//!
//! ## Architecture
//!
//! - [`binary`] - little-endian cursor shared by the binary formats
//! - [`nmea0183`] - sentence parsing and checksum verification
//! - [`nmea2000`] - PGN payload decoding and CAN id translation
//! - [`timebase`] - elapsed-to-real time interpolation
//! - [`stats`] - observed/fault counters per message name
//! - [`ydvr`], [`wibl`], [`teamsurv`], [`generic_ascii`] - file formats
//!
//! ## Usage
//!
//! ```rust,no_run
//! use csb_processor::app::services::loaders::LoaderKind;
//! use csb_processor::config::DecodingConfig;
//!
//! # fn example() -> csb_processor::Result<()> {
//! let loader = LoaderKind::from_name("WIBL")?.loader(&DecodingConfig::default());
//! let decoded = loader.decode(std::path::Path::new("00001.wibl"))?;
//!
//! println!("{} records, time from {}", decoded.records.len(), decoded.timebase.source());
//! # Ok(())
//! # }
//! ```

pub mod binary;
pub mod generic_ascii;
pub mod nmea0183;
pub mod nmea2000;
pub mod stats;
pub mod teamsurv;
pub mod timebase;
pub mod wibl;
pub mod ydvr;

#[cfg(test)]
pub mod tests;

pub use stats::{FaultKind, PacketStats};
pub use timebase::Timebase;

use crate::app::models::{LoggerIdentity, RawRecord, RecordPayload};
use crate::config::DecodingConfig;
use crate::{Error, Result};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

/// Reason given when a file carries no real-world clock
pub const NO_TIME_SOURCE: &str = "no usable time source (need SystemTime, GNSS, ZDA or RMC)";

/// A format-specific decoder for logger files
pub trait Loader: Send + Sync {
    /// Registry label
    fn name(&self) -> &'static str;

    /// Default input file suffix, including the dot
    fn suffix(&self) -> &'static str;

    /// Decode file contents already read into memory
    fn decode_bytes(&self, file_id: &str, bytes: &[u8]) -> Result<DecodedFile>;

    /// Read and decode a file
    fn decode(&self, path: &Path) -> Result<DecodedFile> {
        let file_id = file_id(path);
        let bytes = std::fs::read(path)
            .map_err(|e| Error::decode(&file_id, format!("cannot read file: {}", e)))?;
        debug!("Read {} bytes from {}", bytes.len(), path.display());
        self.decode_bytes(&file_id, &bytes)
    }
}

/// Identifier used for a file in reports and events
pub fn file_id(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Supported logger formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoaderKind {
    Ydvr,
    Wibl,
    TeamSurv,
    GenericAscii,
}

impl LoaderKind {
    pub const ALL: [LoaderKind; 4] = [
        LoaderKind::Ydvr,
        LoaderKind::Wibl,
        LoaderKind::TeamSurv,
        LoaderKind::GenericAscii,
    ];

    /// Operator-facing label
    pub fn label(&self) -> &'static str {
        match self {
            LoaderKind::Ydvr => "YDVR",
            LoaderKind::Wibl => "WIBL",
            LoaderKind::TeamSurv => "TeamSurv",
            LoaderKind::GenericAscii => "Generic ASCII",
        }
    }

    /// Command-line identifier
    pub fn id(&self) -> &'static str {
        match self {
            LoaderKind::Ydvr => "ydvr",
            LoaderKind::Wibl => "wibl",
            LoaderKind::TeamSurv => "teamsurv",
            LoaderKind::GenericAscii => "generic-ascii",
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            LoaderKind::Ydvr => ydvr::SUFFIX,
            LoaderKind::Wibl => wibl::SUFFIX,
            LoaderKind::TeamSurv => teamsurv::SUFFIX,
            LoaderKind::GenericAscii => generic_ascii::SUFFIX,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            LoaderKind::Ydvr => "Yacht Devices YDVR-04 NMEA2000 recording",
            LoaderKind::Wibl => "WIBL logger binary packet file",
            LoaderKind::TeamSurv => "TeamSurv NMEA0183 text log without elapsed times",
            LoaderKind::GenericAscii => "Text log of '<elapsed ms> <NMEA0183 sentence>' lines",
        }
    }

    /// Labels of every registered loader
    pub fn library() -> Vec<&'static str> {
        Self::ALL.iter().map(|kind| kind.label()).collect()
    }

    /// Resolve a loader from its label or identifier (case-insensitive)
    pub fn from_name(name: &str) -> Result<Self> {
        let wanted = name.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.label().eq_ignore_ascii_case(wanted) || kind.id().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::unknown_loader(wanted, &Self::library()))
    }

    /// Instantiate the loader with decoding tolerances
    pub fn loader(&self, decoding: &DecodingConfig) -> Box<dyn Loader> {
        match self {
            LoaderKind::Ydvr => Box::new(ydvr::YdvrLoader::new(decoding.fault_limit)),
            LoaderKind::Wibl => Box::new(wibl::WiblLoader::new(decoding.fault_limit)),
            LoaderKind::TeamSurv => Box::new(teamsurv::TeamSurvLoader::new(decoding.fault_limit)),
            LoaderKind::GenericAscii => Box::new(generic_ascii::GenericAsciiLoader::new(
                decoding.fault_limit,
                decoding.ascii_elapsed_wrap,
            )),
        }
    }
}

impl fmt::Display for LoaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One message decoded from a frame, sentence or packet
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMessage {
    pub name: String,
    /// Possibly empty when the message held no usable values
    pub payloads: Vec<RecordPayload>,
}

/// A message that could not be decoded
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeFault {
    pub name: String,
    pub kind: FaultKind,
    pub detail: String,
}

impl DecodeFault {
    pub fn new(name: impl Into<String>, kind: FaultKind, detail: impl fmt::Display) -> Self {
        Self {
            name: name.into(),
            kind,
            detail: detail.to_string(),
        }
    }
}

/// Shorten raw input for fault notes
pub fn note_excerpt(raw: &str) -> String {
    const LIMIT: usize = 40;
    if raw.chars().count() <= LIMIT {
        raw.to_string()
    } else {
        let head: String = raw.chars().take(LIMIT).collect();
        format!("{}...", head)
    }
}

/// Records, statistics and identity accumulated while reading a file
#[derive(Debug, Clone, Default)]
pub struct RecordStream {
    pub records: Vec<RawRecord>,
    pub stats: PacketStats,
    pub identity: LoggerIdentity,
    pub embedded_metadata: Option<Value>,
    pub metadata_defaults: Option<Value>,
}

impl RecordStream {
    pub fn new(fault_limit: usize) -> Self {
        Self {
            stats: PacketStats::new(fault_limit),
            ..Default::default()
        }
    }

    /// Append a decoded message at `elapsed_ms`, or count its fault
    pub fn push_message(
        &mut self,
        elapsed_ms: f64,
        message: std::result::Result<DecodedMessage, DecodeFault>,
    ) {
        match message {
            Ok(message) => {
                self.stats.observe(&message.name);
                for payload in message.payloads {
                    self.records
                        .push(RawRecord::new(elapsed_ms, message.name.clone(), payload));
                }
            }
            Err(fault) => {
                self.stats.observe(&fault.name);
                self.stats.fault(&fault.name, fault.kind, &fault.detail);
            }
        }
    }

    /// Establish the time base and seal the stream
    pub fn finish(self, file_id: &str) -> Result<DecodedFile> {
        if self.records.is_empty() {
            return Err(Error::decode(
                file_id,
                format!(
                    "no records could be decoded ({} faults)",
                    self.stats.total_faults()
                ),
            ));
        }

        let timebase = Timebase::from_records(&self.records)
            .ok_or_else(|| Error::decode(file_id, NO_TIME_SOURCE))?;

        info!(
            "Decoded {}: {} records, {} faults, time from {} ({} points)",
            file_id,
            self.records.len(),
            self.stats.total_faults(),
            timebase.source(),
            timebase.len()
        );

        Ok(DecodedFile {
            file_id: file_id.to_string(),
            records: self.records,
            timebase,
            stats: self.stats,
            identity: self.identity,
            embedded_metadata: self.embedded_metadata,
            metadata_defaults: self.metadata_defaults,
        })
    }
}

/// Everything a loader extracted from one file
#[derive(Debug, Clone)]
pub struct DecodedFile {
    pub file_id: String,
    /// File order, malformed records removed
    pub records: Vec<RawRecord>,
    pub timebase: Timebase,
    pub stats: PacketStats,
    pub identity: LoggerIdentity,
    /// Metadata document carried in the file itself
    pub embedded_metadata: Option<Value>,
    /// Values for metadata fields still unset after merging
    pub metadata_defaults: Option<Value>,
}

impl DecodedFile {
    /// Real time of a record's elapsed stamp
    pub fn epoch(&self, elapsed_ms: f64) -> f64 {
        self.timebase.to_epoch(elapsed_ms)
    }
}
