//! Core data models for logger records and depth observations
//!
//! Records flow through the pipeline as immutable values: loaders produce
//! [`RawRecord`]s, the depth extractor turns the selected kind into
//! [`DepthObservation`]s and the geo-referencer pairs those with positions
//! to give [`GeoReferencedObservation`]s.

pub mod metadata;

use crate::constants::OUTPUT_TIME_FORMAT;
use crate::{Error, Result};
use chrono::DateTime;
use serde::Serialize;
use std::fmt;

/// Real-world clock sources, in order of preference for building a time base
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum TimeSource {
    /// NMEA2000 SystemTime (PGN 126992)
    SystemTime,
    /// NMEA2000 GNSS position data (PGN 129029)
    Gnss,
    /// NMEA0183 ZDA
    Zda,
    /// NMEA0183 RMC
    Rmc,
}

impl TimeSource {
    /// All sources, most preferred first
    pub const PREFERENCE: [TimeSource; 4] = [
        TimeSource::SystemTime,
        TimeSource::Gnss,
        TimeSource::Zda,
        TimeSource::Rmc,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TimeSource::SystemTime => "SystemTime",
            TimeSource::Gnss => "GNSS",
            TimeSource::Zda => "ZDA",
            TimeSource::Rmc => "RMC",
        }
    }
}

impl fmt::Display for TimeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Depth message kinds an operator can select
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum DepthMessageKind {
    /// NMEA2000 Water Depth (PGN 128267)
    Nmea2000Depth,
    /// NMEA0183 depth below transducer
    Dbt,
    /// NMEA0183 depth with transducer offset
    Dpt,
}

impl DepthMessageKind {
    pub const ALL: [DepthMessageKind; 3] = [
        DepthMessageKind::Nmea2000Depth,
        DepthMessageKind::Dbt,
        DepthMessageKind::Dpt,
    ];

    /// Short message name as it appears in packet statistics
    pub fn name(&self) -> &'static str {
        match self {
            DepthMessageKind::Nmea2000Depth => "Depth",
            DepthMessageKind::Dbt => "DBT",
            DepthMessageKind::Dpt => "DPT",
        }
    }

    /// Operator-facing label
    pub fn label(&self) -> &'static str {
        match self {
            DepthMessageKind::Nmea2000Depth => "Depth (NMEA2000)",
            DepthMessageKind::Dbt => "DBT (NMEA0183)",
            DepthMessageKind::Dpt => "DPT (NMEA0183)",
        }
    }

    /// Operator labels of every kind, for help text and error messages
    pub fn labels() -> Vec<&'static str> {
        Self::ALL.iter().map(|kind| kind.label()).collect()
    }

    /// Resolve a kind from its label or short name (case-insensitive)
    pub fn from_name(name: &str) -> Result<Self> {
        let wanted = name.trim();
        Self::ALL
            .into_iter()
            .find(|kind| {
                kind.label().eq_ignore_ascii_case(wanted) || kind.name().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| Error::unknown_depth_source(wanted, &Self::labels()))
    }
}

impl fmt::Display for DepthMessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoded depth message
#[derive(Debug, Clone, PartialEq)]
pub struct DepthMessage {
    pub kind: DepthMessageKind,
    /// Depth below the transducer, metres
    pub depth_m: f64,
    /// Instrument offset to the water surface (positive) or keel (negative)
    pub offset_m: Option<f64>,
}

/// Auxiliary environmental quantities carried alongside depth
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum AuxiliaryKind {
    WaterTemperature,
    AirTemperature,
    Humidity,
    Pressure,
}

impl AuxiliaryKind {
    /// Column/property name in outputs
    pub fn name(&self) -> &'static str {
        match self {
            AuxiliaryKind::WaterTemperature => "waterTemperature",
            AuxiliaryKind::AirTemperature => "airTemperature",
            AuxiliaryKind::Humidity => "humidity",
            AuxiliaryKind::Pressure => "pressure",
        }
    }

    pub fn units(&self) -> &'static str {
        match self {
            AuxiliaryKind::WaterTemperature | AuxiliaryKind::AirTemperature => "degC",
            AuxiliaryKind::Humidity => "percent",
            AuxiliaryKind::Pressure => "mbar",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuxiliaryMessage {
    pub kind: AuxiliaryKind,
    pub value: f64,
}

/// What a decoded record carries
#[derive(Debug, Clone, PartialEq)]
pub enum RecordPayload {
    /// WGS84 position, degrees
    PositionFix { latitude: f64, longitude: f64 },
    Depth(DepthMessage),
    Auxiliary(AuxiliaryMessage),
    /// Real-world time carried by the message, seconds since the Unix epoch
    TimeReference {
        source: TimeSource,
        epoch_seconds: f64,
    },
    /// Decoded, but of no use to the pipeline
    Unrecognized,
}

/// One decoded message from a logger file
///
/// `elapsed_ms` is the logger's own monotonic clock (after wrap correction)
/// and is the only timestamp a record carries until a time base converts it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub elapsed_ms: f64,
    pub name: String,
    pub payload: RecordPayload,
}

impl RawRecord {
    pub fn new(elapsed_ms: f64, name: impl Into<String>, payload: RecordPayload) -> Self {
        Self {
            elapsed_ms,
            name: name.into(),
            payload,
        }
    }

    /// Depth message kind carried by this record, if any
    pub fn depth_kind(&self) -> Option<DepthMessageKind> {
        match &self.payload {
            RecordPayload::Depth(message) => Some(message.kind),
            _ => None,
        }
    }
}

/// Vertical reference a reported depth is measured from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DepthReference {
    Transducer,
    WaterSurface,
    Keel,
}

impl DepthReference {
    pub fn name(&self) -> &'static str {
        match self {
            DepthReference::Transducer => "Transducer",
            DepthReference::WaterSurface => "WaterSurface",
            DepthReference::Keel => "Keel",
        }
    }
}

/// A depth sample with a real-world timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct DepthObservation {
    /// Seconds since the Unix epoch
    pub timestamp: f64,
    /// Finite and non-negative
    pub depth_m: f64,
    pub source: DepthMessageKind,
    pub reference: DepthReference,
}

/// A position fix with a real-world timestamp
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedFix {
    pub timestamp: f64,
    pub latitude: f64,
    pub longitude: f64,
}

/// How a depth obtained its position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FixMethod {
    /// A fix shares the depth's timestamp
    Exact,
    /// Linear interpolation between the bracketing fixes
    Interpolated,
    /// Only one side had a fix; its position was used as-is
    Nearest,
}

impl FixMethod {
    pub fn name(&self) -> &'static str {
        match self {
            FixMethod::Exact => "exact",
            FixMethod::Interpolated => "interpolated",
            FixMethod::Nearest => "nearest",
        }
    }
}

/// A depth observation paired with a position
#[derive(Debug, Clone, PartialEq)]
pub struct GeoReferencedObservation {
    pub observation: DepthObservation,
    pub latitude: f64,
    pub longitude: f64,
    /// Time to the nearest fix used, seconds; never more than the gap limit
    pub delta_s: f64,
    pub method: FixMethod,
}

/// Auxiliary reading with a real-world timestamp
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AuxiliaryReading {
    pub timestamp: f64,
    pub kind: AuxiliaryKind,
    pub value: f64,
}

/// Logger identification reported by a loader
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoggerIdentity {
    pub unique_id: Option<String>,
    pub logger_name: Option<String>,
    pub logger_version: Option<String>,
    pub ship_name: Option<String>,
}

/// Reasons a single file can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FailureKind {
    DecodeError,
    NoMatchingDepthSource,
    InsufficientPositionCoverage,
    MissingRequiredMetadata,
    WriteFailed,
    ExternalTimeout,
}

impl FailureKind {
    pub fn name(&self) -> &'static str {
        match self {
            FailureKind::DecodeError => "DecodeError",
            FailureKind::NoMatchingDepthSource => "NoMatchingDepthSource",
            FailureKind::InsufficientPositionCoverage => "InsufficientPositionCoverage",
            FailureKind::MissingRequiredMetadata => "MissingRequiredMetadata",
            FailureKind::WriteFailed => "WriteFailed",
            FailureKind::ExternalTimeout => "ExternalTimeout",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Format epoch seconds as an ISO-8601 UTC string with millisecond precision
pub fn format_timestamp(epoch_seconds: f64) -> String {
    let millis = (epoch_seconds * 1000.0).round() as i64;
    match DateTime::from_timestamp_millis(millis) {
        Some(datetime) => datetime.format(OUTPUT_TIME_FORMAT).to_string(),
        None => format!("{:.3}", epoch_seconds),
    }
}
