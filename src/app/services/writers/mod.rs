//! Output writers
//!
//! A [`WriterKind`] names one of the supported output encodings and builds
//! the [`OutputWriter`] that serialises a [`MergedDataset`]. Outputs are
//! named `<base_name><suffix>` in the output directory; the DCDB CSV encoding
//! adds a `<base_name>.json` metadata companion.
//!
//! Every writer renders its files fully in memory and places them through
//! [`atomic`], so a failure leaves nothing behind and reruns over the same
//! dataset produce byte-identical files.
//!
//! ## Encodings
//!
//! - [`geojson`] - "DCDB GeoJSON": metadata document with point features
//! - [`dcdb_csv`] - "DCDB CSV": fixed-column CSV plus metadata JSON
//! - [`plain_csv`] - "Plain CSV": observations only, no metadata needed

pub mod atomic;
pub mod dcdb_csv;
pub mod geojson;
pub mod plain_csv;

#[cfg(test)]
pub mod tests;

use crate::app::services::metadata_merger::{MergedDataset, MetadataRequirement};
use crate::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};

/// Serialises a merged dataset into one or more files
pub trait OutputWriter: Send + Sync {
    /// Write the dataset as `output_dir/<base_name><suffix>` (plus companions)
    fn write(&self, dataset: &MergedDataset, output_dir: &Path, base_name: &str)
    -> Result<WriteSummary>;

    /// Paths `write` would produce, used for cleanup and dry runs
    fn output_paths(&self, output_dir: &Path, base_name: &str) -> Vec<PathBuf>;
}

/// What a writer produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub paths: Vec<PathBuf>,
    pub observations: usize,
}

/// Supported output encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriterKind {
    DcdbGeoJson,
    DcdbCsv,
    PlainCsv,
}

impl WriterKind {
    pub const ALL: [WriterKind; 3] = [
        WriterKind::DcdbGeoJson,
        WriterKind::DcdbCsv,
        WriterKind::PlainCsv,
    ];

    /// Operator-facing label
    pub fn label(&self) -> &'static str {
        match self {
            WriterKind::DcdbGeoJson => "DCDB GeoJSON",
            WriterKind::DcdbCsv => "DCDB CSV",
            WriterKind::PlainCsv => "Plain CSV",
        }
    }

    /// Command-line identifier
    pub fn id(&self) -> &'static str {
        match self {
            WriterKind::DcdbGeoJson => "geojson",
            WriterKind::DcdbCsv => "dcdb-csv",
            WriterKind::PlainCsv => "csv",
        }
    }

    /// Suffix of the primary output file
    pub fn suffix(&self) -> &'static str {
        match self {
            WriterKind::DcdbGeoJson => geojson::SUFFIX,
            WriterKind::DcdbCsv => dcdb_csv::SUFFIX,
            WriterKind::PlainCsv => plain_csv::SUFFIX,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            WriterKind::DcdbGeoJson => "GeoJSON FeatureCollection with submission metadata",
            WriterKind::DcdbCsv => "Fixed-column CSV with a JSON metadata companion",
            WriterKind::PlainCsv => "CSV of geo-referenced depths, no metadata",
        }
    }

    /// Whether the writer needs core or embedded metadata
    pub fn requirement(&self) -> MetadataRequirement {
        match self {
            WriterKind::DcdbGeoJson | WriterKind::DcdbCsv => MetadataRequirement::Required {
                writer: self.label(),
            },
            WriterKind::PlainCsv => MetadataRequirement::NotRequired,
        }
    }

    /// Labels of every registered writer
    pub fn library() -> Vec<&'static str> {
        Self::ALL.iter().map(|kind| kind.label()).collect()
    }

    /// Resolve a writer from its label or identifier (case-insensitive)
    pub fn from_name(name: &str) -> Result<Self> {
        let wanted = name.trim();
        Self::ALL
            .into_iter()
            .find(|kind| {
                kind.label().eq_ignore_ascii_case(wanted) || kind.id().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| Error::unknown_writer(wanted, &Self::library()))
    }

    /// Instantiate the writer
    pub fn writer(&self) -> Box<dyn OutputWriter> {
        match self {
            WriterKind::DcdbGeoJson => Box::new(geojson::DcdbGeoJsonWriter),
            WriterKind::DcdbCsv => Box::new(dcdb_csv::DcdbCsvWriter),
            WriterKind::PlainCsv => Box::new(plain_csv::PlainCsvWriter),
        }
    }
}

impl fmt::Display for WriterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Output base name for an input file: its name without the final suffix
pub fn base_name(input: &Path) -> String {
    input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string())
}

/// Primary output path for a base name
pub(crate) fn output_path(output_dir: &Path, base_name: &str, suffix: &str) -> PathBuf {
    output_dir.join(format!("{}{}", base_name, suffix))
}
