//! Metadata merging
//!
//! Builds the dataset a writer serialises: geo-referenced observations with
//! any auxiliary readings attached, and the submission metadata document.
//! The document is layered, later layers winning:
//!
//! 1. the mandatory CSB template, with `NOTSET` placeholders
//! 2. identity reported by the loader
//! 3. metadata embedded in the logger file
//! 4. the operator's core metadata
//!
//! Loader defaults then fill whatever is still unset, and a timestamp
//! processing action is appended. Nothing here validates the document.

#[cfg(test)]
pub mod tests;

use crate::app::models::metadata::{
    CoreMetadata, add_processing_action, apply_identity, field, fill_unset, mandatory_template,
    merge_documents,
};
use crate::app::models::{
    AuxiliaryKind, AuxiliaryReading, GeoReferencedObservation, RecordPayload, format_timestamp,
};
use crate::app::services::loaders::DecodedFile;
use crate::constants::{TIMESTAMP_METHOD, TIMESTAMP_PROCESSING_TYPE};
use crate::{Error, Result};
use serde_json::{Value, json};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Whether a writer needs a metadata document to produce its output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataRequirement {
    /// The named writer cannot run without core or embedded metadata
    Required { writer: &'static str },
    NotRequired,
}

/// A geo-referenced observation with the auxiliary values near it
#[derive(Debug, Clone, PartialEq)]
pub struct MergedObservation {
    pub geo: GeoReferencedObservation,
    pub auxiliary: BTreeMap<AuxiliaryKind, f64>,
}

/// Everything a writer needs for one file
#[derive(Debug, Clone, PartialEq)]
pub struct MergedDataset {
    pub file_id: String,
    pub metadata: Value,
    /// Ordered by timestamp
    pub observations: Vec<MergedObservation>,
    /// Auxiliary kinds attached to at least one observation
    pub auxiliary_kinds: Vec<AuxiliaryKind>,
}

impl MergedDataset {
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Field of the metadata document as a string, if set
    pub fn metadata_str(&self, path: &[&str]) -> Option<&str> {
        field(&self.metadata, path).and_then(Value::as_str)
    }
}

/// Auxiliary readings in a decoded file, placed in real time
pub fn auxiliary_readings(decoded: &DecodedFile) -> Vec<AuxiliaryReading> {
    decoded
        .records
        .iter()
        .filter_map(|record| match &record.payload {
            RecordPayload::Auxiliary(message) if message.value.is_finite() => {
                Some(AuxiliaryReading {
                    timestamp: decoded.epoch(record.elapsed_ms),
                    kind: message.kind,
                    value: message.value,
                })
            }
            _ => None,
        })
        .collect()
}

/// Nearest reading value for each time, within `max_gap_seconds`.
/// `times` must be ascending; ties go to the earlier reading.
fn nearest_values(
    times: &[f64],
    readings: &[(f64, f64)],
    max_gap_seconds: f64,
) -> Vec<Option<f64>> {
    let mut upper = 0usize;
    times
        .iter()
        .map(|&time| {
            while upper < readings.len() && readings[upper].0 < time {
                upper += 1;
            }
            let before = upper.checked_sub(1).map(|index| readings[index]);
            let after = readings.get(upper).copied();
            let nearest = match (before, after) {
                (Some(b), Some(a)) if a.0 - time < time - b.0 => Some(a),
                (Some(b), _) => Some(b),
                (None, a) => a,
            };
            nearest
                .filter(|(at, _)| (time - at).abs() <= max_gap_seconds)
                .map(|(_, value)| value)
        })
        .collect()
}

/// Attach the nearest reading of each auxiliary kind to each observation
pub fn attach_auxiliary(
    geo: Vec<GeoReferencedObservation>,
    auxiliary: &[AuxiliaryReading],
    max_gap_seconds: f64,
) -> (Vec<MergedObservation>, Vec<AuxiliaryKind>) {
    let mut by_kind: BTreeMap<AuxiliaryKind, Vec<(f64, f64)>> = BTreeMap::new();
    for reading in auxiliary {
        by_kind
            .entry(reading.kind)
            .or_default()
            .push((reading.timestamp, reading.value));
    }

    let times: Vec<f64> = geo.iter().map(|g| g.observation.timestamp).collect();
    let mut merged: Vec<MergedObservation> = geo
        .into_iter()
        .map(|geo| MergedObservation {
            geo,
            auxiliary: BTreeMap::new(),
        })
        .collect();
    let mut attached = BTreeSet::new();

    for (kind, mut readings) in by_kind {
        readings.sort_by(|a, b| a.0.total_cmp(&b.0));
        let values = nearest_values(&times, &readings, max_gap_seconds);
        for (observation, value) in merged.iter_mut().zip(values) {
            if let Some(value) = value {
                observation.auxiliary.insert(kind, value);
                attached.insert(kind);
            }
        }
    }

    (merged, attached.into_iter().collect())
}

/// Layered submission document for a file
pub fn build_metadata(
    decoded: &DecodedFile,
    core: Option<&CoreMetadata>,
    last_observation: Option<f64>,
) -> Value {
    let mut document = mandatory_template();
    apply_identity(&mut document, &decoded.identity);
    if let Some(embedded) = &decoded.embedded_metadata {
        merge_documents(&mut document, embedded);
    }
    if let Some(core) = core {
        merge_documents(&mut document, core.document());
    }
    if let Some(defaults) = &decoded.metadata_defaults {
        fill_unset(&mut document, defaults);
    }

    if let Some(timestamp) = last_observation {
        add_processing_action(
            &mut document,
            json!({
                "type": TIMESTAMP_PROCESSING_TYPE,
                "timestamp": format_timestamp(timestamp),
                "method": TIMESTAMP_METHOD,
                "algorithm": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            }),
        );
    }
    document
}

/// Combine observations, auxiliary readings and metadata for a writer
pub fn merge(
    geo: Vec<GeoReferencedObservation>,
    auxiliary: &[AuxiliaryReading],
    decoded: &DecodedFile,
    core: Option<&CoreMetadata>,
    requirement: MetadataRequirement,
    max_gap_seconds: f64,
) -> Result<MergedDataset> {
    if let MetadataRequirement::Required { writer } = requirement {
        if core.is_none() && decoded.embedded_metadata.is_none() {
            return Err(Error::missing_required_metadata(writer));
        }
    }

    let last_observation = geo
        .iter()
        .map(|g| g.observation.timestamp)
        .max_by(|a, b| a.total_cmp(b));
    let metadata = build_metadata(decoded, core, last_observation);
    let (observations, auxiliary_kinds) = attach_auxiliary(geo, auxiliary, max_gap_seconds);

    debug!(
        "{}: merged {} observations, auxiliary {:?}",
        decoded.file_id,
        observations.len(),
        auxiliary_kinds
    );

    Ok(MergedDataset {
        file_id: decoded.file_id.clone(),
        metadata,
        observations,
        auxiliary_kinds,
    })
}
