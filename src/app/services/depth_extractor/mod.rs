//! Depth observation extraction
//!
//! Selects the records of the operator's chosen depth message kind, places
//! them in real time through the file's time base and validates the values.
//! There is no fallback: a file without the chosen kind fails, and the error
//! names the depth kinds it does contain so the operator can re-run with one
//! of them.

#[cfg(test)]
pub mod tests;

use crate::app::models::{
    DepthMessage, DepthMessageKind, DepthObservation, DepthReference, RecordPayload,
};
use crate::app::services::loaders::DecodedFile;
use crate::{Error, Result};
use tracing::{debug, warn};

/// Options for turning depth messages into observations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionOptions {
    /// Add the instrument offset where the message carries one
    pub apply_transducer_offset: bool,
}

/// Observations extracted from one file
#[derive(Debug, Clone, PartialEq)]
pub struct DepthExtraction {
    pub kind: DepthMessageKind,
    /// Ordered by timestamp
    pub observations: Vec<DepthObservation>,
    /// Messages of the selected kind with a negative or non-finite depth
    pub rejected: usize,
    /// Depth kinds present in the file, in order of first appearance
    pub found: Vec<DepthMessageKind>,
}

impl DepthExtraction {
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// Depth kinds present in the records, in order of first appearance
pub fn depth_kinds_present(decoded: &DecodedFile) -> Vec<DepthMessageKind> {
    let mut found = Vec::new();
    for kind in decoded.records.iter().filter_map(|record| record.depth_kind()) {
        if !found.contains(&kind) {
            found.push(kind);
        }
    }
    found
}

fn observation(
    message: &DepthMessage,
    timestamp: f64,
    options: ExtractionOptions,
) -> DepthObservation {
    let mut depth_m = message.depth_m;
    let mut reference = DepthReference::Transducer;

    if options.apply_transducer_offset && message.kind != DepthMessageKind::Dbt {
        if let Some(offset) = message.offset_m.filter(|offset| offset.is_finite()) {
            depth_m += offset;
            if offset > 0.0 {
                reference = DepthReference::WaterSurface;
            } else if offset < 0.0 {
                reference = DepthReference::Keel;
            }
        }
    }

    DepthObservation {
        timestamp,
        depth_m,
        source: message.kind,
        reference,
    }
}

/// Extract observations of `kind`, ordered by time
pub fn extract_depths(
    decoded: &DecodedFile,
    kind: DepthMessageKind,
    options: ExtractionOptions,
) -> Result<DepthExtraction> {
    let found = depth_kinds_present(decoded);
    let mut rejected = 0usize;
    let mut observations = Vec::new();

    for record in &decoded.records {
        let RecordPayload::Depth(message) = &record.payload else {
            continue;
        };
        if message.kind != kind {
            continue;
        }
        // Checked after the offset, which may move the depth above zero
        let candidate = observation(message, decoded.epoch(record.elapsed_ms), options);
        if !candidate.depth_m.is_finite() || candidate.depth_m < 0.0 {
            rejected += 1;
            continue;
        }
        observations.push(candidate);
    }

    if observations.is_empty() {
        let found = found
            .iter()
            .map(|present| {
                if *present == kind && rejected > 0 {
                    format!("{} ({} rejected as negative or non-finite)", present, rejected)
                } else {
                    present.to_string()
                }
            })
            .collect();
        return Err(Error::no_matching_depth_source(kind.name(), found));
    }

    if rejected > 0 {
        warn!(
            "{}: rejected {} {} depths as negative or non-finite",
            decoded.file_id, rejected, kind
        );
    }

    // Stable, so equal timestamps keep file order
    observations.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

    debug!(
        "{}: extracted {} {} observations",
        decoded.file_id,
        observations.len(),
        kind
    );

    Ok(DepthExtraction {
        kind,
        observations,
        rejected,
        found,
    })
}
