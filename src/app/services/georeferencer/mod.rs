//! Geo-referencing of depth observations
//!
//! Each depth is paired with the logger's position track in one merge-style
//! sweep over the time-ordered depths and fixes. A depth that coincides with
//! a fix takes it directly, a depth between two fixes is interpolated and a
//! depth beyond either end of the track takes the end fix. Any depth whose
//! nearest fix is further away than the allowed gap is dropped.
//!
//! # Example
//!
//! ```rust
//! use csb_processor::app::models::{DepthMessageKind, DepthObservation, DepthReference, TimedFix};
//! use csb_processor::app::services::georeferencer::{PositionTrack, georeference};
//! use csb_processor::config::GeoreferenceConfig;
//!
//! let track = PositionTrack::new(vec![
//!     TimedFix { timestamp: 0.0, latitude: 10.0, longitude: 20.0 },
//!     TimedFix { timestamp: 10.0, latitude: 10.1, longitude: 20.1 },
//! ]);
//! let depth = DepthObservation {
//!     timestamp: 5.0,
//!     depth_m: 12.0,
//!     source: DepthMessageKind::Dbt,
//!     reference: DepthReference::Transducer,
//! };
//!
//! let outcome = georeference(&[depth], &track, &GeoreferenceConfig::default()).unwrap();
//! assert!((outcome.observations[0].latitude - 10.05).abs() < 1e-9);
//! ```

#[cfg(test)]
pub mod tests;

use crate::app::models::{
    DepthObservation, FixMethod, GeoReferencedObservation, RecordPayload, TimedFix,
};
use crate::app::services::loaders::DecodedFile;
use crate::config::{CoveragePolicy, GeoreferenceConfig};
use crate::{Error, Result};
use tracing::{debug, warn};

/// Time-ordered position fixes of one file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionTrack {
    fixes: Vec<TimedFix>,
}

impl PositionTrack {
    /// Build from fixes in any order; non-finite fixes are discarded and
    /// fixes sharing a timestamp keep their original order.
    pub fn new(fixes: Vec<TimedFix>) -> Self {
        let mut fixes: Vec<TimedFix> = fixes
            .into_iter()
            .filter(|fix| {
                fix.timestamp.is_finite() && fix.latitude.is_finite() && fix.longitude.is_finite()
            })
            .collect();
        fixes.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        Self { fixes }
    }

    /// Every position fix in a decoded file, placed in real time
    pub fn from_decoded(decoded: &DecodedFile) -> Self {
        let fixes = decoded
            .records
            .iter()
            .filter_map(|record| match record.payload {
                RecordPayload::PositionFix {
                    latitude,
                    longitude,
                } => Some(TimedFix {
                    timestamp: decoded.epoch(record.elapsed_ms),
                    latitude,
                    longitude,
                }),
                _ => None,
            })
            .collect();
        Self::new(fixes)
    }

    pub fn fixes(&self) -> &[TimedFix] {
        &self.fixes
    }

    pub fn len(&self) -> usize {
        self.fixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }
}

/// Geo-referenced observations and the drop accounting behind them
#[derive(Debug, Clone, PartialEq)]
pub struct GeoreferenceOutcome {
    pub observations: Vec<GeoReferencedObservation>,
    /// Depths with no fix within the allowed gap
    pub dropped: usize,
    /// Depths offered
    pub total: usize,
}

impl GeoreferenceOutcome {
    pub fn drop_fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.dropped as f64 / self.total as f64
        }
    }
}

/// Wrap a longitude into [-180, 180)
pub fn normalize_longitude(longitude: f64) -> f64 {
    (longitude + 180.0).rem_euclid(360.0) - 180.0
}

/// Interpolate a longitude along the shorter way round
pub fn interpolate_longitude(from: f64, to: f64, fraction: f64) -> f64 {
    let mut delta = to - from;
    if delta > 180.0 {
        delta -= 360.0;
    } else if delta < -180.0 {
        delta += 360.0;
    }
    normalize_longitude(from + fraction * delta)
}

/// Position for a time, with the time to the nearest fix used
fn locate(
    timestamp: f64,
    before: Option<&TimedFix>,
    after: Option<&TimedFix>,
) -> Option<(f64, f64, f64, FixMethod)> {
    match (before, after) {
        (_, Some(fix)) if fix.timestamp == timestamp => {
            Some((fix.latitude, fix.longitude, 0.0, FixMethod::Exact))
        }
        (Some(a), Some(b)) => {
            let span = b.timestamp - a.timestamp;
            let fraction = (timestamp - a.timestamp) / span;
            let latitude = a.latitude + fraction * (b.latitude - a.latitude);
            let longitude = interpolate_longitude(a.longitude, b.longitude, fraction);
            let delta = (timestamp - a.timestamp).min(b.timestamp - timestamp);
            Some((latitude, longitude, delta, FixMethod::Interpolated))
        }
        (Some(fix), None) | (None, Some(fix)) => Some((
            fix.latitude,
            fix.longitude,
            (timestamp - fix.timestamp).abs(),
            FixMethod::Nearest,
        )),
        (None, None) => None,
    }
}

/// Pair time-ordered depths with positions from the track
pub fn georeference(
    depths: &[DepthObservation],
    track: &PositionTrack,
    config: &GeoreferenceConfig,
) -> Result<GeoreferenceOutcome> {
    debug_assert!(depths.is_sorted_by(|a, b| a.timestamp <= b.timestamp));

    let fixes = track.fixes();
    let mut observations = Vec::with_capacity(depths.len());
    let mut dropped = 0usize;
    // First fix at or after the current depth; never moves backwards
    let mut upper = 0usize;

    for depth in depths {
        while upper < fixes.len() && fixes[upper].timestamp < depth.timestamp {
            upper += 1;
        }
        let before = upper.checked_sub(1).map(|index| &fixes[index]);
        let after = fixes.get(upper);

        match locate(depth.timestamp, before, after) {
            Some((latitude, longitude, delta_s, method)) if delta_s <= config.max_gap_seconds => {
                observations.push(GeoReferencedObservation {
                    observation: depth.clone(),
                    latitude,
                    longitude,
                    delta_s,
                    method,
                });
            }
            _ => dropped += 1,
        }
    }

    let outcome = GeoreferenceOutcome {
        observations,
        dropped,
        total: depths.len(),
    };
    let coverage_error = || {
        Error::insufficient_position_coverage(
            outcome.dropped,
            outcome.total,
            config.max_gap_seconds,
            config.max_drop_fraction,
        )
    };

    if outcome.observations.is_empty() {
        return Err(coverage_error());
    }
    if outcome.drop_fraction() > config.max_drop_fraction {
        match config.coverage_policy {
            CoveragePolicy::Fail => return Err(coverage_error()),
            CoveragePolicy::Warn => warn!(
                "Dropped {} of {} depths with no fix within {}s",
                outcome.dropped, outcome.total, config.max_gap_seconds
            ),
        }
    }

    debug!(
        "Geo-referenced {} of {} depths against {} fixes",
        outcome.observations.len(),
        outcome.total,
        fixes.len()
    );
    Ok(outcome)
}
