//! Elapsed-time to real-time conversion
//!
//! Loggers stamp records with a local millisecond counter. Messages that
//! carry a real-world clock give (elapsed, epoch) pairs; every other record
//! is placed in real time by linear interpolation between those pairs.

use crate::app::models::{RawRecord, RecordPayload, TimeSource};
use std::cmp::Ordering;

/// Piecewise-linear map from elapsed milliseconds to epoch seconds
#[derive(Debug, Clone, PartialEq)]
pub struct Timebase {
    source: TimeSource,
    /// (elapsed_ms, epoch_seconds), sorted by elapsed
    points: Vec<(f64, f64)>,
}

impl Timebase {
    /// Build from explicit points; `None` if no finite point remains
    pub fn new(source: TimeSource, points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        let mut points: Vec<(f64, f64)> = points
            .into_iter()
            .filter(|(elapsed, epoch)| elapsed.is_finite() && epoch.is_finite())
            .collect();
        if points.is_empty() {
            return None;
        }
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        Some(Self { source, points })
    }

    /// Most preferred time source present in the records
    pub fn preferred_source(records: &[RawRecord]) -> Option<TimeSource> {
        records
            .iter()
            .filter_map(|record| match record.payload {
                RecordPayload::TimeReference { source, .. } => Some(source),
                _ => None,
            })
            .min()
    }

    /// Time base from the most preferred source present in the records
    pub fn from_records(records: &[RawRecord]) -> Option<Self> {
        let source = Self::preferred_source(records)?;
        let points = records.iter().filter_map(|record| match record.payload {
            RecordPayload::TimeReference {
                source: s,
                epoch_seconds,
            } if s == source => Some((record.elapsed_ms, epoch_seconds)),
            _ => None,
        });
        Self::new(source, points)
    }

    pub fn source(&self) -> TimeSource {
        self.source
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Convert elapsed milliseconds to epoch seconds, clamping to the end
    /// points outside the recorded span.
    pub fn to_epoch(&self, elapsed_ms: f64) -> f64 {
        let upper = self
            .points
            .partition_point(|(elapsed, _)| elapsed.total_cmp(&elapsed_ms) != Ordering::Greater);
        if upper == 0 {
            return self.points[0].1;
        }
        if upper == self.points.len() {
            return self.points[upper - 1].1;
        }
        let (x0, y0) = self.points[upper - 1];
        let (x1, y1) = self.points[upper];
        if x1 == x0 {
            return y0;
        }
        y0 + (elapsed_ms - x0) / (x1 - x0) * (y1 - y0)
    }

    /// Earliest and latest real times covered
    pub fn span(&self) -> (f64, f64) {
        self.points
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (_, epoch)| {
                (lo.min(*epoch), hi.max(*epoch))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(elapsed: f64, source: TimeSource, epoch: f64) -> RawRecord {
        RawRecord::new(
            elapsed,
            source.name(),
            RecordPayload::TimeReference {
                source,
                epoch_seconds: epoch,
            },
        )
    }

    #[test]
    fn test_interpolates_between_points() {
        let timebase = Timebase::new(TimeSource::Zda, [(0.0, 100.0), (10_000.0, 110.0)]).unwrap();
        assert_eq!(timebase.to_epoch(5_000.0), 105.0);
        assert_eq!(timebase.to_epoch(0.0), 100.0);
        assert_eq!(timebase.to_epoch(10_000.0), 110.0);
    }

    #[test]
    fn test_clamps_outside_span() {
        let timebase = Timebase::new(TimeSource::Zda, [(1_000.0, 100.0), (2_000.0, 101.0)]).unwrap();
        assert_eq!(timebase.to_epoch(0.0), 100.0);
        assert_eq!(timebase.to_epoch(99_000.0), 101.0);
        assert_eq!(timebase.span(), (100.0, 101.0));
    }

    #[test]
    fn test_prefers_system_time_over_nmea0183() {
        let records = vec![
            time(0.0, TimeSource::Rmc, 50.0),
            time(10.0, TimeSource::SystemTime, 1_000.0),
            time(20.0, TimeSource::Zda, 60.0),
            time(30.0, TimeSource::SystemTime, 1_000.02),
        ];
        let timebase = Timebase::from_records(&records).unwrap();
        assert_eq!(timebase.source(), TimeSource::SystemTime);
        assert_eq!(timebase.len(), 2);
        assert!((timebase.to_epoch(20.0) - 1_000.01).abs() < 1e-9);
    }

    #[test]
    fn test_no_time_source() {
        let records = vec![RawRecord::new(0.0, "GGA", RecordPayload::Unrecognized)];
        assert!(Timebase::from_records(&records).is_none());
    }

    #[test]
    fn test_duplicate_elapsed_uses_latest_point() {
        let timebase =
            Timebase::new(TimeSource::Rmc, [(0.0, 10.0), (0.0, 12.0), (1_000.0, 13.0)]).unwrap();
        assert_eq!(timebase.to_epoch(500.0), 12.5);
    }
}
