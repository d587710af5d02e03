//! Tests for geo-referencing depths against a position track


use crate::app::models::{DepthMessageKind, DepthObservation, DepthReference, TimedFix};
use crate::config::GeoreferenceConfig;

pub fn fix(timestamp: f64, latitude: f64, longitude: f64) -> TimedFix {
    TimedFix {
        timestamp,
        latitude,
        longitude,
    }
}

pub fn depth_at(timestamp: f64) -> DepthObservation {
    DepthObservation {
        timestamp,
        depth_m: 12.0,
        source: DepthMessageKind::Dbt,
        reference: DepthReference::Transducer,
    }
}

pub fn config_with_gap(max_gap_seconds: f64) -> GeoreferenceConfig {
    GeoreferenceConfig {
        max_gap_seconds,
        ..Default::default()
    }
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {}, got {}",
        expected,
        actual
    );
}
