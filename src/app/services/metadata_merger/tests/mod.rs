//! Tests for metadata layering and auxiliary attachment

pub mod auxiliary_tests;

use crate::app::models::{
    DepthMessageKind, DepthObservation, DepthReference, FixMethod, GeoReferencedObservation,
    LoggerIdentity, RawRecord, RecordPayload, TimeSource,
};
use crate::app::services::loaders::{DecodedFile, RecordStream};
use serde_json::Value;

pub fn geo_at(timestamp: f64, depth_m: f64) -> GeoReferencedObservation {
    GeoReferencedObservation {
        observation: DepthObservation {
            timestamp,
            depth_m,
            source: DepthMessageKind::Nmea2000Depth,
            reference: DepthReference::Transducer,
        },
        latitude: 43.0,
        longitude: -70.0,
        delta_s: 0.0,
        method: FixMethod::Exact,
    }
}

/// Decoded file with an identity, optional embedded and default documents,
/// and a clock reading `epoch = elapsed_ms / 1000`
pub fn decoded_file(
    identity: LoggerIdentity,
    embedded: Option<Value>,
    defaults: Option<Value>,
    extra: Vec<RawRecord>,
) -> DecodedFile {
    let mut stream = RecordStream::new(10);
    stream.records.push(RawRecord::new(
        0.0,
        "SystemTime",
        RecordPayload::TimeReference {
            source: TimeSource::SystemTime,
            epoch_seconds: 0.0,
        },
    ));
    stream.records.push(RawRecord::new(
        1_000_000.0,
        "SystemTime",
        RecordPayload::TimeReference {
            source: TimeSource::SystemTime,
            epoch_seconds: 1_000.0,
        },
    ));
    stream.records.extend(extra);
    stream.identity = identity;
    stream.embedded_metadata = embedded;
    stream.metadata_defaults = defaults;
    stream.finish("merge.wibl").unwrap()
}

pub fn plain_decoded() -> DecodedFile {
    decoded_file(LoggerIdentity::default(), None, None, Vec::new())
}
