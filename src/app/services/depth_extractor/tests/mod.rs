//! Tests for depth observation extraction


use crate::app::models::{
    DepthMessage, DepthMessageKind, RawRecord, RecordPayload, TimeSource,
};
use crate::app::services::loaders::{DecodedFile, RecordStream};

/// SystemTime record mapping `elapsed_ms` to `epoch_seconds`
pub fn time_record(elapsed_ms: f64, epoch_seconds: f64) -> RawRecord {
    RawRecord::new(
        elapsed_ms,
        "SystemTime",
        RecordPayload::TimeReference {
            source: TimeSource::SystemTime,
            epoch_seconds,
        },
    )
}

pub fn depth_record(
    elapsed_ms: f64,
    kind: DepthMessageKind,
    depth_m: f64,
    offset_m: Option<f64>,
) -> RawRecord {
    RawRecord::new(
        elapsed_ms,
        kind.name(),
        RecordPayload::Depth(DepthMessage {
            kind,
            depth_m,
            offset_m,
        }),
    )
}

/// Decoded file whose clock reads `1000 + elapsed/1000` seconds
pub fn decoded_with(mut records: Vec<RawRecord>) -> DecodedFile {
    records.insert(0, time_record(0.0, 1_000.0));
    records.push(time_record(100_000.0, 1_100.0));
    let mut stream = RecordStream::new(10);
    stream.records = records;
    stream.finish("test.wibl").unwrap()
}
