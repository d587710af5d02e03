//! Tests for attaching auxiliary readings to observations

use super::*;
use crate::app::models::{AuxiliaryKind, AuxiliaryMessage, AuxiliaryReading};
use crate::app::services::metadata_merger::{attach_auxiliary, auxiliary_readings};

fn reading(timestamp: f64, kind: AuxiliaryKind, value: f64) -> AuxiliaryReading {
    AuxiliaryReading {
        timestamp,
        kind,
        value,
    }
}

#[test]
fn test_nearest_reading_within_gap() {
    let geo = vec![geo_at(10.0, 5.0), geo_at(20.0, 5.5), geo_at(100.0, 6.0)];
    let readings = [
        reading(8.0, AuxiliaryKind::WaterTemperature, 15.0),
        reading(13.0, AuxiliaryKind::WaterTemperature, 15.5),
        reading(19.0, AuxiliaryKind::WaterTemperature, 16.0),
    ];

    let (merged, kinds) = attach_auxiliary(geo, &readings, 5.0);

    let values: Vec<Option<f64>> = merged
        .iter()
        .map(|m| m.auxiliary.get(&AuxiliaryKind::WaterTemperature).copied())
        .collect();
    assert_eq!(values, vec![Some(15.0), Some(16.0), None]);
    assert_eq!(kinds, vec![AuxiliaryKind::WaterTemperature]);
}

#[test]
fn test_equidistant_readings_prefer_earlier() {
    let (merged, _) = attach_auxiliary(
        vec![geo_at(10.0, 5.0)],
        &[
            reading(12.0, AuxiliaryKind::Pressure, 1_013.0),
            reading(8.0, AuxiliaryKind::Pressure, 1_012.0),
        ],
        5.0,
    );
    assert_eq!(
        merged[0].auxiliary.get(&AuxiliaryKind::Pressure),
        Some(&1_012.0)
    );
}

#[test]
fn test_kinds_attached_independently() {
    let (merged, kinds) = attach_auxiliary(
        vec![geo_at(10.0, 5.0)],
        &[
            reading(10.0, AuxiliaryKind::Pressure, 1_013.0),
            reading(11.0, AuxiliaryKind::WaterTemperature, 14.0),
            reading(60.0, AuxiliaryKind::Humidity, 80.0),
        ],
        5.0,
    );
    assert_eq!(merged[0].auxiliary.len(), 2);
    assert_eq!(
        kinds,
        vec![AuxiliaryKind::WaterTemperature, AuxiliaryKind::Pressure]
    );
}

#[test]
fn test_no_readings_leaves_observations_bare() {
    let (merged, kinds) = attach_auxiliary(vec![geo_at(10.0, 5.0)], &[], 5.0);
    assert!(merged[0].auxiliary.is_empty());
    assert!(kinds.is_empty());
    assert_eq!(merged[0].geo.observation.depth_m, 5.0);
}

#[test]
fn test_readings_collected_from_decoded_file() {
    let decoded = decoded_file(
        LoggerIdentity::default(),
        None,
        None,
        vec![
            RawRecord::new(
                5_000.0,
                "MTW",
                RecordPayload::Auxiliary(AuxiliaryMessage {
                    kind: AuxiliaryKind::WaterTemperature,
                    value: 12.5,
                }),
            ),
            RawRecord::new(
                6_000.0,
                "MTW",
                RecordPayload::Auxiliary(AuxiliaryMessage {
                    kind: AuxiliaryKind::WaterTemperature,
                    value: f64::NAN,
                }),
            ),
        ],
    );

    let readings = auxiliary_readings(&decoded);
    assert_eq!(readings.len(), 1);
    assert!((readings[0].timestamp - 5.0).abs() < 1e-9);
    assert_eq!(readings[0].value, 12.5);
}
