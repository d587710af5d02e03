//! Tests for NMEA2000 PGN decoding and CAN identifiers

use super::*;
use crate::app::models::{AuxiliaryKind, DepthMessageKind, RecordPayload, TimeSource};
use crate::app::services::loaders::FaultKind;
use crate::app::services::loaders::nmea2000::{decode_pgn, pgn_name, translate_can_id};
use crate::constants::pgn;

#[test]
fn test_translate_broadcast_can_id() {
    let id = can_id(pgn::WATER_DEPTH, 3, 0x23);
    let translated = translate_can_id(id);
    assert_eq!(translated.pgn, pgn::WATER_DEPTH);
    assert_eq!(translated.priority, 3);
    assert_eq!(translated.source, 0x23);
    assert_eq!(translated.destination, 0xFF);
}

#[test]
fn test_translate_addressed_can_id_drops_destination() {
    // ISO request (PF 234) addressed to node 0x42
    let id = (6 << 26) | (0xEA << 16) | (0x42 << 8) | 0x10;
    let translated = translate_can_id(id);
    assert_eq!(translated.pgn, pgn::ISO_REQUEST);
    assert_eq!(translated.destination, 0x42);
    assert_eq!(translated.source, 0x10);
}

#[test]
fn test_water_depth_scaling() {
    let message = decode_pgn(pgn::WATER_DEPTH, &water_depth_payload(1234, 500)).unwrap();
    assert_eq!(message.name, "Depth");
    match message.payloads.as_slice() {
        [RecordPayload::Depth(depth)] => {
            assert_eq!(depth.kind, DepthMessageKind::Nmea2000Depth);
            assert!((depth.depth_m - 12.34).abs() < 1e-9);
            assert!((depth.offset_m.unwrap() - 0.5).abs() < 1e-9);
        }
        other => panic!("unexpected payloads {:?}", other),
    }
}

#[test]
fn test_water_depth_not_available() {
    let message = decode_pgn(pgn::WATER_DEPTH, &water_depth_payload(0xFFFF_FFFF, 0)).unwrap();
    assert!(message.payloads.is_empty());
}

#[test]
fn test_system_time_epoch() {
    let message = decode_pgn(pgn::SYSTEM_TIME, &system_time_payload(TEST_DAY, 80_000.5)).unwrap();
    assert_eq!(
        message.payloads,
        vec![RecordPayload::TimeReference {
            source: TimeSource::SystemTime,
            epoch_seconds: TEST_DAY_EPOCH + 80_000.5,
        }]
    );
}

#[test]
fn test_position_rapid_update() {
    let message = decode_pgn(
        pgn::POSITION_RAPID_UPDATE,
        &position_rapid_payload(43.1234567, -70.7654321),
    )
    .unwrap();
    match message.payloads.as_slice() {
        [RecordPayload::PositionFix { latitude, longitude }] => {
            assert!((latitude - 43.1234567).abs() < 1e-7);
            assert!((longitude + 70.7654321).abs() < 1e-7);
        }
        other => panic!("unexpected payloads {:?}", other),
    }
}

#[test]
fn test_gnss_position_gives_time_and_fix() {
    let mut data = vec![0x01];
    data.extend_from_slice(&TEST_DAY.to_le_bytes());
    data.extend_from_slice(&(3_600u32 * 10_000).to_le_bytes());
    data.extend_from_slice(&((10.5 * 1e16) as i64).to_le_bytes());
    data.extend_from_slice(&((-20.25 * 1e16) as i64).to_le_bytes());

    let message = decode_pgn(pgn::GNSS_POSITION_DATA, &data).unwrap();
    assert_eq!(message.name, "GNSS");
    assert_eq!(message.payloads.len(), 2);
    assert_eq!(
        message.payloads[0],
        RecordPayload::TimeReference {
            source: TimeSource::Gnss,
            epoch_seconds: TEST_DAY_EPOCH + 3_600.0,
        }
    );
    match message.payloads[1] {
        RecordPayload::PositionFix { latitude, longitude } => {
            assert!((latitude - 10.5).abs() < 1e-9);
            assert!((longitude + 20.25).abs() < 1e-9);
        }
        ref other => panic!("unexpected payload {:?}", other),
    }
}

#[test]
fn test_temperature_source_selects_kind() {
    let kelvin = ((20.0 + 273.15) / 0.01f64).round() as u16;
    let mut sea = vec![0x01, 0x00, 0x00];
    sea.extend_from_slice(&kelvin.to_le_bytes());
    let message = decode_pgn(pgn::TEMPERATURE, &sea).unwrap();
    match message.payloads.as_slice() {
        [RecordPayload::Auxiliary(aux)] => {
            assert_eq!(aux.kind, AuxiliaryKind::WaterTemperature);
            assert!((aux.value - 20.0).abs() < 1e-6);
        }
        other => panic!("unexpected payloads {:?}", other),
    }

    // Source 4 is engine room temperature, which is not carried
    let mut engine = vec![0x01, 0x00, 0x04];
    engine.extend_from_slice(&kelvin.to_le_bytes());
    assert!(decode_pgn(pgn::TEMPERATURE, &engine).unwrap().payloads.is_empty());
}

#[test]
fn test_short_payload_is_fault() {
    let fault = decode_pgn(pgn::WATER_DEPTH, &[0x01, 0x02]).unwrap_err();
    assert_eq!(fault.name, "Depth");
    assert_eq!(fault.kind, FaultKind::ShortMessage);
}

#[test]
fn test_unknown_pgn_is_unrecognized() {
    let message = decode_pgn(127_250, &[0; 8]).unwrap();
    assert_eq!(message.name, "PGN 127250");
    assert_eq!(message.payloads, vec![RecordPayload::Unrecognized]);
    assert_eq!(pgn_name(pgn::TEMPERATURE_EXTENDED), "Temperature");
}
