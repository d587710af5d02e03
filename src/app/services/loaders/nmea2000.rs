//! NMEA2000 parameter group decoding
//!
//! Payloads arrive already reassembled (fast-packet PGNs included), so each
//! decoder sees the complete field layout of its PGN.

use super::binary::{ByteReader, ShortRead};
use super::{DecodeFault, DecodedMessage};
use crate::app::models::{
    AuxiliaryKind, AuxiliaryMessage, DepthMessage, DepthMessageKind, RecordPayload, TimeSource,
};
use crate::app::services::loaders::stats::FaultKind;
use crate::constants::{KELVIN_OFFSET, SECONDS_PER_DAY, pgn};

/// Fields of a 29-bit CAN identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanId {
    pub priority: u8,
    pub pgn: u32,
    pub source: u8,
    pub destination: u8,
}

/// Split a CAN identifier into priority, PGN, source and destination.
///
/// PDU1 formats (PF below 240) are addressed: the PS byte is the destination
/// and is not part of the PGN. PDU2 formats are broadcast.
pub fn translate_can_id(id: u32) -> CanId {
    let pf = (id >> 16) & 0xFF;
    let ps = (id >> 8) & 0xFF;
    let dp = (id >> 24) & 1;
    let source = (id & 0xFF) as u8;
    let priority = ((id >> 26) & 0x7) as u8;

    if pf < 240 {
        CanId {
            priority,
            pgn: (dp << 16) + (pf << 8),
            source,
            destination: ps as u8,
        }
    } else {
        CanId {
            priority,
            pgn: (dp << 16) + (pf << 8) + ps,
            source,
            destination: 0xFF,
        }
    }
}

pub fn is_fast_packet(pgn: u32) -> bool {
    pgn::FAST_PACKET.contains(&pgn)
}

/// Message name used in statistics
pub fn pgn_name(number: u32) -> String {
    match number {
        pgn::SYSTEM_TIME => "SystemTime".to_string(),
        pgn::WATER_DEPTH => DepthMessageKind::Nmea2000Depth.name().to_string(),
        pgn::POSITION_RAPID_UPDATE => "PositionRapid".to_string(),
        pgn::GNSS_POSITION_DATA => "GNSS".to_string(),
        pgn::ENVIRONMENTAL_PARAMETERS_LEGACY | pgn::ENVIRONMENTAL_PARAMETERS => {
            "Environment".to_string()
        }
        pgn::TEMPERATURE | pgn::TEMPERATURE_EXTENDED => "Temperature".to_string(),
        other => format!("PGN {}", other),
    }
}

/// Decode a complete PGN payload
pub fn decode_pgn(number: u32, data: &[u8]) -> Result<DecodedMessage, DecodeFault> {
    let name = pgn_name(number);
    let mut reader = ByteReader::new(data);
    let payloads = match number {
        pgn::SYSTEM_TIME => system_time(&mut reader),
        pgn::WATER_DEPTH => water_depth(&mut reader),
        pgn::POSITION_RAPID_UPDATE => position_rapid(&mut reader),
        pgn::GNSS_POSITION_DATA => gnss_position(&mut reader),
        pgn::ENVIRONMENTAL_PARAMETERS_LEGACY => environment_legacy(&mut reader),
        pgn::ENVIRONMENTAL_PARAMETERS => environment(&mut reader),
        pgn::TEMPERATURE => temperature(&mut reader),
        pgn::TEMPERATURE_EXTENDED => temperature_extended(&mut reader),
        _ => Ok(vec![RecordPayload::Unrecognized]),
    }
    .map_err(|short| DecodeFault::new(&name, FaultKind::ShortMessage, short))?;

    Ok(DecodedMessage { name, payloads })
}

type Payloads = Result<Vec<RecordPayload>, ShortRead>;

// "Data not available" markers
const NA_U16: u16 = 0xFFFF;
const NA_U24: u32 = 0xFF_FFFF;
const NA_U32: u32 = 0xFFFF_FFFF;
const NA_I16: i16 = 0x7FFF;
const NA_I32: i32 = 0x7FFF_FFFF;
const NA_I64: i64 = 0x7FFF_FFFF_FFFF_FFFF;

fn epoch(days: u16, time_units: u32) -> Option<f64> {
    (days != NA_U16 && time_units != NA_U32)
        .then(|| f64::from(days) * SECONDS_PER_DAY + f64::from(time_units) * 1e-4)
}

fn system_time(reader: &mut ByteReader<'_>) -> Payloads {
    reader.skip(2)?; // SID, source
    let days = reader.u16()?;
    let time = reader.u32()?;
    Ok(epoch(days, time)
        .map(|epoch_seconds| RecordPayload::TimeReference {
            source: TimeSource::SystemTime,
            epoch_seconds,
        })
        .into_iter()
        .collect())
}

fn water_depth(reader: &mut ByteReader<'_>) -> Payloads {
    reader.skip(1)?; // SID
    let depth = reader.u32()?;
    let offset = reader.i16()?;
    if depth == NA_U32 {
        return Ok(Vec::new());
    }
    Ok(vec![RecordPayload::Depth(DepthMessage {
        kind: DepthMessageKind::Nmea2000Depth,
        depth_m: f64::from(depth) * 0.01,
        offset_m: (offset != NA_I16).then(|| f64::from(offset) * 0.001),
    })])
}

fn position_rapid(reader: &mut ByteReader<'_>) -> Payloads {
    let latitude = reader.i32()?;
    let longitude = reader.i32()?;
    if latitude == NA_I32 || longitude == NA_I32 {
        return Ok(Vec::new());
    }
    Ok(vec![RecordPayload::PositionFix {
        latitude: f64::from(latitude) * 1e-7,
        longitude: f64::from(longitude) * 1e-7,
    }])
}

fn gnss_position(reader: &mut ByteReader<'_>) -> Payloads {
    reader.skip(1)?; // SID
    let days = reader.u16()?;
    let time = reader.u32()?;
    let latitude = reader.i64()?;
    let longitude = reader.i64()?;

    let mut payloads = Vec::new();
    if let Some(epoch_seconds) = epoch(days, time) {
        payloads.push(RecordPayload::TimeReference {
            source: TimeSource::Gnss,
            epoch_seconds,
        });
    }
    if latitude != NA_I64 && longitude != NA_I64 {
        payloads.push(RecordPayload::PositionFix {
            latitude: latitude as f64 * 1e-16,
            longitude: longitude as f64 * 1e-16,
        });
    }
    Ok(payloads)
}

fn kelvin(raw: u16, scale: f64) -> Option<f64> {
    (raw != NA_U16).then(|| f64::from(raw) * scale - KELVIN_OFFSET)
}

/// Temperature kind from the N2K temperature-source code
fn temperature_kind(source: u8) -> Option<AuxiliaryKind> {
    match source {
        0 => Some(AuxiliaryKind::WaterTemperature),
        1 => Some(AuxiliaryKind::AirTemperature),
        _ => None,
    }
}

fn aux(kind: AuxiliaryKind, value: f64) -> RecordPayload {
    RecordPayload::Auxiliary(AuxiliaryMessage { kind, value })
}

fn environment_legacy(reader: &mut ByteReader<'_>) -> Payloads {
    reader.skip(1)?; // SID
    let water = reader.u16()?;
    let air = reader.u16()?;
    let pressure = reader.u16()?;

    let mut payloads = Vec::new();
    if let Some(celsius) = kelvin(water, 0.01) {
        payloads.push(aux(AuxiliaryKind::WaterTemperature, celsius));
    }
    if let Some(celsius) = kelvin(air, 0.01) {
        payloads.push(aux(AuxiliaryKind::AirTemperature, celsius));
    }
    if pressure != NA_U16 {
        // hPa and mbar are the same unit
        payloads.push(aux(AuxiliaryKind::Pressure, f64::from(pressure)));
    }
    Ok(payloads)
}

fn environment(reader: &mut ByteReader<'_>) -> Payloads {
    reader.skip(1)?; // SID
    let sources = reader.u8()?;
    let temperature = reader.u16()?;
    let humidity = reader.i16()?;
    let pressure = reader.u16()?;

    let mut payloads = Vec::new();
    if let (Some(kind), Some(celsius)) = (temperature_kind(sources & 0x3F), kelvin(temperature, 0.01)) {
        payloads.push(aux(kind, celsius));
    }
    if humidity != NA_I16 {
        payloads.push(aux(AuxiliaryKind::Humidity, f64::from(humidity) * 0.004));
    }
    if pressure != NA_U16 {
        payloads.push(aux(AuxiliaryKind::Pressure, f64::from(pressure)));
    }
    Ok(payloads)
}

fn temperature(reader: &mut ByteReader<'_>) -> Payloads {
    reader.skip(2)?; // SID, instance
    let source = reader.u8()?;
    let actual = reader.u16()?;
    Ok(temperature_kind(source)
        .zip(kelvin(actual, 0.01))
        .map(|(kind, celsius)| aux(kind, celsius))
        .into_iter()
        .collect())
}

fn temperature_extended(reader: &mut ByteReader<'_>) -> Payloads {
    reader.skip(2)?; // SID, instance
    let source = reader.u8()?;
    let actual = reader.u24()?;
    if actual == NA_U24 {
        return Ok(Vec::new());
    }
    Ok(temperature_kind(source)
        .map(|kind| aux(kind, f64::from(actual) * 0.001 - KELVIN_OFFSET))
        .into_iter()
        .collect())
}
