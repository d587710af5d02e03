//! WIBL logger packet files
//!
//! A file is a sequence of `u32 id | u32 length | payload` packets, all
//! little-endian. Most data packets begin with the logger's own date, time
//! and elapsed stamp; position, depth and time values follow in the layout
//! of the NMEA2000 message they were captured from. Raw NMEA0183 traffic
//! arrives as serial-string packets and is decoded sentence by sentence.

use super::binary::{ByteReader, ShortRead};
use super::nmea0183::parse_sentence;
use super::{DecodeFault, DecodedFile, DecodedMessage, Loader, RecordStream, note_excerpt};
use crate::Result;
use crate::app::models::{
    AuxiliaryKind, AuxiliaryMessage, DepthMessage, DepthMessageKind, LoggerIdentity, RecordPayload,
    TimeSource,
};
use crate::app::services::loaders::stats::FaultKind;
use crate::constants::wibl::{self, packet_name};
use crate::constants::{KELVIN_OFFSET, SECONDS_PER_DAY, WIBL_DEFAULT_PROVIDER};
use serde_json::{Value, json};
use tracing::{debug, warn};

pub const SUFFIX: &str = ".wibl";

const TRUNCATED: &str = "Truncated";

#[derive(Debug, Clone)]
pub struct WiblLoader {
    fault_limit: usize,
}

impl WiblLoader {
    pub fn new(fault_limit: usize) -> Self {
        Self { fault_limit }
    }
}

impl Loader for WiblLoader {
    fn name(&self) -> &'static str {
        "WIBL"
    }

    fn suffix(&self) -> &'static str {
        SUFFIX
    }

    fn decode_bytes(&self, file_id: &str, bytes: &[u8]) -> Result<DecodedFile> {
        let mut stream = RecordStream::new(self.fault_limit);
        let mut identity = LoggerIdentity {
            unique_id: Some("NONE".to_string()),
            logger_name: Some("WIBL".to_string()),
            logger_version: Some("0.0.0".to_string()),
            ship_name: Some("Anonymous".to_string()),
        };

        let mut reader = ByteReader::new(bytes);
        while !reader.is_empty() {
            let packet_start = bytes.len() - reader.remaining();
            let (id, payload) = match next_packet(&mut reader) {
                Ok(packet) => packet,
                Err(short) => {
                    stream.stats.observe(TRUNCATED);
                    stream.stats.fault(
                        TRUNCATED,
                        FaultKind::ShortMessage,
                        format!("packet at byte {}: {}", packet_start, short),
                    );
                    break;
                }
            };

            let name = packet_name(id);
            let mut payload = ByteReader::new(payload);
            match id {
                wibl::SERIALISER_VERSION => {
                    stream.stats.observe(name);
                    match serialiser_version(&mut payload) {
                        Ok(version) => identity.logger_version = Some(version),
                        Err(short) => stream.stats.fault(name, FaultKind::ShortMessage, short),
                    }
                }
                wibl::METADATA => {
                    stream.stats.observe(name);
                    match logger_metadata(&mut payload) {
                        Ok((logger_id, ship_name)) => {
                            identity.unique_id = Some(logger_id);
                            identity.ship_name = Some(ship_name);
                        }
                        Err(fault) => stream.stats.fault(name, fault.kind, &fault.detail),
                    }
                }
                wibl::JSON_METADATA => {
                    stream.stats.observe(name);
                    match json_metadata(&mut payload) {
                        Ok(document) => stream.embedded_metadata = Some(document),
                        Err(fault) => stream.stats.fault(name, fault.kind, &fault.detail),
                    }
                }
                wibl::SERIAL_STRING => match serial_string(&mut payload) {
                    Ok((elapsed, sentence)) => {
                        stream.push_message(f64::from(elapsed), parse_sentence(&sentence))
                    }
                    Err(fault) => stream.push_message(0.0, Err(fault)),
                },
                wibl::SYSTEM_TIME
                | wibl::DEPTH
                | wibl::GNSS
                | wibl::ENVIRONMENT
                | wibl::TEMPERATURE
                | wibl::HUMIDITY
                | wibl::PRESSURE => {
                    let decoded = data_packet(id, &mut payload)
                        .map(|(elapsed, payloads)| {
                            (
                                f64::from(elapsed),
                                DecodedMessage {
                                    name: name.to_string(),
                                    payloads,
                                },
                            )
                        })
                        .map_err(|short| DecodeFault::new(name, FaultKind::ShortMessage, short));
                    match decoded {
                        Ok((elapsed, message)) => stream.push_message(elapsed, Ok(message)),
                        Err(fault) => stream.push_message(0.0, Err(fault)),
                    }
                }
                _ => stream.stats.observe(name),
            }
        }

        if identity.logger_version.as_deref() == Some("0.0.0") {
            warn!("{}: no serialiser version packet", file_id);
        }
        debug!(
            "WIBL {}: logger {:?}, firmware {:?}",
            file_id, identity.unique_id, identity.logger_version
        );

        stream.identity = identity;
        stream.metadata_defaults = Some(json!({
            "properties": {
                "trustedNode": {
                    "providerOrganizationName": WIBL_DEFAULT_PROVIDER.0,
                    "providerEmail": WIBL_DEFAULT_PROVIDER.1,
                    "verticalReferenceOfDepth": "Transducer",
                    "vesselPositionReferencePoint": "Transducer"
                }
            }
        }));
        stream.finish(file_id)
    }
}

fn next_packet<'a>(
    reader: &mut ByteReader<'a>,
) -> std::result::Result<(u32, &'a [u8]), ShortRead> {
    let id = reader.u32()?;
    let length = reader.u32()? as usize;
    Ok((id, reader.take(length)?))
}

fn component(reader: &mut ByteReader<'_>) -> std::result::Result<String, ShortRead> {
    Ok(format!("{}.{}.{}", reader.u16()?, reader.u16()?, reader.u16()?))
}

/// Firmware description as `major.minor/nmea0183/nmea2000/imu`
fn serialiser_version(reader: &mut ByteReader<'_>) -> std::result::Result<String, ShortRead> {
    let major = reader.u16()?;
    let minor = reader.u16()?;
    let nmea2000 = component(reader)?;
    let nmea0183 = component(reader)?;
    // IMU versioning arrived with serialiser 1.3
    let imu = if (major, minor) < wibl::CURRENT_VERSION {
        "0.0.0".to_string()
    } else {
        component(reader)?
    };
    Ok(format!("{}.{}/{}/{}/{}", major, minor, nmea0183, nmea2000, imu))
}

fn text(bytes: &[u8], what: &str) -> std::result::Result<String, DecodeFault> {
    std::str::from_utf8(bytes)
        .map(|s| s.trim_end_matches('\0').trim().to_string())
        .map_err(|e| DecodeFault::new(what, FaultKind::Decode, format!("invalid UTF-8: {}", e)))
}

fn short(name: &str) -> impl Fn(ShortRead) -> DecodeFault + '_ {
    move |short| DecodeFault::new(name, FaultKind::ShortMessage, short)
}

/// Logger identifier and ship name
fn logger_metadata(
    reader: &mut ByteReader<'_>,
) -> std::result::Result<(String, String), DecodeFault> {
    let name = packet_name(wibl::METADATA);
    let logger_id = reader.length_prefixed().map_err(short(name))?;
    let ship_name = reader.length_prefixed().map_err(short(name))?;
    Ok((text(logger_id, name)?, text(ship_name, name)?))
}

fn json_metadata(reader: &mut ByteReader<'_>) -> std::result::Result<Value, DecodeFault> {
    let name = packet_name(wibl::JSON_METADATA);
    let raw = reader.length_prefixed().map_err(short(name))?;
    let document = text(raw, name)?;
    serde_json::from_str(&document).map_err(|e| {
        DecodeFault::new(name, FaultKind::Decode, format!("invalid JSON metadata: {}", e))
    })
}

fn serial_string(reader: &mut ByteReader<'_>) -> std::result::Result<(u32, String), DecodeFault> {
    let name = packet_name(wibl::SERIAL_STRING);
    let elapsed = reader.u32().map_err(short(name))?;
    let sentence = text(reader.rest(), name)?;
    if sentence.is_empty() {
        return Err(DecodeFault::new(name, FaultKind::ShortMessage, "empty sentence"));
    }
    debug!("Serial string at {} ms: {}", elapsed, note_excerpt(&sentence));
    Ok((elapsed, sentence))
}

/// Date (days since epoch), seconds of day and elapsed stamp that begin
/// every data packet
fn packet_stamp(
    reader: &mut ByteReader<'_>,
) -> std::result::Result<(u16, f64, u32), ShortRead> {
    Ok((reader.u16()?, reader.f64()?, reader.u32()?))
}

fn aux(kind: AuxiliaryKind, value: f64) -> RecordPayload {
    RecordPayload::Auxiliary(AuxiliaryMessage { kind, value })
}

fn temperature_kind(source: u8) -> Option<AuxiliaryKind> {
    match source {
        0 => Some(AuxiliaryKind::WaterTemperature),
        1 => Some(AuxiliaryKind::AirTemperature),
        _ => None,
    }
}

/// Elapsed stamp and payloads of a data packet
fn data_packet(
    id: u32,
    reader: &mut ByteReader<'_>,
) -> std::result::Result<(u32, Vec<RecordPayload>), ShortRead> {
    let (date, seconds, elapsed) = packet_stamp(reader)?;
    let payloads = match id {
        wibl::SYSTEM_TIME => {
            // The stamp itself is the captured SystemTime value
            let _source = reader.u8()?;
            vec![RecordPayload::TimeReference {
                source: TimeSource::SystemTime,
                epoch_seconds: f64::from(date) * SECONDS_PER_DAY + seconds,
            }]
        }
        wibl::DEPTH => {
            let depth_m = reader.f64()?;
            let offset = reader.f64()?;
            let _range = reader.f64()?;
            // Range checks belong to depth extraction, which counts rejects
            vec![RecordPayload::Depth(DepthMessage {
                kind: DepthMessageKind::Nmea2000Depth,
                depth_m,
                offset_m: offset.is_finite().then_some(offset),
            })]
        }
        wibl::GNSS => {
            let fix_date = reader.u16()?;
            let fix_seconds = reader.f64()?;
            let latitude = reader.f64()?;
            let longitude = reader.f64()?;
            let mut payloads = vec![RecordPayload::TimeReference {
                source: TimeSource::Gnss,
                epoch_seconds: f64::from(fix_date) * SECONDS_PER_DAY + fix_seconds,
            }];
            if latitude.is_finite()
                && longitude.is_finite()
                && latitude.abs() <= 90.0
                && longitude.abs() <= 180.0
            {
                payloads.push(RecordPayload::PositionFix {
                    latitude,
                    longitude,
                });
            }
            payloads
        }
        wibl::ENVIRONMENT => {
            let temperature_source = reader.u8()?;
            let temperature = reader.f64()?;
            let _humidity_source = reader.u8()?;
            let humidity = reader.f64()?;
            let pressure = reader.f64()?;
            let mut payloads = Vec::new();
            if let Some(kind) = temperature_kind(temperature_source) {
                payloads.push(aux(kind, temperature - KELVIN_OFFSET));
            }
            payloads.push(aux(AuxiliaryKind::Humidity, humidity));
            payloads.push(aux(AuxiliaryKind::Pressure, pressure / 100.0));
            payloads
        }
        wibl::TEMPERATURE => {
            let source = reader.u8()?;
            let temperature = reader.f64()?;
            temperature_kind(source)
                .map(|kind| aux(kind, temperature - KELVIN_OFFSET))
                .into_iter()
                .collect()
        }
        wibl::HUMIDITY => {
            let _source = reader.u8()?;
            vec![aux(AuxiliaryKind::Humidity, reader.f64()?)]
        }
        wibl::PRESSURE => {
            let _source = reader.u8()?;
            vec![aux(AuxiliaryKind::Pressure, reader.f64()? / 100.0)]
        }
        _ => vec![RecordPayload::Unrecognized],
    };
    Ok((elapsed, payloads))
}
