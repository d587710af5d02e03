//! Tests for the logger file decoders
//!
//! Fixtures are built byte by byte so each test states exactly what the
//! logger wrote.

pub mod nmea2000_tests;

use crate::app::services::loaders::nmea0183::checksum;
use crate::app::services::loaders::nmea2000::is_fast_packet;

/// 2023-11-14T00:00:00Z as a day count
pub const TEST_DAY: u16 = 19_675;

/// Epoch seconds of `TEST_DAY` at midnight
pub const TEST_DAY_EPOCH: f64 = 1_699_920_000.0;

/// Wrap a sentence body in `$...*HH`
pub fn sentence(body: &str) -> String {
    format!("${}*{:02X}", body, checksum(body))
}

/// 29-bit CAN identifier for a broadcast of `pgn`
pub fn can_id(pgn: u32, priority: u32, source: u32) -> u32 {
    let dp = (pgn >> 16) & 1;
    let pf = (pgn >> 8) & 0xFF;
    let ps = if pf < 240 { 0xFF } else { pgn & 0xFF };
    (priority << 26) | (dp << 24) | (pf << 16) | (ps << 8) | source
}

/// One YDVR record; single-frame payloads are padded to eight bytes
pub fn ydvr_record(elapsed: u16, pgn: u32, payload: &[u8]) -> Vec<u8> {
    let mut record = Vec::new();
    record.extend_from_slice(&elapsed.to_le_bytes());
    record.extend_from_slice(&can_id(pgn, 3, 0x23).to_le_bytes());
    if is_fast_packet(pgn) {
        record.push(0);
        record.push(payload.len() as u8);
        record.extend_from_slice(payload);
    } else {
        let mut frame = [0xFFu8; 8];
        frame[..payload.len()].copy_from_slice(payload);
        record.extend_from_slice(&frame);
    }
    record
}

/// PGN 126992 payload
pub fn system_time_payload(days: u16, seconds: f64) -> Vec<u8> {
    let mut data = vec![0x01, 0xF0];
    data.extend_from_slice(&days.to_le_bytes());
    data.extend_from_slice(&((seconds * 1e4).round() as u32).to_le_bytes());
    data
}

/// PGN 128267 payload
pub fn water_depth_payload(depth_cm: u32, offset_mm: i16) -> Vec<u8> {
    let mut data = vec![0x01];
    data.extend_from_slice(&depth_cm.to_le_bytes());
    data.extend_from_slice(&offset_mm.to_le_bytes());
    data.push(0xFF);
    data
}

/// PGN 129025 payload
pub fn position_rapid_payload(latitude: f64, longitude: f64) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&((latitude * 1e7).round() as i32).to_le_bytes());
    data.extend_from_slice(&((longitude * 1e7).round() as i32).to_le_bytes());
    data
}

/// One WIBL packet
pub fn wibl_packet(id: u32, payload: &[u8]) -> Vec<u8> {
    let mut packet = Vec::new();
    packet.extend_from_slice(&id.to_le_bytes());
    packet.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    packet.extend_from_slice(payload);
    packet
}

/// Date, time and elapsed stamp that opens WIBL data packets
pub fn wibl_stamp(days: u16, seconds: f64, elapsed: u32) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&days.to_le_bytes());
    data.extend_from_slice(&seconds.to_le_bytes());
    data.extend_from_slice(&elapsed.to_le_bytes());
    data
}

pub fn wibl_system_time(days: u16, seconds: f64, elapsed: u32) -> Vec<u8> {
    let mut data = wibl_stamp(days, seconds, elapsed);
    data.push(0);
    data
}

pub fn wibl_depth(elapsed: u32, depth: f64, offset: f64) -> Vec<u8> {
    let mut data = wibl_stamp(TEST_DAY, 0.0, elapsed);
    for value in [depth, offset, 200.0] {
        data.extend_from_slice(&value.to_le_bytes());
    }
    data
}

pub fn wibl_gnss(elapsed: u32, seconds: f64, latitude: f64, longitude: f64) -> Vec<u8> {
    let mut data = wibl_stamp(TEST_DAY, seconds, elapsed);
    data.extend_from_slice(&TEST_DAY.to_le_bytes());
    for value in [seconds, latitude, longitude, 12.5] {
        data.extend_from_slice(&value.to_le_bytes());
    }
    data.extend_from_slice(&[1, 2, 12]);
    for value in [0.9f64, 1.5, 46.9] {
        data.extend_from_slice(&value.to_le_bytes());
    }
    data.extend_from_slice(&[0, 0, 0, 0]);
    data.extend_from_slice(&0.0f64.to_le_bytes());
    data
}

pub fn wibl_serial(elapsed: u32, sentence: &str) -> Vec<u8> {
    let mut data = elapsed.to_le_bytes().to_vec();
    data.extend_from_slice(sentence.as_bytes());
    data.extend_from_slice(b"\r\n");
    data
}

pub fn length_prefixed(text: &str) -> Vec<u8> {
    let mut data = (text.len() as u32).to_le_bytes().to_vec();
    data.extend_from_slice(text.as_bytes());
    data
}

pub fn wibl_version(major: u16, minor: u16, components: &[u16]) -> Vec<u8> {
    let mut data = Vec::new();
    for value in [major, minor].iter().chain(components) {
        data.extend_from_slice(&value.to_le_bytes());
    }
    data
}
