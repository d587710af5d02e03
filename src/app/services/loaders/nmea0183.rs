//! NMEA0183 sentence decoding
//!
//! Only the sentences the pipeline needs are interpreted: GGA and RMC for
//! position, RMC and ZDA for time, DBT and DPT for depth and MTW for water
//! temperature. Any other well-formed sentence decodes as unrecognized.

use super::{DecodeFault, DecodedMessage, note_excerpt};
use crate::app::models::{
    AuxiliaryKind, AuxiliaryMessage, DepthMessage, DepthMessageKind, RecordPayload, TimeSource,
};
use crate::app::services::loaders::stats::FaultKind;
use crate::constants::METRES_PER_FOOT;
use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

/// Talker (two characters) followed by a three-letter formatter
static ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z][A-Z0-9]([A-Z]{3})$").expect("address pattern is valid")
});

const METRES_PER_FATHOM: f64 = 1.8288;

type FieldResult<T> = std::result::Result<T, (FaultKind, String)>;

/// XOR of every byte between the start delimiter and the `*`
pub fn checksum(body: &str) -> u8 {
    body.bytes().fold(0, |acc, byte| acc ^ byte)
}

/// Decode one sentence, verifying its checksum when one is present
pub fn parse_sentence(line: &str) -> Result<DecodedMessage, DecodeFault> {
    let sentence = line.trim();
    let Some(rest) = sentence
        .strip_prefix('$')
        .or_else(|| sentence.strip_prefix('!'))
    else {
        return Err(DecodeFault::new(
            "Unknown",
            FaultKind::Parse,
            format!("no start delimiter in '{}'", note_excerpt(sentence)),
        ));
    };

    let (body, expected) = match rest.split_once('*') {
        Some((body, checksum)) => (body, Some(checksum.trim())),
        None => (rest, None),
    };
    let fields: Vec<&str> = body.split(',').collect();
    let name = sentence_name(fields[0])?;

    if let Some(expected) = expected {
        let expected = u8::from_str_radix(expected, 16).map_err(|_| {
            DecodeFault::new(
                &name,
                FaultKind::Parse,
                format!("malformed checksum '{}'", note_excerpt(expected)),
            )
        })?;
        let actual = checksum(body);
        if actual != expected {
            return Err(DecodeFault::new(
                &name,
                FaultKind::Checksum,
                format!("expected {:02X}, computed {:02X}", expected, actual),
            ));
        }
    }

    let payloads = match name.as_str() {
        "GGA" => gga(&fields),
        "RMC" => rmc(&fields),
        "ZDA" => zda(&fields),
        "DBT" => dbt(&fields),
        "DPT" => dpt(&fields),
        "MTW" => mtw(&fields),
        _ => Ok(vec![RecordPayload::Unrecognized]),
    }
    .map_err(|(kind, detail)| DecodeFault::new(&name, kind, detail))?;

    Ok(DecodedMessage { name, payloads })
}

fn sentence_name(address: &str) -> Result<String, DecodeFault> {
    if address.starts_with('P') && address.len() > 1 {
        return Ok(address.to_string());
    }
    ADDRESS
        .captures(address)
        .and_then(|captures| captures.get(1))
        .map(|formatter| formatter.as_str().to_string())
        .ok_or_else(|| {
            DecodeFault::new(
                "Unknown",
                FaultKind::Parse,
                format!("invalid sentence address '{}'", note_excerpt(address)),
            )
        })
}

fn require(fields: &[&str], count: usize) -> FieldResult<()> {
    if fields.len() < count {
        return Err((
            FaultKind::ShortMessage,
            format!("expected {} fields, found {}", count, fields.len()),
        ));
    }
    Ok(())
}

fn number(value: &str) -> FieldResult<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| (FaultKind::Decode, format!("invalid number '{}'", note_excerpt(value))))
}

fn integer(value: &str) -> FieldResult<u32> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| (FaultKind::Decode, format!("invalid integer '{}'", note_excerpt(value))))
}

/// `ddmm.mmmm` / `dddmm.mmmm` with hemisphere to signed degrees
fn coordinate(value: &str, hemisphere: &str, limit: f64) -> FieldResult<f64> {
    let raw = number(value)?;
    let degrees = (raw / 100.0).trunc();
    let minutes = raw - degrees * 100.0;
    if !(0.0..60.0).contains(&minutes) {
        return Err((FaultKind::Decode, format!("invalid minutes in '{}'", value)));
    }
    let magnitude = degrees + minutes / 60.0;
    let signed = match hemisphere.trim() {
        "N" | "E" => magnitude,
        "S" | "W" => -magnitude,
        other => {
            return Err((
                FaultKind::Decode,
                format!("invalid hemisphere '{}'", note_excerpt(other)),
            ));
        }
    };
    if signed.abs() > limit {
        return Err((FaultKind::Decode, format!("coordinate {} out of range", signed)));
    }
    Ok(signed)
}

/// `hhmmss.ss` to seconds past midnight
fn time_of_day(value: &str) -> FieldResult<f64> {
    let invalid = || (FaultKind::Decode, format!("invalid time '{}'", note_excerpt(value)));
    let hours = value.get(0..2).ok_or_else(invalid)?;
    let minutes = value.get(2..4).ok_or_else(invalid)?;
    let seconds = value.get(4..).filter(|s| !s.is_empty()).ok_or_else(invalid)?;
    let hours = integer(hours).map_err(|_| invalid())?;
    let minutes = integer(minutes).map_err(|_| invalid())?;
    let seconds = number(seconds).map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 || !(0.0..61.0).contains(&seconds) {
        return Err(invalid());
    }
    Ok(f64::from(hours * 3600 + minutes * 60) + seconds)
}

/// Epoch seconds at the start of a calendar day
fn day_start(year: i32, month: u32, day: u32) -> FieldResult<f64> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.and_utc().timestamp() as f64)
        .ok_or_else(|| {
            (
                FaultKind::Decode,
                format!("invalid date {:04}-{:02}-{:02}", year, month, day),
            )
        })
}

fn gga(fields: &[&str]) -> FieldResult<Vec<RecordPayload>> {
    require(fields, 7)?;
    let quality = fields[6].trim();
    if quality.is_empty() || quality == "0" || fields[2].is_empty() || fields[4].is_empty() {
        return Ok(Vec::new());
    }
    Ok(vec![RecordPayload::PositionFix {
        latitude: coordinate(fields[2], fields[3], 90.0)?,
        longitude: coordinate(fields[4], fields[5], 180.0)?,
    }])
}

fn rmc(fields: &[&str]) -> FieldResult<Vec<RecordPayload>> {
    require(fields, 10)?;
    let mut payloads = Vec::new();

    let (time, date) = (fields[1].trim(), fields[9].trim());
    if !time.is_empty() && !date.is_empty() {
        let seconds = time_of_day(time)?;
        let invalid = || (FaultKind::Decode, format!("invalid date '{}'", note_excerpt(date)));
        if date.len() != 6 {
            return Err(invalid());
        }
        let part = |range: std::ops::Range<usize>| {
            date.get(range)
                .ok_or_else(invalid)
                .and_then(|digits| integer(digits).map_err(|_| invalid()))
        };
        let day = part(0..2)?;
        let month = part(2..4)?;
        let short_year = part(4..6)? as i32;
        let year = if short_year < 70 {
            2000 + short_year
        } else {
            1900 + short_year
        };
        payloads.push(RecordPayload::TimeReference {
            source: TimeSource::Rmc,
            epoch_seconds: day_start(year, month, day)? + seconds,
        });
    }

    if fields[2].trim() == "A" && !fields[3].is_empty() && !fields[5].is_empty() {
        payloads.push(RecordPayload::PositionFix {
            latitude: coordinate(fields[3], fields[4], 90.0)?,
            longitude: coordinate(fields[5], fields[6], 180.0)?,
        });
    }

    Ok(payloads)
}

fn zda(fields: &[&str]) -> FieldResult<Vec<RecordPayload>> {
    require(fields, 5)?;
    if fields[1..5].iter().any(|field| field.trim().is_empty()) {
        return Ok(Vec::new());
    }
    let seconds = time_of_day(fields[1].trim())?;
    let day = integer(fields[2])?;
    let month = integer(fields[3])?;
    let year = integer(fields[4])? as i32;
    Ok(vec![RecordPayload::TimeReference {
        source: TimeSource::Zda,
        epoch_seconds: day_start(year, month, day)? + seconds,
    }])
}

fn dbt(fields: &[&str]) -> FieldResult<Vec<RecordPayload>> {
    require(fields, 4)?;
    let non_empty = |index: usize| fields.get(index).map(|f| f.trim()).filter(|f| !f.is_empty());

    let depth_m = if let Some(metres) = non_empty(3) {
        number(metres)?
    } else if let Some(feet) = non_empty(1) {
        number(feet)? * METRES_PER_FOOT
    } else if let Some(fathoms) = non_empty(5) {
        number(fathoms)? * METRES_PER_FATHOM
    } else {
        return Ok(Vec::new());
    };

    Ok(vec![RecordPayload::Depth(DepthMessage {
        kind: DepthMessageKind::Dbt,
        depth_m,
        offset_m: None,
    })])
}

fn dpt(fields: &[&str]) -> FieldResult<Vec<RecordPayload>> {
    require(fields, 2)?;
    if fields[1].trim().is_empty() {
        return Ok(Vec::new());
    }
    let offset_m = match fields.get(2).map(|f| f.trim()) {
        Some(offset) if !offset.is_empty() => Some(number(offset)?),
        _ => None,
    };
    Ok(vec![RecordPayload::Depth(DepthMessage {
        kind: DepthMessageKind::Dpt,
        depth_m: number(fields[1])?,
        offset_m,
    })])
}

fn mtw(fields: &[&str]) -> FieldResult<Vec<RecordPayload>> {
    require(fields, 2)?;
    if fields[1].trim().is_empty() {
        return Ok(Vec::new());
    }
    if let Some(units) = fields.get(2).map(|f| f.trim()) {
        if !units.is_empty() && units != "C" {
            return Err((FaultKind::Decode, format!("unsupported units '{}'", units)));
        }
    }
    Ok(vec![RecordPayload::Auxiliary(AuxiliaryMessage {
        kind: AuxiliaryKind::WaterTemperature,
        value: number(fields[1])?,
    })])
}
