//! Yacht Devices voyage recorder files
//!
//! Each record is a u16 millisecond stamp, a u32 CAN identifier and the
//! frame payload. Fast-packet PGNs are stored reassembled, preceded by a
//! sequence byte and a length byte. The 16-bit stamp wraps roughly every
//! 65 seconds; a stamp lower than its predecessor is taken as one wrap.

use super::binary::{ByteReader, ShortRead};
use super::nmea2000::{decode_pgn, is_fast_packet, translate_can_id};
use super::{DecodedFile, Loader, RecordStream};
use crate::Result;
use crate::app::models::LoggerIdentity;
use crate::app::services::loaders::stats::FaultKind;
use crate::constants::{YDVR_ELAPSED_WRAP, pgn};
use tracing::debug;

pub const SUFFIX: &str = ".DAT";

const SERVICE_RECORD: &str = "Service";

#[derive(Debug, Clone)]
pub struct YdvrLoader {
    fault_limit: usize,
}

impl YdvrLoader {
    pub fn new(fault_limit: usize) -> Self {
        Self { fault_limit }
    }
}

impl Loader for YdvrLoader {
    fn name(&self) -> &'static str {
        "YDVR"
    }

    fn suffix(&self) -> &'static str {
        SUFFIX
    }

    fn decode_bytes(&self, file_id: &str, bytes: &[u8]) -> Result<DecodedFile> {
        let mut stream = RecordStream::new(self.fault_limit);
        stream.identity = LoggerIdentity {
            logger_name: Some("YDVR".to_string()),
            ..Default::default()
        };

        let mut reader = ByteReader::new(bytes);
        let mut elapsed_offset: u64 = 0;
        let mut last_elapsed: u16 = 0;

        while !reader.is_empty() {
            let record_start = bytes.len() - reader.remaining();
            let frame = next_frame(&mut reader);

            let (elapsed, number, payload) = match frame {
                Ok(frame) => frame,
                Err(short) => {
                    // A truncated tail cannot be resynchronised
                    stream.stats.observe("Truncated");
                    stream.stats.fault(
                        "Truncated",
                        FaultKind::ShortMessage,
                        format!("record at byte {}: {}", record_start, short),
                    );
                    break;
                }
            };

            if elapsed < last_elapsed {
                elapsed_offset += YDVR_ELAPSED_WRAP;
            }
            last_elapsed = elapsed;
            let elapsed_ms = (u64::from(elapsed) + elapsed_offset) as f64;

            if number == pgn::YDVR_SERVICE_RECORD {
                stream.stats.observe(SERVICE_RECORD);
                continue;
            }
            stream.push_message(elapsed_ms, decode_pgn(number, payload));
        }

        debug!(
            "YDVR {}: {} counter wraps",
            file_id,
            elapsed_offset / YDVR_ELAPSED_WRAP
        );
        stream.finish(file_id)
    }
}

/// Read one record: elapsed stamp, PGN and payload
fn next_frame<'a>(
    reader: &mut ByteReader<'a>,
) -> std::result::Result<(u16, u32, &'a [u8]), ShortRead> {
    let elapsed = reader.u16()?;
    let id = reader.u32()?;
    let number = if id == pgn::YDVR_SERVICE_RECORD {
        pgn::YDVR_SERVICE_RECORD
    } else {
        translate_can_id(id).pgn
    };
    let length = match number {
        pgn::ISO_REQUEST => 3,
        pgn::YDVR_SERVICE_RECORD => 8,
        n if is_fast_packet(n) => {
            reader.skip(1)?; // sequence
            usize::from(reader.u8()?)
        }
        _ => 8,
    };
    let payload = reader.take(length)?;
    Ok((elapsed, number, payload))
}
