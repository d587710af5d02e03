//! Text logs of `<elapsed ms> <sentence>` lines
//!
//! The elapsed counter may be narrower than the logging run is long, so a
//! value lower than its predecessor is taken as one wrap of the counter.

use super::nmea0183::parse_sentence;
use super::{DecodeFault, DecodedFile, Loader, RecordStream, note_excerpt};
use crate::Result;
use crate::app::models::LoggerIdentity;
use crate::app::services::loaders::stats::FaultKind;

pub const SUFFIX: &str = ".log";

const LINE: &str = "Line";

#[derive(Debug, Clone)]
pub struct GenericAsciiLoader {
    fault_limit: usize,
    elapsed_wrap: u64,
}

impl GenericAsciiLoader {
    pub fn new(fault_limit: usize, elapsed_wrap: u64) -> Self {
        Self {
            fault_limit,
            elapsed_wrap,
        }
    }
}

impl Loader for GenericAsciiLoader {
    fn name(&self) -> &'static str {
        "Generic ASCII"
    }

    fn suffix(&self) -> &'static str {
        SUFFIX
    }

    fn decode_bytes(&self, file_id: &str, bytes: &[u8]) -> Result<DecodedFile> {
        let mut stream = RecordStream::new(self.fault_limit);
        stream.identity = LoggerIdentity {
            logger_name: Some("Generic ASCII Inputs".to_string()),
            logger_version: Some("1.0".to_string()),
            ..Default::default()
        };

        let content = String::from_utf8_lossy(bytes);
        let mut elapsed_offset: u64 = 0;
        let mut last_elapsed: u64 = 0;

        for (number, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some((stamp, sentence)) = line.split_once(' ') else {
                stream.push_message(
                    0.0,
                    Err(DecodeFault::new(
                        LINE,
                        FaultKind::Parse,
                        format!("line {}: no elapsed time in '{}'", number + 1, note_excerpt(line)),
                    )),
                );
                continue;
            };
            let Ok(elapsed) = stamp.parse::<u64>() else {
                stream.push_message(
                    0.0,
                    Err(DecodeFault::new(
                        LINE,
                        FaultKind::Parse,
                        format!("line {}: invalid elapsed time '{}'", number + 1, note_excerpt(stamp)),
                    )),
                );
                continue;
            };

            if elapsed < last_elapsed {
                elapsed_offset += self.elapsed_wrap;
            }
            last_elapsed = elapsed;
            let elapsed_ms = (elapsed + elapsed_offset) as f64;
            stream.push_message(elapsed_ms, parse_sentence(sentence));
        }

        stream.finish(file_id)
    }
}
