//! TeamSurv NMEA0183 logs
//!
//! TeamSurv loggers write bare sentences with no reception time, and two
//! serial inputs may be interleaved. Elapsed times are reconstructed from
//! the sentences that carry the file's preferred clock: those are placed
//! at `1000 * (t - t0)` milliseconds, and every sentence between two of them
//! is placed at the midpoint. Sentences outside the first and last clock
//! sentence cannot be placed and are dropped.

use super::nmea0183::parse_sentence;
use super::{DecodedFile, DecodedMessage, Loader, NO_TIME_SOURCE, RecordStream};
use crate::app::models::{LoggerIdentity, RecordPayload, TimeSource};
use crate::{Error, Result};
use tracing::debug;

pub const SUFFIX: &str = ".txt";

#[derive(Debug, Clone)]
pub struct TeamSurvLoader {
    fault_limit: usize,
}

impl TeamSurvLoader {
    pub fn new(fault_limit: usize) -> Self {
        Self { fault_limit }
    }
}

/// Epoch carried by a message from the given source
fn clock(message: &DecodedMessage, source: TimeSource) -> Option<f64> {
    message.payloads.iter().find_map(|payload| match payload {
        RecordPayload::TimeReference {
            source: s,
            epoch_seconds,
        } if *s == source => Some(*epoch_seconds),
        _ => None,
    })
}

/// Reconstructed elapsed milliseconds for each message, `None` where the
/// message cannot be placed.
pub fn reconstruct_elapsed(messages: &[DecodedMessage], source: TimeSource) -> Vec<Option<f64>> {
    let mut elapsed: Vec<Option<f64>> = vec![None; messages.len()];
    let mut origin: Option<f64> = None;
    for (slot, message) in elapsed.iter_mut().zip(messages) {
        if let Some(epoch) = clock(message, source) {
            let t0 = *origin.get_or_insert(epoch);
            *slot = Some(1000.0 * (epoch - t0));
        }
    }

    let mut previous: Option<usize> = None;
    for index in 0..elapsed.len() {
        let Some(current) = elapsed[index] else {
            continue;
        };
        if let Some(start) = previous {
            if let Some(before) = elapsed[start] {
                let midpoint = (before + current) / 2.0;
                for slot in &mut elapsed[start + 1..index] {
                    *slot = Some(midpoint);
                }
            }
        }
        previous = Some(index);
    }
    elapsed
}

impl Loader for TeamSurvLoader {
    fn name(&self) -> &'static str {
        "TeamSurv"
    }

    fn suffix(&self) -> &'static str {
        SUFFIX
    }

    fn decode_bytes(&self, file_id: &str, bytes: &[u8]) -> Result<DecodedFile> {
        let mut stream = RecordStream::new(self.fault_limit);
        stream.identity = LoggerIdentity {
            logger_name: Some("TeamSurv".to_string()),
            ..Default::default()
        };

        let content = String::from_utf8_lossy(bytes);
        let mut messages = Vec::new();
        for line in content.lines().filter(|line| !line.trim().is_empty()) {
            match parse_sentence(line) {
                Ok(message) => messages.push(message),
                Err(fault) => stream.push_message(0.0, Err(fault)),
            }
        }

        let source = messages
            .iter()
            .flat_map(|message| &message.payloads)
            .filter_map(|payload| match payload {
                RecordPayload::TimeReference { source, .. } => Some(*source),
                _ => None,
            })
            .min();
        let Some(source) = source else {
            if messages.is_empty() {
                // Let the stream report the fault count
                return stream.finish(file_id);
            }
            return Err(Error::decode(file_id, NO_TIME_SOURCE));
        };

        let elapsed = reconstruct_elapsed(&messages, source);
        let mut untimed = 0usize;
        for (message, elapsed_ms) in messages.into_iter().zip(elapsed) {
            match elapsed_ms {
                Some(elapsed_ms) => stream.push_message(elapsed_ms, Ok(message)),
                None => {
                    stream.stats.observe(&message.name);
                    untimed += 1;
                }
            }
        }
        debug!(
            "TeamSurv {}: clock from {}, {} sentences outside the clocked span",
            file_id, source, untimed
        );

        stream.finish(file_id)
    }
}
