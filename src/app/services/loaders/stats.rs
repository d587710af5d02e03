//! Per-file packet statistics
//!
//! Loaders never fail on an isolated bad record; they count it here instead.
//! The counts feed the operator report and the list of depth kinds present.

use std::collections::BTreeMap;
use std::fmt;

/// Why a record was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FaultKind {
    /// Framing or field syntax could not be parsed
    Parse,
    /// Fewer bytes or fields than the message requires
    ShortMessage,
    /// Fields parsed but held impossible values
    Decode,
    /// NMEA0183 checksum mismatch
    Checksum,
}

impl FaultKind {
    pub fn name(&self) -> &'static str {
        match self {
            FaultKind::Parse => "parse",
            FaultKind::ShortMessage => "short message",
            FaultKind::Decode => "decode",
            FaultKind::Checksum => "checksum",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Observed and faulted message counts, keyed by message name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PacketStats {
    observed: BTreeMap<String, usize>,
    faults: BTreeMap<String, BTreeMap<FaultKind, usize>>,
    notes: Vec<String>,
    fault_limit: usize,
}

impl PacketStats {
    pub fn new(fault_limit: usize) -> Self {
        Self {
            fault_limit,
            ..Default::default()
        }
    }

    /// Count a message of the given name
    pub fn observe(&mut self, name: &str) {
        *self.observed.entry(name.to_string()).or_default() += 1;
    }

    /// Count a fault; the first `fault_limit` details are kept as notes
    pub fn fault(&mut self, name: &str, kind: FaultKind, detail: impl fmt::Display) {
        *self
            .faults
            .entry(name.to_string())
            .or_default()
            .entry(kind)
            .or_default() += 1;
        if self.notes.len() < self.fault_limit {
            self.notes.push(format!("{} ({} fault): {}", name, kind, detail));
        }
    }

    pub fn seen(&self, name: &str) -> bool {
        self.observed_count(name) > 0
    }

    pub fn observed_count(&self, name: &str) -> usize {
        self.observed.get(name).copied().unwrap_or(0)
    }

    pub fn fault_count(&self, name: &str, kind: FaultKind) -> usize {
        self.faults
            .get(name)
            .and_then(|kinds| kinds.get(&kind))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_observed(&self) -> usize {
        self.observed.values().sum()
    }

    pub fn total_faults(&self) -> usize {
        self.faults.values().flat_map(|kinds| kinds.values()).sum()
    }

    /// Retained fault details, oldest first
    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    /// One line per message name, in name order
    pub fn summary_lines(&self) -> Vec<String> {
        self.observed
            .iter()
            .map(|(name, count)| {
                let faults: Vec<String> = self
                    .faults
                    .get(name)
                    .map(|kinds| {
                        kinds
                            .iter()
                            .map(|(kind, n)| format!("{} {}", n, kind))
                            .collect()
                    })
                    .unwrap_or_default();
                if faults.is_empty() {
                    format!("{}: {} observed", name, count)
                } else {
                    format!("{}: {} observed, faults: {}", name, count, faults.join(", "))
                }
            })
            .collect()
    }
}
