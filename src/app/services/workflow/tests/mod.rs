//! Tests for the workflow orchestrator and batch runner
//!
//! Inputs are generic ASCII logs written to a temporary folder, so each test
//! spells out the sentences the logger saw.

pub mod batch_tests;

use crate::app::models::DepthMessageKind;
use crate::app::services::loaders::LoaderKind;
use crate::app::services::loaders::nmea0183::checksum;
use crate::app::services::workflow::{StageEvent, StageObserver, StageStatus};
use crate::app::services::writers::WriterKind;
use crate::config::Config;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// 2023-11-14T12:00:00Z
pub const NOON: f64 = 1_699_963_200.0;

pub fn sentence(body: &str) -> String {
    format!("${}*{:02X}", body, checksum(body))
}

/// Clock reading `seconds` after noon
pub fn zda(seconds: u32) -> String {
    sentence(&format!("GPZDA,1200{:02}.00,14,11,2023,00,00", seconds))
}

/// Fix from `ddmm.mmmm` / `dddmm.mmmm` strings
pub fn gga(latitude: &str, longitude: &str) -> String {
    sentence(&format!(
        "GPGGA,120000,{},N,{},E,1,08,0.9,1.0,M,0.0,M,,",
        latitude, longitude
    ))
}

pub fn dbt(metres: f64) -> String {
    sentence(&format!("SDDBT,,f,{:.1},M,,F", metres))
}

/// Fixes at noon (10.0, 20.0) and ten seconds later (10.1, 20.1), a DBT depth
/// of 12.3 m halfway between
pub fn scenario_log() -> String {
    [
        format!("0 {}", zda(0)),
        format!("0 {}", gga("1000.0000", "02000.0000")),
        format!("5000 {}", dbt(12.3)),
        format!("10000 {}", gga("1006.0000", "02006.0000")),
        format!("10000 {}", zda(10)),
    ]
    .join("\n")
}

pub fn write_input(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// Generic ASCII in, plain CSV out, DBT depths
pub fn ascii_config() -> Config {
    Config::default()
        .with_loader(LoaderKind::GenericAscii)
        .with_writer(WriterKind::PlainCsv)
        .with_depth_source(DepthMessageKind::Dbt)
}

/// Collects every event it sees
#[derive(Default)]
pub struct RecordingObserver {
    pub events: Mutex<Vec<StageEvent>>,
}

impl RecordingObserver {
    pub fn transitions(&self) -> Vec<(String, StageStatus)> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|event| (event.stage.name().to_string(), event.status))
            .collect()
    }
}

impl StageObserver for RecordingObserver {
    fn on_stage(&self, event: &StageEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
