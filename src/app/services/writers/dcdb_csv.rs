//! DCDB CSV encoding
//!
//! A fixed-column CSV, one row per observation, with the metadata document
//! written alongside as `<base_name>.json`. Per-file identity columns are
//! taken from the metadata; unset fields keep their placeholder.

use super::atomic::persist_all;
use super::{OutputWriter, WriteSummary, output_path};
use crate::app::models::format_timestamp;
use crate::app::services::metadata_merger::MergedDataset;
use crate::constants::METADATA_NOT_SET;
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::info;

pub const SUFFIX: &str = ".csv";
pub const COMPANION_SUFFIX: &str = ".json";

pub const COLUMNS: [&str; 8] = [
    "UNIQUE_ID",
    "FILE_UUID",
    "LON",
    "LAT",
    "DEPTH",
    "TIME",
    "PLATFORM_NAME",
    "PROVIDER",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct DcdbCsvWriter;

/// Render the CSV body
pub fn render_csv(dataset: &MergedDataset, base_name: &str) -> csv::Result<Vec<u8>> {
    let unique_id = dataset
        .metadata_str(&["properties", "trustedNode", "uniqueVesselID"])
        .unwrap_or(METADATA_NOT_SET);
    let platform = dataset
        .metadata_str(&["properties", "platform", "name"])
        .unwrap_or(METADATA_NOT_SET);
    let provider = dataset
        .metadata_str(&["properties", "trustedNode", "providerOrganizationName"])
        .unwrap_or(METADATA_NOT_SET);

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(COLUMNS)?;
    for observation in &dataset.observations {
        let geo = &observation.geo;
        let longitude = geo.longitude.to_string();
        let latitude = geo.latitude.to_string();
        let depth = geo.observation.depth_m.to_string();
        let time = format_timestamp(geo.observation.timestamp);
        writer.write_record([
            unique_id,
            base_name,
            longitude.as_str(),
            latitude.as_str(),
            depth.as_str(),
            time.as_str(),
            platform,
            provider,
        ])?;
    }
    writer.into_inner().map_err(|e| e.into_error().into())
}

impl OutputWriter for DcdbCsvWriter {
    fn write(
        &self,
        dataset: &MergedDataset,
        output_dir: &Path,
        base_name: &str,
    ) -> Result<WriteSummary> {
        let data_path = output_path(output_dir, base_name, SUFFIX);
        let metadata_path = output_path(output_dir, base_name, COMPANION_SUFFIX);

        let data = render_csv(dataset, base_name).map_err(|e| {
            Error::write_failed(
                data_path.display().to_string(),
                format!("cannot encode CSV: {}", e),
                None,
            )
        })?;
        let metadata = serde_json::to_vec(&dataset.metadata).map_err(|e| {
            Error::write_failed(
                metadata_path.display().to_string(),
                format!("cannot encode metadata: {}", e),
                None,
            )
        })?;

        let paths = persist_all(&[(data_path, data), (metadata_path, metadata)])?;
        info!(
            "Wrote {} rows to {} with metadata companion",
            dataset.len(),
            paths[0].display()
        );
        Ok(WriteSummary {
            paths,
            observations: dataset.len(),
        })
    }

    fn output_paths(&self, output_dir: &Path, base_name: &str) -> Vec<PathBuf> {
        vec![
            output_path(output_dir, base_name, SUFFIX),
            output_path(output_dir, base_name, COMPANION_SUFFIX),
        ]
    }
}
