//! Plain CSV encoding, for inspection and downstream tools that do not need
//! submission metadata.

use super::atomic::persist_bytes;
use super::{OutputWriter, WriteSummary, output_path};
use crate::app::models::format_timestamp;
use crate::app::services::metadata_merger::MergedDataset;
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::info;

pub const SUFFIX: &str = ".csv";

const FIXED_COLUMNS: [&str; 8] = [
    "time",
    "longitude",
    "latitude",
    "depth",
    "source",
    "reference",
    "fix_method",
    "fix_delta_s",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainCsvWriter;

/// Render the CSV: fixed columns, then one column per attached auxiliary kind
pub fn render_csv(dataset: &MergedDataset) -> csv::Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header: Vec<&str> = FIXED_COLUMNS.to_vec();
    header.extend(dataset.auxiliary_kinds.iter().map(|kind| kind.name()));
    writer.write_record(&header)?;

    for observation in &dataset.observations {
        let geo = &observation.geo;
        let mut row = vec![
            format_timestamp(geo.observation.timestamp),
            geo.longitude.to_string(),
            geo.latitude.to_string(),
            geo.observation.depth_m.to_string(),
            geo.observation.source.name().to_string(),
            geo.observation.reference.name().to_string(),
            geo.method.name().to_string(),
            geo.delta_s.to_string(),
        ];
        // Empty cell where no reading was close enough
        row.extend(dataset.auxiliary_kinds.iter().map(|kind| {
            observation
                .auxiliary
                .get(kind)
                .map(|value| value.to_string())
                .unwrap_or_default()
        }));
        writer.write_record(&row)?;
    }
    writer.into_inner().map_err(|e| e.into_error().into())
}

impl OutputWriter for PlainCsvWriter {
    fn write(
        &self,
        dataset: &MergedDataset,
        output_dir: &Path,
        base_name: &str,
    ) -> Result<WriteSummary> {
        let path = output_path(output_dir, base_name, SUFFIX);
        let bytes = render_csv(dataset).map_err(|e| {
            Error::write_failed(
                path.display().to_string(),
                format!("cannot encode CSV: {}", e),
                None,
            )
        })?;
        persist_bytes(&path, &bytes)?;

        info!("Wrote {} rows to {}", dataset.len(), path.display());
        Ok(WriteSummary {
            paths: vec![path],
            observations: dataset.len(),
        })
    }

    fn output_paths(&self, output_dir: &Path, base_name: &str) -> Vec<PathBuf> {
        vec![output_path(output_dir, base_name, SUFFIX)]
    }
}
