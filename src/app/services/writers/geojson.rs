//! DCDB GeoJSON encoding
//!
//! The output is the merged metadata document turned into a
//! `FeatureCollection`, one `Point` feature per observation:
//!
//! ```json
//! {"type":"Feature","geometry":{"type":"Point","coordinates":[lon,lat]},
//!  "properties":{"depth":12.3,"time":"2023-11-14T22:13:20.250Z"}}
//! ```
//!
//! Auxiliary values attached to an observation become extra properties.

use super::atomic::persist_bytes;
use super::{OutputWriter, WriteSummary, output_path};
use crate::app::models::format_timestamp;
use crate::app::services::metadata_merger::{MergedDataset, MergedObservation};
use crate::{Error, Result};
use serde_json::{Map, Value, json};
use std::path::{Path, PathBuf};
use tracing::info;

pub const SUFFIX: &str = ".geojson";

#[derive(Debug, Clone, Copy, Default)]
pub struct DcdbGeoJsonWriter;

fn feature(observation: &MergedObservation) -> Value {
    let geo = &observation.geo;
    let mut properties = Map::new();
    properties.insert("depth".to_string(), json!(geo.observation.depth_m));
    properties.insert(
        "time".to_string(),
        json!(format_timestamp(geo.observation.timestamp)),
    );
    for (kind, value) in &observation.auxiliary {
        properties.insert(kind.name().to_string(), json!(value));
    }

    json!({
        "type": "Feature",
        "geometry": {
            "type": "Point",
            "coordinates": [geo.longitude, geo.latitude]
        },
        "properties": properties
    })
}

/// The complete submission document for a dataset
pub fn feature_collection(dataset: &MergedDataset) -> Value {
    let mut document = dataset.metadata.clone();
    if let Value::Object(map) = &mut document {
        map.insert("type".to_string(), json!("FeatureCollection"));
        map.insert(
            "features".to_string(),
            Value::Array(dataset.observations.iter().map(feature).collect()),
        );
    }
    document
}

impl OutputWriter for DcdbGeoJsonWriter {
    fn write(
        &self,
        dataset: &MergedDataset,
        output_dir: &Path,
        base_name: &str,
    ) -> Result<WriteSummary> {
        let path = output_path(output_dir, base_name, SUFFIX);
        let bytes = serde_json::to_vec(&feature_collection(dataset)).map_err(|e| {
            Error::write_failed(path.display().to_string(), format!("cannot encode: {}", e), None)
        })?;
        persist_bytes(&path, &bytes)?;

        info!(
            "Wrote {} features to {}",
            dataset.len(),
            path.display()
        );
        Ok(WriteSummary {
            paths: vec![path],
            observations: dataset.len(),
        })
    }

    fn output_paths(&self, output_dir: &Path, base_name: &str) -> Vec<PathBuf> {
        vec![output_path(output_dir, base_name, SUFFIX)]
    }
}
