//! Tests for the DCDB GeoJSON writer

use super::*;
use crate::app::services::writers::geojson::feature_collection;
use crate::app::services::writers::{OutputWriter, WriterKind};
use tempfile::TempDir;

#[test]
fn test_features_carry_position_depth_and_time() {
    let document = feature_collection(&sample_dataset());

    assert_eq!(document["type"], json!("FeatureCollection"));
    let features = document["features"].as_array().unwrap();
    assert_eq!(features.len(), 2);

    assert_eq!(
        features[0],
        json!({
            "type": "Feature",
            "geometry": { "type": "Point", "coordinates": [-70.0, 43.0] },
            "properties": { "depth": 12.3, "time": "2023-11-14T22:13:20.000Z" }
        })
    );
    assert_eq!(features[1]["properties"]["waterTemperature"], json!(14.5));
    assert_eq!(
        features[1]["properties"]["time"],
        json!("2023-11-14T22:13:21.250Z")
    );
}

#[test]
fn test_metadata_is_kept_at_top_level() {
    let document = feature_collection(&sample_dataset());
    assert_eq!(
        document["properties"]["trustedNode"]["uniqueVesselID"],
        json!("WIBL-42")
    );
    assert_eq!(document["crs"]["properties"]["name"], json!("EPSG:4326"));
}

#[test]
fn test_write_produces_one_file() {
    let dir = TempDir::new().unwrap();
    let summary = WriterKind::DcdbGeoJson
        .writer()
        .write(&sample_dataset(), dir.path(), "00001")
        .unwrap();

    assert_eq!(summary.observations, 2);
    assert_eq!(summary.paths, vec![dir.path().join("00001.geojson")]);

    let written: Value =
        serde_json::from_slice(&std::fs::read(&summary.paths[0]).unwrap()).unwrap();
    assert_eq!(written, feature_collection(&sample_dataset()));
}

#[test]
fn test_rewrite_is_byte_identical() {
    let dir = TempDir::new().unwrap();
    let writer = WriterKind::DcdbGeoJson.writer();
    let path = dir.path().join("00001.geojson");

    writer.write(&sample_dataset(), dir.path(), "00001").unwrap();
    let first = std::fs::read(&path).unwrap();
    writer.write(&sample_dataset(), dir.path(), "00001").unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), first);
}

#[test]
fn test_unwritable_directory_leaves_nothing() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("not-there");

    let error = WriterKind::DcdbGeoJson
        .writer()
        .write(&sample_dataset(), &missing, "00001")
        .unwrap_err();

    assert_eq!(error.failure_kind(), Some(crate::FailureKind::WriteFailed));
    assert!(!missing.exists());
}
