//! Tests for writer lookup and naming

use crate::app::services::metadata_merger::MetadataRequirement;
use crate::app::services::writers::{WriterKind, base_name};
use std::path::Path;

#[test]
fn test_from_name_accepts_labels_and_ids() {
    assert_eq!(
        WriterKind::from_name("DCDB GeoJSON").unwrap(),
        WriterKind::DcdbGeoJson
    );
    assert_eq!(
        WriterKind::from_name("dcdb csv").unwrap(),
        WriterKind::DcdbCsv
    );
    assert_eq!(WriterKind::from_name("csv").unwrap(), WriterKind::PlainCsv);
}

#[test]
fn test_unknown_writer_lists_library() {
    let message = WriterKind::from_name("Shapefile").unwrap_err().to_string();
    assert!(message.contains("Shapefile"));
    assert!(message.contains("DCDB GeoJSON, DCDB CSV, Plain CSV"));
}

#[test]
fn test_metadata_requirements() {
    assert_eq!(
        WriterKind::DcdbCsv.requirement(),
        MetadataRequirement::Required { writer: "DCDB CSV" }
    );
    assert_eq!(
        WriterKind::PlainCsv.requirement(),
        MetadataRequirement::NotRequired
    );
}

#[test]
fn test_output_paths_follow_base_name() {
    let dir = Path::new("/out");
    let paths = WriterKind::DcdbCsv.writer().output_paths(dir, "00001");
    assert_eq!(
        paths,
        vec![dir.join("00001.csv"), dir.join("00001.json")]
    );
    assert_eq!(
        WriterKind::DcdbGeoJson.writer().output_paths(dir, "00001"),
        vec![dir.join("00001.geojson")]
    );
}

#[test]
fn test_base_name_strips_final_suffix() {
    assert_eq!(base_name(Path::new("/data/00001.wibl")), "00001");
    assert_eq!(base_name(Path::new("trip.2024.log")), "trip.2024");
}
