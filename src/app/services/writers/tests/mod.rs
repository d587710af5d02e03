//! Tests for the output writers

pub mod geojson_tests;
pub mod registry_tests;

use crate::app::models::metadata::{mandatory_template, set_field};
use crate::app::models::{
    AuxiliaryKind, DepthMessageKind, DepthObservation, DepthReference, FixMethod,
    GeoReferencedObservation,
};
use crate::app::services::metadata_merger::{MergedDataset, MergedObservation};
use serde_json::{Value, json};
use std::collections::BTreeMap;

/// 2023-11-14T22:13:20.000Z
pub const T0: f64 = 1_700_000_000.0;

pub fn observation(offset_s: f64, depth_m: f64, longitude: f64, latitude: f64) -> MergedObservation {
    MergedObservation {
        geo: GeoReferencedObservation {
            observation: DepthObservation {
                timestamp: T0 + offset_s,
                depth_m,
                source: DepthMessageKind::Dbt,
                reference: DepthReference::Transducer,
            },
            latitude,
            longitude,
            delta_s: 0.5,
            method: FixMethod::Interpolated,
        },
        auxiliary: BTreeMap::new(),
    }
}

pub fn metadata() -> Value {
    let mut document = mandatory_template();
    set_field(
        &mut document,
        &["properties", "trustedNode", "uniqueVesselID"],
        json!("WIBL-42"),
    );
    set_field(
        &mut document,
        &["properties", "trustedNode", "providerOrganizationName"],
        json!("OpenVBI"),
    );
    set_field(
        &mut document,
        &["properties", "platform", "name"],
        json!("Mary Jane"),
    );
    document
}

/// Two observations, the second with a water temperature attached
pub fn sample_dataset() -> MergedDataset {
    let mut second = observation(1.25, 13.5, -70.25, 43.5);
    second
        .auxiliary
        .insert(AuxiliaryKind::WaterTemperature, 14.5);

    MergedDataset {
        file_id: "00001.wibl".to_string(),
        metadata: metadata(),
        observations: vec![observation(0.0, 12.3, -70.0, 43.0), second],
        auxiliary_kinds: vec![AuxiliaryKind::WaterTemperature],
    }
}
