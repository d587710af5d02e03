//! Submission metadata documents
//!
//! Metadata is carried as an opaque JSON document following the CSB GeoJSON
//! 3.1 layout. The engine only ever fills identity fields, merges documents
//! and appends processing actions; schema validation is delegated to an
//! external [`MetadataValidator`].

use crate::app::models::LoggerIdentity;
use crate::constants::{
    CSB_CONVENTION, CSB_CRS, CSB_DATA_LICENSE, MANDATORY_TRUSTED_NODE_FIELDS, METADATA_NOT_SET,
};
use crate::{Error, Result};
use serde_json::{Map, Value, json};
use std::path::Path;
use tracing::debug;

/// Mandatory skeleton of a submission document, with placeholders
pub fn mandatory_template() -> Value {
    json!({
        "type": "FeatureCollection",
        "crs": {
            "type": "name",
            "properties": { "name": CSB_CRS }
        },
        "properties": {
            "trustedNode": {
                "providerOrganizationName": METADATA_NOT_SET,
                "providerEmail": METADATA_NOT_SET,
                "uniqueVesselID": METADATA_NOT_SET,
                "convention": CSB_CONVENTION,
                "dataLicense": CSB_DATA_LICENSE,
                "providerLogger": METADATA_NOT_SET,
                "providerLoggerVersion": METADATA_NOT_SET,
                "navigationCRS": CSB_CRS,
                "verticalReferenceOfDepth": METADATA_NOT_SET,
                "vesselPositionReferencePoint": METADATA_NOT_SET
            },
            "platform": {
                "uniqueID": METADATA_NOT_SET
            }
        }
    })
}

/// Operator-supplied metadata shared by every file in a run
#[derive(Debug, Clone, PartialEq)]
pub struct CoreMetadata {
    document: Value,
}

impl CoreMetadata {
    /// Wrap a JSON document; the root must be an object
    pub fn from_value(document: Value) -> Result<Self> {
        if !document.is_object() {
            return Err(Error::metadata_format(
                "metadata document root must be a JSON object",
            ));
        }
        Ok(Self { document })
    }

    /// Read a metadata document from disk
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::io(
                format!("Failed to read metadata file {}", path.display()),
                e,
            )
        })?;
        let document: Value = serde_json::from_str(&content).map_err(|e| {
            Error::json(format!("Invalid metadata file {}", path.display()), e)
        })?;
        debug!("Loaded metadata from {}", path.display());
        Self::from_value(document)
    }

    pub fn document(&self) -> &Value {
        &self.document
    }
}

/// Deep-merge `overlay` into `base`: objects merge key by key, anything else
/// in the overlay replaces the base value.
pub fn merge_documents(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(existing) => merge_documents(existing, value),
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

/// Copy leaves of `defaults` into `document` where the document has no value
/// or still holds the placeholder.
pub fn fill_unset(document: &mut Value, defaults: &Value) {
    let (Value::Object(doc_map), Value::Object(default_map)) = (document, defaults) else {
        return;
    };
    for (key, default) in default_map {
        match doc_map.get_mut(key) {
            Some(existing) if default.is_object() => fill_unset(existing, default),
            Some(existing) if is_unset(existing) => *existing = default.clone(),
            Some(_) => {}
            None => {
                doc_map.insert(key.clone(), default.clone());
            }
        }
    }
}

fn is_unset(value: &Value) -> bool {
    value.is_null() || value.as_str() == Some(METADATA_NOT_SET)
}

/// Look up a nested field by key path
pub fn field<'a>(document: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(document, |node, key| node.get(*key))
}

/// Set a nested field, creating intermediate objects as needed
pub fn set_field(document: &mut Value, path: &[&str], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        *document = value;
        return;
    };
    let mut node = document;
    for key in parents {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        node = match node {
            Value::Object(map) => map
                .entry(key.to_string())
                .or_insert_with(|| Value::Object(Map::new())),
            _ => return,
        };
    }
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        map.insert(last.to_string(), value);
    }
}

/// Fill identity fields reported by the logger
pub fn apply_identity(document: &mut Value, identity: &LoggerIdentity) {
    if let Some(unique_id) = &identity.unique_id {
        set_field(
            document,
            &["properties", "trustedNode", "uniqueVesselID"],
            json!(unique_id),
        );
        set_field(
            document,
            &["properties", "platform", "uniqueID"],
            json!(unique_id),
        );
    }
    if let Some(logger) = &identity.logger_name {
        set_field(
            document,
            &["properties", "trustedNode", "providerLogger"],
            json!(logger),
        );
    }
    if let Some(version) = &identity.logger_version {
        set_field(
            document,
            &["properties", "trustedNode", "providerLoggerVersion"],
            json!(version),
        );
    }
    if let Some(ship_name) = &identity.ship_name {
        set_field(
            document,
            &["properties", "platform", "name"],
            json!(ship_name),
        );
    }
}

/// Append an entry to `properties.processing`
pub fn add_processing_action(document: &mut Value, action: Value) {
    let existing = field(document, &["properties", "processing"])
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let mut actions = existing;
    actions.push(action);
    set_field(document, &["properties", "processing"], Value::Array(actions));
}

/// A problem reported by a metadata validator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// Dotted path to the offending field
    pub path: String,
    pub message: String,
}

/// Checks a rendered metadata document against the archive's schema
///
/// The engine never calls validators itself; they are offered to the
/// operator ahead of a run.
pub trait MetadataValidator {
    fn name(&self) -> &'static str;
    fn validate(&self, path: &Path) -> Result<Vec<SchemaViolation>>;
}

/// Validator for the mandatory subset of fields, without a schema engine
#[derive(Debug, Clone, Copy, Default)]
pub struct MandatoryFieldsValidator;

impl MandatoryFieldsValidator {
    /// Check an in-memory document
    pub fn check(&self, document: &Value) -> Vec<SchemaViolation> {
        let mut violations = Vec::new();

        if field(document, &["type"]).and_then(Value::as_str) != Some("FeatureCollection") {
            violations.push(SchemaViolation {
                path: "type".to_string(),
                message: "must be \"FeatureCollection\"".to_string(),
            });
        }
        if field(document, &["crs"]).is_none() {
            violations.push(SchemaViolation {
                path: "crs".to_string(),
                message: "coordinate reference system is missing".to_string(),
            });
        }

        let mut required: Vec<Vec<&str>> = MANDATORY_TRUSTED_NODE_FIELDS
            .iter()
            .map(|name| vec!["properties", "trustedNode", *name])
            .collect();
        required.push(vec!["properties", "platform", "uniqueID"]);

        for path in required {
            let dotted = path.join(".");
            match field(document, &path) {
                None => violations.push(SchemaViolation {
                    path: dotted,
                    message: "required field is missing".to_string(),
                }),
                Some(value) if is_unset(value) => violations.push(SchemaViolation {
                    path: dotted,
                    message: format!("required field is still {}", METADATA_NOT_SET),
                }),
                Some(_) => {}
            }
        }

        violations
    }
}

impl MetadataValidator for MandatoryFieldsValidator {
    fn name(&self) -> &'static str {
        "mandatory fields"
    }

    fn validate(&self, path: &Path) -> Result<Vec<SchemaViolation>> {
        let metadata = CoreMetadata::from_file(path)?;
        Ok(self.check(metadata.document()))
    }
}
