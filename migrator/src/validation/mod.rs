//! JSON Schema validation for CKAN payloads.
//!
//! Payloads are checked before the first remote write so that a bad row
//! fails the run before anything is created on the target.
//!
//! # Embedded Schemas
//!
//! Draft 7 schemas embedded at compile time from `schemas/`:
//! - `ckan-package.json` - `package_create` body
//! - `ckan-resource.json` - `resource_create` fields

use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::Value;

use crate::error::ValidationError;
use crate::transform::publish::PlannedDataset;

static PACKAGE_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/ckan-package.json"))
        .expect("Invalid embedded schema")
});

static RESOURCE_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/ckan-resource.json"))
        .expect("Invalid embedded schema")
});

/// Validate a JSON value against a schema.
///
/// # Returns
/// * `Ok(())` when valid
/// * `Err(Vec<String>)` with one message per violation
///
/// # Example
/// ```ignore
/// use serde_json::json;
/// use migrator::validation::validate;
///
/// let schema = json!({
///     "type": "object",
///     "required": ["name"],
///     "properties": { "name": { "type": "string" } }
/// });
///
/// assert!(validate(&schema, &json!({ "name": "roads" })).is_ok());
/// assert!(validate(&schema, &json!({ "title": "Roads" })).is_err());
/// ```
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_serialized<T: Serialize>(schema: &Value, payload: &T) -> Result<(), Vec<String>> {
    let data = serde_json::to_value(payload).map_err(|e| vec![e.to_string()])?;
    validate(schema, &data)
}

/// Validate a `package_create` payload.
pub fn validate_package<T: Serialize>(package: &T) -> Result<(), Vec<String>> {
    validate_serialized(&PACKAGE_SCHEMA, package)
}

/// Validate a resource upload.
pub fn validate_resource<T: Serialize>(resource: &T) -> Result<(), Vec<String>> {
    validate_serialized(&RESOURCE_SCHEMA, resource)
}

/// Validate every planned dataset and resource, collecting all failures.
pub fn validate_plan(datasets: &[PlannedDataset]) -> Result<(), ValidationError> {
    let mut failures = Vec::new();

    for planned in datasets {
        let name = &planned.package.name;
        if let Err(errs) = validate_package(&planned.package) {
            failures.push(format!("dataset '{}': {}", name, errs.join(", ")));
        }
        for resource in &planned.resources {
            if let Err(errs) = validate_resource(resource) {
                failures.push(format!(
                    "resource '{}' of '{}': {}",
                    resource.name,
                    name,
                    errs.join(", ")
                ));
            }
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::SchemaError(failures))
    }
}
