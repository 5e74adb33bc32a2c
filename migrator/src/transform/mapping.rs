//! Column mapping: which source column feeds which catalog field.
//!
//! The built-in `socrata-v1` mapping matches the Socrata catalog export.
//! Other exports can supply their own mapping as JSON:
//!
//! ```json
//! { "version": "socrata-v1", "id": "U ID", "parent_id": "Parent UID", ... }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::PipelineError;

/// Source column names for every field the builder reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    /// Mapping version label
    #[serde(default = "default_version")]
    pub version: String,
    pub id: String,
    pub parent_id: String,
    pub name: String,
    pub description: String,
    pub keywords: String,
    pub license: String,
    pub public: String,
    pub category: String,
    pub owner: String,
    pub contact_email: String,
    pub created: String,
    pub last_modified: String,
    pub derived_view: String,
    pub organization: String,
    pub source_link: String,
}

fn default_version() -> String {
    "socrata-v1".to_string()
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self::socrata_v1()
    }
}

impl ColumnMapping {
    /// Columns of the Socrata catalog export.
    pub fn socrata_v1() -> Self {
        Self {
            version: default_version(),
            id: "U ID".into(),
            parent_id: "Parent UID".into(),
            name: "Name".into(),
            description: "Description".into(),
            keywords: "Keywords".into(),
            license: "License".into(),
            public: "Public".into(),
            category: "Category".into(),
            owner: "Owner".into(),
            contact_email: "Contact Email".into(),
            created: "Creation Date".into(),
            last_modified: "Last Update Date (data)".into(),
            derived_view: "Derived View".into(),
            organization: "data_provided_by".into(),
            source_link: "source_link".into(),
        }
    }

    /// Parse from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, PipelineError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content).map_err(|e| {
            PipelineError::Mapping(format!("{}: {}", path.display(), e))
        })
    }

    /// Every column the header must contain.
    pub fn required_columns(&self) -> Vec<&str> {
        vec![
            &self.id,
            &self.parent_id,
            &self.name,
            &self.description,
            &self.keywords,
            &self.license,
            &self.public,
            &self.category,
            &self.owner,
            &self.contact_email,
            &self.created,
            &self.last_modified,
            &self.derived_view,
            &self.organization,
            &self.source_link,
        ]
        .into_iter()
        .map(String::as_str)
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_socrata() {
        let mapping = ColumnMapping::default();
        assert_eq!(mapping.version, "socrata-v1");
        assert_eq!(mapping.last_modified, "Last Update Date (data)");
        assert_eq!(mapping.required_columns().len(), 15);
    }

    #[test]
    fn test_from_json_defaults_version() {
        let mut value = serde_json::to_value(ColumnMapping::socrata_v1()).unwrap();
        value.as_object_mut().unwrap().remove("version");
        value["organization"] = serde_json::json!("Publisher");

        let mapping = ColumnMapping::from_json(&value.to_string()).unwrap();
        assert_eq!(mapping.version, "socrata-v1");
        assert_eq!(mapping.organization, "Publisher");
        assert!(mapping.required_columns().contains(&"Publisher"));
    }

    #[test]
    fn test_from_json_rejects_incomplete() {
        assert!(ColumnMapping::from_json(r#"{"id": "U ID"}"#).is_err());
    }
}
