//! Domain models for the migration pipeline.
//!
//! - [`SourceRow`] - one row of the Socrata index
//! - [`DatasetRecord`] / [`ResourceRecord`] - the folded catalog
//! - [`Tag`] - CKAN keyword
//! - [`CatalogEntity`] - organization or group on the target
//! - [`PackagePayload`] / [`ResourceUpload`] - what is sent to CKAN

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

// =============================================================================
// Source Row
// =============================================================================

/// One flat row of the catalog index, keyed by header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRow {
    /// 1-based line number in the CSV file (header is line 1).
    pub line: u64,
    /// Column name -> raw value.
    pub fields: HashMap<String, String>,
}

impl SourceRow {
    pub fn new(line: u64, fields: HashMap<String, String>) -> Self {
        Self { line, fields }
    }

    /// Raw value of a column, if the column exists.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    /// Trimmed value, `None` when absent or blank.
    pub fn non_empty(&self, column: &str) -> Option<&str> {
        self.get(column).map(str::trim).filter(|v| !v.is_empty())
    }
}

// =============================================================================
// Catalog Records
// =============================================================================

/// A CKAN keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
}

/// A resource as folded from one source row, before file matching.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceRecord {
    pub name: String,
    /// ISO-8601, UTC.
    pub created: String,
    /// ISO-8601, UTC.
    pub last_modified: String,
    /// Only set for child rows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `U ID` of the row, used to find the file on disk.
    pub source_id: String,
}

/// A dataset as folded from its root row.
///
/// Organization and group are still human-readable titles here; the
/// reconciler turns them into target references.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetRecord {
    /// `U ID` of the root row.
    pub id: String,
    pub name: String,
    pub title: String,
    pub tags: Vec<Tag>,
    pub private: bool,
    pub notes: String,
    pub maintainer: String,
    pub maintainer_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub resources: Vec<ResourceRecord>,
}

// =============================================================================
// Target Catalog Entities
// =============================================================================

/// Organization or group as known by the target catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntity {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub title: String,
}

/// Which kind of entity a reference points to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Organization,
    Group,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Organization => "organization",
            Self::Group => "group",
        }
    }
}

/// Entry of the target's `license_list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

// =============================================================================
// Payloads
// =============================================================================

/// Group reference inside a package payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRef {
    pub id: String,
}

/// Body of `package_create`. Optional keys are omitted, never `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackagePayload {
    pub name: String,
    pub title: String,
    pub tags: Vec<Tag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_org: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupRef>,
    pub private: bool,
    pub notes: String,
    pub maintainer: String,
    pub maintainer_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A resource matched to a local file, ready for `resource_create`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceUpload {
    pub name: String,
    pub created: String,
    pub last_modified: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Uppercased file extension, empty when the file has none.
    pub format: String,
    pub upload_path: PathBuf,
}

/// Result of `package_create`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedPackage {
    pub id: String,
    pub name: String,
}

/// Result of `resource_create`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedResource {
    pub id: String,
    #[serde(default)]
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_row_non_empty() {
        let mut fields = HashMap::new();
        fields.insert("Name".to_string(), "  Roads ".to_string());
        fields.insert("Category".to_string(), "   ".to_string());
        let row = SourceRow::new(2, fields);

        assert_eq!(row.non_empty("Name"), Some("Roads"));
        assert_eq!(row.non_empty("Category"), None);
        assert_eq!(row.non_empty("Owner"), None);
    }

    #[test]
    fn test_package_payload_omits_unset_keys() {
        let payload = PackagePayload {
            name: "roads-abcd-1234".into(),
            title: "Roads".into(),
            tags: vec![],
            license_id: None,
            owner_org: None,
            groups: vec![],
            private: false,
            notes: String::new(),
            maintainer: String::new(),
            maintainer_email: String::new(),
            url: None,
        };
        let json = serde_json::to_value(&payload).unwrap();

        assert!(json.get("license_id").is_none());
        assert!(json.get("owner_org").is_none());
        assert!(json.get("groups").is_none());
        assert!(json.get("url").is_none());
        assert_eq!(json["private"], false);
    }

    #[test]
    fn test_catalog_entity_title_defaults() {
        let entity: CatalogEntity =
            serde_json::from_str(r#"{"id": "1", "name": "gov-a"}"#).unwrap();
        assert_eq!(entity.title, "");
    }
}
