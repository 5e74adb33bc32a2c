//! Fold flat index rows into datasets with ordered resources.
//!
//! # Architecture
//!
//! ```text
//! Index rows (flat)                        Catalog
//! ┌──────────────────────────────┐        ┌───────────────────────────┐
//! │ U ID: B, Parent UID: A       │        │ A "Roads"                 │
//! │ U ID: A, Parent UID: -       │   →    │   resources: [A, B]       │
//! │ U ID: C, Parent UID: -       │        ├───────────────────────────┤
//! │ U ID: D, Derived View: true  │        │ C "Water"                 │
//! └──────────────────────────────┘        │   resources: [C]          │
//!                                          └───────────────────────────┘
//! ```
//!
//! A child row may come before its parent, so the fold runs in two passes:
//! the first builds every dataset and every resource and records
//! `(resource, dataset id)` links in row order, the second resolves the
//! links against the finished dataset index.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::error::{BuildError, BuildResult};
use crate::models::{DatasetRecord, ResourceRecord, SourceRow};

use super::license::LicenseTable;
use super::mapping::ColumnMapping;
use super::slug::{dataset_name, parse_tags};

/// Socrata export timestamp, e.g. `01/02/2020 03:04:05 PM +0000`.
pub const SOCRATA_TIMESTAMP: &str = "%m/%d/%Y %I:%M:%S %p %z";

/// Datasets in first-seen order with an id index.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    datasets: Vec<DatasetRecord>,
    index: HashMap<String, usize>,
    /// Rows dropped because they were derived views.
    pub skipped_derived: usize,
}

impl Catalog {
    pub fn get(&self, id: &str) -> Option<&DatasetRecord> {
        self.index.get(id).map(|&slot| &self.datasets[slot])
    }

    pub fn datasets(&self) -> &[DatasetRecord] {
        &self.datasets
    }

    pub fn iter(&self) -> impl Iterator<Item = &DatasetRecord> {
        self.datasets.iter()
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    /// Total resources across all datasets.
    pub fn resource_count(&self) -> usize {
        self.datasets.iter().map(|d| d.resources.len()).sum()
    }

    fn insert(&mut self, dataset: DatasetRecord) -> BuildResult<()> {
        if self.index.contains_key(&dataset.id) {
            return Err(BuildError::DuplicateDataset(dataset.id));
        }
        self.index.insert(dataset.id.clone(), self.datasets.len());
        self.datasets.push(dataset);
        Ok(())
    }
}

/// Builds a [`Catalog`] from rows using a column mapping and license table.
pub struct CatalogBuilder<'a> {
    mapping: &'a ColumnMapping,
    licenses: &'a LicenseTable,
}

impl<'a> CatalogBuilder<'a> {
    pub fn new(mapping: &'a ColumnMapping, licenses: &'a LicenseTable) -> Self {
        Self { mapping, licenses }
    }

    /// Fold rows into a catalog.
    pub fn build<I>(&self, rows: I) -> BuildResult<Catalog>
    where
        I: IntoIterator<Item = SourceRow>,
    {
        let mut catalog = Catalog::default();
        let mut links: Vec<(ResourceRecord, String)> = Vec::new();

        for row in rows {
            if self.is_derived_view(&row) {
                catalog.skipped_derived += 1;
                continue;
            }

            let id = self.field(&row, &self.mapping.id)?.trim().to_string();
            let parent = row
                .non_empty(&self.mapping.parent_id)
                .map(str::to_string);

            let dataset_id = match parent {
                Some(parent_id) => parent_id,
                None => {
                    catalog.insert(self.dataset_from_row(&row, &id)?)?;
                    id.clone()
                }
            };

            let is_child = dataset_id != id;
            links.push((self.resource_from_row(&row, &id, is_child)?, dataset_id));
        }

        for (resource, dataset_id) in links {
            let slot = match catalog.index.get(&dataset_id) {
                Some(&slot) => slot,
                None => {
                    return Err(BuildError::DanglingParent {
                        resource_id: resource.source_id,
                        parent_id: dataset_id,
                    })
                }
            };
            catalog.datasets[slot].resources.push(resource);
        }

        Ok(catalog)
    }

    fn is_derived_view(&self, row: &SourceRow) -> bool {
        row.non_empty(&self.mapping.derived_view)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }

    fn dataset_from_row(&self, row: &SourceRow, id: &str) -> BuildResult<DatasetRecord> {
        let m = self.mapping;
        let title = self.field(row, &m.name)?.trim().to_string();
        let public = self.field(row, &m.public)?.trim();

        Ok(DatasetRecord {
            id: id.to_string(),
            name: dataset_name(&title, id),
            tags: parse_tags(self.field(row, &m.keywords)?),
            private: !public.eq_ignore_ascii_case("true"),
            notes: self.field(row, &m.description)?.to_string(),
            maintainer: self.field(row, &m.owner)?.trim().to_string(),
            maintainer_email: self.field(row, &m.contact_email)?.trim().to_string(),
            license_id: self
                .licenses
                .resolve(self.field(row, &m.license)?.trim())
                .map(str::to_string),
            organization_title: row.non_empty(&m.organization).map(str::to_string),
            group_title: row.non_empty(&m.category).map(str::to_string),
            url: row.non_empty(&m.source_link).map(str::to_string),
            title,
            resources: Vec::new(),
        })
    }

    fn resource_from_row(
        &self,
        row: &SourceRow,
        id: &str,
        is_child: bool,
    ) -> BuildResult<ResourceRecord> {
        let m = self.mapping;
        let description = if is_child {
            Some(self.field(row, &m.description)?.to_string())
        } else {
            None
        };

        Ok(ResourceRecord {
            name: self.field(row, &m.name)?.trim().to_string(),
            created: self.timestamp(row, &m.created)?,
            last_modified: self.timestamp(row, &m.last_modified)?,
            description,
            source_id: id.to_string(),
        })
    }

    fn field<'r>(&self, row: &'r SourceRow, column: &str) -> BuildResult<&'r str> {
        row.get(column).ok_or_else(|| BuildError::MissingField {
            line: row.line,
            column: column.to_string(),
        })
    }

    fn timestamp(&self, row: &SourceRow, column: &str) -> BuildResult<String> {
        let raw = self.field(row, column)?;
        parse_socrata_timestamp(raw).ok_or_else(|| BuildError::InvalidDate {
            line: row.line,
            column: column.to_string(),
            value: raw.to_string(),
        })
    }
}

/// Fold rows with the given mapping and license table.
pub fn build_catalog<I>(
    rows: I,
    mapping: &ColumnMapping,
    licenses: &LicenseTable,
) -> BuildResult<Catalog>
where
    I: IntoIterator<Item = SourceRow>,
{
    CatalogBuilder::new(mapping, licenses).build(rows)
}

/// Parse a Socrata timestamp into ISO-8601 UTC without offset.
pub fn parse_socrata_timestamp(raw: &str) -> Option<String> {
    DateTime::parse_from_str(raw.trim(), SOCRATA_TIMESTAMP)
        .ok()
        .map(|dt| {
            dt.with_timezone(&Utc)
                .format("%Y-%m-%dT%H:%M:%S")
                .to_string()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATE: &str = "01/02/2020 03:04:05 PM +0000";

    fn row(line: u64, pairs: &[(&str, &str)]) -> SourceRow {
        let mapping = ColumnMapping::socrata_v1();
        let mut fields: HashMap<String, String> = mapping
            .required_columns()
            .into_iter()
            .map(|c| (c.to_string(), String::new()))
            .collect();
        fields.insert("Creation Date".into(), DATE.into());
        fields.insert("Last Update Date (data)".into(), DATE.into());
        fields.insert("Derived View".into(), "false".into());
        for (k, v) in pairs {
            fields.insert(k.to_string(), v.to_string());
        }
        SourceRow::new(line, fields)
    }

    fn build(rows: Vec<SourceRow>) -> BuildResult<Catalog> {
        build_catalog(rows, &ColumnMapping::socrata_v1(), &LicenseTable::socrata())
    }

    #[test]
    fn test_parent_and_child() {
        let catalog = build(vec![
            row(2, &[("U ID", "A"), ("Name", "Roads")]),
            row(3, &[("U ID", "B"), ("Parent UID", "A"), ("Name", "Roads 2020")]),
        ])
        .unwrap();

        assert_eq!(catalog.len(), 1);
        let dataset = catalog.get("A").unwrap();
        let names: Vec<&str> = dataset.resources.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Roads", "Roads 2020"]);
        assert_eq!(dataset.resources[0].source_id, "A");
        assert_eq!(dataset.resources[1].source_id, "B");
    }

    #[test]
    fn test_child_before_parent() {
        let catalog = build(vec![
            row(2, &[("U ID", "B"), ("Parent UID", "A"), ("Name", "Child")]),
            row(3, &[("U ID", "A"), ("Name", "Parent")]),
        ])
        .unwrap();

        let sources: Vec<&str> = catalog
            .get("A")
            .unwrap()
            .resources
            .iter()
            .map(|r| r.source_id.as_str())
            .collect();
        assert_eq!(sources, vec!["B", "A"]);
    }

    #[test]
    fn test_root_is_its_own_first_resource() {
        let catalog = build(vec![
            row(2, &[("U ID", "A"), ("Name", "Roads")]),
            row(3, &[("U ID", "C"), ("Name", "Water")]),
        ])
        .unwrap();

        for id in ["A", "C"] {
            let dataset = catalog.get(id).unwrap();
            assert_eq!(dataset.resources[0].source_id, id);
        }
        let order: Vec<&str> = catalog.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(order, vec!["A", "C"]);
    }

    #[test]
    fn test_only_child_resources_get_description() {
        let catalog = build(vec![
            row(2, &[("U ID", "A"), ("Description", "All roads")]),
            row(3, &[("U ID", "B"), ("Parent UID", "A"), ("Description", "2020 only")]),
        ])
        .unwrap();

        let dataset = catalog.get("A").unwrap();
        assert_eq!(dataset.notes, "All roads");
        assert_eq!(dataset.resources[0].description, None);
        assert_eq!(dataset.resources[1].description.as_deref(), Some("2020 only"));
    }

    #[test]
    fn test_dataset_fields() {
        let catalog = build(vec![row(
            2,
            &[
                ("U ID", "abcd-1234"),
                ("Name", "Roads"),
                ("Keywords", "Health, Education, "),
                ("License", "Public Domain"),
                ("Public", "true"),
                ("Category", "Transport"),
                ("Owner", "Jane"),
                ("Contact Email", "jane@example.org"),
                ("data_provided_by", "Gov A"),
                ("source_link", "https://example.org/roads"),
            ],
        )])
        .unwrap();

        let d = catalog.get("abcd-1234").unwrap();
        assert_eq!(d.name, "roads-abcd-1234");
        assert_eq!(d.title, "Roads");
        let tags: Vec<&str> = d.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(tags, vec!["health", "education"]);
        assert_eq!(d.license_id.as_deref(), Some("other-pd"));
        assert!(!d.private);
        assert_eq!(d.group_title.as_deref(), Some("Transport"));
        assert_eq!(d.organization_title.as_deref(), Some("Gov A"));
        assert_eq!(d.maintainer, "Jane");
        assert_eq!(d.maintainer_email, "jane@example.org");
        assert_eq!(d.url.as_deref(), Some("https://example.org/roads"));
    }

    #[test]
    fn test_optional_fields_absent() {
        let catalog = build(vec![row(2, &[("U ID", "A"), ("License", "Custom terms")])]).unwrap();

        let d = catalog.get("A").unwrap();
        assert!(d.private);
        assert_eq!(d.license_id, None);
        assert_eq!(d.organization_title, None);
        assert_eq!(d.group_title, None);
        assert_eq!(d.url, None);
    }

    #[test]
    fn test_derived_view_dropped() {
        let catalog = build(vec![
            row(2, &[("U ID", "A")]),
            row(3, &[("U ID", "D"), ("Parent UID", "A"), ("Derived View", "true")]),
            row(4, &[("U ID", "E"), ("Derived View", "TRUE")]),
        ])
        .unwrap();

        assert_eq!(catalog.len(), 1);
        assert!(catalog.get("E").is_none());
        assert_eq!(catalog.resource_count(), 1);
        assert_eq!(catalog.skipped_derived, 2);
    }

    #[test]
    fn test_derived_view_is_not_a_parent() {
        let err = build(vec![
            row(2, &[("U ID", "D"), ("Derived View", "true")]),
            row(3, &[("U ID", "B"), ("Parent UID", "D")]),
        ])
        .unwrap_err();

        assert!(matches!(err, BuildError::DanglingParent { ref parent_id, .. } if parent_id == "D"));
    }

    #[test]
    fn test_dangling_parent() {
        let err = build(vec![row(2, &[("U ID", "B"), ("Parent UID", "missing")])]).unwrap_err();

        match err {
            BuildError::DanglingParent { resource_id, parent_id } => {
                assert_eq!(resource_id, "B");
                assert_eq!(parent_id, "missing");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_date_fails() {
        let err = build(vec![row(5, &[("U ID", "A"), ("Creation Date", "2020-01-02")])]).unwrap_err();

        assert!(matches!(err, BuildError::InvalidDate { line: 5, .. }));
    }

    #[test]
    fn test_duplicate_root() {
        let err = build(vec![row(2, &[("U ID", "A")]), row(3, &[("U ID", "A")])]).unwrap_err();
        assert!(matches!(err, BuildError::DuplicateDataset(ref id) if id == "A"));
    }

    #[test]
    fn test_parse_socrata_timestamp() {
        assert_eq!(parse_socrata_timestamp(DATE).as_deref(), Some("2020-01-02T15:04:05"));
        assert_eq!(
            parse_socrata_timestamp("12/31/2019 11:30:00 PM -0200").as_deref(),
            Some("2020-01-01T01:30:00")
        );
        assert_eq!(parse_socrata_timestamp(""), None);
        assert_eq!(parse_socrata_timestamp("13/01/2020 01:00:00 AM +0000"), None);
    }
}
