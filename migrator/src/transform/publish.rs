//! Push the planned datasets and their files to the target catalog.
//!
//! Strictly sequential: a dataset is created without resources, then each
//! of its resources is created against the new package id with the file
//! streamed as the upload. The first failure stops the run; whatever was
//! created before it stays on the target.

use serde::Serialize;
use uuid::Uuid;

use crate::ckan::CatalogApi;
use crate::error::{PublishError, PublishResult};
use crate::logs::{log_info, log_info_indent, log_success};
use crate::models::{CatalogEntity, PackagePayload, ResourceUpload};

/// One dataset ready to publish.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedDataset {
    pub package: PackagePayload,
    pub resources: Vec<ResourceUpload>,
}

/// Everything a run will send, in send order.
#[derive(Debug, Clone, Serialize)]
pub struct PublishPlan {
    pub run_id: Uuid,
    /// Organizations/groups created (or, in a dry run, to be created).
    pub new_entities: Vec<CatalogEntity>,
    pub datasets: Vec<PlannedDataset>,
}

impl PublishPlan {
    pub fn new(new_entities: Vec<CatalogEntity>, datasets: Vec<PlannedDataset>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            new_entities,
            datasets,
        }
    }

    pub fn resource_count(&self) -> usize {
        self.datasets.iter().map(|d| d.resources.len()).sum()
    }
}

/// A dataset created on the target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedDataset {
    pub id: String,
    pub name: String,
    pub resource_ids: Vec<String>,
}

/// What a completed publish created.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PublishReport {
    pub datasets: Vec<PublishedDataset>,
}

impl PublishReport {
    pub fn resource_count(&self) -> usize {
        self.datasets.iter().map(|d| d.resource_ids.len()).sum()
    }
}

/// Create every planned dataset, then its resources, in plan order.
pub async fn publish<A: CatalogApi>(api: &A, plan: &PublishPlan) -> PublishResult<PublishReport> {
    let mut report = PublishReport::default();
    let total = plan.datasets.len();

    for (i, planned) in plan.datasets.iter().enumerate() {
        let name = &planned.package.name;
        log_info(format!("[{}/{}] Creating dataset {}", i + 1, total, name));

        let created = match api.create_package(&planned.package).await {
            Ok(created) => created,
            Err(source) => {
                return Err(PublishError::Dataset {
                    name: name.clone(),
                    source,
                    partial: report,
                })
            }
        };

        let mut resource_ids = Vec::with_capacity(planned.resources.len());
        for resource in &planned.resources {
            log_info_indent(
                format!("Uploading {} ({})", resource.name, resource.upload_path.display()),
                1,
            );
            match api.create_resource(&created.id, resource).await {
                Ok(uploaded) => resource_ids.push(uploaded.id),
                Err(source) => {
                    // the package itself exists on the target
                    report.datasets.push(PublishedDataset {
                        id: created.id,
                        name: created.name,
                        resource_ids,
                    });
                    return Err(PublishError::Resource {
                        dataset: name.clone(),
                        resource: resource.name.clone(),
                        source,
                        partial: report,
                    });
                }
            }
        }

        report.datasets.push(PublishedDataset {
            id: created.id,
            name: created.name,
            resource_ids,
        });
    }

    log_success(format!(
        "Published {} dataset(s), {} resource(s)",
        report.datasets.len(),
        report.resource_count()
    ));
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ckan::fake::FakeCatalog;
    use std::path::PathBuf;

    fn package(name: &str) -> PackagePayload {
        PackagePayload {
            name: name.into(),
            title: name.into(),
            tags: vec![],
            license_id: None,
            owner_org: None,
            groups: vec![],
            private: false,
            notes: String::new(),
            maintainer: String::new(),
            maintainer_email: String::new(),
            url: None,
        }
    }

    fn upload(name: &str) -> ResourceUpload {
        ResourceUpload {
            name: name.into(),
            created: "2020-01-02T15:04:05".into(),
            last_modified: "2020-01-02T15:04:05".into(),
            description: None,
            format: "CSV".into(),
            upload_path: PathBuf::from(format!("{name}.csv")),
        }
    }

    fn plan() -> PublishPlan {
        PublishPlan::new(
            vec![],
            vec![
                PlannedDataset {
                    package: package("roads"),
                    resources: vec![upload("r1"), upload("r2")],
                },
                PlannedDataset {
                    package: package("water"),
                    resources: vec![],
                },
            ],
        )
    }

    #[tokio::test]
    async fn test_publish_order() {
        let api = FakeCatalog::default();
        let report = publish(&api, &plan()).await.unwrap();

        assert_eq!(
            api.calls(),
            vec![
                "package_create:roads",
                "resource_create:pkg-1/r1",
                "resource_create:pkg-1/r2",
                "package_create:water",
            ]
        );
        assert_eq!(report.datasets.len(), 2);
        assert_eq!(report.resource_count(), 2);
        assert_eq!(report.datasets[0].id, "pkg-1");
    }

    #[tokio::test]
    async fn test_resource_failure_stops_run() {
        let api = FakeCatalog {
            fail_on: Some("resource_create:pkg-1/r1".into()),
            ..FakeCatalog::default()
        };
        let err = publish(&api, &plan()).await.unwrap_err();

        assert!(matches!(err, PublishError::Resource { ref resource, .. } if resource == "r1"));
        assert_eq!(api.calls().len(), 2);

        let partial = err.partial();
        assert_eq!(partial.datasets.len(), 1);
        assert_eq!(partial.datasets[0].id, "pkg-1");
        assert!(partial.datasets[0].resource_ids.is_empty());
    }

    #[tokio::test]
    async fn test_dataset_failure_keeps_earlier_datasets() {
        let api = FakeCatalog {
            fail_on: Some("package_create:water".into()),
            ..FakeCatalog::default()
        };
        let err = publish(&api, &plan()).await.unwrap_err();

        assert!(matches!(err, PublishError::Dataset { ref name, .. } if name == "water"));
        let partial = err.partial();
        assert_eq!(partial.datasets.len(), 1);
        assert_eq!(partial.datasets[0].name, "roads");
        assert_eq!(partial.datasets[0].resource_ids, vec!["res-2", "res-3"]);
        assert_eq!(partial.resource_count(), 2);
    }

    #[test]
    fn test_plan_serializes_paths() {
        let json = serde_json::to_value(plan()).unwrap();
        assert_eq!(json["datasets"][0]["resources"][1]["upload_path"], "r2.csv");
        assert_eq!(json["datasets"][0]["package"]["name"], "roads");
    }
}
