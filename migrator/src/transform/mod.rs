//! Transformation module.
//!
//! This module turns index rows into what gets published:
//! - Catalog: flat rows to datasets with ordered resources
//! - Reconcile: organization/group titles to target ids
//! - Materialize: resources to files on disk
//! - Publish: sequential dataset and resource creation
//! - Pipeline: the whole run

pub mod catalog;
pub mod license;
pub mod mapping;
pub mod materialize;
pub mod pipeline;
pub mod publish;
pub mod reconcile;
pub mod slug;

pub use catalog::{build_catalog, Catalog, CatalogBuilder};
pub use license::LicenseTable;
pub use mapping::ColumnMapping;
pub use materialize::{materialize, FileIndex};
pub use pipeline::*;
pub use publish::{publish, PlannedDataset, PublishPlan, PublishReport, PublishedDataset};
pub use reconcile::{EntityIndex, Reconciler};
