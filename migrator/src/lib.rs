//! # Migrator - Socrata catalog export to CKAN
//!
//! Reads the CSV index of a Socrata export, folds its rows into datasets with
//! ordered resources, creates the organizations and groups the target is
//! missing, then publishes every dataset and uploads its files.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Index CSV  │────▶│   Parser    │────▶│   Catalog   │────▶│  Reconcile  │────▶│   Publish   │
//! │  (ISO/UTF8) │     │  (auto-enc) │     │  (2 passes) │     │ (orgs/grps) │     │ (+ uploads) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!                                                                                        ▲
//!                                                              files dir ── Materialize ─┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use migrator::{migrate, CkanClient, MigrateOptions};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = CkanClient::new("https://data.example.org", "api-key");
//!     let options = MigrateOptions { dry_run: true, ..MigrateOptions::default() };
//!     let result = migrate(&client, Path::new("index.csv"), &options).await.unwrap();
//!     println!("Would publish {} datasets", result.plan.datasets.len());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Source rows, datasets, CKAN payloads
//! - [`parser`] - CSV parsing with auto-detection
//! - [`transform`] - Catalog, reconciliation, materialization, publishing
//! - [`validation`] - CKAN payload schema validation
//! - [`ckan`] - CKAN action API client
//! - [`logs`] - Progress logging

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Validation
pub mod validation;

// Target catalog
pub mod ckan;

// Logging
pub mod logs;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    BuildError,
    CkanError,
    CsvError,
    PipelineError,
    PublishError,
    ValidationError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    CatalogEntity,
    DatasetRecord,
    EntityKind,
    License,
    PackagePayload,
    ResourceRecord,
    ResourceUpload,
    SourceRow,
    Tag,
};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    parse_bytes_auto,
    parse_str,
    detect_encoding,
    detect_delimiter,
    decode_content,
    ParseResult,
};

// =============================================================================
// Re-exports - CKAN
// =============================================================================

pub use ckan::{CatalogApi, CkanClient};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::{
    build_catalog,
    Catalog,
    ColumnMapping,
    FileIndex,
    LicenseTable,
    PublishPlan,
    PublishReport,
    Reconciler,
};

pub use transform::pipeline::{
    migrate,
    migrate_bytes,
    CsvInfo,
    MigrateOptions,
    MigrationResult,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{validate, validate_package, validate_plan, validate_resource};
