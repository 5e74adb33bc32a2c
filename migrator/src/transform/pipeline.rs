//! High-level migration pipeline.
//!
//! Combines every stage: parse the index, fold it into a catalog, reconcile
//! organizations and groups, match files, validate, publish.
//!
//! # Example
//!
//! ```rust,ignore
//! use migrator::ckan::CkanClient;
//! use migrator::transform::pipeline::{migrate, MigrateOptions};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = CkanClient::new("https://data.example.org", "api-key");
//!     let options = MigrateOptions {
//!         files_dir: Some("export/files".into()),
//!         ..MigrateOptions::default()
//!     };
//!     let result = migrate(&client, Path::new("export/index.csv"), &options).await?;
//!     println!("Planned {} datasets", result.plan.datasets.len());
//!     Ok(())
//! }
//! ```

use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::ckan::CatalogApi;
use crate::error::{CsvError, PipelineError, PipelineResult};
use crate::models::{CatalogEntity, ResourceUpload};
use crate::logs::{log_error, log_info, log_info_indent, log_success, log_warning};
use crate::parser::{parse_bytes_auto, ParseResult};
use crate::validation::validate_plan;

use super::catalog::{build_catalog, Catalog};
use super::license::LicenseTable;
use super::mapping::ColumnMapping;
use super::materialize::{materialize, FileIndex};
use super::publish::{publish, PlannedDataset, PublishPlan, PublishReport};
use super::reconcile::Reconciler;

/// Options for a migration run
#[derive(Debug, Clone)]
pub struct MigrateOptions {
    /// Root directory holding the resource files
    pub files_dir: Option<PathBuf>,

    /// Source column names
    pub mapping: ColumnMapping,

    /// Plan only: no create calls on the target
    pub dry_run: bool,

    /// Skip payload schema validation
    pub skip_validation: bool,
}

impl Default for MigrateOptions {
    fn default() -> Self {
        Self {
            files_dir: None,
            mapping: ColumnMapping::socrata_v1(),
            dry_run: false,
            skip_validation: false,
        }
    }
}

/// Index file information
#[derive(Debug, Clone, Serialize)]
pub struct CsvInfo {
    pub encoding: String,
    pub delimiter: char,
    pub headers: Vec<String>,
    pub row_count: usize,
}

/// Result of a migration run
#[derive(Debug, Clone, Serialize)]
pub struct MigrationResult {
    pub csv_info: CsvInfo,

    /// What was (or, in a dry run, would be) sent
    pub plan: PublishPlan,

    /// `None` for a dry run
    pub report: Option<PublishReport>,

    /// Rows dropped as derived views
    pub skipped_derived: usize,

    /// Resources without a matching file
    pub dropped_resources: usize,
}

/// Migrate the index file at `path` into the target catalog.
pub async fn migrate<A: CatalogApi>(
    api: &A,
    path: &Path,
    options: &MigrateOptions,
) -> PipelineResult<MigrationResult> {
    log_info(format!("📖 Reading index {}", path.display()));
    let bytes = tokio::fs::read(path).await.map_err(CsvError::from)?;
    migrate_bytes(api, &bytes, options).await
}

/// Migrate index content already in memory.
pub async fn migrate_bytes<A: CatalogApi>(
    api: &A,
    bytes: &[u8],
    options: &MigrateOptions,
) -> PipelineResult<MigrationResult> {
    // Step 1: parse
    let parsed = parse_bytes_auto(bytes, &options.mapping.required_columns())?;
    let csv_info = csv_info(&parsed);
    log_success(format!(
        "Read {} rows (encoding {}, delimiter '{}')",
        csv_info.row_count,
        csv_info.encoding,
        format_delimiter(csv_info.delimiter)
    ));
    if parsed.rows.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    // Step 2: licenses offered by the target
    log_info("📜 Fetching target licenses...");
    let licenses = license_table(api).await?;

    // Step 3: fold rows into datasets
    log_info("📦 Building catalog...");
    let catalog = build_catalog(parsed.rows, &options.mapping, &licenses)?;
    log_success(format!(
        "{} datasets, {} resources ({} derived views skipped)",
        catalog.len(),
        catalog.resource_count(),
        catalog.skipped_derived
    ));

    // Step 4: organizations and groups
    log_info("🏛️  Reconciling organizations and groups...");
    let mut reconciler = Reconciler::from_api(api).await?;
    let mut preview = reconciler.clone();
    let pending = preview.register_pending(&catalog);
    for entity in &pending {
        log_info(format!("→ missing on target: {} ({})", entity.title, entity.name));
    }

    // Step 5: files
    let files = match options.files_dir {
        Some(ref dir) => {
            log_info(format!("🔎 Scanning files under {}", dir.display()));
            let index = FileIndex::scan(dir)?;
            log_success(format!("{} files found", index.len()));
            index
        }
        None => {
            log_warning("No files directory given; every resource will be skipped");
            FileIndex::default()
        }
    };
    let uploads = materialize_all(&catalog, &files);

    // Step 6: validate before the first write
    let preview_plan = plan(&preview, &catalog, &uploads, pending)?;
    if options.skip_validation {
        log_info("(validation skipped)");
    } else {
        log_info("✔️  Validating payloads...");
        validate_plan(&preview_plan.datasets)?;
        log_success(format!("All {} datasets valid", preview_plan.datasets.len()));
    }

    let dropped_resources = catalog.resource_count() - preview_plan.resource_count();
    if dropped_resources > 0 {
        log_warning(format!("{} resource(s) have no file and will not be uploaded", dropped_resources));
    }

    if options.dry_run {
        log_info("Dry run: nothing was created");
        return Ok(MigrationResult {
            csv_info,
            plan: preview_plan,
            report: None,
            skipped_derived: catalog.skipped_derived,
            dropped_resources,
        });
    }

    // Step 7: create what is missing, then publish
    let created = reconciler.create_missing(api, &catalog).await?;
    let final_plan = plan(&reconciler, &catalog, &uploads, created)?;

    log_info(format!(
        "🚀 Publishing {} datasets, {} resources...",
        final_plan.datasets.len(),
        final_plan.resource_count()
    ));
    let report = match publish(api, &final_plan).await {
        Ok(report) => report,
        Err(e) => {
            log_error(format!("Run stopped: {}", e));
            let partial = e.partial();
            log_warning(format!(
                "Already on the target: {} dataset(s), {} resource(s)",
                partial.datasets.len(),
                partial.resource_count()
            ));
            for dataset in &partial.datasets {
                log_info_indent(
                    format!(
                        "{} ({}) resources: [{}]",
                        dataset.name,
                        dataset.id,
                        dataset.resource_ids.join(", ")
                    ),
                    1,
                );
            }
            return Err(e.into());
        }
    };

    Ok(MigrationResult {
        csv_info,
        plan: final_plan,
        report: Some(report),
        skipped_derived: catalog.skipped_derived,
        dropped_resources,
    })
}

/// Static license table restricted to what the target offers.
async fn license_table<A: CatalogApi>(api: &A) -> PipelineResult<LicenseTable> {
    let mut table = LicenseTable::socrata();
    let offered: HashSet<String> = api
        .list_licenses()
        .await?
        .into_iter()
        .map(|l| l.id)
        .collect();

    if offered.is_empty() {
        log_warning("Target reports no licenses; keeping the built-in table");
    } else {
        table.restrict_to(&offered);
    }
    Ok(table)
}

fn materialize_all(catalog: &Catalog, files: &FileIndex) -> Vec<Vec<ResourceUpload>> {
    catalog
        .iter()
        .map(|dataset| materialize(&dataset.resources, files))
        .collect()
}

fn plan(
    reconciler: &Reconciler,
    catalog: &Catalog,
    uploads: &[Vec<ResourceUpload>],
    new_entities: Vec<CatalogEntity>,
) -> PipelineResult<PublishPlan> {
    let packages = reconciler.attach_all(catalog)?;
    let datasets = packages
        .into_iter()
        .zip(uploads.iter().cloned())
        .map(|(package, resources)| PlannedDataset { package, resources })
        .collect();
    Ok(PublishPlan::new(new_entities, datasets))
}

fn csv_info(parsed: &ParseResult) -> CsvInfo {
    CsvInfo {
        encoding: parsed.encoding.clone(),
        delimiter: parsed.delimiter,
        headers: parsed.headers.clone(),
        row_count: parsed.rows.len(),
    }
}

/// Format delimiter for display
fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "TAB".to_string(),
        c => c.to_string(),
    }
}
