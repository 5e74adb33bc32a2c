//! Error types for the migration pipeline.
//!
//! One enum per stage, plus the top-level [`PipelineError`]:
//!
//! - [`CsvError`] - reading and decoding the catalog index
//! - [`BuildError`] - folding rows into datasets
//! - [`CkanError`] - talking to the target catalog
//! - [`ValidationError`] - payload schema checks
//! - [`PublishError`] - uploading datasets and resource files
//! - [`PipelineError`] - orchestration
//!
//! Conversion into [`PipelineError`] is automatic via `From`, so `?` works
//! across stage boundaries.

use std::path::PathBuf;
use thiserror::Error;

use crate::transform::publish::PublishReport;

// =============================================================================
// CSV Errors
// =============================================================================

/// Errors while reading the catalog index.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Content could not be decoded.
    #[error("Failed to decode content: {0}")]
    EncodingError(String),

    /// A record could not be parsed.
    #[error("Line {line}: {message}")]
    ParseError { line: u64, message: String },

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// The header lacks columns the mapping needs.
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

// =============================================================================
// Catalog Build Errors
// =============================================================================

/// Errors while folding rows into datasets.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A timestamp column did not match the Socrata format.
    #[error("Line {line}, column '{column}' (value '{value}'): invalid date")]
    InvalidDate {
        line: u64,
        column: String,
        value: String,
    },

    /// A child row references a dataset that was never built.
    #[error("Dangling parent reference: resource '{resource_id}' points to unknown dataset '{parent_id}'")]
    DanglingParent {
        resource_id: String,
        parent_id: String,
    },

    /// Two root rows share the same identifier.
    #[error("Duplicate dataset identifier '{0}'")]
    DuplicateDataset(String),

    /// Row lacks a column the mapping names.
    #[error("Line {line}: missing column '{column}'")]
    MissingField { line: u64, column: String },

    /// A dataset references an organization or group the target does not know.
    #[error("Dataset '{dataset}' references unknown {kind} '{title}'")]
    UnresolvedReference {
        dataset: String,
        kind: &'static str,
        title: String,
    },
}

// =============================================================================
// CKAN Client Errors
// =============================================================================

/// Errors from the CKAN action API.
#[derive(Debug, Error)]
pub enum CkanError {
    /// Transport failure.
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// The action returned `success: false` or a non-2xx status.
    #[error("Action '{action}' failed: {message}")]
    ActionFailed { action: String, message: String },

    /// The response body was not the expected envelope.
    #[error("Invalid response from '{action}': {message}")]
    InvalidResponse { action: String, message: String },

    /// Local file for an upload could not be opened.
    #[error("Cannot open upload '{}': {source}", path.display())]
    Upload {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Payloads that failed the embedded schemas.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// One entry per failing payload.
    #[error("{} payload(s) failed validation: {}", .0.len(), .0.join("; "))]
    SchemaError(Vec<String>),
}

// =============================================================================
// Publish Errors
// =============================================================================

/// Errors while pushing the plan to the target catalog.
///
/// Both variants carry what was created before the failure; nothing is
/// rolled back.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Dataset creation failed.
    #[error("Creating dataset '{name}' failed: {source}")]
    Dataset {
        name: String,
        #[source]
        source: CkanError,
        partial: PublishReport,
    },

    /// Resource creation failed.
    #[error("Creating resource '{resource}' of dataset '{dataset}' failed: {source}")]
    Resource {
        dataset: String,
        resource: String,
        #[source]
        source: CkanError,
        partial: PublishReport,
    },
}

impl PublishError {
    /// Datasets and resources created before the failure.
    pub fn partial(&self) -> &PublishReport {
        match self {
            PublishError::Dataset { partial, .. } | PublishError::Resource { partial, .. } => {
                partial
            }
        }
    }
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level orchestration errors.
///
/// Returned by [`crate::transform::pipeline::migrate`]; wraps every stage error.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Catalog build error.
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Remote catalog error.
    #[error("CKAN error: {0}")]
    Ckan(#[from] CkanError),

    /// Payload validation error.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Publishing error.
    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    /// Mapping file could not be loaded.
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// Plan output could not be written.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// No rows survived parsing.
    #[error("No records to migrate")]
    EmptyInput,
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for catalog building.
pub type BuildResult<T> = Result<T, BuildError>;

/// Result type for CKAN operations.
pub type CkanResult<T> = Result<T, CkanError>;

/// Result type for publishing.
pub type PublishResult<T> = Result<T, PublishError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let csv_err = CsvError::EmptyFile;
        let pipeline_err: PipelineError = csv_err.into();
        assert!(pipeline_err.to_string().contains("empty"));

        let build_err = BuildError::DanglingParent {
            resource_id: "b".into(),
            parent_id: "a".into(),
        };
        let pipeline_err: PipelineError = build_err.into();
        assert!(pipeline_err.to_string().contains("Dangling parent"));
    }

    #[test]
    fn test_missing_columns_format() {
        let err = CsvError::MissingColumns(vec!["U ID".into(), "Name".into()]);
        assert_eq!(err.to_string(), "Missing required columns: U ID, Name");
    }

    #[test]
    fn test_invalid_date_format() {
        let err = BuildError::InvalidDate {
            line: 4,
            column: "Creation Date".into(),
            value: "yesterday".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Line 4"));
        assert!(msg.contains("column 'Creation Date'"));
        assert!(msg.contains("value 'yesterday'"));
    }
}
