//! Attach local files to resources.
//!
//! A resource is matched by finding its source id inside a file path. The
//! id must sit on an identifier boundary: the characters on either side
//! may not be ASCII alphanumerics or `-`. `abcd-1234` matches
//! `export/abcd-1234.csv` and `abcd-1234/rows.json` but not
//! `xabcd-12345.csv`.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::logs::log_warning;
use crate::models::{ResourceRecord, ResourceUpload};

/// Every file below a root directory, sorted.
#[derive(Debug, Clone, Default)]
pub struct FileIndex {
    paths: Vec<PathBuf>,
}

impl FileIndex {
    /// Walk `root` recursively and collect regular files.
    pub fn scan(root: &Path) -> std::io::Result<Self> {
        let mut paths = Vec::new();
        for entry in WalkDir::new(root).follow_links(true) {
            let entry = entry?;
            if entry.file_type().is_file() {
                paths.push(entry.into_path());
            }
        }
        Ok(Self::from_paths(paths))
    }

    pub fn from_paths(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut paths: Vec<PathBuf> = paths.into_iter().collect();
        paths.sort();
        Self { paths }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// All paths containing `source_id` at an identifier boundary.
    pub fn find(&self, source_id: &str) -> Vec<&Path> {
        if source_id.is_empty() {
            return Vec::new();
        }
        self.paths
            .iter()
            .filter(|p| contains_identifier(&p.to_string_lossy(), source_id))
            .map(PathBuf::as_path)
            .collect()
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-'
}

/// Whether `id` occurs in `haystack` not flanked by identifier characters.
pub fn contains_identifier(haystack: &str, id: &str) -> bool {
    haystack.match_indices(id).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + id.len()..].chars().next();
        !before.is_some_and(is_identifier_char) && !after.is_some_and(is_identifier_char)
    })
}

/// Uppercased extension of the file name, empty when there is none.
pub fn file_format(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy())
        .and_then(|name| name.rsplit_once('.').map(|(_, ext)| ext.to_uppercase()))
        .unwrap_or_default()
}

/// Turn resources into uploads, dropping those without a file.
pub fn materialize(resources: &[ResourceRecord], files: &FileIndex) -> Vec<ResourceUpload> {
    resources
        .iter()
        .filter_map(|resource| {
            let matches = files.find(&resource.source_id);
            let Some(path) = matches.first() else {
                log_warning(format!(
                    "No file for resource '{}' ({}), skipping",
                    resource.name, resource.source_id
                ));
                return None;
            };
            if matches.len() > 1 {
                log_warning(format!(
                    "{} files match resource {}, using {}",
                    matches.len(),
                    resource.source_id,
                    path.display()
                ));
            }

            Some(ResourceUpload {
                name: resource.name.clone(),
                created: resource.created.clone(),
                last_modified: resource.last_modified.clone(),
                description: resource.description.clone(),
                format: file_format(path),
                upload_path: path.to_path_buf(),
            })
        })
        .collect()
}
