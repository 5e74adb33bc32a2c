//! Socrata license string -> CKAN license id.

use std::collections::{HashMap, HashSet};

use crate::logs::log_warning;

/// Exact Socrata license labels and the CKAN id each maps to.
const SOCRATA_LICENSES: &[(&str, &str)] = &[
    ("Public Domain", "other-pd"),
    ("Creative Commons 1.0 Universal (Public Domain Dedication)", "cc-zero"),
    ("Creative Commons Attribution 3.0 Unported", "cc-by"),
    ("Creative Commons Attribution 4.0 International", "cc-by"),
    ("Creative Commons Attribution | Share Alike 3.0 Unported", "cc-by-sa"),
    ("Creative Commons Attribution | Share Alike 4.0 International", "cc-by-sa"),
    ("Creative Commons Attribution | Noncommercial 3.0 Unported", "cc-nc"),
    ("Open Data Commons Public Domain Dedication and License", "odc-pddl"),
    ("Open Data Commons Attribution License", "odc-by"),
    ("Open Data Commons Open Database License", "odc-odbl"),
    ("UK Open Government Licence v3", "uk-ogl"),
    ("GNU Free Documentation License", "gfdl"),
];

/// Lookup from source license label to target license id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseTable {
    map: HashMap<String, String>,
}

impl Default for LicenseTable {
    fn default() -> Self {
        Self::socrata()
    }
}

impl LicenseTable {
    /// The built-in Socrata table.
    pub fn socrata() -> Self {
        Self::from_pairs(SOCRATA_LICENSES.iter().copied())
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            map: pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Target id for an exact source label. Unmapped labels yield `None`.
    pub fn resolve(&self, label: &str) -> Option<&str> {
        self.map.get(label).map(String::as_str)
    }

    /// Drop mappings whose target id the catalog does not offer.
    pub fn restrict_to(&mut self, known_ids: &HashSet<String>) {
        let mut dropped: Vec<(String, String)> = Vec::new();
        self.map.retain(|label, id| {
            let keep = known_ids.contains(id);
            if !keep {
                dropped.push((label.clone(), id.clone()));
            }
            keep
        });

        dropped.sort();
        for (label, id) in dropped {
            log_warning(format!(
                "License '{}' maps to '{}', which the target does not offer; it will be omitted",
                label, id
            ));
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
