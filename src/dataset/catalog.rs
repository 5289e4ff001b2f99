//! Dataset discovery: scan a root directory, classify files per namespace,
//! ingest, and index the valid datasets by name.

use super::ingest::{Dataset, DatasetFiles};
use crate::config::ConfigurationError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Model-artifact extension recognized under a namespace's `models` directory.
const MODEL_EXT: &str = "pth";

/// A registered dataset plus the trained-model artifacts discovered next to
/// it. Model files are indexed by name only; loading them is the inference
/// collaborator's job.
#[derive(Debug)]
pub struct DatasetBundle {
    pub dataset: Dataset,
    /// Model file name → artifact path
    pub models: BTreeMap<String, PathBuf>,
}

/// Index of all valid datasets under one root directory.
///
/// One namespace's ingestion failure is logged and skipped; it never aborts
/// the scan for the others.
#[derive(Debug, Default)]
pub struct DatasetCatalog {
    datasets: BTreeMap<String, DatasetBundle>,
}

impl DatasetCatalog {
    /// Scan `root` and build every namespace that has at least one user file
    /// and one item file. Only valid datasets are registered.
    pub fn scan(root: &Path) -> Result<Self, ConfigurationError> {
        let entries =
            std::fs::read_dir(root).map_err(|source| ConfigurationError::DatasetRootUnreadable {
                path: root.to_path_buf(),
                source,
            })?;

        let mut catalog = DatasetCatalog::default();
        for entry in entries.flatten() {
            let dir = entry.path();
            if !dir.is_dir() {
                continue;
            }
            let Some(name) = dir.file_name().and_then(|n| n.to_str()).map(str::to_string)
            else {
                continue;
            };
            catalog.scan_namespace(&dir, &name);
        }

        info!(datasets = ?catalog.dataset_names(), "catalog scan complete");
        Ok(catalog)
    }

    fn scan_namespace(&mut self, dir: &Path, name: &str) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            warn!(dataset = name, "namespace directory unreadable, skipping");
            return;
        };

        let mut files = DatasetFiles::default();
        let mut models = BTreeMap::new();

        for entry in entries.flatten() {
            let path = entry.path();
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            match path.extension().and_then(|e| e.to_str()) {
                Some("user") => files.user_files.push(file_name.into()),
                Some("item") => files.item_files.push(file_name.into()),
                Some("inter") => files.inter_files.push(file_name.into()),
                _ if file_name == "models" && path.is_dir() => {
                    collect_models(&path, &mut models);
                }
                _ => {}
            }
        }

        // Deterministic ingestion order regardless of directory listing order
        files.user_files.sort();
        files.item_files.sort();
        files.inter_files.sort();

        if files.user_files.is_empty() || files.item_files.is_empty() {
            return;
        }

        match Dataset::load(dir, name, &files) {
            Ok(dataset) if dataset.valid() => {
                info!(dataset = name, models = models.len(), "registered dataset");
                self.datasets
                    .insert(name.to_string(), DatasetBundle { dataset, models });
            }
            Ok(_) => {
                warn!(dataset = name, "dataset is incomplete, not registering");
            }
            Err(err) => {
                warn!(dataset = name, error = %err, "dataset ingestion failed, skipping");
            }
        }
    }

    /// Names of all registered datasets, sorted.
    pub fn dataset_names(&self) -> Vec<&str> {
        self.datasets.keys().map(String::as_str).collect()
    }

    /// Bundle for a name. `None` is the not-found signal, never an error.
    pub fn get(&self, name: &str) -> Option<&DatasetBundle> {
        self.datasets.get(name)
    }

    /// Model names registered for a dataset.
    pub fn model_names(&self, name: &str) -> Option<Vec<String>> {
        self.get(name)
            .map(|bundle| bundle.models.keys().cloned().collect())
    }
}

fn collect_models(dir: &Path, models: &mut BTreeMap<String, PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some(MODEL_EXT) {
            if let Some(file_name) = path.file_name().and_then(|n| n.to_str()) {
                models.insert(file_name.to_string(), path.clone());
            }
        }
    }
}
