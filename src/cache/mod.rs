//! Fingerprint-addressed graph cache.
//!
//! Maps a (dataset, filter) fingerprint to a persisted or in-memory build
//! artifact. Guarantees at-most-one concurrent build per fingerprint via a
//! per-key lock map; requests for distinct keys build in parallel on their
//! own threads.

use crate::config::ConfigurationError;
use crate::dataset::DatasetCatalog;
use crate::error::{ServiceError, ServiceResult};
use crate::graph::{BuildMode, BuiltGraph, FilterSpec, GraphBuilder};
use rustc_hash::FxHashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Suffix distinguishing community-partition entries from graph entries.
const LOUVAIN_SUFFIX: &str = "_louvain";

/// Canonical fingerprint of a (dataset, filters) pair. Deterministic and
/// insensitive to the ordering of the filter map and its value lists.
pub fn graph_key(dataset_name: &str, filters: Option<&FilterSpec>) -> String {
    match filters {
        None => dataset_name.to_string(),
        Some(filters) if filters.is_empty() => dataset_name.to_string(),
        Some(filters) => {
            // BTreeMap iteration is already lexicographic by feature name
            let parts: Vec<String> = filters
                .iter()
                .map(|(feature, values)| {
                    let mut values: Vec<&str> = values.iter().map(String::as_str).collect();
                    values.sort_unstable();
                    format!("{feature}:{}", values.join(","))
                })
                .collect();
            format!("{dataset_name}_{}", parts.join("_"))
        }
    }
}

/// A registered cache artifact. Cloning is cheap; repeated hits on one key
/// hand back the identical `Arc`.
#[derive(Debug, Clone)]
pub enum CacheEntry {
    /// Interchange file discovered during the startup scan
    GexfFile(PathBuf),
    /// Graph built during this process lifetime
    Graph(Arc<BuiltGraph>),
    /// Community partition from a skip-persistence build
    Partition(Arc<FxHashMap<String, usize>>),
}

/// Shared graph cache. All methods take `&self`; interior state is behind
/// mutexes because the intended deployment serves concurrent requests.
pub struct GraphCache {
    cache_dir: PathBuf,
    builder: GraphBuilder,
    entries: Mutex<FxHashMap<String, CacheEntry>>,
    /// Per-key build gates (single-flight). Gates live for the process
    /// lifetime: removing one while a waiter is parked on it would let a
    /// newcomer mint a second gate for the same key and build concurrently.
    gates: Mutex<FxHashMap<String, Arc<Mutex<()>>>>,
}

impl GraphCache {
    /// Create the cache, registering every interchange file already present
    /// in the cache directory. An unusable directory is a fatal startup
    /// error for the whole service.
    pub fn new(cache_dir: impl Into<PathBuf>, builder: GraphBuilder) -> Result<Self, ConfigurationError> {
        let cache_dir = cache_dir.into();
        let listing = std::fs::read_dir(&cache_dir).map_err(|source| {
            ConfigurationError::CacheDirUnavailable {
                path: cache_dir.clone(),
                source,
            }
        })?;

        let mut entries = FxHashMap::default();
        for entry in listing.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("gexf") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    entries.insert(stem.to_string(), CacheEntry::GexfFile(path.clone()));
                }
            }
        }
        info!(
            cache_dir = %cache_dir.display(),
            entries = entries.len(),
            "graph cache ready"
        );

        Ok(Self {
            cache_dir,
            builder,
            entries: Mutex::new(entries),
            gates: Mutex::new(FxHashMap::default()),
        })
    }

    pub fn cache_dir(&self) -> &PathBuf {
        &self.cache_dir
    }

    /// Keys currently registered.
    pub fn keys(&self) -> Vec<String> {
        let entries = self.entries.lock().expect("graph cache poisoned");
        entries.keys().cloned().collect()
    }

    fn lookup(&self, key: &str) -> Option<CacheEntry> {
        let entries = self.entries.lock().expect("graph cache poisoned");
        entries.get(key).cloned()
    }

    fn register(&self, key: &str, entry: CacheEntry) {
        let mut entries = self.entries.lock().expect("graph cache poisoned");
        entries.insert(key.to_string(), entry);
    }

    /// Gate for one key: all requests for the same fingerprint serialize
    /// behind this mutex, so at most one build runs per key.
    fn gate(&self, key: &str) -> Arc<Mutex<()>> {
        let mut gates = self.gates.lock().expect("build gate map poisoned");
        gates
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Return the artifact for a fingerprint, building (and persisting) it
    /// on a miss. Failed builds are not registered, so a later request
    /// retries instead of observing a permanently broken value.
    pub fn get_graph(
        &self,
        catalog: &DatasetCatalog,
        dataset_name: &str,
        filters: Option<&FilterSpec>,
    ) -> ServiceResult<CacheEntry> {
        let key = graph_key(dataset_name, filters);
        if let Some(entry) = self.lookup(&key) {
            debug!(key, "cache hit");
            return Ok(entry);
        }

        let gate = self.gate(&key);
        let _guard = gate.lock().expect("build gate poisoned");

        // A coalesced waiter observes the build that beat it here
        if let Some(entry) = self.lookup(&key) {
            debug!(key, "cache hit after wait");
            return Ok(entry);
        }

        self.build_entry(catalog, dataset_name, filters, &key, BuildMode::Persist)
    }

    /// Return the community partition for a fingerprint, building the graph
    /// in skip-persistence mode on a miss. Only the partition is stored.
    pub fn get_louvain(
        &self,
        catalog: &DatasetCatalog,
        dataset_name: &str,
        filters: Option<&FilterSpec>,
    ) -> ServiceResult<Arc<FxHashMap<String, usize>>> {
        let key = format!("{}{LOUVAIN_SUFFIX}", graph_key(dataset_name, filters));
        if let Some(CacheEntry::Partition(parts)) = self.lookup(&key) {
            debug!(key, "cache hit");
            return Ok(parts);
        }

        let gate = self.gate(&key);
        let _guard = gate.lock().expect("build gate poisoned");

        if let Some(CacheEntry::Partition(parts)) = self.lookup(&key) {
            debug!(key, "cache hit after wait");
            return Ok(parts);
        }

        self.build_entry(catalog, dataset_name, filters, &key, BuildMode::SkipPersist)
            .map(|entry| match entry {
                CacheEntry::Partition(parts) => parts,
                // build_entry only produces Partition for SkipPersist
                _ => unreachable!("skip-persist build registered a non-partition entry"),
            })
    }

    fn build_entry(
        &self,
        catalog: &DatasetCatalog,
        dataset_name: &str,
        filters: Option<&FilterSpec>,
        key: &str,
        mode: BuildMode,
    ) -> ServiceResult<CacheEntry> {
        let bundle = catalog
            .get(dataset_name)
            .ok_or_else(|| ServiceError::NotFound(dataset_name.to_string()))?;

        let built = self.builder.build(&bundle.dataset, filters, key, mode)?;
        let entry = match mode {
            BuildMode::Persist => CacheEntry::Graph(Arc::new(built)),
            BuildMode::SkipPersist => {
                CacheEntry::Partition(Arc::new(built.louvain_parts().clone()))
            }
        };
        self.register(key, entry.clone());
        Ok(entry)
    }
}
