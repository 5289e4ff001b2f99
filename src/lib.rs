//! RecViz Core
//!
//! Turns tabular recommendation-system datasets (users, items, timestamped
//! interactions) into filtered, laid-out, community-annotated graphs for
//! visualization, with a cache keyed by dataset and filter fingerprint.
//!
//! # Architecture
//!
//! - [`dataset`]: ingestion of tab-delimited feature/interaction files into
//!   normalized, immutable [`Dataset`] instances, and the catalog that
//!   discovers and indexes them by namespace.
//! - [`graph`]: the build pipeline — node preparation, filter matching,
//!   interaction replay, force-directed layout, Louvain community
//!   annotation, GEXF persistence.
//! - [`cache`]: fingerprint-addressed artifact cache with single-flight
//!   build coalescing per key.
//! - [`config`]: environment-driven startup configuration and the
//!   accelerated-layout capability probe.
//!
//! The HTTP routing layer, model inference, and set-similarity scoring are
//! external collaborators; they consume the public APIs here (ordered user
//! ids, item display labels, per-user interaction history, cache entries)
//! and are not part of this crate.
//!
//! # Example Usage
//!
//! ```no_run
//! use recviz::cache::GraphCache;
//! use recviz::config::{LayoutBackend, RecvizConfig};
//! use recviz::dataset::DatasetCatalog;
//! use recviz::graph::GraphBuilder;
//!
//! # fn main() -> Result<(), recviz::ServiceError> {
//! let config = RecvizConfig::from_env()?;
//! let catalog = DatasetCatalog::scan(&config.dataset_root)?;
//! let builder = GraphBuilder::new(&config.cache_dir, config.backend);
//! let cache = GraphCache::new(&config.cache_dir, builder)?;
//!
//! for name in catalog.dataset_names() {
//!     let entry = cache.get_graph(&catalog, name, None)?;
//!     println!("{name}: {entry:?}");
//! }
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]

pub mod cache;
pub mod config;
pub mod dataset;
pub mod error;
pub mod graph;

// Re-export main types for convenience
pub use cache::{graph_key, CacheEntry, GraphCache};
pub use config::{ConfigurationError, LayoutBackend, RecvizConfig};
pub use dataset::{DataFormatError, Dataset, DatasetCatalog, InteractionEvent};
pub use error::{ServiceError, ServiceResult};
pub use graph::{BuildFailureError, BuildMode, BuiltGraph, FilterSpec, GraphBuilder, VizGraph};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
