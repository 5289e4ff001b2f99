//! Dataset ingestion and discovery.
//!
//! Turns tab-delimited user/item/interaction files into normalized,
//! immutable [`Dataset`] instances, and indexes them by namespace.

pub mod catalog;
pub mod ingest;
pub mod record;

pub use catalog::{DatasetBundle, DatasetCatalog};
pub use ingest::{DataFormatError, Dataset, DatasetFiles, IngestResult};
pub use record::{InteractionEvent, ItemRecord, UserRecord};
