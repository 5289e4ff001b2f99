//! Service-boundary error type.
//!
//! Each subsystem carries its own `thiserror` enum; this unifies them into
//! the four inspectable kinds the calling boundary dispatches on.

use crate::config::ConfigurationError;
use crate::dataset::DataFormatError;
use crate::graph::BuildFailureError;
use thiserror::Error;

/// Top-level error returned at the service boundary.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Dataset ingestion failure (malformed files)
    #[error(transparent)]
    DataFormat(#[from] DataFormatError),

    /// Lookup miss for a dataset or model name
    #[error("dataset '{0}' is not registered")]
    NotFound(String),

    /// Startup/environment failure
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Graph build pipeline failure (layout, community detection, persistence)
    #[error(transparent)]
    Build(#[from] BuildFailureError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
