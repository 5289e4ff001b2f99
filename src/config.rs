//! Startup configuration and the accelerated-layout capability probe.

use std::env;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

/// Environment variable naming the dataset root directory.
pub const DS_PATH_VAR: &str = "RECVIZ_DS_PATH";

/// Environment variable naming the graph cache directory.
pub const CACHE_PATH_VAR: &str = "RECVIZ_CACHE_PATH";

/// Environment variable forcing the CPU layout backend regardless of the
/// capability probe. Any non-empty value counts.
pub const FORCE_CPU_VAR: &str = "RECVIZ_FORCE_CPU_LAYOUT";

/// Startup/environment errors. All of these are fatal for the service.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("environment variable {0} is not set")]
    MissingVar(&'static str),

    #[error("cache directory '{path}' is unusable: {source}")]
    CacheDirUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("dataset root '{path}' is unreadable: {source}")]
    DatasetRootUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type ConfigResult<T> = Result<T, ConfigurationError>;

/// Which implementation runs the layout and community-detection stages.
///
/// Resolved once at startup and injected into the graph builder; tests force
/// either variant directly instead of relying on the probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutBackend {
    /// Sequential reference implementation, always available
    Cpu,
    /// Rayon-parallel implementation
    Parallel,
}

impl LayoutBackend {
    /// Probe the process environment once: multi-core hosts get the parallel
    /// backend, everything else (and `RECVIZ_FORCE_CPU_LAYOUT`) falls back
    /// to the CPU reference.
    pub fn detect() -> Self {
        if env::var_os(FORCE_CPU_VAR).is_some_and(|v| !v.is_empty()) {
            info!("{} set, using CPU layout backend", FORCE_CPU_VAR);
            return LayoutBackend::Cpu;
        }
        match std::thread::available_parallelism() {
            Ok(n) if n.get() > 1 => LayoutBackend::Parallel,
            _ => {
                info!("parallelism probe failed or single-core, using CPU layout backend");
                LayoutBackend::Cpu
            }
        }
    }
}

/// Typed startup configuration.
#[derive(Debug, Clone)]
pub struct RecvizConfig {
    /// Root directory holding one subdirectory per dataset namespace
    pub dataset_root: PathBuf,
    /// Directory holding persisted graph artifacts
    pub cache_dir: PathBuf,
    /// Layout/community execution strategy
    pub backend: LayoutBackend,
}

impl RecvizConfig {
    /// Read the configuration from the environment. Absence of either path
    /// variable is fatal.
    pub fn from_env() -> ConfigResult<Self> {
        let dataset_root = env::var_os(DS_PATH_VAR)
            .map(PathBuf::from)
            .ok_or(ConfigurationError::MissingVar(DS_PATH_VAR))?;
        let cache_dir = env::var_os(CACHE_PATH_VAR)
            .map(PathBuf::from)
            .ok_or(ConfigurationError::MissingVar(CACHE_PATH_VAR))?;

        Ok(Self {
            dataset_root,
            cache_dir,
            backend: LayoutBackend::detect(),
        })
    }

    /// Build a configuration from explicit paths (tests, embedding).
    pub fn new(
        dataset_root: impl Into<PathBuf>,
        cache_dir: impl Into<PathBuf>,
        backend: LayoutBackend,
    ) -> Self {
        Self {
            dataset_root: dataset_root.into(),
            cache_dir: cache_dir.into(),
            backend,
        }
    }
}
