//! Error types for the Sentinel orchestrator.

use std::path::PathBuf;

use thiserror::Error;

/// Core error type for sentinel operations.
#[derive(Debug, Error)]
pub enum SentinelError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A configuration file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A configuration file is not valid TOML for [`SentinelConfig`](crate::SentinelConfig).
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Monitor error passthrough.
    #[error("Monitor error: {0}")]
    Monitor(#[from] sentinel_monitor::MonitorError),

    /// Council error passthrough.
    #[error("Council error: {0}")]
    Council(#[from] sentinel_council::CouncilError),
}
