//! Error taxonomy for the analysis run
//!
//! Only fatal conditions are errors. Per-file and per-batch problems are
//! logged where they happen and surface as counts in the stage reports.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors that abort an analysis before or during a stage.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("archive rejected: {0}")]
    Archive(#[from] ArchiveError),

    #[error("{stage} stage failed: {message}")]
    Stage { stage: &'static str, message: String },
}

/// Reasons an uploaded archive is refused.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("entry escapes the extraction directory: {entry}")]
    PathTraversal { entry: String },

    #[error("payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: u64, limit: u64 },

    #[error("invalid archive: {0}")]
    Invalid(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Problems loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}
