use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the Pellet Monitor crates.
#[derive(Error, Debug)]
pub enum PelletError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A day window other than 7 or 30 days was requested.
    #[error("Invalid day window: {0} (expected 7 or 30)")]
    InvalidWindow(u32),

    /// A histogram bin boundary list is unusable.
    #[error("Invalid bin boundaries: {0}")]
    InvalidBins(String),

    /// A chart name did not match any known chart kind.
    #[error("Unknown chart: {0}")]
    UnknownChart(String),

    /// The upstream data source could not produce a snapshot.
    #[error("Data source unavailable: {0}")]
    SourceUnavailable(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the pellet crates.
pub type Result<T> = std::result::Result<T, PelletError>;
