//! Error types for the tagean-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the tagean library.
#[derive(Error, Debug)]
pub enum TagError {
    /// Catalog loading error.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Result log error.
    #[error("result log error: {0}")]
    Log(#[from] LogError),

    /// Batch driver error.
    #[error("batch error: {0}")]
    Batch(#[from] BatchError),

    /// Inference table output error.
    #[error("output error: {0}")]
    Output(#[from] csv::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to loading the reference catalog.
///
/// Every variant is fatal for a run: a degraded catalog is never used.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The catalog file does not exist.
    #[error("catalog file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Required columns are missing from the header row.
    #[error("catalog is missing required columns {missing:?} (available: {available:?})")]
    Schema {
        missing: Vec<String>,
        available: Vec<String>,
    },

    /// Any other failure while reading or parsing the catalog.
    #[error("failed to parse catalog: {0}")]
    Parse(String),
}

/// Errors related to the append-only result log.
#[derive(Error, Debug)]
pub enum LogError {
    /// The result log does not exist.
    #[error("result log not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Failed to read or append to the log.
    #[error("I/O error on result log: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the batch driver before or between items.
#[derive(Error, Debug)]
pub enum BatchError {
    /// The input directory holds no recognized images.
    #[error("no images found in {}", .0.display())]
    NoWorkItems(PathBuf),

    /// The requested resume item is not part of the enumerated sequence.
    #[error("resume item '{0}' not found among the enumerated images")]
    ResumePointNotFound(String),

    /// Failed to read or write the checkpoint file.
    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    /// Failed to append to the result log.
    #[error(transparent)]
    Log(#[from] LogError),

    /// I/O error while enumerating work items.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the tagean library.
pub type Result<T> = std::result::Result<T, TagError>;
