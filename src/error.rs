//! Error types for each pipeline stage.
//!
//! Lower-level I/O and parse failures are converted into one of these at the
//! stage boundary; the driver decides whether a failure is fatal.

use std::path::PathBuf;
use thiserror::Error;

/// Failure while querying the remote carbon estimation service.
///
/// Always recoverable: the caller falls back to a synthesized dataset.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("cannot connect to {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unparsable response body: {0}")]
    Body(String),
}

/// A statistic is undefined for the given input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("insufficient data: {reason}")]
pub struct InsufficientData {
    pub reason: String,
}

impl InsufficientData {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Failure while producing a single chart artifact.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to draw {chart}: {message}")]
    Draw { chart: String, message: String },

    #[error("failed to serialize data for {chart}: {source}")]
    Encode {
        chart: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no records to plot in {chart}")]
    NoData { chart: String },
}

/// Failure while converting a notebook into a page.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("notebook not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed notebook {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported notebook format version {0} (need 4 or later)")]
    UnsupportedVersion(u32),

    #[error("cell {cell} output {output}: cannot decode {mime} payload")]
    BadImage {
        cell: usize,
        output: usize,
        mime: String,
    },
}

/// Failure while persisting or loading the dataset file.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid dataset file {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}
