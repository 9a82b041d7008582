//! Error types for aridex

use thiserror::Error;

/// Main error type for aridex operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed tables, parameters or ranges, detected while the graph is built.
    #[error("configuration error in {context}: {reason}")]
    Configuration { context: String, reason: String },

    /// An input code with no remap table entry, under the `Fail` miss policy.
    #[error("remap miss: code {code} has no entry in the remap table")]
    RemapMiss { code: f64 },

    #[error("unknown dataset: {0}")]
    UnknownDataset(String),

    #[error("band '{band}' not found (available: {available:?})")]
    UnknownBand { band: String, available: Vec<String> },

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("CRS mismatch: {0} vs {1}")]
    CrsMismatch(String, String),

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a [`Error::Configuration`].
    pub fn config(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Configuration {
            context: context.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error was raised while building, before any evaluation.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration { .. })
    }
}

/// Result type alias for aridex operations
pub type Result<T> = std::result::Result<T, Error>;
