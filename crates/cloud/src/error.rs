//! Error types for remote submission.

use thiserror::Error;

/// Errors produced while submitting a graph.
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status. The body is kept
    /// verbatim.
    #[error("remote evaluation failed with HTTP {status}: {body}")]
    Remote { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("runtime error: {0}")]
    Runtime(String),

    #[error("core error: {0}")]
    Core(#[from] aridex_core::Error),
}

/// Result alias for cloud operations.
pub type Result<T> = std::result::Result<T, CloudError>;
