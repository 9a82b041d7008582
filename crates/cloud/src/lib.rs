//! # aridex cloud
//!
//! Submits index graphs to a remote raster service for evaluation.
//!
//! The graphs built by `aridex-algorithms` are declarative; this crate is
//! the boundary where they leave the process. Each layer of an
//! [`IndexResult`](aridex_algorithms::result::IndexResult) is serialised
//! with its tags and posted as one JSON request. Whatever the service
//! answers is handed back unchanged.
//!
//! ## Features
//!
//! - `native` (default): blocking API via a tokio current-thread runtime

pub mod auth;
pub mod client;
pub mod error;
pub mod http;
pub mod request;

pub mod sync_api;

pub use auth::{BearerToken, CloudAuth, NoAuth};
pub use client::{RemoteEvaluator, RemoteEvaluatorOptions};
pub use error::{CloudError, Result};
pub use request::{LayerPayload, SubmitRequest};

/// Blocking API re-exported as `blocking` module (native only).
#[cfg(feature = "native")]
pub mod blocking {
    pub use crate::sync_api::*;
}
