//! Blocking (synchronous) API for native platforms.
//!
//! Wraps the async [`RemoteEvaluator`](crate::client::RemoteEvaluator) with
//! a Tokio runtime so callers don't need to manage their own.

#[cfg(feature = "native")]
mod inner {
    use aridex_algorithms::result::IndexResult;

    use crate::client::{RemoteEvaluator, RemoteEvaluatorOptions};
    use crate::error::{CloudError, Result};
    use crate::request::SubmitRequest;

    /// Blocking wrapper around [`RemoteEvaluator`].
    ///
    /// Uses an internal single-threaded Tokio runtime.
    pub struct RemoteEvaluatorBlocking {
        rt: tokio::runtime::Runtime,
        inner: RemoteEvaluator,
    }

    impl RemoteEvaluatorBlocking {
        pub fn new(endpoint: impl Into<String>, options: RemoteEvaluatorOptions) -> Result<Self> {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| CloudError::Runtime(e.to_string()))?;
            let inner = RemoteEvaluator::new(endpoint, options)?;
            Ok(Self { rt, inner })
        }

        pub fn endpoint(&self) -> &str {
            self.inner.endpoint()
        }

        /// Submit an index result (blocking).
        pub fn submit(&self, result: &IndexResult) -> Result<serde_json::Value> {
            self.rt.block_on(self.inner.submit(result))
        }

        /// Submit a prepared request (blocking).
        pub fn submit_request(&self, request: &SubmitRequest) -> Result<serde_json::Value> {
            self.rt.block_on(self.inner.submit_request(request))
        }
    }

    /// One-shot: build a client, submit, return the reply.
    pub fn submit(
        endpoint: &str,
        result: &IndexResult,
        options: RemoteEvaluatorOptions,
    ) -> Result<serde_json::Value> {
        RemoteEvaluatorBlocking::new(endpoint, options)?.submit(result)
    }
}

#[cfg(feature = "native")]
pub use inner::*;
