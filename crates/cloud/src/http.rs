//! HTTP client wrapper for JSON submissions.
//!
//! Requests go out once. A timeout bounds the wait; there is no retry.

use crate::auth::CloudAuth;
use crate::error::{CloudError, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Status and body of a successful response.
#[derive(Debug, Clone)]
pub struct JsonResponse {
    pub status: u16,
    pub body: String,
}

/// HTTP client for posting JSON documents.
pub struct HttpClient {
    client: Client,
    request_timeout: Duration,
}

impl HttpClient {
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            client,
            request_timeout,
        })
    }

    /// POST `body` as JSON and read the whole response.
    ///
    /// A non-success status becomes [`CloudError::Remote`] with the body
    /// exactly as received.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        auth: &dyn CloudAuth,
    ) -> Result<JsonResponse> {
        let mut auth_headers = Vec::new();
        auth.sign_request(url, "POST", &mut auth_headers)?;

        let payload = serde_json::to_vec(body)?;
        debug!("POST {} ({} bytes)", url, payload.len());

        let mut req = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .body(payload);
        for (key, value) in &auth_headers {
            req = req.header(key.as_str(), value.as_str());
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        debug!("{} answered HTTP {}", url, status);

        if !status.is_success() {
            return Err(CloudError::Remote {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(JsonResponse {
            status: status.as_u16(),
            body: text,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}
